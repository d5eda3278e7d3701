//! Declaration Table (§4.6 / Data Model "Declaration Record").

use ahash::AHashMap;

use crate::dependency::DependencyAnalysis;
use crate::intern::StringId;
use crate::types::Type;

/// One locally introduced name. Immutable after creation; re-declaring the
/// same name overwrites the table entry with a fresh record rather than
/// mutating the existing one (invariant iv).
#[derive(Debug, Clone)]
pub struct DeclarationRecord {
    pub ty: Type,
    pub dependencies: DependencyAnalysis,
    pub is_safe: bool,
}

impl DeclarationRecord {
    pub fn new(ty: Type, dependencies: DependencyAnalysis) -> Self {
        let is_safe = dependencies.is_safe;
        Self { ty, dependencies, is_safe }
    }
}

#[derive(Debug, Default)]
pub struct DeclarationTable {
    records: AHashMap<StringId, DeclarationRecord>,
}

impl DeclarationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: StringId) -> Option<&DeclarationRecord> {
        self.records.get(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StringId, &DeclarationRecord)> {
        self.records.iter().map(|(name, record)| (*name, record))
    }

    /// Coerces `initializer_ty` per §4.6's rule (`LiteralInteger` becomes
    /// `Number`, or `Integer` when `in_for_loop_init` is set) and records
    /// an immutable declaration.
    pub fn declare(
        &mut self,
        name: StringId,
        initializer_ty: Type,
        dependencies: DependencyAnalysis,
        in_for_loop_init: bool,
    ) -> Type {
        let ty = coerce_literal_integer(initializer_ty, in_for_loop_init);
        self.records.insert(name, DeclarationRecord::new(ty, dependencies));
        ty
    }

    /// Records an additional declarator sharing a single statement's
    /// inferred type; per §4.6 it reuses that type but is marked unsafe.
    pub fn declare_unsafe_sibling(&mut self, name: StringId, ty: Type) {
        self.records.insert(name, DeclarationRecord::new(ty, DependencyAnalysis::default()));
    }
}

fn coerce_literal_integer(ty: Type, in_for_loop_init: bool) -> Type {
    if ty == Type::LiteralInteger {
        if in_for_loop_init { Type::Integer } else { Type::Number }
    } else {
        ty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Interner;

    #[test]
    fn literal_integer_coerces_to_number_outside_for_init() {
        assert_eq!(coerce_literal_integer(Type::LiteralInteger, false), Type::Number);
    }

    #[test]
    fn literal_integer_coerces_to_integer_inside_for_init() {
        assert_eq!(coerce_literal_integer(Type::LiteralInteger, true), Type::Integer);
    }

    #[test]
    fn later_declaration_overwrites_earlier_one() {
        let mut interner = Interner::new();
        let name = interner.intern("x");
        let mut table = DeclarationTable::new();
        table.declare(name, Type::Number, DependencyAnalysis::default(), false);
        table.declare(name, Type::Boolean, DependencyAnalysis::default(), false);
        assert_eq!(table.get(name).unwrap().ty, Type::Boolean);
    }

    #[test]
    fn is_safe_matches_dependency_and() {
        let mut interner = Interner::new();
        let name = interner.intern("x");
        let mut table = DeclarationTable::new();
        let deps = DependencyAnalysis {
            dependencies: vec![
                crate::dependency::Dependency {
                    origin: crate::dependency::DependencyOrigin::Literal,
                    is_safe: true,
                },
                crate::dependency::Dependency {
                    origin: crate::dependency::DependencyOrigin::Argument,
                    is_safe: false,
                },
            ],
            is_safe: false,
        };
        table.declare(name, Type::Number, deps, false);
        assert!(!table.get(name).unwrap().is_safe);
    }
}
