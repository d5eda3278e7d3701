//! The Type Oracle (§4.3): total-coverage static type inference over the
//! supported AST subset.

use ahash::AHashMap;

use crate::decomposer::{self, MemberDescriptor};
use crate::declarations::DeclarationTable;
use crate::errors::ShapeError;
use crate::expressions::{BinaryOp, Expr, ExprLoc, Node, NodeLoc};
use crate::intern::{Interner, StringId};
use crate::types::{indexed_element_type, Type, MATH_INTRINSICS, MATH_INTRINSICS_INTEGER};

/// `Float` normalizes to `Number` when surfaced through the constant oracle
/// (§3 Type Vocabulary); every other type passes through unchanged.
fn normalize_constant_type(ty: Type) -> Type {
    if ty == Type::Float {
        Type::Number
    } else {
        ty
    }
}

/// Per-call argument-type bindings recorded by a unit as it types calls to
/// named (potential sub-kernel) functions, consulted by that callee's own
/// oracle for argument-type back-propagation (§4.5).
#[derive(Debug, Default, Clone)]
pub struct CalledFunctionArguments {
    calls: AHashMap<String, Vec<Vec<Option<Type>>>>,
}

impl CalledFunctionArguments {
    pub fn record(&mut self, name: &str, argument_types: Vec<Option<Type>>) {
        self.calls.entry(name.to_string()).or_default().push(argument_types);
    }

    fn first_at(&self, name: &str, index: usize) -> Option<Type> {
        self.calls.get(name)?.iter().find_map(|call| call.get(index).copied().flatten())
    }
}

/// Bundles everything the oracle needs to resolve types: the interner,
/// declaration table, argument bindings (mutable for back-propagation
/// memoization), constant types, and the backend's `lookupReturnType`.
pub struct TypeOracle<'a> {
    pub interner: &'a Interner,
    pub declarations: &'a DeclarationTable,
    pub own_name: &'a str,
    pub argument_names: &'a [StringId],
    pub argument_types: &'a mut Vec<Option<Type>>,
    pub constant_types: &'a AHashMap<StringId, Type>,
    pub parent_called_arguments: Option<&'a CalledFunctionArguments>,
    pub own_called_arguments: &'a mut CalledFunctionArguments,
    pub lookup_return_type: &'a dyn Fn(&str) -> Option<Type>,
}

impl<'a> TypeOracle<'a> {
    fn argument_index(&self, name: StringId) -> Option<usize> {
        self.argument_names.iter().position(|candidate| *candidate == name)
    }

    /// Resolves argument `index`'s type, back-propagating from the
    /// parent's called-function-arguments table and memoizing the result
    /// (§4.5). This is the only permitted post-construction mutation of
    /// `argument_types`.
    fn resolve_argument_type(&mut self, index: usize) -> Option<Type> {
        if let Some(Some(ty)) = self.argument_types.get(index) {
            return Some(*ty);
        }
        let resolved = self.parent_called_arguments.and_then(|parent| parent.first_at(self.own_name, index))?;
        if let Some(slot) = self.argument_types.get_mut(index) {
            *slot = Some(resolved);
        }
        Some(resolved)
    }

    fn identifier_type(&mut self, name: StringId) -> Option<Type> {
        if let Some(index) = self.argument_index(name) {
            return self.resolve_argument_type(index);
        }
        if let Some(decl) = self.declarations.get(name) {
            return Some(decl.ty);
        }
        if self.interner.resolve(name) == "Infinity" {
            return Some(Type::Integer);
        }
        None
    }

    fn call_return_type(&mut self, callee: StringId, args: &[ExprLoc]) -> Result<Option<Type>, ShapeError> {
        let name = self.interner.resolve(callee);
        if MATH_INTRINSICS.contains(&name) {
            return Ok(Some(if MATH_INTRINSICS_INTEGER.contains(&name) { Type::Integer } else { Type::Number }));
        }
        let mut argument_types = Vec::with_capacity(args.len());
        for arg in args {
            argument_types.push(self.type_of(arg)?);
        }
        self.own_called_arguments.record(name, argument_types);
        Ok((self.lookup_return_type)(name))
    }

    /// `typeOf(node)` for an expression node.
    pub fn type_of(&mut self, expr: &ExprLoc) -> Result<Option<Type>, ShapeError> {
        match &expr.expr {
            Expr::Array(elements) => Ok(Some(Type::ArrayVec(elements.len() as u32))),
            Expr::Literal(lit) => {
                Ok(Some(if lit.is_integer_valued() { Type::LiteralInteger } else { Type::Number }))
            }
            Expr::Call { callee, arguments } => match &callee.expr {
                Expr::Identifier(name) => self.call_return_type(*name, arguments),
                Expr::Member { object, property: crate::expressions::MemberProp::Name(name), computed: false } => {
                    if matches!(&object.expr, Expr::Identifier(id) if self.interner.resolve(*id) == "Math") {
                        let fn_name = self.interner.resolve(*name);
                        if MATH_INTRINSICS.contains(&fn_name) {
                            return Ok(Some(if MATH_INTRINSICS_INTEGER.contains(&fn_name) {
                                Type::Integer
                            } else {
                                Type::Number
                            }));
                        }
                    }
                    Ok((self.lookup_return_type)(self.interner.resolve(*name)))
                }
                _ => Ok(None),
            },
            Expr::Binary { op, left, right } => {
                let left_ty = self.type_of(left)?;
                if matches!(op, BinaryOp::Mod) {
                    return Ok(Some(Type::Number));
                }
                if matches!(op, BinaryOp::Lt | BinaryOp::Gt) {
                    return Ok(Some(Type::Boolean));
                }
                let _ = self.type_of(right)?;
                Ok(left_ty.map(|ty| indexed_element_type(ty).unwrap_or(ty)))
            }
            Expr::Logical { left, right, .. } => {
                let _ = self.type_of(left)?;
                self.type_of(right)
            }
            Expr::Unary { argument, .. } | Expr::Update { argument, .. } => self.type_of(argument),
            Expr::Assignment { value, .. } => self.type_of(value),
            Expr::Sequence(items) => {
                let mut last = None;
                for item in items {
                    last = self.type_of(item)?;
                }
                Ok(last)
            }
            Expr::Conditional { consequent, .. } => self.type_of(consequent),
            Expr::Identifier(name) => Ok(self.identifier_type(*name)),
            Expr::This => Ok(None),
            Expr::Function(func) => self.type_of_function_body(&func.body),
            Expr::Member { .. } => self.member_type(expr),
        }
    }

    fn member_type(&mut self, expr: &ExprLoc) -> Result<Option<Type>, ShapeError> {
        let descriptor = self.decompose(expr)?;
        Ok(Some(descriptor.ty))
    }

    /// Exposes the decomposer with this oracle's root-type resolution
    /// wired in, for callers (the walker's member-expression handler)
    /// that need the full structured descriptor, not just a type.
    pub fn decompose(&mut self, expr: &ExprLoc) -> Result<MemberDescriptor, ShapeError> {
        // Resolve the root types eagerly; the closures passed to the
        // decomposer must be `Fn`, so interior mutation happens here,
        // ahead of the call, via a cache keyed by identifier.
        let mut identifier_cache: AHashMap<StringId, Option<Type>> = AHashMap::new();
        for candidate in self.argument_names.iter().copied() {
            identifier_cache.insert(candidate, self.identifier_type(candidate));
        }
        for (name, decl) in self.declarations.iter() {
            identifier_cache.entry(name).or_insert(Some(decl.ty));
        }
        let constant_types = self.constant_types;
        let lookup_return_type = self.lookup_return_type;
        let interner = self.interner;
        decomposer::decompose(
            expr,
            interner,
            |name| identifier_cache.get(&name).copied().flatten(),
            |name| constant_types.get(&name).copied().map(normalize_constant_type),
            |name| lookup_return_type(interner.resolve(name)),
        )
    }

    /// `typeOf(node)` for the subset of statement kinds §4.3 defines
    /// recursion for: variable declarations, return, function
    /// declaration, and block (via their last/right-hand-side
    /// sub-expression or statement).
    pub fn type_of_node(&mut self, node: &NodeLoc) -> Result<Option<Type>, ShapeError> {
        match &node.node {
            Node::Return(Some(value)) => self.type_of(value),
            Node::Return(None) => Ok(None),
            Node::VariableDeclaration { declarations, .. } => match declarations.first() {
                Some(decl) => match &decl.init {
                    Some(init) => self.type_of(init),
                    None => Ok(None),
                },
                None => Ok(None),
            },
            Node::FunctionDeclaration(func) => self.type_of_function_body(&func.body),
            Node::Block(statements) => match statements.last() {
                Some(last) => self.type_of_node(last),
                None => Ok(None),
            },
            _ => Ok(None),
        }
    }

    fn type_of_function_body(&mut self, body: &[NodeLoc]) -> Result<Option<Type>, ShapeError> {
        match body.last() {
            Some(last) => self.type_of_node(last),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expressions::Literal;

    fn oracle<'a>(
        interner: &'a Interner,
        declarations: &'a DeclarationTable,
        argument_names: &'a [StringId],
        argument_types: &'a mut Vec<Option<Type>>,
        constant_types: &'a AHashMap<StringId, Type>,
        own_called: &'a mut CalledFunctionArguments,
        lookup: &'a dyn Fn(&str) -> Option<Type>,
    ) -> TypeOracle<'a> {
        TypeOracle {
            interner,
            declarations,
            own_name: "kernel",
            argument_names,
            argument_types,
            constant_types,
            parent_called_arguments: None,
            own_called_arguments: own_called,
            lookup_return_type: lookup,
        }
    }

    #[test]
    fn literal_return_is_literal_integer() {
        let interner = Interner::new();
        let declarations = DeclarationTable::new();
        let names: Vec<StringId> = vec![];
        let mut types = vec![];
        let constants = AHashMap::new();
        let mut called = CalledFunctionArguments::default();
        let lookup = |_: &str| None;
        let mut o = oracle(&interner, &declarations, &names, &mut types, &constants, &mut called, &lookup);
        let expr = ExprLoc::new(Expr::Literal(Literal::Int(1)), None);
        assert_eq!(o.type_of(&expr).unwrap(), Some(Type::LiteralInteger));
    }

    #[test]
    fn typed_argument_resolves_directly() {
        let mut interner = Interner::new();
        let a = interner.intern("a");
        let declarations = DeclarationTable::new();
        let names = vec![a];
        let mut types = vec![Some(Type::ArrayVec(4))];
        let constants = AHashMap::new();
        let mut called = CalledFunctionArguments::default();
        let lookup = |_: &str| None;
        let mut o = oracle(&interner, &declarations, &names, &mut types, &constants, &mut called, &lookup);
        let expr = ExprLoc::new(Expr::Identifier(a), None);
        assert_eq!(o.type_of(&expr).unwrap(), Some(Type::ArrayVec(4)));
    }

    #[test]
    fn math_floor_is_integer() {
        let mut interner = Interner::new();
        let math = interner.intern("Math");
        let floor = interner.intern("floor");
        let declarations = DeclarationTable::new();
        let names: Vec<StringId> = vec![];
        let mut types = vec![];
        let constants = AHashMap::new();
        let mut called = CalledFunctionArguments::default();
        let lookup = |_: &str| None;
        let mut o = oracle(&interner, &declarations, &names, &mut types, &constants, &mut called, &lookup);
        let callee = ExprLoc::new(
            Expr::Member {
                object: Box::new(ExprLoc::new(Expr::Identifier(math), None)),
                property: crate::expressions::MemberProp::Name(floor),
                computed: false,
            },
            None,
        );
        let arg = ExprLoc::new(Expr::Literal(Literal::float(1.5)), None);
        let call = ExprLoc::new(Expr::Call { callee: Box::new(callee), arguments: vec![arg] }, None);
        assert_eq!(o.type_of(&call).unwrap(), Some(Type::Integer));
    }

    #[test]
    fn constant_float_type_normalizes_to_number() {
        let mut interner = Interner::new();
        let weight = interner.intern("weight");
        let declarations = DeclarationTable::new();
        let names: Vec<StringId> = vec![];
        let mut types = vec![];
        let mut constants = AHashMap::new();
        constants.insert(weight, Type::Float);
        let mut called = CalledFunctionArguments::default();
        let lookup = |_: &str| None;
        let mut o = oracle(&interner, &declarations, &names, &mut types, &constants, &mut called, &lookup);
        let this = ExprLoc::new(Expr::This, None);
        let constants_member = ExprLoc::new(
            Expr::Member {
                object: Box::new(this),
                property: crate::expressions::MemberProp::Name(interner.intern("constants")),
                computed: false,
            },
            None,
        );
        let weight_member = ExprLoc::new(
            Expr::Member {
                object: Box::new(constants_member),
                property: crate::expressions::MemberProp::Name(weight),
                computed: false,
            },
            None,
        );
        let descriptor = o.decompose(&weight_member).unwrap();
        assert_eq!(descriptor.ty, Type::Number);
    }

    #[test]
    fn comparison_operators_are_boolean() {
        let interner = Interner::new();
        let declarations = DeclarationTable::new();
        let names: Vec<StringId> = vec![];
        let mut types = vec![];
        let constants = AHashMap::new();
        let mut called = CalledFunctionArguments::default();
        let lookup = |_: &str| None;
        let mut o = oracle(&interner, &declarations, &names, &mut types, &constants, &mut called, &lookup);
        let left = ExprLoc::new(Expr::Literal(Literal::Int(1)), None);
        let right = ExprLoc::new(Expr::Literal(Literal::Int(2)), None);
        let expr = ExprLoc::new(
            Expr::Binary { op: BinaryOp::Lt, left: Box::new(left), right: Box::new(right) },
            None,
        );
        assert_eq!(o.type_of(&expr).unwrap(), Some(Type::Boolean));
    }
}
