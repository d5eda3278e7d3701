//! Dependency and safety analysis (§4.4 / Data Model "Dependency Record").

use crate::declarations::DeclarationTable;
use crate::expressions::{BinaryOp, Expr, ExprLoc};
use crate::intern::StringId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyOrigin {
    Literal,
    Declaration,
    Argument,
    Function,
    ArrayLiteral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    pub origin: DependencyOrigin,
    pub is_safe: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyAnalysis {
    pub dependencies: Vec<Dependency>,
    pub is_safe: bool,
}

impl DependencyAnalysis {
    fn single(dependency: Dependency) -> Self {
        Self { is_safe: dependency.is_safe, dependencies: vec![dependency] }
    }

    fn merge(mut self, other: Self) -> Self {
        self.is_safe = self.is_safe && other.is_safe;
        self.dependencies.extend(other.dependencies);
        self
    }
}

/// Walks `expr` collecting dependency records.
///
/// `clobbered` is true when an enclosing `*` or `/` has already forced
/// `isSafe = false` on the subtree; it is threaded down rather than
/// applied only at the leaves so that every dependency under a clobbering
/// operator is affected, matching §4.4.
pub fn analyze(
    expr: &ExprLoc,
    declarations: &DeclarationTable,
    is_argument: impl Fn(StringId) -> bool,
    clobbered: bool,
) -> DependencyAnalysis {
    match &expr.expr {
        Expr::Literal(lit) => DependencyAnalysis::single(Dependency {
            origin: DependencyOrigin::Literal,
            is_safe: lit.is_finite() && !clobbered,
        }),
        Expr::Identifier(name) => {
            if let Some(decl) = declarations.get(*name) {
                DependencyAnalysis::single(Dependency {
                    origin: DependencyOrigin::Declaration,
                    is_safe: decl.is_safe && !clobbered,
                })
            } else if is_argument(*name) {
                DependencyAnalysis::single(Dependency {
                    origin: DependencyOrigin::Argument,
                    is_safe: false,
                })
            } else {
                DependencyAnalysis::single(Dependency {
                    origin: DependencyOrigin::Declaration,
                    is_safe: false,
                })
            }
        }
        Expr::This => DependencyAnalysis::single(Dependency {
            origin: DependencyOrigin::Argument,
            is_safe: false,
        }),
        Expr::Array(_) => DependencyAnalysis::single(Dependency {
            origin: DependencyOrigin::ArrayLiteral,
            is_safe: true,
        }),
        Expr::Call { .. } => DependencyAnalysis::single(Dependency {
            origin: DependencyOrigin::Function,
            is_safe: true,
        }),
        Expr::Binary { op, left, right } => {
            let next_clobbered = clobbered || matches!(op, BinaryOp::Mul | BinaryOp::Div);
            let l = analyze(left, declarations, &is_argument, next_clobbered);
            let r = analyze(right, declarations, &is_argument, next_clobbered);
            l.merge(r)
        }
        Expr::Logical { left, right, .. } => {
            let l = analyze(left, declarations, &is_argument, clobbered);
            let r = analyze(right, declarations, &is_argument, clobbered);
            l.merge(r)
        }
        Expr::Unary { argument, .. } | Expr::Update { argument, .. } => {
            analyze(argument, declarations, &is_argument, clobbered)
        }
        Expr::Assignment { value, .. } => analyze(value, declarations, &is_argument, clobbered),
        Expr::Sequence(items) => items
            .iter()
            .map(|item| analyze(item, declarations, &is_argument, clobbered))
            .reduce(DependencyAnalysis::merge)
            .unwrap_or_default(),
        Expr::Conditional { test, consequent, alternate } => {
            let t = analyze(test, declarations, &is_argument, clobbered);
            let c = analyze(consequent, declarations, &is_argument, clobbered);
            let a = analyze(alternate, declarations, &is_argument, clobbered);
            t.merge(c).merge(a)
        }
        Expr::Member { object, property, .. } => {
            let base = analyze(object, declarations, &is_argument, clobbered);
            match property {
                crate::expressions::MemberProp::Computed(index) => {
                    base.merge(analyze(index, declarations, &is_argument, clobbered))
                }
                crate::expressions::MemberProp::Name(_) => base,
            }
        }
        Expr::Function(_) => DependencyAnalysis { dependencies: Vec::new(), is_safe: true },
    }
}
