//! Canonicalization of member-expression access chains into the fixed
//! signature vocabulary (§4.2).

use std::fmt;

use crate::expressions::{Expr, ExprLoc, MemberProp};
use crate::intern::Interner;

/// One of the fixed, recognized access-chain shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signature {
    Value,
    ValueIndex1,
    ValueIndex2,
    ValueIndex3,
    ValueDotValue,
    ThisThreadValue,
    ThisOutputValue,
    ThisConstantsValue,
    ThisConstantsValueIndex1,
    ThisConstantsValueIndex2,
    ThisConstantsValueIndex3,
    FnIndex1,
    FnIndex2,
    FnIndex3,
}

impl Signature {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::ValueIndex1 => "value[]",
            Self::ValueIndex2 => "value[][]",
            Self::ValueIndex3 => "value[][][]",
            Self::ValueDotValue => "value.value",
            Self::ThisThreadValue => "this.thread.value",
            Self::ThisOutputValue => "this.output.value",
            Self::ThisConstantsValue => "this.constants.value",
            Self::ThisConstantsValueIndex1 => "this.constants.value[]",
            Self::ThisConstantsValueIndex2 => "this.constants.value[][]",
            Self::ThisConstantsValueIndex3 => "this.constants.value[][][]",
            Self::FnIndex1 => "fn()[]",
            Self::FnIndex2 => "fn()[][]",
            Self::FnIndex3 => "fn()[][][]",
        }
    }

    fn from_str(text: &str) -> Option<Self> {
        Some(match text {
            "value" => Self::Value,
            "value[]" => Self::ValueIndex1,
            "value[][]" => Self::ValueIndex2,
            "value[][][]" => Self::ValueIndex3,
            "value.value" => Self::ValueDotValue,
            "this.thread.value" => Self::ThisThreadValue,
            "this.output.value" => Self::ThisOutputValue,
            "this.constants.value" => Self::ThisConstantsValue,
            "this.constants.value[]" => Self::ThisConstantsValueIndex1,
            "this.constants.value[][]" => Self::ThisConstantsValueIndex2,
            "this.constants.value[][][]" => Self::ThisConstantsValueIndex3,
            "fn()[]" => Self::FnIndex1,
            "fn()[][]" => Self::FnIndex2,
            "fn()[][][]" => Self::FnIndex3,
            _ => return None,
        })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vector-channel property names recognized only when resolving a
/// `value.value` descriptor to a channel access. `x`/`y`/`z` are part of
/// the broader named-property bucket the signature recognizer folds into
/// `.value` (§4.2) but are not themselves channel names (§3) — only
/// `r`/`g`/`b`/`a` qualify here.
pub const CHANNEL_PROPERTIES: &[&str] = &["r", "g", "b", "a"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fragment {
    This,
    Value,
    Constants,
    Thread,
    Output,
    FnCall,
    Index,
}

impl Fragment {
    fn text(self) -> &'static str {
        match self {
            Self::This => "this",
            Self::Value => "value",
            Self::Constants => "constants",
            Self::Thread => "thread",
            Self::Output => "output",
            Self::FnCall => "fn()",
            Self::Index => "[]",
        }
    }
}

fn join_fragments(fragments: &[Fragment]) -> String {
    let mut out = String::new();
    for fragment in fragments {
        if *fragment == Fragment::Index {
            out.push_str("[]");
        } else if out.is_empty() {
            out.push_str(fragment.text());
        } else {
            out.push('.');
            out.push_str(fragment.text());
        }
    }
    out
}

/// Walks from the outermost access inward, collecting fragments from the
/// base identifier/`this`/call origin out to the given expression.
fn collect(expr: &Expr, interner: &Interner) -> Option<Vec<Fragment>> {
    match expr {
        Expr::This => Some(vec![Fragment::This]),
        Expr::Identifier(_) => Some(vec![Fragment::Value]),
        Expr::Call { callee, .. } => {
            matches!(callee.expr, Expr::Identifier(_)).then_some(vec![Fragment::FnCall])
        }
        Expr::Member { object, property: MemberProp::Computed(_), computed: true } => {
            let mut fragments = collect(&object.expr, interner)?;
            fragments.push(Fragment::Index);
            Some(fragments)
        }
        Expr::Member { object, property: MemberProp::Name(name), computed: false } => {
            let mut fragments = collect(&object.expr, interner)?;
            let suffix = match interner.resolve(*name) {
                "constants" => Fragment::Constants,
                "thread" => Fragment::Thread,
                "output" => Fragment::Output,
                _ => Fragment::Value,
            };
            fragments.push(suffix);
            Some(fragments)
        }
        _ => None,
    }
}

/// Recognizes `expr`'s member-access chain, if any, against the fixed
/// allow-list. Returns `None` for non-member-chain expressions or chains
/// that don't match an allow-listed shape ("unhandled shape").
pub fn recognize(expr: &ExprLoc, interner: &Interner) -> Option<Signature> {
    let fragments = collect(&expr.expr, interner)?;
    Signature::from_str(&join_fragments(&fragments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expressions::Literal;

    fn ident(interner: &mut Interner, name: &str) -> ExprLoc {
        ExprLoc::new(Expr::Identifier(interner.intern(name)), None)
    }

    fn member(object: ExprLoc, prop: &str, interner: &mut Interner) -> ExprLoc {
        ExprLoc::new(
            Expr::Member {
                object: Box::new(object),
                property: MemberProp::Name(interner.intern(prop)),
                computed: false,
            },
            None,
        )
    }

    fn index(object: ExprLoc) -> ExprLoc {
        ExprLoc::new(
            Expr::Member {
                object: Box::new(object),
                property: MemberProp::Computed(Box::new(ExprLoc::new(
                    Expr::Literal(Literal::Int(0)),
                    None,
                ))),
                computed: true,
            },
            None,
        )
    }

    #[test]
    fn bare_identifier_is_value() {
        let mut interner = Interner::new();
        let expr = ident(&mut interner, "a");
        assert_eq!(recognize(&expr, &interner), Some(Signature::Value));
    }

    #[test]
    fn indexed_identifier_chain() {
        let mut interner = Interner::new();
        let base = ident(&mut interner, "a");
        let once = index(base);
        assert_eq!(recognize(&once, &interner), Some(Signature::ValueIndex1));
        let twice = index(once);
        assert_eq!(recognize(&twice, &interner), Some(Signature::ValueIndex2));
    }

    #[test]
    fn this_thread_channel() {
        let mut interner = Interner::new();
        let this = ExprLoc::new(Expr::This, None);
        let thread = member(this, "thread", &mut interner);
        let x = member(thread, "x", &mut interner);
        assert_eq!(recognize(&x, &interner), Some(Signature::ThisThreadValue));
    }

    #[test]
    fn this_constants_indexed() {
        let mut interner = Interner::new();
        let this = ExprLoc::new(Expr::This, None);
        let constants = member(this, "constants", &mut interner);
        let named = member(constants, "weights", &mut interner);
        let indexed = index(named);
        assert_eq!(recognize(&indexed, &interner), Some(Signature::ThisConstantsValueIndex1));
    }

    #[test]
    fn fn_call_result_indexed() {
        let mut interner = Interner::new();
        let callee = ident(&mut interner, "helper");
        let call = ExprLoc::new(Expr::Call { callee: Box::new(callee), arguments: vec![] }, None);
        let indexed = index(call);
        assert_eq!(recognize(&indexed, &interner), Some(Signature::FnIndex1));
    }

    #[test]
    fn bare_this_is_unrecognized() {
        let interner = Interner::new();
        let this = ExprLoc::new(Expr::This, None);
        assert_eq!(recognize(&this, &interner), None);
    }

    #[test]
    fn four_levels_of_indexing_is_unrecognized() {
        let mut interner = Interner::new();
        let base = ident(&mut interner, "a");
        let deep = index(index(index(index(base))));
        assert_eq!(recognize(&deep, &interner), None);
    }
}
