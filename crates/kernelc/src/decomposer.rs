//! Structured extraction of a recognized member-expression signature
//! (§4.8): given a signature already matched by [`crate::signature`],
//! pulls out the underlying name, origin, index sub-expressions and
//! resolved type.

use crate::errors::ShapeError;
use crate::expressions::{Expr, ExprLoc, MemberProp};
use crate::intern::{Interner, StringId};
use crate::signature::{self, Signature, CHANNEL_PROPERTIES};
use crate::types::{indexed_element_type, Type, MATH_CONSTANTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberOrigin {
    User,
    Constants,
    Math,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThisSuffix {
    Thread,
    Output,
    Constants,
}

#[derive(Debug, Clone)]
pub struct MemberDescriptor {
    pub name: Option<StringId>,
    pub origin: MemberOrigin,
    pub signature: Signature,
    pub ty: Type,
    pub x_property: Option<ExprLoc>,
    pub y_property: Option<ExprLoc>,
    pub z_property: Option<ExprLoc>,
    /// The vector-channel letter, set only for `value.value` descriptors
    /// whose trailing property is one of `x y z r g b a`.
    pub property: Option<char>,
}

struct ChainInfo {
    base_identifier: Option<StringId>,
    is_call: bool,
    this_suffix: Option<ThisSuffix>,
    value_name: Option<StringId>,
    indices: Vec<ExprLoc>,
}

fn gather(expr: &Expr, interner: &Interner) -> ChainInfo {
    match expr {
        Expr::This => ChainInfo {
            base_identifier: None,
            is_call: false,
            this_suffix: None,
            value_name: None,
            indices: Vec::new(),
        },
        Expr::Identifier(name) => ChainInfo {
            base_identifier: Some(*name),
            is_call: false,
            this_suffix: None,
            value_name: None,
            indices: Vec::new(),
        },
        Expr::Call { callee, .. } => {
            let name = match &callee.expr {
                Expr::Identifier(name) => Some(*name),
                _ => None,
            };
            ChainInfo {
                base_identifier: name,
                is_call: true,
                this_suffix: None,
                value_name: None,
                indices: Vec::new(),
            }
        }
        Expr::Member { object, property: MemberProp::Computed(index), computed: true } => {
            let mut info = gather(&object.expr, interner);
            info.indices.push((**index).clone());
            info
        }
        Expr::Member { object, property: MemberProp::Name(name), computed: false } => {
            let mut info = gather(&object.expr, interner);
            match interner.resolve(*name) {
                "constants" => info.this_suffix = Some(ThisSuffix::Constants),
                "thread" => info.this_suffix = Some(ThisSuffix::Thread),
                "output" => info.this_suffix = Some(ThisSuffix::Output),
                _ => {
                    if info.value_name.is_none() {
                        info.value_name = Some(*name);
                    }
                }
            }
            info
        }
        _ => ChainInfo {
            base_identifier: None,
            is_call: false,
            this_suffix: None,
            value_name: None,
            indices: Vec::new(),
        },
    }
}

fn peel(mut ty: Type, times: u32) -> Option<Type> {
    for _ in 0..times {
        ty = indexed_element_type(ty)?;
    }
    Some(ty)
}

/// Decomposes `expr` into a structured descriptor.
///
/// `identifier_type`, `constant_type` and `call_return_type` resolve the
/// root type for, respectively, a plain identifier base, a
/// `this.constants.<name>` base, and a `fn()` call origin; the oracle is
/// responsible for supplying these since it alone knows about argument
/// back-propagation and math-intrinsic/`lookupReturnType` resolution.
pub fn decompose(
    expr: &ExprLoc,
    interner: &Interner,
    identifier_type: impl Fn(StringId) -> Option<Type>,
    constant_type: impl Fn(StringId) -> Option<Type>,
    call_return_type: impl Fn(StringId) -> Option<Type>,
) -> Result<MemberDescriptor, ShapeError> {
    let span = expr.span.clone();
    let sig = signature::recognize(expr, interner).ok_or_else(|| {
        ShapeError::unrecognized_signature(format!("{:?}", expr.expr), span.clone())
    })?;
    let info = gather(&expr.expr, interner);

    if matches!(sig, Signature::ValueDotValue) {
        if let Some(base) = info.base_identifier {
            if interner.resolve(base) == "Math" {
                let const_name = info
                    .value_name
                    .ok_or_else(|| ShapeError::unrecognized_signature(sig.as_str(), span.clone()))?;
                let text = interner.resolve(const_name);
                if !MATH_CONSTANTS.contains(&text) {
                    return Err(ShapeError::unknown_constant(text, span));
                }
                return Ok(MemberDescriptor {
                    name: Some(const_name),
                    origin: MemberOrigin::Math,
                    signature: sig,
                    ty: Type::Number,
                    x_property: None,
                    y_property: None,
                    z_property: None,
                    property: None,
                });
            }
        }
    }

    let name = if info.this_suffix.is_some() || info.base_identifier.is_none() {
        info.value_name
    } else {
        info.base_identifier
    };

    let origin = if info.this_suffix == Some(ThisSuffix::Constants) {
        MemberOrigin::Constants
    } else {
        MemberOrigin::User
    };

    let depth = match sig {
        Signature::Value
        | Signature::ValueDotValue
        | Signature::ThisThreadValue
        | Signature::ThisOutputValue
        | Signature::ThisConstantsValue => 0,
        Signature::ValueIndex1 | Signature::ThisConstantsValueIndex1 | Signature::FnIndex1 => 1,
        Signature::ValueIndex2 | Signature::ThisConstantsValueIndex2 | Signature::FnIndex2 => 2,
        Signature::ValueIndex3 | Signature::ThisConstantsValueIndex3 | Signature::FnIndex3 => 3,
    };

    let root_type = match sig {
        Signature::ThisThreadValue | Signature::ThisOutputValue => Some(Type::Integer),
        Signature::ThisConstantsValue
        | Signature::ThisConstantsValueIndex1
        | Signature::ThisConstantsValueIndex2
        | Signature::ThisConstantsValueIndex3 => {
            let name = name.ok_or_else(|| {
                ShapeError::unrecognized_signature(sig.as_str(), span.clone())
            })?;
            Some(
                constant_type(name)
                    .ok_or_else(|| ShapeError::unknown_constant(interner.resolve(name), span.clone()))?,
            )
        }
        Signature::FnIndex1 | Signature::FnIndex2 | Signature::FnIndex3 => {
            name.and_then(&call_return_type)
        }
        Signature::ValueDotValue => {
            info.base_identifier.and_then(&identifier_type)
        }
        Signature::Value | Signature::ValueIndex1 | Signature::ValueIndex2 | Signature::ValueIndex3 => {
            info.base_identifier.and_then(&identifier_type)
        }
    };

    let peel_depth = if matches!(sig, Signature::ValueDotValue) { 1 } else { depth };
    let ty = root_type
        .and_then(|ty| peel(ty, peel_depth))
        .ok_or_else(|| ShapeError::unrecognized_signature(sig.as_str(), span.clone()))?;

    let property = matches!(sig, Signature::ValueDotValue)
        .then(|| info.value_name)
        .flatten()
        .map(|id| interner.resolve(id))
        .filter(|text| CHANNEL_PROPERTIES.contains(text) && text.len() == 1)
        .map(|text| text.chars().next().expect("checked len == 1"));

    let mut indices = info.indices.into_iter();
    let x_property = indices.next();
    let y_property = indices.next();
    let z_property = indices.next();

    Ok(MemberDescriptor {
        name,
        origin,
        signature: sig,
        ty,
        x_property,
        y_property,
        z_property,
        property,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expressions::Literal;

    fn ident(interner: &mut Interner, name: &str) -> ExprLoc {
        ExprLoc::new(Expr::Identifier(interner.intern(name)), None)
    }

    fn index(object: ExprLoc, value: i64) -> ExprLoc {
        ExprLoc::new(
            Expr::Member {
                object: Box::new(object),
                property: MemberProp::Computed(Box::new(ExprLoc::new(
                    Expr::Literal(Literal::Int(value)),
                    None,
                ))),
                computed: true,
            },
            None,
        )
    }

    #[test]
    fn plain_value_resolves_declared_type() {
        let mut interner = Interner::new();
        let expr = ident(&mut interner, "a");
        let descriptor = decompose(&expr, &interner, |_| Some(Type::Array), |_| None, |_| None).unwrap();
        assert_eq!(descriptor.origin, MemberOrigin::User);
        assert_eq!(descriptor.signature, Signature::Value);
        assert_eq!(descriptor.ty, Type::Array);
        assert!(descriptor.x_property.is_none());
    }

    #[test]
    fn indexed_value_peels_once() {
        let mut interner = Interner::new();
        let base = ident(&mut interner, "a");
        let expr = index(base, 3);
        let descriptor =
            decompose(&expr, &interner, |_| Some(Type::Array), |_| None, |_| None).unwrap();
        assert_eq!(descriptor.ty, Type::Number);
        assert!(matches!(descriptor.x_property.as_ref().unwrap().expr, Expr::Literal(Literal::Int(3))));
    }

    #[test]
    fn math_constant_member_is_math_origin() {
        let mut interner = Interner::new();
        let math = ident(&mut interner, "Math");
        let expr = ExprLoc::new(
            Expr::Member {
                object: Box::new(math),
                property: MemberProp::Name(interner.intern("PI")),
                computed: false,
            },
            None,
        );
        let descriptor = decompose(&expr, &interner, |_| None, |_| None, |_| None).unwrap();
        assert_eq!(descriptor.origin, MemberOrigin::Math);
        assert_eq!(descriptor.ty, Type::Number);
        assert!(descriptor.x_property.is_none());
    }

    #[test]
    fn unrecognized_math_member_is_unknown_constant() {
        let mut interner = Interner::new();
        let math = ident(&mut interner, "Math");
        let expr = ExprLoc::new(
            Expr::Member {
                object: Box::new(math),
                property: MemberProp::Name(interner.intern("TAU")),
                computed: false,
            },
            None,
        );
        let err = decompose(&expr, &interner, |_| None, |_| None, |_| None).unwrap_err();
        assert!(matches!(err, ShapeError::UnknownConstant { .. }));
    }

    #[test]
    fn missing_constant_type_is_fatal() {
        let mut interner = Interner::new();
        let this = ExprLoc::new(Expr::This, None);
        let constants = ExprLoc::new(
            Expr::Member {
                object: Box::new(this),
                property: MemberProp::Name(interner.intern("constants")),
                computed: false,
            },
            None,
        );
        let weight = ExprLoc::new(
            Expr::Member {
                object: Box::new(constants),
                property: MemberProp::Name(interner.intern("weight")),
                computed: false,
            },
            None,
        );
        let err = decompose(&weight, &interner, |_| None, |_| None, |_| None).unwrap_err();
        assert!(matches!(err, ShapeError::UnknownConstant { .. }));
    }
}
