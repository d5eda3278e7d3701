//! The closed set of kernel-lowerable types and the lookups over it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A lowerable type. This set is closed: the type oracle and the
/// signature recognizer never produce a value outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Number,
    Float,
    Integer,
    /// An integer literal whose value is not yet committed to `Integer` or
    /// `Number`; coerced by the declaration table once its usage context is
    /// known (see the declaration-coupling rule).
    LiteralInteger,
    Boolean,
    /// Unsized numeric array (`Array`).
    Array,
    /// An array of known width, e.g. the type of an array-literal
    /// expression with `n` elements, or the `Array(2|3|4)` vector types.
    /// Only width 2, 3 and 4 appear in the type-lookup map; other widths
    /// are valid types but are not indexable through it.
    ArrayVec(u32),
    Array2D,
    Array3D,
    Input,
    HtmlImage,
    HtmlImageArray,
    NumberTexture,
    ArrayTexture4,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number => write!(f, "Number"),
            Self::Float => write!(f, "Float"),
            Self::Integer => write!(f, "Integer"),
            Self::LiteralInteger => write!(f, "LiteralInteger"),
            Self::Boolean => write!(f, "Boolean"),
            Self::Array => write!(f, "Array"),
            Self::ArrayVec(width) => write!(f, "Array({width})"),
            Self::Array2D => write!(f, "Array2D"),
            Self::Array3D => write!(f, "Array3D"),
            Self::Input => write!(f, "Input"),
            Self::HtmlImage => write!(f, "HTMLImage"),
            Self::HtmlImageArray => write!(f, "HTMLImageArray"),
            Self::NumberTexture => write!(f, "NumberTexture"),
            Self::ArrayTexture4 => write!(f, "ArrayTexture(4)"),
        }
    }
}

/// The type produced by indexing one level into a container type, or
/// `None` if the type is not indexable.
///
/// This is the "type-lookup map" used both by the type oracle (for plain
/// `value[]` shapes) and by the member-expression decomposer.
pub fn indexed_element_type(container: Type) -> Option<Type> {
    match container {
        Type::Array
        | Type::ArrayVec(2 | 3 | 4)
        | Type::Array2D
        | Type::Array3D
        | Type::NumberTexture => Some(Type::Number),
        Type::HtmlImage | Type::HtmlImageArray | Type::ArrayTexture4 => Some(Type::ArrayVec(4)),
        _ => None,
    }
}

/// Names recognized as math intrinsics on the injected `Math` namespace.
/// Each one resolves to `Number`, except `ceil`, `floor` and `round`, which
/// the oracle specializes to `Integer`.
pub const MATH_INTRINSICS: &[&str] = &[
    "abs", "acos", "asin", "atan", "atan2", "ceil", "cos", "exp", "floor", "log", "log2", "max",
    "min", "pow", "random", "round", "sign", "sin", "sqrt", "tan",
];

/// The subset of [`MATH_INTRINSICS`] specialized to `Integer` rather than
/// `Number`.
pub const MATH_INTRINSICS_INTEGER: &[&str] = &["ceil", "floor", "round"];

/// Names recognized as math constants on the injected `Math` namespace.
/// Each one always resolves to `Number`.
pub const MATH_CONSTANTS: &[&str] = &["E", "PI", "SQRT2", "SQRT1_2", "LN2", "LN10", "LOG2E", "LOG10E"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_matches_documented_table() {
        assert_eq!(indexed_element_type(Type::Array), Some(Type::Number));
        assert_eq!(indexed_element_type(Type::ArrayVec(4)), Some(Type::Number));
        assert_eq!(indexed_element_type(Type::HtmlImage), Some(Type::ArrayVec(4)));
        assert_eq!(indexed_element_type(Type::ArrayTexture4), Some(Type::ArrayVec(4)));
        assert_eq!(indexed_element_type(Type::ArrayVec(5)), None);
        assert_eq!(indexed_element_type(Type::Boolean), None);
    }

    #[test]
    fn math_lists_have_documented_length() {
        assert_eq!(MATH_INTRINSICS.len(), 20);
        assert_eq!(MATH_CONSTANTS.len(), 8);
        for name in MATH_INTRINSICS_INTEGER {
            assert!(MATH_INTRINSICS.contains(name));
        }
    }
}
