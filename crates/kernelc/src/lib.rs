#![expect(clippy::module_name_repetitions, reason = "public names mirror the module they live in")]
#![expect(clippy::too_many_arguments, reason = "construction/lowering signatures stay explicit")]

mod declarations;
mod decomposer;
mod dependency;
mod errors;
mod expressions;
mod function_unit;
mod intern;
mod oracle;
mod parse;
mod signature;
mod types;
mod walker;

pub use crate::{
    declarations::{DeclarationRecord, DeclarationTable},
    decomposer::{MemberDescriptor, MemberOrigin},
    dependency::{Dependency, DependencyAnalysis, DependencyOrigin},
    errors::{ConfigError, ParseError, ShapeError, SourceSpan, StateError, TranspileError},
    expressions::{
        AssignOp, BinaryOp, Expr, ExprLoc, FunctionNode, Literal, LogicalOp, MemberProp, Node, NodeLoc, UnaryOp,
        UpdateOp, VarKind, VariableDeclarator,
    },
    function_unit::{FunctionUnit, FunctionUnitConfig, FunctionUnitSettings, FunctionUnitSnapshot, Source, SourceSetting},
    intern::{Interner, StringId},
    oracle::{CalledFunctionArguments, TypeOracle},
    parse::{parse_function, ParsedFunction},
    signature::{Signature, CHANNEL_PROPERTIES},
    types::{indexed_element_type, Type, MATH_CONSTANTS, MATH_INTRINSICS, MATH_INTRINSICS_INTEGER},
    walker::{Backend, TraversalStateStack, VariableNameCounter, IN_FOR_LOOP_INIT},
};
