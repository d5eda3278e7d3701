//! Error types.
//!
//! Mirrors the small-enum-plus-`From`-impls shape used throughout the
//! construction/parse/compile pipeline: each stage owns a narrow error
//! type, and a single top-level enum aggregates them for callers that
//! don't care which stage failed.

use std::fmt;

/// A byte-offset span in the original source, plus the line/column it
/// starts at and a one-line preview, for diagnostics that point at source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
    pub snippet: String,
}

impl SourceSpan {
    /// Builds a span from byte offsets into `source`, deriving line/column
    /// and a trimmed one-line snippet of the enclosing line.
    pub fn from_offsets(source: &str, start: usize, end: usize) -> Self {
        let mut line = 1u32;
        let mut column = 1u32;
        let mut line_start = 0usize;
        for (idx, ch) in source.char_indices() {
            if idx >= start {
                break;
            }
            if ch == '\n' {
                line += 1;
                column = 1;
                line_start = idx + 1;
            } else {
                column += 1;
            }
        }
        let line_end = source[line_start..]
            .find('\n')
            .map_or(source.len(), |rel| line_start + rel);
        let snippet = source[line_start..line_end].to_string();
        Self { start, end, line, column, snippet }
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.snippet)
    }
}

/// Errors raised while validating a function unit's construction settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingSource,
    MissingName,
    UnrecognizedFunctionText { snippet: String },
    ArgumentLengthMismatch { names: usize, types: usize },
    EmptyOutput,
}

impl ConfigError {
    pub fn argument_length_mismatch(names: usize, types: usize) -> Self {
        Self::ArgumentLengthMismatch { names, types }
    }

    pub fn unrecognized_function_text(snippet: impl Into<String>) -> Self {
        Self::UnrecognizedFunctionText { snippet: snippet.into() }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSource => write!(f, "function unit has no source text or AST"),
            Self::MissingName => {
                write!(f, "function unit has no name and is not the root kernel")
            }
            Self::UnrecognizedFunctionText { snippet } => {
                write!(f, "source text is not recognizable as a function: `{snippet}`")
            }
            Self::ArgumentLengthMismatch { names, types } => write!(
                f,
                "argument type list has {types} entries but there are {names} argument names"
            ),
            Self::EmptyOutput => write!(f, "output dimensions must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors raised while recognizing or decomposing a member-expression
/// shape, or while the type oracle cannot resolve a required type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    UnrecognizedSignature { text: String, span: Option<SourceSpan> },
    UnknownConstant { name: String, span: Option<SourceSpan> },
    UnresolvedReturnType { name: String, span: Option<SourceSpan> },
    MissingTypeMapping { ty: String, span: Option<SourceSpan> },
}

impl ShapeError {
    pub fn unrecognized_signature(text: impl Into<String>, span: Option<SourceSpan>) -> Self {
        Self::UnrecognizedSignature { text: text.into(), span }
    }

    pub fn unknown_constant(name: impl Into<String>, span: Option<SourceSpan>) -> Self {
        Self::UnknownConstant { name: name.into(), span }
    }

    pub fn unresolved_return_type(name: impl Into<String>, span: Option<SourceSpan>) -> Self {
        Self::UnresolvedReturnType { name: name.into(), span }
    }

    pub fn missing_type_mapping(ty: impl Into<String>, span: Option<SourceSpan>) -> Self {
        Self::MissingTypeMapping { ty: ty.into(), span }
    }

    pub fn span(&self) -> Option<&SourceSpan> {
        match self {
            Self::UnrecognizedSignature { span, .. }
            | Self::UnknownConstant { span, .. }
            | Self::UnresolvedReturnType { span, .. }
            | Self::MissingTypeMapping { span, .. } => span.as_ref(),
        }
    }
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedSignature { text, span } => {
                write!(f, "unrecognized member-expression shape `{text}`")?;
                if let Some(span) = span {
                    write!(f, " ({span})")?;
                }
                Ok(())
            }
            Self::UnknownConstant { name, span } => {
                write!(f, "no type registered for constant `{name}`")?;
                if let Some(span) = span {
                    write!(f, " ({span})")?;
                }
                Ok(())
            }
            Self::UnresolvedReturnType { name, span } => {
                write!(f, "could not resolve a return type for call to `{name}`")?;
                if let Some(span) = span {
                    write!(f, " ({span})")?;
                }
                Ok(())
            }
            Self::MissingTypeMapping { ty, span } => {
                write!(f, "backend has no lowered-type mapping for `{ty}`")?;
                if let Some(span) = span {
                    write!(f, " ({span})")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ShapeError {}

/// Errors raised by the generic walker's traversal-state stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    StackUnderflow,
    PopMismatch { expected: &'static str, found: &'static str },
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackUnderflow => write!(f, "traversal-state stack popped while empty"),
            Self::PopMismatch { expected, found } => {
                write!(f, "traversal-state mismatch: expected to pop `{expected}`, found `{found}`")
            }
        }
    }
}

impl std::error::Error for StateError {}

/// Errors surfaced while parsing source text into an AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Syntax { message: String, span: Option<SourceSpan> },
    NotSupported { message: String, span: Option<SourceSpan> },
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, span: Option<SourceSpan>) -> Self {
        Self::Syntax { message: message.into(), span }
    }

    pub fn not_supported(message: impl Into<String>, span: Option<SourceSpan>) -> Self {
        Self::NotSupported { message: message.into(), span }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax { message, span } => {
                write!(f, "syntax error: {message}")?;
                if let Some(span) = span {
                    write!(f, " ({span})")?;
                }
                Ok(())
            }
            Self::NotSupported { message, span } => {
                write!(f, "unsupported construct: {message}")?;
                if let Some(span) = span {
                    write!(f, " ({span})")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Aggregate error type returned by the public construction/transpile API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranspileError {
    Config(ConfigError),
    Parse(ParseError),
    Shape(ShapeError),
    State(StateError),
}

impl fmt::Display for TranspileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Parse(err) => write!(f, "{err}"),
            Self::Shape(err) => write!(f, "{err}"),
            Self::State(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for TranspileError {}

impl From<ConfigError> for TranspileError {
    fn from(error: ConfigError) -> Self {
        Self::Config(error)
    }
}

impl From<ParseError> for TranspileError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<ShapeError> for TranspileError {
    fn from(error: ShapeError) -> Self {
        Self::Shape(error)
    }
}

impl From<StateError> for TranspileError {
    fn from(error: StateError) -> Self {
        Self::State(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_span_locates_second_line() {
        let source = "const x = 1;\nconst y = 2;\n";
        let span = SourceSpan::from_offsets(source, 19, 20);
        assert_eq!(span.line, 2);
        assert_eq!(span.column, 7);
        assert_eq!(span.snippet, "const y = 2;");
    }

    #[test]
    fn from_impls_wrap_into_transpile_error() {
        let err: TranspileError = ConfigError::MissingSource.into();
        assert!(matches!(err, TranspileError::Config(ConfigError::MissingSource)));
    }
}
