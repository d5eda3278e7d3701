//! Source Intake + AST Parser Adapter (§4.1).
//!
//! A function unit's source text is always a single `function` expression.
//! Before the real grammar parser can see it, the text needs a name: a
//! synthetic binding `const parser_<name> = <source>;` is what actually
//! gets parsed, so the name has to be known first. [`scan_header`] does
//! that with a lightweight regex over the raw text rather than a full
//! parse, mirroring `ouros`'s own pre-parse scans for synthetic names.
//!
//! The real parse goes through `oxc_parser`'s arena-allocated tree, which
//! is lowered into [`crate::expressions`]'s owned tree before the arena
//! is dropped, the same borrowed-then-owned handoff `ouros::parse` uses
//! around `ruff_python_parser`.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    self, AssignmentOperator, AssignmentTarget, BinaryOperator, Expression, LogicalOperator,
    SimpleAssignmentTarget, Statement, UnaryOperator, UpdateOperator, VariableDeclarationKind,
};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};
use regex::Regex;

use crate::errors::{ConfigError, ParseError, SourceSpan};
use crate::expressions::{
    AssignOp, BinaryOp, Expr, ExprLoc, FunctionNode, Literal, LogicalOp, MemberProp, Node, NodeLoc,
    UnaryOp, UpdateOp, VarKind, VariableDeclarator,
};
use crate::intern::Interner;

/// Result of a full text-to-AST parse: the interner the AST's identifiers
/// and member names were interned into, the lowered function, and the
/// name that was actually used (config override, scanned name, or the
/// forced `"kernel"` for a root kernel).
pub struct ParsedFunction {
    pub interner: Interner,
    pub function: FunctionNode,
    pub name: String,
}

/// A lightweight pre-parse scan of `function <name>(...)`'s header,
/// enough to recover the declared name without a full grammar parse.
fn scan_header(source: &str) -> Option<Option<String>> {
    let pattern = Regex::new(r"^\s*function\s*([A-Za-z_$][A-Za-z0-9_$]*)?\s*\(").ok()?;
    let captures = pattern.captures(source)?;
    Some(captures.get(1).map(|m| m.as_str().to_string()))
}

fn snippet(source: &str) -> String {
    source.chars().take(60).collect()
}

/// Parses `source` as a function unit's body, resolving its name from
/// `name_override` (a config-supplied name, or the forced `"kernel"` for
/// a root kernel) falling back to whatever [`scan_header`] recovers.
pub fn parse_function(source: &str, name_override: Option<&str>) -> Result<ParsedFunction, ParseError> {
    let scanned = scan_header(source)
        .ok_or_else(|| ParseError::syntax(ConfigError::unrecognized_function_text(snippet(source)).to_string(), None))?;
    let name = match name_override {
        Some(name) => name.to_string(),
        None => scanned.ok_or_else(|| {
            ParseError::syntax(ConfigError::MissingName.to_string(), None)
        })?,
    };
    if name.is_empty() {
        return Err(ParseError::syntax(ConfigError::MissingName.to_string(), None));
    }

    let binding = format!("parser_{name}");
    let wrapped = format!("const {binding} = {source};");
    let offset = wrapped.len() - source.len() - 1; // chars before `source` in `wrapped`

    let allocator = Allocator::default();
    let source_type = SourceType::default();
    let parser_return = Parser::new(&allocator, &wrapped, source_type).parse();
    if parser_return.panicked || !parser_return.errors.is_empty() {
        let message = parser_return
            .errors
            .first()
            .map(ToString::to_string)
            .unwrap_or_else(|| "unknown syntax error".to_string());
        return Err(ParseError::syntax(message, Some(SourceSpan::from_offsets(source, 0, source.len()))));
    }

    let declarator_init = parser_return
        .program
        .body
        .iter()
        .find_map(|stmt| match stmt {
            Statement::VariableDeclaration(decl) => decl
                .declarations
                .iter()
                .find(|d| matches!(&d.id.kind, ast::BindingPatternKind::BindingIdentifier(id) if id.name == binding))
                .and_then(|d| d.init.as_ref()),
            _ => None,
        })
        .ok_or_else(|| {
            ParseError::syntax(ConfigError::unrecognized_function_text(snippet(source)).to_string(), None)
        })?;

    let mut lowering = Lowering { source, offset, interner: Interner::new() };
    let function = match declarator_init {
        Expression::FunctionExpression(func) => lowering.lower_function(func)?,
        Expression::ArrowFunctionExpression(func) => lowering.lower_arrow_function(func)?,
        _ => {
            return Err(ParseError::not_supported(
                "function source must be a function expression",
                None,
            ))
        }
    };

    Ok(ParsedFunction { interner: lowering.interner, function, name })
}

struct Lowering<'s> {
    source: &'s str,
    offset: usize,
    interner: Interner,
}

impl<'s> Lowering<'s> {
    fn span(&self, span: oxc_span::Span) -> Option<SourceSpan> {
        let start = (span.start as usize).saturating_sub(self.offset);
        let end = (span.end as usize).saturating_sub(self.offset);
        if start > self.source.len() || end > self.source.len() || start > end {
            return None;
        }
        Some(SourceSpan::from_offsets(self.source, start, end))
    }

    fn not_supported(&self, message: impl Into<String>, span: oxc_span::Span) -> ParseError {
        ParseError::not_supported(message, self.span(span))
    }

    fn lower_function(&mut self, func: &ast::Function) -> Result<FunctionNode, ParseError> {
        let name = func.id.as_ref().map(|id| self.interner.intern(id.name.as_str()));
        let mut params = Vec::with_capacity(func.params.items.len());
        for param in &func.params.items {
            params.push(self.lower_binding_identifier(&param.pattern)?);
        }
        let body = match &func.body {
            Some(body) => self.lower_statements(&body.statements)?,
            None => Vec::new(),
        };
        Ok(FunctionNode { name, params, body })
    }

    fn lower_arrow_function(&mut self, func: &ast::ArrowFunctionExpression) -> Result<FunctionNode, ParseError> {
        let mut params = Vec::with_capacity(func.params.items.len());
        for param in &func.params.items {
            params.push(self.lower_binding_identifier(&param.pattern)?);
        }
        let body = if func.expression {
            let expr = func
                .body
                .statements
                .first()
                .and_then(|stmt| match stmt {
                    Statement::ExpressionStatement(expr_stmt) => Some(&expr_stmt.expression),
                    _ => None,
                })
                .ok_or_else(|| ParseError::syntax("empty arrow function body", None))?;
            let value = self.lower_expression(expr)?;
            let span = value.span.clone();
            vec![NodeLoc::new(Node::Return(Some(value)), span)]
        } else {
            self.lower_statements(&func.body.statements)?
        };
        Ok(FunctionNode { name: None, params, body })
    }

    fn lower_binding_identifier(&mut self, pattern: &ast::BindingPattern) -> Result<crate::intern::StringId, ParseError> {
        match &pattern.kind {
            ast::BindingPatternKind::BindingIdentifier(id) => Ok(self.interner.intern(id.name.as_str())),
            _ => Err(self.not_supported("destructuring parameters are not supported", pattern.span())),
        }
    }

    fn lower_statements(&mut self, statements: &[Statement]) -> Result<Vec<NodeLoc>, ParseError> {
        statements.iter().map(|stmt| self.lower_statement(stmt)).collect()
    }

    fn lower_statement(&mut self, stmt: &Statement) -> Result<NodeLoc, ParseError> {
        let span = stmt.span();
        let node = match stmt {
            Statement::ExpressionStatement(inner) => {
                Node::ExpressionStatement(self.lower_expression(&inner.expression)?)
            }
            Statement::ReturnStatement(inner) => {
                let value = inner.argument.as_ref().map(|expr| self.lower_expression(expr)).transpose()?;
                Node::Return(value)
            }
            Statement::BlockStatement(inner) => Node::Block(self.lower_statements(&inner.body)?),
            Statement::IfStatement(inner) => Node::If {
                test: self.lower_expression(&inner.test)?,
                consequent: Box::new(self.lower_statement(&inner.consequent)?),
                alternate: inner.alternate.as_ref().map(|alt| self.lower_statement(alt)).transpose()?.map(Box::new),
            },
            Statement::BreakStatement(inner) => {
                if inner.label.is_some() {
                    return Err(self.not_supported("labeled break is not supported", span));
                }
                Node::Break
            }
            Statement::ContinueStatement(inner) => {
                if inner.label.is_some() {
                    return Err(self.not_supported("labeled continue is not supported", span));
                }
                Node::Continue
            }
            Statement::ForStatement(inner) => {
                let init = inner
                    .init
                    .as_ref()
                    .map(|init| self.lower_for_init(init))
                    .transpose()?
                    .map(Box::new);
                let test = inner.test.as_ref().map(|expr| self.lower_expression(expr)).transpose()?;
                let update = inner.update.as_ref().map(|expr| self.lower_expression(expr)).transpose()?;
                let body = Box::new(self.lower_statement(&inner.body)?);
                Node::For { init, test, update, body }
            }
            Statement::WhileStatement(inner) => Node::While {
                test: self.lower_expression(&inner.test)?,
                body: Box::new(self.lower_statement(&inner.body)?),
            },
            Statement::DoWhileStatement(inner) => Node::DoWhile {
                body: Box::new(self.lower_statement(&inner.body)?),
                test: self.lower_expression(&inner.test)?,
            },
            Statement::VariableDeclaration(inner) => {
                let kind = match inner.kind {
                    VariableDeclarationKind::Var => VarKind::Var,
                    VariableDeclarationKind::Let => VarKind::Let,
                    VariableDeclarationKind::Const => VarKind::Const,
                };
                let mut declarations = Vec::with_capacity(inner.declarations.len());
                for decl in &inner.declarations {
                    let id = self.lower_binding_identifier(&decl.id)?;
                    let init = decl.init.as_ref().map(|expr| self.lower_expression(expr)).transpose()?;
                    declarations.push(VariableDeclarator { id, init });
                }
                Node::VariableDeclaration { kind, declarations }
            }
            Statement::EmptyStatement(_) => Node::Empty,
            Statement::DebuggerStatement(_) => Node::Debugger,
            Statement::FunctionDeclaration(inner) => Node::FunctionDeclaration(self.lower_function(inner)?),
            other => return Err(self.not_supported(format!("unsupported statement: {other:?}"), span)),
        };
        Ok(NodeLoc::new(node, self.span(span)))
    }

    fn lower_for_init(&mut self, init: &ast::ForStatementInit) -> Result<NodeLoc, ParseError> {
        match init {
            ast::ForStatementInit::VariableDeclaration(decl) => {
                let span = decl.span();
                let kind = match decl.kind {
                    VariableDeclarationKind::Var => VarKind::Var,
                    VariableDeclarationKind::Let => VarKind::Let,
                    VariableDeclarationKind::Const => VarKind::Const,
                };
                let mut declarations = Vec::with_capacity(decl.declarations.len());
                for d in &decl.declarations {
                    let id = self.lower_binding_identifier(&d.id)?;
                    let value = d.init.as_ref().map(|expr| self.lower_expression(expr)).transpose()?;
                    declarations.push(VariableDeclarator { id, init: value });
                }
                Ok(NodeLoc::new(Node::VariableDeclaration { kind, declarations }, self.span(span)))
            }
            other => {
                let expr = other.to_expression();
                let span = expr.span();
                let lowered = self.lower_expression(expr)?;
                Ok(NodeLoc::new(Node::ExpressionStatement(lowered), self.span(span)))
            }
        }
    }

    fn lower_expression(&mut self, expr: &Expression) -> Result<ExprLoc, ParseError> {
        let span = expr.span();
        let lowered = match expr {
            Expression::BooleanLiteral(lit) => Expr::Literal(Literal::Bool(lit.value)),
            Expression::NumericLiteral(lit) => Expr::Literal(lower_numeric(lit)),
            Expression::Identifier(id) => Expr::Identifier(self.interner.intern(id.name.as_str())),
            Expression::ThisExpression(_) => Expr::This,
            Expression::ParenthesizedExpression(inner) => return self.lower_expression(&inner.expression),
            Expression::ArrayExpression(inner) => {
                let mut elements = Vec::with_capacity(inner.elements.len());
                for element in &inner.elements {
                    match element {
                        ast::ArrayExpressionElement::SpreadElement(_) => {
                            return Err(self.not_supported("spread elements are not supported", span))
                        }
                        ast::ArrayExpressionElement::Elision(_) => {
                            return Err(self.not_supported("array elisions are not supported", span))
                        }
                        other => elements.push(self.lower_expression(other.to_expression())?),
                    }
                }
                Expr::Array(elements)
            }
            Expression::FunctionExpression(func) => Expr::Function(Box::new(self.lower_function(func)?)),
            Expression::ArrowFunctionExpression(func) => Expr::Function(Box::new(self.lower_arrow_function(func)?)),
            Expression::UnaryExpression(inner) => {
                let op = lower_unary_op(inner.operator)
                    .ok_or_else(|| self.not_supported(format!("unsupported unary operator {:?}", inner.operator), span))?;
                Expr::Unary { op, prefix: true, argument: Box::new(self.lower_expression(&inner.argument)?) }
            }
            Expression::UpdateExpression(inner) => {
                let op = match inner.operator {
                    UpdateOperator::Increment => UpdateOp::Increment,
                    UpdateOperator::Decrement => UpdateOp::Decrement,
                };
                let argument = Box::new(self.lower_simple_target(&inner.argument)?);
                Expr::Update { op, prefix: inner.prefix, argument }
            }
            Expression::BinaryExpression(inner) => {
                let op = lower_binary_op(inner.operator)
                    .ok_or_else(|| self.not_supported(format!("unsupported binary operator {:?}", inner.operator), span))?;
                Expr::Binary {
                    op,
                    left: Box::new(self.lower_expression(&inner.left)?),
                    right: Box::new(self.lower_expression(&inner.right)?),
                }
            }
            Expression::LogicalExpression(inner) => {
                let op = match inner.operator {
                    LogicalOperator::And => LogicalOp::And,
                    LogicalOperator::Or => LogicalOp::Or,
                    LogicalOperator::Coalesce => {
                        return Err(self.not_supported("nullish coalescing is not supported", span))
                    }
                };
                Expr::Logical {
                    op,
                    left: Box::new(self.lower_expression(&inner.left)?),
                    right: Box::new(self.lower_expression(&inner.right)?),
                }
            }
            Expression::ConditionalExpression(inner) => Expr::Conditional {
                test: Box::new(self.lower_expression(&inner.test)?),
                consequent: Box::new(self.lower_expression(&inner.consequent)?),
                alternate: Box::new(self.lower_expression(&inner.alternate)?),
            },
            Expression::AssignmentExpression(inner) => {
                let op = lower_assign_op(inner.operator)
                    .ok_or_else(|| self.not_supported(format!("unsupported assignment operator {:?}", inner.operator), span))?;
                let target = Box::new(self.lower_assignment_target(&inner.left)?);
                let value = Box::new(self.lower_expression(&inner.right)?);
                Expr::Assignment { op, target, value }
            }
            Expression::SequenceExpression(inner) => {
                let mut items = Vec::with_capacity(inner.expressions.len());
                for item in &inner.expressions {
                    items.push(self.lower_expression(item)?);
                }
                Expr::Sequence(items)
            }
            Expression::CallExpression(inner) => {
                let callee = Box::new(self.lower_expression(&inner.callee)?);
                let mut arguments = Vec::with_capacity(inner.arguments.len());
                for arg in &inner.arguments {
                    match arg {
                        ast::Argument::SpreadElement(_) => {
                            return Err(self.not_supported("spread arguments are not supported", span))
                        }
                        other => arguments.push(self.lower_expression(other.to_expression())?),
                    }
                }
                Expr::Call { callee, arguments }
            }
            Expression::StaticMemberExpression(inner) => Expr::Member {
                object: Box::new(self.lower_expression(&inner.object)?),
                property: MemberProp::Name(self.interner.intern(inner.property.name.as_str())),
                computed: false,
            },
            Expression::ComputedMemberExpression(inner) => Expr::Member {
                object: Box::new(self.lower_expression(&inner.object)?),
                property: MemberProp::Computed(Box::new(self.lower_expression(&inner.expression)?)),
                computed: true,
            },
            other => return Err(self.not_supported(format!("unsupported expression: {other:?}"), span)),
        };
        Ok(ExprLoc::new(lowered, self.span(span)))
    }

    fn lower_simple_target(&mut self, target: &SimpleAssignmentTarget) -> Result<ExprLoc, ParseError> {
        let span = target.span();
        let lowered = match target {
            SimpleAssignmentTarget::AssignmentTargetIdentifier(id) => {
                Expr::Identifier(self.interner.intern(id.name.as_str()))
            }
            SimpleAssignmentTarget::StaticMemberExpression(inner) => Expr::Member {
                object: Box::new(self.lower_expression(&inner.object)?),
                property: MemberProp::Name(self.interner.intern(inner.property.name.as_str())),
                computed: false,
            },
            SimpleAssignmentTarget::ComputedMemberExpression(inner) => Expr::Member {
                object: Box::new(self.lower_expression(&inner.object)?),
                property: MemberProp::Computed(Box::new(self.lower_expression(&inner.expression)?)),
                computed: true,
            },
            other => return Err(self.not_supported(format!("unsupported assignment target: {other:?}"), span)),
        };
        Ok(ExprLoc::new(lowered, self.span(span)))
    }

    fn lower_assignment_target(&mut self, target: &AssignmentTarget) -> Result<ExprLoc, ParseError> {
        match target {
            AssignmentTarget::SimpleAssignmentTarget(simple) => self.lower_simple_target(simple),
            other => Err(self.not_supported(format!("unsupported assignment target: {other:?}"), other.span())),
        }
    }
}

fn lower_numeric(lit: &ast::NumericLiteral) -> Literal {
    let text = lit.raw.as_str();
    if lit.value.fract() == 0.0 && !text.contains(['.', 'e', 'E']) && lit.value.abs() < i64::MAX as f64 {
        Literal::Int(lit.value as i64)
    } else {
        Literal::float(lit.value)
    }
}

fn lower_unary_op(op: UnaryOperator) -> Option<UnaryOp> {
    Some(match op {
        UnaryOperator::UnaryNegation => UnaryOp::Neg,
        UnaryOperator::UnaryPlus => UnaryOp::Plus,
        UnaryOperator::LogicalNot => UnaryOp::Not,
        UnaryOperator::BitwiseNot => UnaryOp::BitNot,
        UnaryOperator::Typeof | UnaryOperator::Void | UnaryOperator::Delete => return None,
    })
}

fn lower_binary_op(op: BinaryOperator) -> Option<BinaryOp> {
    Some(match op {
        BinaryOperator::Addition => BinaryOp::Add,
        BinaryOperator::Subtraction => BinaryOp::Sub,
        BinaryOperator::Multiplication => BinaryOp::Mul,
        BinaryOperator::Division => BinaryOp::Div,
        BinaryOperator::Remainder => BinaryOp::Mod,
        BinaryOperator::LessThan => BinaryOp::Lt,
        BinaryOperator::GreaterThan => BinaryOp::Gt,
        BinaryOperator::LessEqualThan => BinaryOp::Le,
        BinaryOperator::GreaterEqualThan => BinaryOp::Ge,
        BinaryOperator::Equality => BinaryOp::Eq,
        BinaryOperator::StrictEquality => BinaryOp::StrictEq,
        BinaryOperator::Inequality => BinaryOp::Ne,
        BinaryOperator::StrictInequality => BinaryOp::StrictNe,
        BinaryOperator::BitwiseAnd => BinaryOp::BitAnd,
        BinaryOperator::BitwiseOR => BinaryOp::BitOr,
        BinaryOperator::BitwiseXOR => BinaryOp::BitXor,
        BinaryOperator::ShiftLeft => BinaryOp::Shl,
        BinaryOperator::ShiftRight => BinaryOp::Shr,
        _ => return None,
    })
}

fn lower_assign_op(op: AssignmentOperator) -> Option<AssignOp> {
    Some(match op {
        AssignmentOperator::Assign => AssignOp::Assign,
        AssignmentOperator::Addition => AssignOp::AddAssign,
        AssignmentOperator::Subtraction => AssignOp::SubAssign,
        AssignmentOperator::Multiplication => AssignOp::MulAssign,
        AssignmentOperator::Division => AssignOp::DivAssign,
        AssignmentOperator::Remainder => AssignOp::ModAssign,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_named_function_header() {
        assert_eq!(scan_header("function add(a, b) { return a + b; }"), Some(Some("add".to_string())));
    }

    #[test]
    fn scans_anonymous_function_header() {
        assert_eq!(scan_header("function (a) { return a; }"), Some(None));
    }

    #[test]
    fn rejects_non_function_text() {
        assert_eq!(scan_header("const x = 1;"), None);
    }

    #[test]
    fn parses_literal_return() {
        let parsed = parse_function("function kernel() { return 1; }", Some("kernel")).unwrap();
        assert_eq!(parsed.name, "kernel");
        assert_eq!(parsed.function.body.len(), 1);
    }
}
