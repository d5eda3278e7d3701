//! The Function Unit (§3 Data Model, §4.7, §6): the root entity that ties
//! source intake, type inference, dependency analysis, declaration
//! tracking and the generic walker together into the object a backend
//! transpiles.

use ahash::AHashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::declarations::DeclarationTable;
use crate::dependency::{self, DependencyAnalysis};
use crate::errors::{ConfigError, ShapeError, SourceSpan, TranspileError};
use crate::expressions::{Expr, ExprLoc, FunctionNode, Node, NodeLoc, VariableDeclarator};
use crate::intern::{Interner, StringId};
use crate::oracle::{CalledFunctionArguments, TypeOracle};
use crate::parse;
use crate::types::Type;
use crate::walker::{Backend, TraversalStateStack, VariableNameCounter, IN_FOR_LOOP_INIT};

/// Either a textual function definition or a pre-built AST (§4.1).
pub enum Source {
    Text(String),
    Ast { node: FunctionNode, interner: Interner },
}

/// Construction-time configuration (§6). Every field is applied only when
/// provided; omitted collection fields default to empty.
#[derive(Debug, Clone, Default)]
pub struct FunctionUnitConfig {
    pub name: Option<String>,
    pub is_root_kernel: bool,
    pub is_sub_kernel: bool,
    pub debug: bool,
    pub constants: IndexMap<String, serde_json::Value>,
    pub constant_types: IndexMap<String, Type>,
    pub argument_names: Vec<String>,
    pub argument_types: Vec<Option<Type>>,
    pub argument_sizes: Vec<Option<u32>>,
    pub output: Vec<u32>,
    pub loop_max_iterations: Option<u32>,
    pub return_type: Option<Type>,
}

/// Whether a source was textual (and so reconstructible from `settings`
/// alone) or a pre-built AST (reconstructible only via [`FunctionUnitSnapshot`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SourceSetting {
    Text(String),
    PrebuiltAst,
}

/// The serializable, backend-agnostic half of a function unit's state
/// (§6 "toJSON"). Round-tripping through [`FunctionUnit::from_settings`]
/// is well-defined for `Text` sources; `PrebuiltAst` sources need the
/// full [`FunctionUnitSnapshot`] instead, since the ast itself isn't text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionUnitSettings {
    pub source: SourceSetting,
    pub name: String,
    pub is_root_kernel: bool,
    pub is_sub_kernel: bool,
    pub debug: bool,
    pub constants: IndexMap<String, serde_json::Value>,
    pub constant_types: IndexMap<String, Type>,
    pub argument_names: Vec<String>,
    pub argument_types: Vec<Option<Type>>,
    pub argument_sizes: Vec<Option<u32>>,
    pub output: Vec<u32>,
    pub loop_max_iterations: Option<u32>,
    pub return_type: Type,
}

/// A full, backend-agnostic snapshot: settings plus the already-lowered
/// ast and the interner its identifiers resolve against. Reconstructing
/// from a snapshot never re-parses source text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionUnitSnapshot {
    pub ast: FunctionNode,
    pub interner: Interner,
    pub settings: FunctionUnitSettings,
}

/// The root entity a [`Backend`] transpiles (§3).
pub struct FunctionUnit<B: Backend> {
    backend: B,
    interner: Interner,
    source_text: Option<String>,
    name: String,
    is_root_kernel: bool,
    is_sub_kernel: bool,
    debug: bool,
    constants: IndexMap<String, serde_json::Value>,
    constant_type_names: IndexMap<String, Type>,
    constant_types: AHashMap<StringId, Type>,
    argument_names: Vec<StringId>,
    argument_types: Vec<Option<Type>>,
    argument_sizes: Vec<Option<u32>>,
    output: Vec<u32>,
    loop_max_iterations: Option<u32>,
    return_type: Type,
    parent_called_arguments: Option<CalledFunctionArguments>,
    own_called_arguments: CalledFunctionArguments,
    declarations: DeclarationTable,
    state_stack: TraversalStateStack,
    name_counter: VariableNameCounter,
    ast: FunctionNode,
    #[allow(clippy::type_complexity)]
    on_nested_function: Option<Box<dyn FnMut(&str, Type)>>,
    cached_string: Option<String>,
}

impl<B: Backend> FunctionUnit<B> {
    pub fn from_text(source: impl Into<String>, config: FunctionUnitConfig, backend: B) -> Result<Self, TranspileError> {
        Self::new(Source::Text(source.into()), config, backend, None, None)
    }

    pub fn from_ast(
        node: FunctionNode,
        interner: Interner,
        config: FunctionUnitConfig,
        backend: B,
    ) -> Result<Self, TranspileError> {
        Self::new(Source::Ast { node, interner }, config, backend, None, None)
    }

    /// Like [`Self::from_text`], additionally wiring a parent's recorded
    /// call-site argument types (§4.5 back-propagation) and a callback
    /// invoked once per nested function declaration encountered while
    /// walking (§4.7's "onNestedFunction hook").
    pub fn from_text_with_context(
        source: impl Into<String>,
        config: FunctionUnitConfig,
        backend: B,
        parent_called_arguments: Option<CalledFunctionArguments>,
        on_nested_function: Option<Box<dyn FnMut(&str, Type)>>,
    ) -> Result<Self, TranspileError> {
        Self::new(Source::Text(source.into()), config, backend, parent_called_arguments, on_nested_function)
    }

    fn new(
        source: Source,
        config: FunctionUnitConfig,
        backend: B,
        parent_called_arguments: Option<CalledFunctionArguments>,
        on_nested_function: Option<Box<dyn FnMut(&str, Type)>>,
    ) -> Result<Self, TranspileError> {
        let forced_name = config.is_root_kernel.then(|| "kernel".to_string());
        let (interner, ast, name, source_text) = match source {
            Source::Text(text) => {
                if text.trim().is_empty() {
                    return Err(ConfigError::MissingSource.into());
                }
                let name_override = forced_name.clone().or_else(|| config.name.clone());
                let parsed = parse::parse_function(&text, name_override.as_deref())?;
                (parsed.interner, parsed.function, parsed.name, Some(text))
            }
            Source::Ast { node, interner } => {
                let name = forced_name.or_else(|| config.name.clone()).ok_or(ConfigError::MissingName)?;
                (interner, node, name, None)
            }
        };

        Self::finish_construction(
            interner,
            ast,
            name,
            source_text,
            config,
            backend,
            parent_called_arguments,
            on_nested_function,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_construction(
        mut interner: Interner,
        ast: FunctionNode,
        name: String,
        source_text: Option<String>,
        config: FunctionUnitConfig,
        backend: B,
        parent_called_arguments: Option<CalledFunctionArguments>,
        on_nested_function: Option<Box<dyn FnMut(&str, Type)>>,
    ) -> Result<Self, TranspileError> {
        if name.trim().is_empty() {
            return Err(ConfigError::MissingName.into());
        }
        if config.output.is_empty() {
            return Err(ConfigError::EmptyOutput.into());
        }

        let argument_name_ids: Vec<StringId> = if config.argument_names.is_empty() {
            ast.params.clone()
        } else {
            config.argument_names.iter().map(|text| interner.intern(text)).collect()
        };

        if !config.argument_types.is_empty() && config.argument_types.len() != argument_name_ids.len() {
            return Err(ConfigError::argument_length_mismatch(argument_name_ids.len(), config.argument_types.len()).into());
        }

        let argument_types = if config.argument_types.is_empty() {
            vec![None; argument_name_ids.len()]
        } else {
            config.argument_types.clone()
        };
        let argument_sizes = if config.argument_sizes.is_empty() {
            vec![None; argument_name_ids.len()]
        } else {
            config.argument_sizes.clone()
        };

        let mut constant_types = AHashMap::with_capacity(config.constant_types.len());
        for (name, ty) in &config.constant_types {
            constant_types.insert(interner.intern(name), *ty);
        }

        Ok(Self {
            backend,
            interner,
            source_text,
            name,
            is_root_kernel: config.is_root_kernel,
            is_sub_kernel: config.is_sub_kernel,
            debug: config.debug,
            constants: config.constants,
            constant_type_names: config.constant_types,
            constant_types,
            argument_names: argument_name_ids,
            argument_types,
            argument_sizes,
            output: config.output,
            loop_max_iterations: config.loop_max_iterations,
            return_type: config.return_type.unwrap_or(Type::Number),
            parent_called_arguments,
            own_called_arguments: CalledFunctionArguments::default(),
            declarations: DeclarationTable::new(),
            state_stack: TraversalStateStack::default(),
            name_counter: VariableNameCounter::default(),
            ast,
            on_nested_function,
            cached_string: None,
        })
    }

    /// Reconstructs a unit from its own `to_settings()` output, per the
    /// round-trip law. Only well-defined for `Text`-sourced settings; a
    /// `PrebuiltAst` source has no text to re-parse and is rejected with
    /// [`ConfigError::MissingSource`] (use [`Self::from_snapshot`] instead).
    pub fn from_settings(settings: FunctionUnitSettings, backend: B) -> Result<Self, TranspileError> {
        let text = match settings.source {
            SourceSetting::Text(text) => text,
            SourceSetting::PrebuiltAst => return Err(ConfigError::MissingSource.into()),
        };
        let config = config_from_settings(&settings);
        Self::from_text(text, config, backend)
    }

    /// Reconstructs a unit directly from a previously taken snapshot,
    /// reusing its already-lowered ast and interner rather than re-parsing
    /// (the round-trip law holds for both source kinds through this path).
    pub fn from_snapshot(snapshot: FunctionUnitSnapshot, backend: B) -> Result<Self, TranspileError> {
        let config = config_from_settings(&snapshot.settings);
        let source_text = match snapshot.settings.source {
            SourceSetting::Text(text) => Some(text),
            SourceSetting::PrebuiltAst => None,
        };
        Self::finish_construction(snapshot.interner, snapshot.ast, snapshot.settings.name, source_text, config, backend, None, None)
    }

    pub fn to_settings(&self) -> FunctionUnitSettings {
        FunctionUnitSettings {
            source: match &self.source_text {
                Some(text) => SourceSetting::Text(text.clone()),
                None => SourceSetting::PrebuiltAst,
            },
            name: self.name.clone(),
            is_root_kernel: self.is_root_kernel,
            is_sub_kernel: self.is_sub_kernel,
            debug: self.debug,
            constants: self.constants.clone(),
            constant_types: self.constant_type_names.clone(),
            argument_names: self.argument_names.iter().map(|id| self.interner.resolve(*id).to_string()).collect(),
            argument_types: self.argument_types.clone(),
            argument_sizes: self.argument_sizes.clone(),
            output: self.output.clone(),
            loop_max_iterations: self.loop_max_iterations,
            return_type: self.return_type,
        }
    }

    pub fn to_snapshot(&self) -> FunctionUnitSnapshot {
        FunctionUnitSnapshot { ast: self.ast.clone(), interner: self.interner.clone(), settings: self.to_settings() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_root_kernel(&self) -> bool {
        self.is_root_kernel
    }

    pub fn is_sub_kernel(&self) -> bool {
        self.is_sub_kernel
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn output(&self) -> &[u32] {
        &self.output
    }

    pub fn return_type(&self) -> Type {
        self.return_type
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// A snapshot of the calls this unit has typed so far, suitable for
    /// handing to a child unit's `parent_called_arguments` so the child
    /// can back-propagate its own argument types (§4.5).
    pub fn called_arguments(&self) -> CalledFunctionArguments {
        self.own_called_arguments.clone()
    }

    /// Issues a fresh internal variable name via the counter (Data Model
    /// "Internal Variable Name Counter").
    pub fn issue_variable_name(&mut self, requested: &str) -> String {
        self.name_counter.issue(requested)
    }

    pub fn push_state(&mut self, label: &'static str) {
        self.state_stack.push(label);
    }

    pub fn pop_state(&mut self, label: &'static str) -> Result<(), TranspileError> {
        self.state_stack.pop(label).map_err(Into::into)
    }

    /// Runs `f` with `in-for-loop-init` pushed onto the traversal-state
    /// stack, so that a literal-integer loop counter declared within `f`
    /// coerces to `Integer` rather than `Number` (§4.6). Backends
    /// implementing `on_for` should wrap their recursion into the loop's
    /// init clause in this, since for-loops are not otherwise core-fixed.
    pub fn with_for_loop_init_state<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, TranspileError>,
    ) -> Result<T, TranspileError> {
        self.push_state(IN_FOR_LOOP_INIT);
        let result = f(self);
        self.pop_state(IN_FOR_LOOP_INIT)?;
        result
    }

    /// Looks up a declared or argument variable's type by source name,
    /// without mutating the interner if it has never been seen.
    pub fn get_variable_type(&mut self, name: &str) -> Option<Type> {
        let id = self.interner.get(name)?;
        if let Some(index) = self.argument_names.iter().position(|candidate| *candidate == id) {
            return self.type_of_argument(index);
        }
        self.declarations.get(id).map(|decl| decl.ty)
    }

    fn type_of_argument(&mut self, index: usize) -> Option<Type> {
        let expr = ExprLoc::new(Expr::Identifier(self.argument_names[index]), None);
        self.type_of(&expr).ok().flatten()
    }

    /// `typeOf(expr)` (§4.3), bundling this unit's declaration table,
    /// argument bindings and backend `lookupReturnType` seam into an
    /// ephemeral [`TypeOracle`].
    pub fn type_of(&mut self, expr: &ExprLoc) -> Result<Option<Type>, ShapeError> {
        let backend = self.backend.clone();
        let lookup = |name: &str| backend.lookup_return_type(name);
        TypeOracle {
            interner: &self.interner,
            declarations: &self.declarations,
            own_name: &self.name,
            argument_names: &self.argument_names,
            argument_types: &mut self.argument_types,
            constant_types: &self.constant_types,
            parent_called_arguments: self.parent_called_arguments.as_ref(),
            own_called_arguments: &mut self.own_called_arguments,
            lookup_return_type: &lookup,
        }
        .type_of(expr)
    }

    pub fn type_of_node(&mut self, node: &NodeLoc) -> Result<Option<Type>, ShapeError> {
        let backend = self.backend.clone();
        let lookup = |name: &str| backend.lookup_return_type(name);
        TypeOracle {
            interner: &self.interner,
            declarations: &self.declarations,
            own_name: &self.name,
            argument_names: &self.argument_names,
            argument_types: &mut self.argument_types,
            constant_types: &self.constant_types,
            parent_called_arguments: self.parent_called_arguments.as_ref(),
            own_called_arguments: &mut self.own_called_arguments,
            lookup_return_type: &lookup,
        }
        .type_of_node(node)
    }

    /// Decomposes a recognized member-expression shape into a structured
    /// descriptor (§4.8), for a backend's `on_member` hook.
    pub fn decompose(&mut self, expr: &ExprLoc) -> Result<crate::decomposer::MemberDescriptor, ShapeError> {
        let backend = self.backend.clone();
        let lookup = |name: &str| backend.lookup_return_type(name);
        TypeOracle {
            interner: &self.interner,
            declarations: &self.declarations,
            own_name: &self.name,
            argument_names: &self.argument_names,
            argument_types: &mut self.argument_types,
            constant_types: &self.constant_types,
            parent_called_arguments: self.parent_called_arguments.as_ref(),
            own_called_arguments: &mut self.own_called_arguments,
            lookup_return_type: &lookup,
        }
        .decompose(expr)
    }

    pub fn dependency_analysis(&self, expr: &ExprLoc) -> DependencyAnalysis {
        let argument_names = &self.argument_names;
        dependency::analyze(expr, &self.declarations, |name| argument_names.contains(&name), false)
    }

    /// Transpiles the function body, caching the result so repeated calls
    /// are free (§6 "idempotent, cached `toString`").
    pub fn to_string_cached(&mut self) -> Result<&str, TranspileError> {
        if self.cached_string.is_none() {
            let body = self.ast.body.clone();
            let mut out = String::new();
            for stmt in &body {
                out.push_str(&self.walk_stmt(stmt)?);
            }
            self.cached_string = Some(out);
        }
        Ok(self.cached_string.as_deref().expect("just populated"))
    }

    fn backend_call<T>(&mut self, f: impl FnOnce(&B, &mut Self) -> Result<T, TranspileError>) -> Result<T, TranspileError> {
        let backend = self.backend.clone();
        f(&backend, self)
    }

    pub fn walk_stmt(&mut self, node: &NodeLoc) -> Result<String, TranspileError> {
        match &node.node {
            Node::FunctionDeclaration(func) => self.handle_nested_function(node.span.as_ref(), func),
            Node::Return(value) => {
                let value = value.clone();
                self.backend_call(|backend, unit| backend.on_return(unit, value.as_ref()))
            }
            Node::ExpressionStatement(expr) => {
                let inner = self.walk_expr(expr)?;
                Ok(format!("{inner};"))
            }
            Node::Empty => self.backend_call(|backend, unit| backend.on_empty(unit)),
            Node::Block(body) => {
                let body = body.clone();
                self.backend_call(|backend, unit| backend.on_block(unit, &body))
            }
            Node::If { test, consequent, alternate } => {
                let test = test.clone();
                let consequent = (**consequent).clone();
                let alternate = alternate.clone();
                self.backend_call(|backend, unit| backend.on_if(unit, &test, &consequent, alternate.as_deref()))
            }
            Node::Break => Ok("break;".to_string()),
            Node::Continue => Ok("continue;\n".to_string()),
            Node::For { init, test, update, body } => {
                let init = init.clone();
                let test = test.clone();
                let update = update.clone();
                let body = (**body).clone();
                self.backend_call(|backend, unit| backend.on_for(unit, init.as_deref(), test.as_ref(), update.as_ref(), &body))
            }
            Node::While { test, body } => {
                let test = test.clone();
                let body = (**body).clone();
                self.backend_call(|backend, unit| backend.on_while(unit, &test, &body))
            }
            Node::DoWhile { body, test } => {
                let body = (**body).clone();
                let test = test.clone();
                self.backend_call(|backend, unit| backend.on_do_while(unit, &body, &test))
            }
            Node::VariableDeclaration { kind: _, declarations } => {
                let declarations = declarations.clone();
                self.process_variable_declaration(&declarations)
            }
            Node::Debugger => self.backend_call(|backend, unit| backend.on_debugger(unit)),
        }
    }

    pub fn walk_expr(&mut self, expr: &ExprLoc) -> Result<String, TranspileError> {
        match &expr.expr {
            Expr::Literal(lit) => {
                let lit = *lit;
                self.backend_call(|backend, unit| backend.on_literal(unit, &lit))
            }
            Expr::Identifier(name) => {
                let name = *name;
                self.backend_call(|backend, unit| backend.on_identifier(unit, name))
            }
            Expr::This => self.backend_call(|backend, unit| backend.on_this(unit)),
            Expr::Array(elements) => {
                let elements = elements.clone();
                self.backend_call(|backend, unit| backend.on_array(unit, &elements))
            }
            Expr::Binary { op, left, right } => {
                let (op, left, right) = (*op, (**left).clone(), (**right).clone());
                self.backend_call(|backend, unit| backend.on_binary(unit, op, &left, &right))
            }
            Expr::Logical { op, left, right } => {
                let l = self.walk_expr(left)?;
                let r = self.walk_expr(right)?;
                Ok(format!("({l} {} {r})", op.as_str()))
            }
            Expr::Unary { op, prefix, argument } => {
                let text = self.walk_expr(argument)?;
                Ok(if *prefix { format!("{}{text}", op.as_str()) } else { format!("{text}{}", op.as_str()) })
            }
            Expr::Update { op, prefix, argument } => {
                let text = self.walk_expr(argument)?;
                Ok(if *prefix { format!("{}{text}", op.as_str()) } else { format!("{text}{}", op.as_str()) })
            }
            Expr::Assignment { op, target, value } => {
                let (op, target, value) = (*op, (**target).clone(), (**value).clone());
                self.backend_call(|backend, unit| backend.on_assignment(unit, op, &target, &value))
            }
            Expr::Sequence(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items.clone() {
                    parts.push(self.walk_expr(&item)?);
                }
                Ok(parts.join(","))
            }
            Expr::Member { .. } => self.backend_call(|backend, unit| {
                let expr = expr.clone();
                backend.on_member(unit, &expr)
            }),
            Expr::Call { callee, arguments } => {
                let (callee, arguments) = ((**callee).clone(), arguments.clone());
                self.backend_call(|backend, unit| backend.on_call(unit, &callee, &arguments))
            }
            Expr::Conditional { test, consequent, alternate } => {
                let t = self.walk_expr(test)?;
                let c = self.walk_expr(consequent)?;
                let a = self.walk_expr(alternate)?;
                Ok(format!("({t} ? {c} : {a})"))
            }
            Expr::Function(func) => {
                let func = (**func).clone();
                self.handle_nested_function(expr.span.as_ref(), &func)
            }
        }
    }

    fn handle_nested_function(&mut self, span: Option<&SourceSpan>, func: &FunctionNode) -> Result<String, TranspileError> {
        let return_type = {
            let ty = self.type_of_function_body(&func.body)?;
            match ty {
                Some(Type::LiteralInteger) | None => Type::Number,
                Some(ty) => ty,
            }
        };
        if let Some(hook) = self.on_nested_function.as_mut() {
            let text = match (&self.source_text, span) {
                (Some(source), Some(span)) => source.get(span.start..span.end).unwrap_or_default().to_string(),
                _ => String::new(),
            };
            hook(&text, return_type);
        }
        self.backend_call(|backend, unit| backend.on_function_declaration(unit, func, true))
    }

    fn type_of_function_body(&mut self, body: &[NodeLoc]) -> Result<Option<Type>, ShapeError> {
        match body.last() {
            Some(last) => self.type_of_node(last),
            None => Ok(None),
        }
    }

    /// Variable declaration + declarator (§4.6 / §4.7): integrates with
    /// the declaration table (coercing a literal-integer initializer per
    /// the traversal-state stack's `in-for-loop-init` top) and emits a
    /// single typed declaration statement, joining any additional
    /// declarators rather than re-emitting the type for each.
    fn process_variable_declaration(&mut self, declarators: &[VariableDeclarator]) -> Result<String, TranspileError> {
        let mut parts = Vec::with_capacity(declarators.len());
        let mut declared_type = Type::Number;
        for (index, decl) in declarators.iter().enumerate() {
            let init_text = match &decl.init {
                Some(init) => Some(self.walk_expr(init)?),
                None => None,
            };
            let ty = if index == 0 {
                let ty = match &decl.init {
                    Some(init) => self.type_of(init)?.unwrap_or(Type::Number),
                    None => Type::Number,
                };
                let deps = match &decl.init {
                    Some(init) => self.dependency_analysis(init),
                    None => DependencyAnalysis::default(),
                };
                let in_for_loop_init = self.state_stack.is_in_for_loop_init();
                let coerced = self.declarations.declare(decl.id, ty, deps, in_for_loop_init);
                declared_type = coerced;
                coerced
            } else {
                self.declarations.declare_unsafe_sibling(decl.id, declared_type);
                declared_type
            };

            let var_name = format!("user_{}", self.interner.resolve(decl.id));
            let fragment = match init_text {
                Some(text) => format!("{var_name}={text}"),
                None => var_name,
            };

            if index == 0 {
                let backend = self.backend.clone();
                let lowered = backend
                    .type_map(ty)
                    .ok_or_else(|| TranspileError::from(ShapeError::missing_type_mapping(ty.to_string(), None)))?;
                parts.push(format!("{lowered} {fragment}"));
            } else {
                parts.push(fragment);
            }
        }
        Ok(format!("{};", parts.join(",")))
    }
}

fn config_from_settings(settings: &FunctionUnitSettings) -> FunctionUnitConfig {
    FunctionUnitConfig {
        name: Some(settings.name.clone()),
        is_root_kernel: settings.is_root_kernel,
        is_sub_kernel: settings.is_sub_kernel,
        debug: settings.debug,
        constants: settings.constants.clone(),
        constant_types: settings.constant_types.clone(),
        argument_names: settings.argument_names.clone(),
        argument_types: settings.argument_types.clone(),
        argument_sizes: settings.argument_sizes.clone(),
        output: settings.output.clone(),
        loop_max_iterations: settings.loop_max_iterations,
        return_type: Some(settings.return_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct RecordingBackend;

    impl Backend for RecordingBackend {
        fn type_map(&self, ty: Type) -> Option<String> {
            Some(match ty {
                Type::Number | Type::Float => "double".to_string(),
                Type::Integer | Type::LiteralInteger => "int".to_string(),
                Type::Boolean => "bool".to_string(),
                other => format!("{other:?}"),
            })
        }

        fn lookup_return_type(&self, _name: &str) -> Option<Type> {
            None
        }

        fn on_return(
            &self,
            unit: &mut FunctionUnit<Self>,
            value: Option<&ExprLoc>,
        ) -> Result<String, TranspileError> {
            match value {
                Some(value) => Ok(format!("return {};", unit.walk_expr(value)?)),
                None => Ok("return;".to_string()),
            }
        }

        fn on_literal(&self, _unit: &mut FunctionUnit<Self>, literal: &crate::expressions::Literal) -> Result<String, TranspileError> {
            Ok(match literal {
                crate::expressions::Literal::Int(v) => v.to_string(),
                crate::expressions::Literal::Float(_) => literal.as_f64().to_string(),
                crate::expressions::Literal::Bool(v) => v.to_string(),
            })
        }

        fn on_identifier(&self, unit: &mut FunctionUnit<Self>, name: StringId) -> Result<String, TranspileError> {
            Ok(format!("user_{}", unit.interner().resolve(name)))
        }
    }

    fn config(output: Vec<u32>) -> FunctionUnitConfig {
        FunctionUnitConfig { output, ..Default::default() }
    }

    #[test]
    fn literal_return_transpiles_and_caches() {
        let mut unit =
            FunctionUnit::from_text("function kernel() { return 1; }", config(vec![1]), RecordingBackend).unwrap();
        assert_eq!(unit.to_string_cached().unwrap(), "return 1;");
        assert_eq!(unit.to_string_cached().unwrap(), "return 1;");
    }

    #[test]
    fn typed_argument_is_queryable_by_name() {
        let mut cfg = config(vec![1]);
        cfg.argument_types = vec![Some(Type::ArrayVec(4))];
        let mut unit = FunctionUnit::from_text("function kernel(a) { return a; }", cfg, RecordingBackend).unwrap();
        assert_eq!(unit.get_variable_type("a"), Some(Type::ArrayVec(4)));
    }

    #[test]
    fn variable_declaration_emits_typed_local() {
        let mut unit = FunctionUnit::from_text(
            "function kernel() { var x = 1; return x; }",
            config(vec![1]),
            RecordingBackend,
        )
        .unwrap();
        let text = unit.to_string_cached().unwrap();
        assert!(text.contains("int user_x=1;"));
    }

    #[test]
    fn settings_round_trip_preserves_public_fields() {
        let mut cfg = config(vec![4]);
        cfg.argument_types = vec![Some(Type::Number)];
        cfg.argument_names = vec!["a".to_string()];
        let unit = FunctionUnit::from_text("function add(a) { return a; }", cfg, RecordingBackend).unwrap();
        let settings = unit.to_settings();
        let rebuilt = FunctionUnit::from_settings(settings.clone(), RecordingBackend).unwrap();
        assert_eq!(rebuilt.to_settings().name, settings.name);
        assert_eq!(rebuilt.to_settings().argument_types, settings.argument_types);
        assert_eq!(rebuilt.output(), unit.output());
    }

    #[test]
    fn missing_name_without_root_kernel_is_an_error() {
        let result = FunctionUnit::from_text("function () { return 1; }", config(vec![1]), RecordingBackend);
        assert!(matches!(result, Err(TranspileError::Parse(_)) | Err(TranspileError::Config(ConfigError::MissingName))));
    }

    #[test]
    fn empty_output_is_rejected() {
        let result = FunctionUnit::from_text("function kernel() { return 1; }", config(vec![]), RecordingBackend);
        assert!(matches!(result, Err(TranspileError::Config(ConfigError::EmptyOutput))));
    }
}
