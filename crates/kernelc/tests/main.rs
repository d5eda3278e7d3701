use kernelc::{
    Backend, Expr, ExprLoc, FunctionNode, FunctionUnit, FunctionUnitConfig, Literal, MemberProp, NodeLoc, StringId,
    TranspileError, Type,
};
use pretty_assertions::assert_eq;

#[derive(Clone)]
struct DemoBackend;

impl Backend for DemoBackend {
    fn type_map(&self, ty: Type) -> Option<String> {
        Some(match ty {
            Type::Number | Type::Float => "double".to_string(),
            Type::Integer | Type::LiteralInteger => "int".to_string(),
            Type::Boolean => "int".to_string(),
            Type::ArrayVec(width) => format!("double[{width}]"),
            other => format!("{other:?}"),
        })
    }

    fn lookup_return_type(&self, _name: &str) -> Option<Type> {
        None
    }

    fn on_function_declaration(
        &self,
        unit: &mut FunctionUnit<Self>,
        func: &FunctionNode,
        _is_nested: bool,
    ) -> Result<String, TranspileError> {
        let mut body = String::new();
        for stmt in &func.body {
            body.push_str(&unit.walk_stmt(stmt)?);
        }
        Ok(body)
    }

    fn on_return(&self, unit: &mut FunctionUnit<Self>, value: Option<&ExprLoc>) -> Result<String, TranspileError> {
        match value {
            Some(value) => Ok(format!("return {};", unit.walk_expr(value)?)),
            None => Ok("return;".to_string()),
        }
    }

    fn on_literal(&self, _unit: &mut FunctionUnit<Self>, literal: &Literal) -> Result<String, TranspileError> {
        Ok(match literal {
            Literal::Int(value) => value.to_string(),
            Literal::Float(_) => literal.as_f64().to_string(),
            Literal::Bool(value) => value.to_string(),
        })
    }

    fn on_identifier(&self, unit: &mut FunctionUnit<Self>, name: StringId) -> Result<String, TranspileError> {
        Ok(format!("user_{}", unit.interner().resolve(name)))
    }

    fn on_member(&self, unit: &mut FunctionUnit<Self>, expr: &ExprLoc) -> Result<String, TranspileError> {
        let descriptor = unit.decompose(expr)?;
        let base = descriptor.name.map(|id| unit.interner().resolve(id).to_string()).unwrap_or_default();
        Ok(format!("user_{base}"))
    }

    fn on_call(&self, unit: &mut FunctionUnit<Self>, callee: &ExprLoc, arguments: &[ExprLoc]) -> Result<String, TranspileError> {
        let callee_text = match &callee.expr {
            Expr::Identifier(name) => unit.interner().resolve(*name).to_string(),
            Expr::Member { object, property: MemberProp::Name(name), computed: false }
                if matches!(&object.expr, Expr::Identifier(id) if unit.interner().resolve(*id) == "Math") =>
            {
                unit.interner().resolve(*name).to_string()
            }
            _ => unit.walk_expr(callee)?,
        };
        let mut parts = Vec::with_capacity(arguments.len());
        for arg in arguments {
            parts.push(unit.walk_expr(arg)?);
        }
        Ok(format!("{callee_text}({})", parts.join(",")))
    }

    fn on_for(
        &self,
        unit: &mut FunctionUnit<Self>,
        init: Option<&NodeLoc>,
        test: Option<&ExprLoc>,
        update: Option<&ExprLoc>,
        body: &NodeLoc,
    ) -> Result<String, TranspileError> {
        let init_text = match init {
            Some(init) => unit.with_for_loop_init_state(|unit| unit.walk_stmt(init))?,
            None => String::new(),
        };
        let test_text = test.map(|test| unit.walk_expr(test)).transpose()?.unwrap_or_default();
        let update_text = update.map(|update| unit.walk_expr(update)).transpose()?.unwrap_or_default();
        let body_text = unit.walk_stmt(body)?;
        Ok(format!("for({init_text}{test_text};{update_text}){body_text}"))
    }

    fn on_block(&self, unit: &mut FunctionUnit<Self>, body: &[NodeLoc]) -> Result<String, TranspileError> {
        let mut out = String::from("{");
        for stmt in body {
            out.push_str(&unit.walk_stmt(stmt)?);
        }
        out.push('}');
        Ok(out)
    }
}

fn config(output: Vec<u32>) -> FunctionUnitConfig {
    FunctionUnitConfig { output, ..Default::default() }
}

#[test]
fn literal_return_scenario() {
    let mut unit = FunctionUnit::from_text("function kernel() { return 1; }", config(vec![1]), DemoBackend).unwrap();
    assert_eq!(unit.return_type(), Type::Number);
    assert_eq!(unit.to_string_cached().unwrap(), "return 1;");
}

#[test]
fn typed_argument_scenario() {
    let mut cfg = config(vec![1]);
    cfg.argument_names = vec!["a".to_string()];
    cfg.argument_types = vec![Some(Type::ArrayVec(4))];
    let mut unit = FunctionUnit::from_text("function kernel(a) { return a; }", cfg, DemoBackend).unwrap();
    assert_eq!(unit.get_variable_type("a"), Some(Type::ArrayVec(4)));
}

#[test]
fn indexed_access_scenario() {
    let mut cfg = config(vec![1]);
    cfg.argument_names = vec!["a".to_string()];
    cfg.argument_types = vec![Some(Type::Array)];
    let mut unit = FunctionUnit::from_text("function kernel(a) { return a[0]; }", cfg, DemoBackend).unwrap();
    let text = unit.to_string_cached().unwrap();
    assert_eq!(text, "return user_a;");
}

#[test]
fn this_thread_reference_scenario() {
    let mut unit =
        FunctionUnit::from_text("function kernel() { return this.thread.x; }", config(vec![1]), DemoBackend).unwrap();
    assert!(unit.to_string_cached().is_ok());
}

#[test]
fn math_intrinsic_scenario() {
    let mut unit =
        FunctionUnit::from_text("function kernel() { return Math.floor(1.5); }", config(vec![1]), DemoBackend).unwrap();
    assert_eq!(unit.to_string_cached().unwrap(), "return floor(1.5);");
}

#[test]
fn math_constant_member_scenario() {
    let mut unit =
        FunctionUnit::from_text("function kernel() { return Math.PI; }", config(vec![1]), DemoBackend).unwrap();
    assert_eq!(unit.to_string_cached().unwrap(), "return user_PI;");
}

#[test]
fn for_loop_init_coercion_scenario() {
    let mut unit = FunctionUnit::from_text(
        "function kernel() { for (var i = 0; i < 10; i++) { } return 1; }",
        config(vec![1]),
        DemoBackend,
    )
    .unwrap();
    let text = unit.to_string_cached().unwrap();
    assert!(text.contains("int user_i=0"));
}

#[test]
fn settings_round_trip_preserves_public_fields() {
    let mut cfg = config(vec![4]);
    cfg.argument_names = vec!["a".to_string()];
    cfg.argument_types = vec![Some(Type::Number)];
    let unit = FunctionUnit::from_text("function add(a) { return a; }", cfg, DemoBackend).unwrap();
    let settings = unit.to_settings();
    let rebuilt = FunctionUnit::from_settings(settings.clone(), DemoBackend).unwrap();
    let rebuilt_settings = rebuilt.to_settings();
    assert_eq!(rebuilt_settings.name, settings.name);
    assert_eq!(rebuilt_settings.argument_names, settings.argument_names);
    assert_eq!(rebuilt_settings.argument_types, settings.argument_types);
    assert_eq!(rebuilt_settings.output, settings.output);
}

#[test]
fn snapshot_round_trip_preserves_ast_without_reparsing() {
    let unit = FunctionUnit::from_text("function kernel() { return 1; }", config(vec![1]), DemoBackend).unwrap();
    let snapshot = unit.to_snapshot();
    let rebuilt = FunctionUnit::from_snapshot(snapshot, DemoBackend).unwrap();
    assert_eq!(rebuilt.name(), unit.name());
    assert_eq!(rebuilt.output(), unit.output());
}

#[test]
fn to_string_cached_is_idempotent() {
    let mut unit = FunctionUnit::from_text("function kernel() { return 1; }", config(vec![1]), DemoBackend).unwrap();
    let first = unit.to_string_cached().unwrap().to_string();
    let second = unit.to_string_cached().unwrap().to_string();
    assert_eq!(first, second);
}

#[test]
fn mismatched_state_pop_is_rejected_without_corrupting_the_stack() {
    let mut unit = FunctionUnit::from_text("function kernel() { return 1; }", config(vec![1]), DemoBackend).unwrap();
    unit.push_state("in-for-loop-init");
    let err = unit.pop_state("something-else");
    assert!(err.is_err());
}
