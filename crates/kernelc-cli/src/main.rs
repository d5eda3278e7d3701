use std::{env, fs, io::Read as _, process::ExitCode};

use kernelc::{
    AssignOp, Backend, BinaryOp, Expr, ExprLoc, FunctionNode, FunctionUnit, FunctionUnitConfig, Literal, MemberOrigin,
    MemberProp, NodeLoc, StringId, TranspileError, Type,
};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut input_path: Option<String> = None;
    let mut name: Option<String> = None;
    let mut argument_types = Vec::new();
    let mut output = vec![1u32];

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--name" => name = Some(expect_value(&mut iter, "--name")),
            "--arg" => {
                let text = expect_value(&mut iter, "--arg");
                match parse_type(&text) {
                    Some(ty) => argument_types.push(Some(ty)),
                    None => {
                        eprintln!("error: unrecognized --arg type `{text}`");
                        return ExitCode::FAILURE;
                    }
                }
            }
            "--output" => {
                let text = expect_value(&mut iter, "--output");
                match text.split(',').map(str::parse).collect::<Result<Vec<u32>, _>>() {
                    Ok(dims) if !dims.is_empty() => output = dims,
                    _ => {
                        eprintln!("error: --output expects a comma-separated list of positive integers");
                        return ExitCode::FAILURE;
                    }
                }
            }
            other => input_path = Some(other.to_string()),
        }
    }

    let source = match read_source(input_path.as_deref().unwrap_or("-")) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let config = FunctionUnitConfig { name, argument_types, output, ..Default::default() };

    let mut unit = match FunctionUnit::from_text(source, config, CpuBackend) {
        Ok(unit) => unit,
        Err(err) => {
            report(&err);
            return ExitCode::FAILURE;
        }
    };

    match unit.to_string_cached() {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn expect_value(iter: &mut std::vec::IntoIter<String>, flag: &str) -> String {
    iter.next().unwrap_or_else(|| {
        eprintln!("error: {flag} requires a value");
        std::process::exit(1);
    })
}

fn parse_type(text: &str) -> Option<Type> {
    Some(match text {
        "number" | "Number" => Type::Number,
        "float" | "Float" => Type::Float,
        "integer" | "Integer" => Type::Integer,
        "boolean" | "Boolean" => Type::Boolean,
        "array" | "Array" => Type::Array,
        "array2d" | "Array2D" => Type::Array2D,
        "array3d" | "Array3D" => Type::Array3D,
        "vec2" => Type::ArrayVec(2),
        "vec3" => Type::ArrayVec(3),
        "vec4" => Type::ArrayVec(4),
        "input" | "Input" => Type::Input,
        _ => return None,
    })
}

fn read_source(path: &str) -> Result<String, String> {
    if path == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|err| format!("error reading stdin: {err}"))?;
        return Ok(buffer);
    }
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => {
            fs::read_to_string(path).map_err(|err| format!("error reading {path}: {err}"))
        }
        Ok(_) => Err(format!("{path} is not a file")),
        Err(err) => Err(format!("error reading {path}: {err}")),
    }
}

fn report(err: &TranspileError) {
    eprintln!("error: {err}");
}

/// A portable CPU-style demonstration backend: lowers the closed type
/// vocabulary to plain C type names and emits straightforward C-like
/// expression text. It never resolves a user-defined call's return type,
/// so kernels calling unregistered sub-kernels will fail to type.
#[derive(Clone)]
struct CpuBackend;

impl Backend for CpuBackend {
    fn type_map(&self, ty: Type) -> Option<String> {
        Some(match ty {
            Type::Number | Type::Float => "double".to_string(),
            Type::Integer | Type::LiteralInteger => "int".to_string(),
            Type::Boolean => "int".to_string(),
            Type::Array | Type::Array2D | Type::Array3D => "double*".to_string(),
            Type::ArrayVec(width) => format!("double[{width}]"),
            Type::Input | Type::NumberTexture => "const double*".to_string(),
            Type::HtmlImage | Type::HtmlImageArray | Type::ArrayTexture4 => "const double[4]".to_string(),
        })
    }

    fn lookup_return_type(&self, _name: &str) -> Option<Type> {
        Some(Type::Number)
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
            Literal::Bool(value) => i32::from(*value).to_string(),
        })
    }

    fn on_identifier(&self, unit: &mut FunctionUnit<Self>, name: StringId) -> Result<String, TranspileError> {
        Ok(format!("user_{}", unit.interner().resolve(name)))
    }

    fn on_binary(
        &self,
        unit: &mut FunctionUnit<Self>,
        op: BinaryOp,
        left: &ExprLoc,
        right: &ExprLoc,
    ) -> Result<String, TranspileError> {
        let l = unit.walk_expr(left)?;
        let r = unit.walk_expr(right)?;
        Ok(format!("({l} {} {r})", op.as_str()))
    }

    fn on_assignment(
        &self,
        unit: &mut FunctionUnit<Self>,
        op: AssignOp,
        target: &ExprLoc,
        value: &ExprLoc,
    ) -> Result<String, TranspileError> {
        let t = unit.walk_expr(target)?;
        let v = unit.walk_expr(value)?;
        Ok(format!("{t}{}{v}", op.as_str()))
    }

    fn on_empty(&self, _unit: &mut FunctionUnit<Self>) -> Result<String, TranspileError> {
        Ok(String::new())
    }

    fn on_block(&self, unit: &mut FunctionUnit<Self>, body: &[NodeLoc]) -> Result<String, TranspileError> {
        let mut out = String::from("{");
        for stmt in body {
            out.push_str(&unit.walk_stmt(stmt)?);
        }
        out.push('}');
        Ok(out)
    }

    fn on_if(
        &self,
        unit: &mut FunctionUnit<Self>,
        test: &ExprLoc,
        consequent: &NodeLoc,
        alternate: Option<&NodeLoc>,
    ) -> Result<String, TranspileError> {
        let test_text = unit.walk_expr(test)?;
        let consequent_text = unit.walk_stmt(consequent)?;
        match alternate {
            Some(alt) => {
                let alt_text = unit.walk_stmt(alt)?;
                Ok(format!("if ({test_text}) {consequent_text} else {alt_text}"))
            }
            None => Ok(format!("if ({test_text}) {consequent_text}")),
        }
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
        Ok(format!("for ({init_text} {test_text}; {update_text}) {body_text}"))
    }

    fn on_while(&self, unit: &mut FunctionUnit<Self>, test: &ExprLoc, body: &NodeLoc) -> Result<String, TranspileError> {
        let test_text = unit.walk_expr(test)?;
        let body_text = unit.walk_stmt(body)?;
        Ok(format!("while ({test_text}) {body_text}"))
    }

    fn on_do_while(&self, unit: &mut FunctionUnit<Self>, body: &NodeLoc, test: &ExprLoc) -> Result<String, TranspileError> {
        let body_text = unit.walk_stmt(body)?;
        let test_text = unit.walk_expr(test)?;
        Ok(format!("do {body_text} while ({test_text});"))
    }

    fn on_this(&self, _unit: &mut FunctionUnit<Self>) -> Result<String, TranspileError> {
        Ok("this".to_string())
    }

    fn on_member(&self, unit: &mut FunctionUnit<Self>, expr: &ExprLoc) -> Result<String, TranspileError> {
        let descriptor = unit.decompose(expr)?;
        if descriptor.origin == MemberOrigin::Math {
            let name = descriptor.name.map(|id| unit.interner().resolve(id).to_string()).unwrap_or_default();
            return Ok(math_constant_value(&name));
        }
        let base = descriptor.name.map(|id| unit.interner().resolve(id).to_string()).unwrap_or_default();
        let prefix = match descriptor.origin {
            MemberOrigin::Constants => "constants_",
            _ => "user_",
        };
        let mut text = format!("{prefix}{base}");
        for index in [&descriptor.x_property, &descriptor.y_property, &descriptor.z_property] {
            if let Some(index) = index {
                let index_text = unit.walk_expr(index)?;
                text.push('[');
                text.push_str(&index_text);
                text.push(']');
            }
        }
        if let Some(channel) = descriptor.property {
            text.push('.');
            text.push(channel);
        }
        Ok(text)
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

    fn on_array(&self, unit: &mut FunctionUnit<Self>, elements: &[ExprLoc]) -> Result<String, TranspileError> {
        let mut parts = Vec::with_capacity(elements.len());
        for element in elements {
            parts.push(unit.walk_expr(element)?);
        }
        Ok(format!("{{{}}}", parts.join(",")))
    }

    fn on_debugger(&self, _unit: &mut FunctionUnit<Self>) -> Result<String, TranspileError> {
        Ok(String::new())
    }
}

/// Renders a recognized `Math.<CONST>` name (already validated by the
/// decomposer against [`MATH_CONSTANTS`]) as its numeric literal text.
fn math_constant_value(name: &str) -> String {
    match name {
        "PI" => std::f64::consts::PI.to_string(),
        "E" => std::f64::consts::E.to_string(),
        "SQRT2" => std::f64::consts::SQRT_2.to_string(),
        "SQRT1_2" => std::f64::consts::FRAC_1_SQRT_2.to_string(),
        "LN2" => std::f64::consts::LN_2.to_string(),
        "LN10" => std::f64::consts::LN_10.to_string(),
        "LOG2E" => std::f64::consts::LOG2_E.to_string(),
        "LOG10E" => std::f64::consts::LOG10_E.to_string(),
        _ => "0.0".to_string(),
    }
}
