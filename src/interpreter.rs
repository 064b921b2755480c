//! Tree-walking executor.
//!
//! Every `ast::Statement` node executes directly against a scope map and an
//! execution context; there is no intermediate representation. Method calls
//! recurse through `ObjectHolder::call_method`, which builds a fresh frame
//! per call.

use std::rc::Rc;

use anyhow::Result;

use crate::ast::Statement;
use crate::lexer::Lexer;
use crate::parser;
use crate::runtime::class::{ADD_METHOD, ClassInstance, INIT_METHOD, STR_METHOD};
use crate::runtime::context::Context;
use crate::runtime::error::RuntimeError;
use crate::runtime::object::{Closure, Object, ObjectHolder, is_true};

type ExecResult = std::result::Result<ObjectHolder, RuntimeError>;

impl Statement {
    /// Executes the node against `closure`, yielding its result holder.
    pub fn execute(&self, closure: &mut Closure, context: &mut dyn Context) -> ExecResult {
        match self {
            Statement::NumericConst { value }
            | Statement::StringConst { value }
            | Statement::BoolConst { value } => Ok(value.clone()),
            Statement::None => Ok(ObjectHolder::none()),
            Statement::Variable { dotted_ids } => resolve_variable(dotted_ids, closure),
            Statement::Assignment { var, value } => {
                let value = value.execute(closure, context)?;
                closure.insert(var.clone(), value.clone());
                Ok(value)
            }
            Statement::FieldAssignment {
                object,
                field,
                value,
            } => {
                let target = object.execute(closure, context)?;
                if !target.is_instance() {
                    return Err(RuntimeError::WrongType {
                        expected: "a class instance",
                    });
                }
                let value = value.execute(closure, context)?;
                target.with_instance_mut(|instance| {
                    instance.fields_mut().insert(field.clone(), value.clone());
                });
                Ok(value)
            }
            Statement::Print { args } => exec_print(args, closure, context),
            Statement::MethodCall {
                object,
                method,
                args,
            } => {
                let receiver = object.execute(closure, context)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(arg.execute(closure, context)?);
                }
                receiver.call_method(method, &values, context)
            }
            Statement::NewInstance { class, args } => {
                let class = class.as_class().ok_or(RuntimeError::WrongType {
                    expected: "a class object",
                })?;
                let instance =
                    ObjectHolder::own(Object::Instance(ClassInstance::new(Rc::clone(&class))));
                if let Some(init) = class.method(INIT_METHOD)
                    && init.formal_params.len() == args.len()
                {
                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        values.push(arg.execute(closure, context)?);
                    }
                    instance.call_method(INIT_METHOD, &values, context)?;
                }
                Ok(instance)
            }
            Statement::Stringify { arg } => {
                let value = arg.execute(closure, context)?;
                if value.has_method(STR_METHOD, 0) {
                    return value.call_method(STR_METHOD, &[], context);
                }
                let rendered = value.to_output(context)?;
                Ok(ObjectHolder::own(Object::String(rendered)))
            }
            Statement::Add { lhs, rhs } => exec_add(lhs, rhs, closure, context),
            Statement::Sub { lhs, rhs } => {
                exec_arithmetic(lhs, rhs, closure, context, "Sub", |a, b| a - b)
            }
            Statement::Mult { lhs, rhs } => {
                exec_arithmetic(lhs, rhs, closure, context, "Mult", |a, b| a * b)
            }
            Statement::Div { lhs, rhs } => exec_div(lhs, rhs, closure, context),
            Statement::Or { lhs, rhs } => {
                let result = is_true(&lhs.execute(closure, context)?)
                    || is_true(&rhs.execute(closure, context)?);
                Ok(ObjectHolder::own(Object::Bool(result)))
            }
            Statement::And { lhs, rhs } => {
                let result = is_true(&lhs.execute(closure, context)?)
                    && is_true(&rhs.execute(closure, context)?);
                Ok(ObjectHolder::own(Object::Bool(result)))
            }
            Statement::Not { arg } => {
                let result = !is_true(&arg.execute(closure, context)?);
                Ok(ObjectHolder::own(Object::Bool(result)))
            }
            Statement::Comparison {
                comparator,
                lhs,
                rhs,
            } => {
                let left = lhs.execute(closure, context)?;
                let right = rhs.execute(closure, context)?;
                let result = comparator(&left, &right, context)?;
                Ok(ObjectHolder::own(Object::Bool(result)))
            }
            Statement::Compound { statements } => {
                for statement in statements {
                    let result = statement.execute(closure, context)?;
                    if statement.escapes_compound(&result) {
                        return Ok(result);
                    }
                }
                Ok(ObjectHolder::none())
            }
            Statement::MethodBody { body } => body.execute(closure, context),
            Statement::Return { statement } => statement.execute(closure, context),
            Statement::ClassDefinition { class } => {
                let class_object = class.as_class().ok_or(RuntimeError::WrongType {
                    expected: "a class object",
                })?;
                closure.insert(class_object.name().to_string(), class.clone());
                Ok(ObjectHolder::none())
            }
            Statement::IfElse {
                condition,
                if_body,
                else_body,
            } => {
                if is_true(&condition.execute(closure, context)?) {
                    if_body.execute(closure, context)
                } else if let Some(else_body) = else_body {
                    else_body.execute(closure, context)
                } else {
                    Ok(ObjectHolder::none())
                }
            }
        }
    }

    /// A compound stops early when a child `Return` executed, or when a
    /// nested `IfElse`/`Compound` yielded a non-empty holder. The latter is
    /// what lets `return` inside nested branches escape the enclosing
    /// method body.
    fn escapes_compound(&self, result: &ObjectHolder) -> bool {
        match self {
            Statement::Return { .. } => true,
            Statement::IfElse { .. } | Statement::Compound { .. } => !result.is_empty(),
            _ => false,
        }
    }
}

fn resolve_variable(dotted_ids: &[String], closure: &Closure) -> ExecResult {
    let Some((head, fields)) = dotted_ids.split_first() else {
        return Ok(ObjectHolder::none());
    };
    let mut object = closure
        .get(head)
        .cloned()
        .ok_or_else(|| RuntimeError::UnknownVariable { name: head.clone() })?;
    for name in fields {
        object = object
            .with_instance(|instance| instance.fields().get(name).cloned())
            .ok_or(RuntimeError::WrongType {
                expected: "a class instance",
            })?
            .ok_or_else(|| RuntimeError::UnknownVariable { name: name.clone() })?;
    }
    Ok(object)
}

fn exec_print(
    args: &[Statement],
    closure: &mut Closure,
    context: &mut dyn Context,
) -> ExecResult {
    // Arguments render first (rendering may call __str__, which needs the
    // context), then the finished line goes to the output sink.
    let mut rendered = Vec::with_capacity(args.len());
    for arg in args {
        let value = arg.execute(closure, context)?;
        rendered.push(value.to_output(context)?);
    }
    let line = rendered.join(" ");
    writeln!(context.output_stream(), "{line}").map_err(RuntimeError::output)?;
    Ok(ObjectHolder::none())
}

fn exec_add(
    lhs: &Statement,
    rhs: &Statement,
    closure: &mut Closure,
    context: &mut dyn Context,
) -> ExecResult {
    let left = lhs.execute(closure, context)?;
    let right = rhs.execute(closure, context)?;
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return Ok(ObjectHolder::own(Object::Number(a + b)));
    }
    if let (Some(a), Some(b)) = (left.as_string(), right.as_string()) {
        let joined = format!("{}{}", *a, *b);
        return Ok(ObjectHolder::own(Object::String(joined)));
    }
    if left.has_method(ADD_METHOD, 1) {
        return left.call_method(ADD_METHOD, std::slice::from_ref(&right), context);
    }
    Err(RuntimeError::UnsupportedOperation { operation: "Add" })
}

fn exec_arithmetic(
    lhs: &Statement,
    rhs: &Statement,
    closure: &mut Closure,
    context: &mut dyn Context,
    operation: &'static str,
    apply: fn(i64, i64) -> i64,
) -> ExecResult {
    let left = lhs.execute(closure, context)?;
    let right = rhs.execute(closure, context)?;
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => Ok(ObjectHolder::own(Object::Number(apply(a, b)))),
        _ => Err(RuntimeError::UnsupportedOperation { operation }),
    }
}

fn exec_div(
    lhs: &Statement,
    rhs: &Statement,
    closure: &mut Closure,
    context: &mut dyn Context,
) -> ExecResult {
    let left = lhs.execute(closure, context)?;
    let right = rhs.execute(closure, context)?;
    match (left.as_number(), right.as_number()) {
        (Some(_), Some(0)) => Err(RuntimeError::DivisionByZero),
        (Some(a), Some(b)) => Ok(ObjectHolder::own(Object::Number(a / b))),
        _ => Err(RuntimeError::UnsupportedOperation { operation: "Div" }),
    }
}

/// Lexes, parses, and executes a complete program against a fresh top-level
/// scope, writing `print` output through `context`.
pub fn run(source: &str, context: &mut dyn Context) -> Result<()> {
    let lexer = Lexer::new(source)?;
    let program = parser::parse_program(lexer)?;
    let mut globals = Closure::new();
    program.execute(&mut globals, context)?;
    Ok(())
}
