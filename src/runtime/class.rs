use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::Statement;
use crate::runtime::context::Context;
use crate::runtime::error::RuntimeError;
use crate::runtime::object::{Closure, ObjectHolder};

pub const INIT_METHOD: &str = "__init__";
pub const STR_METHOD: &str = "__str__";
pub const ADD_METHOD: &str = "__add__";
pub const EQ_METHOD: &str = "__eq__";
pub const LT_METHOD: &str = "__lt__";

/// Name the receiver is bound under inside a method frame.
const SELF_NAME: &str = "self";

/// A user-defined method: its name, formal parameter names (the receiver is
/// not part of them), and an owned body subtree.
#[derive(Debug)]
pub struct Method {
    pub name: String,
    pub formal_params: Vec<String>,
    pub body: Statement,
}

/// A user-defined class. Immutable after construction; method lookup goes
/// through a flattened table seeded from the parent's table, with the
/// class's own methods overriding on name collision.
pub struct Class {
    name: String,
    vtbl: HashMap<String, Rc<Method>>,
    parent: Option<Rc<Class>>,
}

impl Class {
    pub fn new(name: String, methods: Vec<Method>, parent: Option<Rc<Class>>) -> Self {
        let mut vtbl = parent
            .as_ref()
            .map(|parent| parent.vtbl.clone())
            .unwrap_or_default();
        for method in methods {
            vtbl.insert(method.name.clone(), Rc::new(method));
        }
        Self { name, vtbl, parent }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Rc<Class>> {
        self.parent.as_ref()
    }

    pub fn method(&self, name: &str) -> Option<&Rc<Method>> {
        self.vtbl.get(name)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A runtime object constructed from a class: mutable fields plus a
/// reference to the class, whose lifetime outlives every instance.
#[derive(Debug)]
pub struct ClassInstance {
    class: Rc<Class>,
    fields: Closure,
}

impl ClassInstance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: Closure::new(),
        }
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    pub fn fields(&self) -> &Closure {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Closure {
        &mut self.fields
    }

    /// True when the class provides `method` taking exactly `arity`
    /// arguments, the receiver not counted.
    pub fn has_method(&self, method: &str, arity: usize) -> bool {
        self.class
            .method(method)
            .is_some_and(|found| found.formal_params.len() == arity)
    }
}

impl ObjectHolder {
    /// True when the holder is a class instance whose class provides
    /// `method` with the given arity.
    pub fn has_method(&self, method: &str, arity: usize) -> bool {
        self.with_instance(|instance| instance.has_method(method, arity))
            .unwrap_or(false)
    }

    /// Calls `method` on the held class instance. The body executes against
    /// a fresh frame holding `self` and the formal parameters bound
    /// positionally to `actual_args`.
    pub fn call_method(
        &self,
        method: &str,
        actual_args: &[ObjectHolder],
        context: &mut dyn Context,
    ) -> Result<ObjectHolder, RuntimeError> {
        let resolved = self
            .with_instance(|instance| {
                instance
                    .class()
                    .method(method)
                    .filter(|found| found.formal_params.len() == actual_args.len())
                    .cloned()
            })
            .ok_or(RuntimeError::WrongType {
                expected: "a class instance",
            })?;
        let Some(method) = resolved else {
            return Err(RuntimeError::MethodNotFound {
                method: method.to_string(),
                arity: actual_args.len(),
            });
        };

        let mut frame = Closure::new();
        frame.insert(SELF_NAME.to_string(), self.clone());
        for (param, value) in method.formal_params.iter().zip(actual_args) {
            frame.insert(param.clone(), value.clone());
        }
        // The instance borrow was released above, so the body is free to
        // touch the receiver's fields.
        method.body.execute(&mut frame, context)
    }
}
