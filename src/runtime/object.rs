use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use crate::runtime::class::{Class, ClassInstance, STR_METHOD};
use crate::runtime::context::Context;
use crate::runtime::error::RuntimeError;

/// A single call frame: variable name to object handle.
pub type Closure = HashMap<String, ObjectHolder>;

/// A live runtime value.
#[derive(Debug)]
pub enum Object {
    Number(i64),
    String(String),
    Bool(bool),
    Class(Rc<Class>),
    Instance(ClassInstance),
}

/// Shared handle over a runtime value. An empty holder represents `None`.
///
/// Cloning a holder shares the referent; this is how `self`, embedded
/// literals, and stored variables alias one heap object.
#[derive(Clone, Default)]
pub struct ObjectHolder(Option<Rc<RefCell<Object>>>);

impl ObjectHolder {
    /// Moves `object` onto the heap and takes ownership of it.
    pub fn own(object: Object) -> Self {
        Self(Some(Rc::new(RefCell::new(object))))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn as_number(&self) -> Option<i64> {
        match &*self.0.as_ref()?.borrow() {
            Object::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &*self.0.as_ref()?.borrow() {
            Object::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Borrows the held string without copying it out.
    pub fn as_string(&self) -> Option<Ref<'_, String>> {
        let cell = self.0.as_ref()?;
        Ref::filter_map(cell.borrow(), |object| match object {
            Object::String(value) => Some(value),
            _ => None,
        })
        .ok()
    }

    pub fn as_class(&self) -> Option<Rc<Class>> {
        match &*self.0.as_ref()?.borrow() {
            Object::Class(class) => Some(Rc::clone(class)),
            _ => None,
        }
    }

    pub fn is_instance(&self) -> bool {
        self.with_instance(|_| ()).is_some()
    }

    /// Swaps the held object in place; every holder sharing the referent
    /// sees the new value. The parser uses this to finalize a class object
    /// once its whole body is known, so methods can construct instances of
    /// the class they belong to.
    pub(crate) fn replace(&self, object: Object) {
        if let Some(cell) = &self.0 {
            *cell.borrow_mut() = object;
        }
    }

    /// Runs `f` against the held class instance; `None` when the holder is
    /// empty or holds something else. The borrow ends when `f` returns, so
    /// `f` must not re-enter the interpreter.
    pub fn with_instance<R>(&self, f: impl FnOnce(&ClassInstance) -> R) -> Option<R> {
        match &*self.0.as_ref()?.borrow() {
            Object::Instance(instance) => Some(f(instance)),
            _ => None,
        }
    }

    pub fn with_instance_mut<R>(&self, f: impl FnOnce(&mut ClassInstance) -> R) -> Option<R> {
        match &mut *self.0.as_ref()?.borrow_mut() {
            Object::Instance(instance) => Some(f(instance)),
            _ => None,
        }
    }

    /// Writes the value's printable form into `os`. An empty holder prints
    /// as `None`; a class instance renders through its zero-argument
    /// `__str__` when one exists, and as a stable identity token otherwise.
    pub fn print(&self, os: &mut dyn Write, context: &mut dyn Context) -> Result<(), RuntimeError> {
        let Some(cell) = self.0.as_ref() else {
            return write!(os, "None").map_err(RuntimeError::output);
        };
        if self.has_method(STR_METHOD, 0) {
            let rendered = self.call_method(STR_METHOD, &[], context)?;
            return rendered.print(os, context);
        }
        match &*cell.borrow() {
            Object::Number(value) => write!(os, "{value}"),
            Object::String(value) => write!(os, "{value}"),
            Object::Bool(true) => write!(os, "True"),
            Object::Bool(false) => write!(os, "False"),
            Object::Class(class) => write!(os, "Class {}", class.name()),
            Object::Instance(instance) => write!(
                os,
                "<{} object at {:p}>",
                instance.class().name(),
                Rc::as_ptr(cell)
            ),
        }
        .map_err(RuntimeError::output)
    }

    /// Renders the printable form into a fresh string.
    pub fn to_output(&self, context: &mut dyn Context) -> Result<String, RuntimeError> {
        let mut buffer = Vec::new();
        self.print(&mut buffer, context)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl fmt::Debug for ObjectHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            None => write!(f, "ObjectHolder(None)"),
            Some(cell) => write!(f, "ObjectHolder({:?})", cell.borrow()),
        }
    }
}

/// Truthiness coercion used by conditionals and the boolean operators:
/// `Bool` as-is, nonzero numbers, non-empty strings; everything else
/// (`None`, classes, instances) is false.
pub fn is_true(object: &ObjectHolder) -> bool {
    if let Some(value) = object.as_bool() {
        return value;
    }
    if let Some(value) = object.as_number() {
        return value != 0;
    }
    if let Some(value) = object.as_string() {
        return !value.is_empty();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::context::BufferedContext;

    fn number(value: i64) -> ObjectHolder {
        ObjectHolder::own(Object::Number(value))
    }

    fn string(value: &str) -> ObjectHolder {
        ObjectHolder::own(Object::String(value.to_string()))
    }

    #[test]
    fn empty_holder_is_none() {
        let holder = ObjectHolder::none();
        assert!(holder.is_empty());
        assert_eq!(holder.as_number(), None);
        assert!(!holder.is_instance());
    }

    #[test]
    fn downcasts_return_the_payload_only_for_the_matching_kind() {
        let holder = number(42);
        assert_eq!(holder.as_number(), Some(42));
        assert_eq!(holder.as_bool(), None);
        assert!(holder.as_string().is_none());

        let holder = string("hi");
        assert_eq!(holder.as_string().as_deref().map(String::as_str), Some("hi"));
        assert_eq!(holder.as_number(), None);
    }

    #[test]
    fn clones_share_the_referent() {
        let class = Rc::new(Class::new("Point".to_string(), Vec::new(), None));
        let holder = ObjectHolder::own(Object::Instance(ClassInstance::new(class)));
        let alias = holder.clone();
        alias.with_instance_mut(|instance| {
            instance.fields_mut().insert("x".to_string(), number(1));
        });
        let seen = holder
            .with_instance(|instance| instance.fields().get("x").and_then(|f| f.as_number()))
            .flatten();
        assert_eq!(seen, Some(1));
    }

    #[test]
    fn truthiness_follows_the_coercion_table() {
        assert!(!is_true(&ObjectHolder::none()));
        assert!(is_true(&ObjectHolder::own(Object::Bool(true))));
        assert!(!is_true(&ObjectHolder::own(Object::Bool(false))));
        assert!(is_true(&number(-3)));
        assert!(!is_true(&number(0)));
        assert!(is_true(&string("x")));
        assert!(!is_true(&string("")));

        let class = Rc::new(Class::new("Empty".to_string(), Vec::new(), None));
        assert!(!is_true(&ObjectHolder::own(Object::Class(Rc::clone(
            &class
        )))));
        assert!(!is_true(&ObjectHolder::own(Object::Instance(
            ClassInstance::new(class)
        ))));
    }

    #[test]
    fn prints_plain_values_and_none() {
        let mut context = BufferedContext::new();
        let mut os = Vec::new();
        number(7).print(&mut os, &mut context).expect("print");
        string(" and ").print(&mut os, &mut context).expect("print");
        ObjectHolder::own(Object::Bool(false))
            .print(&mut os, &mut context)
            .expect("print");
        ObjectHolder::none()
            .print(&mut os, &mut context)
            .expect("print");
        assert_eq!(String::from_utf8_lossy(&os), "7 and FalseNone");
    }

    #[test]
    fn prints_class_and_plain_instance() {
        let class = Rc::new(Class::new("Dog".to_string(), Vec::new(), None));
        let mut context = BufferedContext::new();

        let mut os = Vec::new();
        ObjectHolder::own(Object::Class(Rc::clone(&class)))
            .print(&mut os, &mut context)
            .expect("print");
        assert_eq!(String::from_utf8_lossy(&os), "Class Dog");

        let mut os = Vec::new();
        ObjectHolder::own(Object::Instance(ClassInstance::new(class)))
            .print(&mut os, &mut context)
            .expect("print");
        let rendered = String::from_utf8_lossy(&os);
        assert!(rendered.starts_with("<Dog object at 0x"), "got {rendered}");
    }
}
