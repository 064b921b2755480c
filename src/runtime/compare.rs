use std::slice;

use crate::runtime::class::{EQ_METHOD, LT_METHOD};
use crate::runtime::context::Context;
use crate::runtime::error::RuntimeError;
use crate::runtime::object::ObjectHolder;

/// Signature shared by the comparison entry points below; `Comparison` AST
/// nodes store one of these.
pub type Comparator =
    fn(&ObjectHolder, &ObjectHolder, &mut dyn Context) -> Result<bool, RuntimeError>;

/// Equality dispatch: two empty holders are equal; then Bool, Number and
/// String compare by value; then a class instance with `__eq__/1` decides.
/// Anything else cannot be compared.
pub fn equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    if lhs.is_empty() && rhs.is_empty() {
        return Ok(true);
    }
    if let (Some(left), Some(right)) = (lhs.as_bool(), rhs.as_bool()) {
        return Ok(left == right);
    }
    if let (Some(left), Some(right)) = (lhs.as_number(), rhs.as_number()) {
        return Ok(left == right);
    }
    if let (Some(left), Some(right)) = (lhs.as_string(), rhs.as_string()) {
        return Ok(*left == *right);
    }
    if lhs.has_method(EQ_METHOD, 1) {
        let result = lhs.call_method(EQ_METHOD, slice::from_ref(rhs), context)?;
        return result.as_bool().ok_or(RuntimeError::NotComparable);
    }
    Err(RuntimeError::NotComparable)
}

/// Ordering dispatch, symmetric with `equal` but using `<` and `__lt__/1`.
pub fn less(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    if let (Some(left), Some(right)) = (lhs.as_bool(), rhs.as_bool()) {
        return Ok(left < right);
    }
    if let (Some(left), Some(right)) = (lhs.as_number(), rhs.as_number()) {
        return Ok(left < right);
    }
    if let (Some(left), Some(right)) = (lhs.as_string(), rhs.as_string()) {
        return Ok(*left < *right);
    }
    if lhs.has_method(LT_METHOD, 1) {
        let result = lhs.call_method(LT_METHOD, slice::from_ref(rhs), context)?;
        return result.as_bool().ok_or(RuntimeError::NotComparable);
    }
    Err(RuntimeError::NotComparable)
}

pub fn not_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    Ok(!equal(lhs, rhs, context)?)
}

pub fn greater(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    Ok(!(less(lhs, rhs, context)? || equal(lhs, rhs, context)?))
}

pub fn less_or_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    Ok(less(lhs, rhs, context)? || equal(lhs, rhs, context)?)
}

pub fn greater_or_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    Ok(!less(lhs, rhs, context)?)
}
