//! Runtime object and value model shared by the AST executor.
pub mod class;
pub mod compare;
pub mod context;
pub mod error;
pub mod object;

pub use class::{Class, ClassInstance, Method};
pub use context::{BufferedContext, Context, SimpleContext};
pub use error::RuntimeError;
pub use object::{Closure, Object, ObjectHolder, is_true};
