//! Boundary between a managed runtime and the native array primitives.
//!
//! The host hands over opaque [`HostValue`] handles. [`convert`] views them
//! as contiguous arrays, [`native`] keeps the name → function table the
//! host dispatches through, and [`json`] decodes handles from JSON for
//! tooling.

pub mod convert;
pub mod json;
pub mod native;
pub mod value;

pub use convert::{ArrayArg, as_array};
pub use json::from_json;
pub use native::{MODULE_NAME, ModuleDef, NativeFn, NativeFnDef, call, lookup, register_modules};
pub use value::HostValue;
