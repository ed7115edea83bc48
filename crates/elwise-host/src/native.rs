use crate::convert::as_array;
use crate::value::HostValue;
use elwise_core_tensor::{OverflowPolicy, Result, TensorError, add_with};
use log::{debug, trace};
use once_cell::sync::{Lazy, OnceCell};
use std::collections::HashMap;
use std::fmt;

/// Signature shared by every function exported to the host.
/// Positional arguments in, one owned value (or a distinct error) out.
pub type NativeFn = fn(args: &[HostValue]) -> Result<HostValue>;

#[derive(Clone, Copy)]
pub struct NativeFnDef {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn,
    pub doc: &'static str,
}

impl fmt::Debug for NativeFnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFnDef")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("doc", &self.doc)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ModuleDef {
    pub name: &'static str,
    pub functions: &'static [NativeFnDef],
}

impl ModuleDef {
    pub fn function(&self, name: &str) -> Option<&'static NativeFnDef> {
        self.functions.iter().find(|def| def.name == name)
    }

    /// One `name(arity) - doc` line per exported function.
    pub fn describe(&self) -> String {
        self.functions
            .iter()
            .map(|def| format!("{}.{}({}) - {}", self.name, def.name, def.arity, def.doc))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub const MODULE_NAME: &str = "elwise";

pub static ELWISE_MODULE: ModuleDef = ModuleDef {
    name: MODULE_NAME,
    functions: &[
        NativeFnDef {
            name: "add",
            arity: 2,
            func: native_add,
            doc: "Element-wise sum of two equal-shape arrays; integers wrap.",
        },
        NativeFnDef {
            name: "add_saturating",
            arity: 2,
            func: native_add_saturating,
            doc: "Element-wise sum; integers clamp at the type bounds.",
        },
        NativeFnDef {
            name: "add_checked",
            arity: 2,
            func: native_add_checked,
            doc: "Element-wise sum; integer overflow is an error.",
        },
    ],
};

/// Module registry - initialized once at process start, never torn down
static MODULE_REGISTRY: Lazy<OnceCell<HashMap<&'static str, &'static ModuleDef>>> =
    Lazy::new(OnceCell::new);

pub fn register_modules() {
    MODULE_REGISTRY.get_or_init(|| {
        let mut registry = HashMap::with_capacity(1);
        registry.insert(ELWISE_MODULE.name, &ELWISE_MODULE);
        debug!("registered native module '{}':\n{}", ELWISE_MODULE.name, ELWISE_MODULE.describe());
        registry
    });
}

pub fn module(name: &str) -> Option<&'static ModuleDef> {
    MODULE_REGISTRY.get().and_then(|m| m.get(name)).copied()
}

pub fn lookup(module_name: &str, function: &str) -> Result<&'static NativeFnDef> {
    let m = module(module_name).ok_or_else(|| {
        TensorError::conversion(format!("no native module '{}' registered", module_name))
    })?;

    m.function(function).ok_or_else(|| {
        TensorError::conversion(format!(
            "module '{}' has no function '{}'",
            module_name, function
        ))
    })
}

/// Dispatches a call by external name. Argument count is checked against
/// the declared arity before the function sees anything.
pub fn call(module_name: &str, function: &str, args: &[HostValue]) -> Result<HostValue> {
    let def = lookup(module_name, function)?;

    if args.len() != def.arity {
        return Err(TensorError::conversion(format!(
            "{}.{}() takes {} positional arguments but {} were given",
            module_name,
            function,
            def.arity,
            args.len()
        )));
    }

    trace!("call {}.{} with {} args", module_name, function, args.len());
    (def.func)(args)
}

fn native_add(args: &[HostValue]) -> Result<HostValue> {
    elementwise_add(args, OverflowPolicy::Wrap)
}

fn native_add_saturating(args: &[HostValue]) -> Result<HostValue> {
    elementwise_add(args, OverflowPolicy::Saturate)
}

fn native_add_checked(args: &[HostValue]) -> Result<HostValue> {
    elementwise_add(args, OverflowPolicy::Checked)
}

// Both arguments are converted before either is inspected; coerced
// temporaries are released when `lhs`/`rhs` drop at the end of the call.
fn elementwise_add(args: &[HostValue], policy: OverflowPolicy) -> Result<HostValue> {
    let [a, b] = args else {
        return Err(TensorError::conversion(format!(
            "add() takes 2 positional arguments but {} were given",
            args.len()
        )));
    };

    let lhs = as_array(a)?;
    let rhs = as_array(b)?;

    let out = add_with(&lhs.view(), &rhs.view(), policy)?;
    Ok(HostValue::array(out))
}
