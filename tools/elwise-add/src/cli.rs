use clap::{Args, Parser, ValueEnum};
use elwise_globals::GlobalOpts;

#[derive(Parser, Debug)]
#[command(
    name = "elwise-add",
    version = env!("CARGO_PKG_VERSION"),
    about = "Element-wise addition of two equal-shape numeric arrays."
)]
pub struct Cli {
    #[command(flatten)]
    pub g: GlobalOpts,

    #[command(flatten)]
    pub args: AddArgs,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Left operand: JSON file (plain nested array or {"dtype","shape","data"})
    #[arg(value_name = "LHS")]
    pub lhs: String,

    /// Right operand, same forms as LHS
    #[arg(value_name = "RHS")]
    pub rhs: String,

    /// Read LHS/RHS as JSON literals instead of file paths
    #[arg(long)]
    pub inline: bool,

    /// Integer overflow handling
    #[arg(long, value_enum, default_value = "wrap")]
    pub overflow: Overflow,

    /// Print a shape/dtype line above the values (pretty format only)
    #[arg(long)]
    pub summary: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum Overflow {
    Wrap,
    #[value(alias = "clamp")]
    Saturate,
    Checked,
}

impl Overflow {
    /// Name of the native function implementing this policy.
    pub fn function_name(self) -> &'static str {
        match self {
            Overflow::Wrap => "add",
            Overflow::Saturate => "add_saturating",
            Overflow::Checked => "add_checked",
        }
    }
}
