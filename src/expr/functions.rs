use std::collections::HashMap;
use std::sync::OnceLock;

use statrs::function::erf;

/// The closed set of built-in functions an energy expression may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Func {
    Sqrt,
    Exp,
    Log,
    Sin,
    Cos,
    Sec,
    Csc,
    Tan,
    Cot,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Erf,
    Erfc,
    Min,
    Max,
    Abs,
    Step,
    Delta,
}

pub const ALL_FUNCTIONS: [Func; 22] = [
    Func::Sqrt,
    Func::Exp,
    Func::Log,
    Func::Sin,
    Func::Cos,
    Func::Sec,
    Func::Csc,
    Func::Tan,
    Func::Cot,
    Func::Asin,
    Func::Acos,
    Func::Atan,
    Func::Sinh,
    Func::Cosh,
    Func::Tanh,
    Func::Erf,
    Func::Erfc,
    Func::Min,
    Func::Max,
    Func::Abs,
    Func::Step,
    Func::Delta,
];

/// Names of the derived-geometry calls, which take particle labels instead of values.
pub const GEOMETRY_FUNCTIONS: [&str; 3] = ["distance", "angle", "dihedral"];

static FUNCTIONS_BY_NAME: OnceLock<HashMap<&'static str, Func>> = OnceLock::new();

fn create_function_table() -> HashMap<&'static str, Func> {
    ALL_FUNCTIONS.iter().map(|f| (f.name(), *f)).collect()
}

impl Func {
    /// Looks up a built-in function by the name used in expressions.
    pub fn lookup(name: &str) -> Option<Func> {
        FUNCTIONS_BY_NAME
            .get_or_init(create_function_table)
            .get(name)
            .copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Func::Sqrt => "sqrt",
            Func::Exp => "exp",
            Func::Log => "log",
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Sec => "sec",
            Func::Csc => "csc",
            Func::Tan => "tan",
            Func::Cot => "cot",
            Func::Asin => "asin",
            Func::Acos => "acos",
            Func::Atan => "atan",
            Func::Sinh => "sinh",
            Func::Cosh => "cosh",
            Func::Tanh => "tanh",
            Func::Erf => "erf",
            Func::Erfc => "erfc",
            Func::Min => "min",
            Func::Max => "max",
            Func::Abs => "abs",
            Func::Step => "step",
            Func::Delta => "delta",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Func::Min | Func::Max => 2,
            _ => 1,
        }
    }

    /// Evaluates the function. `args` must hold exactly `arity()` values.
    #[inline]
    pub fn evaluate(self, args: &[f64]) -> f64 {
        let x = args[0];
        match self {
            Func::Sqrt => x.sqrt(),
            Func::Exp => x.exp(),
            Func::Log => x.ln(),
            Func::Sin => x.sin(),
            Func::Cos => x.cos(),
            Func::Sec => 1.0 / x.cos(),
            Func::Csc => 1.0 / x.sin(),
            Func::Tan => x.tan(),
            Func::Cot => 1.0 / x.tan(),
            Func::Asin => x.asin(),
            Func::Acos => x.acos(),
            Func::Atan => x.atan(),
            Func::Sinh => x.sinh(),
            Func::Cosh => x.cosh(),
            Func::Tanh => x.tanh(),
            Func::Erf => erf::erf(x),
            Func::Erfc => erf::erfc(x),
            Func::Min => x.min(args[1]),
            Func::Max => x.max(args[1]),
            Func::Abs => x.abs(),
            // step(x) = 0 if x < 0, 1 otherwise
            Func::Step => {
                if x >= 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            // delta(x) = 1 if x is 0, 0 otherwise
            Func::Delta => {
                if x == 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}
