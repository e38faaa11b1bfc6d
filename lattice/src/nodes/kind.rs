use crate::interpolation::{Curve, Surface};

/// Every kind of evaluation node
///
/// The set is closed: the parser only ever builds these, and evaluation
/// matches on them exhaustively.
#[derive(Debug)]
pub enum NodeKind {
    // leaves
    Constant(f64),
    E,
    Pi,
    Random,
    Variable(String),

    // structure
    Wrapper,
    Piecewise,
    DomainTransformation {
        symbol: String,
        parameters: Vec<String>,
    },
    NumericFunction1D {
        variable: String,
        curve: Box<dyn Curve>,
    },
    NumericFunction2D {
        variables: (String, String),
        surface: Box<dyn Surface>,
    },

    // arithmetic
    Plus,
    Minus,
    Times,
    Divide,
    Power,
    Mod,

    // comparison
    Less,
    LessEqual,
    Equal,
    GreaterEqual,
    Greater,
    EpsilonEquals,

    // logic
    And,
    Or,
    Not,

    // reductions
    Sum,
    CumSum,
    Max,
    Min,

    // elementary functions
    Abs,
    Floor,
    Ceil,
    Round,
    Sqrt,
    Ln,
    Log10,
    Log2,
    Exp,
    ToDegrees,
    ToRadians,
    Sin,
    Cos,
    Tan,
    SinDegrees,
    CosDegrees,
    TanDegrees,
    Asin,
    Acos,
    Atan,
    AsinDegrees,
    AcosDegrees,
    AtanDegrees,
    Sinh,
    Cosh,
    Tanh,
    Sec,
    Csc,
    Cot,
}

const BUILTIN_NAMES: &[&str] = &[
    "e",
    "pi",
    "rand",
    "random",
    "mod",
    "sum",
    "cumsum",
    "abs",
    "floor",
    "ceil",
    "ceiling",
    "round",
    "max",
    "min",
    "epsilonequals",
    "not",
    "sqrt",
    "ln",
    "log10",
    "log2",
    "exp",
    "todegrees",
    "rad2deg",
    "toradians",
    "deg2rad",
    "sin",
    "cos",
    "tan",
    "sind",
    "cosd",
    "tand",
    "asin",
    "acos",
    "atan",
    "asind",
    "acosd",
    "atand",
    "sinh",
    "cosh",
    "tanh",
    "sec",
    "csc",
    "cot",
];

/// Built-in function and constant names are matched case-insensitively.
pub fn is_builtin_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    BUILTIN_NAMES.contains(&lower.as_str())
}

impl NodeKind {
    /// Node kind for a built-in function or constant name
    pub fn builtin(name: &str) -> Option<NodeKind> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "e" => NodeKind::E,
            "pi" => NodeKind::Pi,
            "rand" | "random" => NodeKind::Random,
            "mod" => NodeKind::Mod,
            "sum" => NodeKind::Sum,
            "cumsum" => NodeKind::CumSum,
            "abs" => NodeKind::Abs,
            "floor" => NodeKind::Floor,
            "ceil" | "ceiling" => NodeKind::Ceil,
            "round" => NodeKind::Round,
            "max" => NodeKind::Max,
            "min" => NodeKind::Min,
            "epsilonequals" => NodeKind::EpsilonEquals,
            "not" => NodeKind::Not,
            "sqrt" => NodeKind::Sqrt,
            "ln" => NodeKind::Ln,
            "log10" => NodeKind::Log10,
            "log2" => NodeKind::Log2,
            "exp" => NodeKind::Exp,
            "todegrees" | "rad2deg" => NodeKind::ToDegrees,
            "toradians" | "deg2rad" => NodeKind::ToRadians,
            "sin" => NodeKind::Sin,
            "cos" => NodeKind::Cos,
            "tan" => NodeKind::Tan,
            "sind" => NodeKind::SinDegrees,
            "cosd" => NodeKind::CosDegrees,
            "tand" => NodeKind::TanDegrees,
            "asin" => NodeKind::Asin,
            "acos" => NodeKind::Acos,
            "atan" => NodeKind::Atan,
            "asind" => NodeKind::AsinDegrees,
            "acosd" => NodeKind::AcosDegrees,
            "atand" => NodeKind::AtanDegrees,
            "sinh" => NodeKind::Sinh,
            "cosh" => NodeKind::Cosh,
            "tanh" => NodeKind::Tanh,
            "sec" => NodeKind::Sec,
            "csc" => NodeKind::Csc,
            "cot" => NodeKind::Cot,
            _ => return None,
        };
        Some(kind)
    }

    /// Node kind for an infix or prefix operator token
    pub fn operator(op: &str) -> Option<NodeKind> {
        let kind = match op {
            "+" => NodeKind::Plus,
            "-" => NodeKind::Minus,
            "*" => NodeKind::Times,
            "/" => NodeKind::Divide,
            "^" => NodeKind::Power,
            "%" => NodeKind::Mod,
            "<" => NodeKind::Less,
            "<=" => NodeKind::LessEqual,
            "==" => NodeKind::Equal,
            ">=" => NodeKind::GreaterEqual,
            ">" => NodeKind::Greater,
            "&" => NodeKind::And,
            "|" => NodeKind::Or,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether this kind, on its own, can be evaluated block by block.
    /// Whole-domain reductions cannot; `min`/`max` only when they reduce a
    /// single argument.
    pub fn is_splittable(&self, child_count: usize) -> bool {
        match self {
            NodeKind::Sum | NodeKind::CumSum => false,
            NodeKind::Max | NodeKind::Min => child_count != 1,
            _ => true,
        }
    }

    /// Element-wise function of one argument, for the elementary kinds
    pub fn unary_function(&self) -> Option<fn(f64) -> f64> {
        let f: fn(f64) -> f64 = match self {
            NodeKind::Abs => f64::abs,
            NodeKind::Floor => f64::floor,
            NodeKind::Ceil => f64::ceil,
            NodeKind::Round => f64::round_ties_even,
            NodeKind::Sqrt => f64::sqrt,
            NodeKind::Ln => f64::ln,
            NodeKind::Log10 => f64::log10,
            NodeKind::Log2 => f64::log2,
            NodeKind::Exp => f64::exp,
            NodeKind::ToDegrees => f64::to_degrees,
            NodeKind::ToRadians => f64::to_radians,
            NodeKind::Sin => f64::sin,
            NodeKind::Cos => f64::cos,
            NodeKind::Tan => f64::tan,
            NodeKind::SinDegrees => |v: f64| v.to_radians().sin(),
            NodeKind::CosDegrees => |v: f64| v.to_radians().cos(),
            NodeKind::TanDegrees => |v: f64| v.to_radians().tan(),
            NodeKind::Asin => f64::asin,
            NodeKind::Acos => f64::acos,
            NodeKind::Atan => f64::atan,
            NodeKind::AsinDegrees => |v: f64| v.asin().to_degrees(),
            NodeKind::AcosDegrees => |v: f64| v.acos().to_degrees(),
            NodeKind::AtanDegrees => |v: f64| v.atan().to_degrees(),
            NodeKind::Sinh => f64::sinh,
            NodeKind::Cosh => f64::cosh,
            NodeKind::Tanh => f64::tanh,
            NodeKind::Sec => |v: f64| 1.0 / v.cos(),
            NodeKind::Csc => |v: f64| 1.0 / v.sin(),
            NodeKind::Cot => |v: f64| 1.0 / v.tan(),
            NodeKind::Not => |v: f64| if v == 0.0 { 1.0 } else { 0.0 },
            _ => return None,
        };
        Some(f)
    }

    /// Element-wise function of two arguments, for operator kinds
    pub fn binary_function(&self) -> Option<fn(f64, f64) -> f64> {
        let f: fn(f64, f64) -> f64 = match self {
            NodeKind::Plus => |a, b| a + b,
            NodeKind::Divide => |a, b| a / b,
            NodeKind::Power => f64::powf,
            NodeKind::Mod => |a, b| a % b,
            NodeKind::Less => |a, b| truth(a < b),
            NodeKind::LessEqual => |a, b| truth(a <= b),
            NodeKind::Equal => |a, b| truth(a == b),
            NodeKind::GreaterEqual => |a, b| truth(a >= b),
            NodeKind::Greater => |a, b| truth(a > b),
            NodeKind::EpsilonEquals => |a, b| truth((a - b).abs() <= EPSILON),
            NodeKind::And => |a, b| truth(a == 1.0 && b == 1.0),
            NodeKind::Or => |a, b| truth(a == 1.0 || b == 1.0),
            _ => return None,
        };
        Some(f)
    }

    /// Short name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Constant(_) => "constant",
            NodeKind::E => "e",
            NodeKind::Pi => "pi",
            NodeKind::Random => "random",
            NodeKind::Variable(_) => "variable",
            NodeKind::Wrapper => "wrapper",
            NodeKind::Piecewise => "piecewise",
            NodeKind::DomainTransformation { .. } => "domain transformation",
            NodeKind::NumericFunction1D { .. } => "numeric function 1D",
            NodeKind::NumericFunction2D { .. } => "numeric function 2D",
            NodeKind::Plus => "plus",
            NodeKind::Minus => "minus",
            NodeKind::Times => "times",
            NodeKind::Divide => "divide",
            NodeKind::Power => "power",
            NodeKind::Mod => "mod",
            NodeKind::Less => "less",
            NodeKind::LessEqual => "less or equal",
            NodeKind::Equal => "equal",
            NodeKind::GreaterEqual => "greater or equal",
            NodeKind::Greater => "greater",
            NodeKind::EpsilonEquals => "epsilonEquals",
            NodeKind::And => "and",
            NodeKind::Or => "or",
            NodeKind::Not => "not",
            NodeKind::Sum => "sum",
            NodeKind::CumSum => "cumsum",
            NodeKind::Max => "max",
            NodeKind::Min => "min",
            NodeKind::Abs => "abs",
            NodeKind::Floor => "floor",
            NodeKind::Ceil => "ceil",
            NodeKind::Round => "round",
            NodeKind::Sqrt => "sqrt",
            NodeKind::Ln => "ln",
            NodeKind::Log10 => "log10",
            NodeKind::Log2 => "log2",
            NodeKind::Exp => "exp",
            NodeKind::ToDegrees => "toDegrees",
            NodeKind::ToRadians => "toRadians",
            NodeKind::Sin => "sin",
            NodeKind::Cos => "cos",
            NodeKind::Tan => "tan",
            NodeKind::SinDegrees => "sind",
            NodeKind::CosDegrees => "cosd",
            NodeKind::TanDegrees => "tand",
            NodeKind::Asin => "asin",
            NodeKind::Acos => "acos",
            NodeKind::Atan => "atan",
            NodeKind::AsinDegrees => "asind",
            NodeKind::AcosDegrees => "acosd",
            NodeKind::AtanDegrees => "atand",
            NodeKind::Sinh => "sinh",
            NodeKind::Cosh => "cosh",
            NodeKind::Tanh => "tanh",
            NodeKind::Sec => "sec",
            NodeKind::Csc => "csc",
            NodeKind::Cot => "cot",
        }
    }
}

/// Tolerance of `epsilonEquals`
pub const EPSILON: f64 = 1e-15;

fn truth(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}
