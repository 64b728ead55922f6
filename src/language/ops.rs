use std::fmt;

/// The closed set of built-in operations. Names that resolve to none of
/// these become `Custom` calls and keep their identifier for lambda lookup
/// at evaluation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Neg,
    Abs,
    Exp,
    Sqrt,
    Add,
    Sub,
    Mult,
    Div,
    Remainder,
    Log,
    Pow,
    Max,
    Min,
    Exp2,
    Cbrt,
    Hypot,
    Read,
    Rand,
    Print,
    Equal,
    Less,
    Greater,
    Custom,
}

impl Operator {
    pub fn resolve(name: &str) -> Option<Operator> {
        match name {
            "neg" => Some(Operator::Neg),
            "abs" => Some(Operator::Abs),
            "exp" => Some(Operator::Exp),
            "sqrt" => Some(Operator::Sqrt),
            "add" => Some(Operator::Add),
            "sub" => Some(Operator::Sub),
            "mult" => Some(Operator::Mult),
            "div" => Some(Operator::Div),
            "remainder" => Some(Operator::Remainder),
            "log" => Some(Operator::Log),
            "pow" => Some(Operator::Pow),
            "max" => Some(Operator::Max),
            "min" => Some(Operator::Min),
            "exp2" => Some(Operator::Exp2),
            "cbrt" => Some(Operator::Cbrt),
            "hypot" => Some(Operator::Hypot),
            "read" => Some(Operator::Read),
            "rand" => Some(Operator::Rand),
            "print" => Some(Operator::Print),
            "equal" => Some(Operator::Equal),
            "less" => Some(Operator::Less),
            "greater" => Some(Operator::Greater),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operator::Neg => "neg",
            Operator::Abs => "abs",
            Operator::Exp => "exp",
            Operator::Sqrt => "sqrt",
            Operator::Add => "add",
            Operator::Sub => "sub",
            Operator::Mult => "mult",
            Operator::Div => "div",
            Operator::Remainder => "remainder",
            Operator::Log => "log",
            Operator::Pow => "pow",
            Operator::Max => "max",
            Operator::Min => "min",
            Operator::Exp2 => "exp2",
            Operator::Cbrt => "cbrt",
            Operator::Hypot => "hypot",
            Operator::Read => "read",
            Operator::Rand => "rand",
            Operator::Print => "print",
            Operator::Equal => "equal",
            Operator::Less => "less",
            Operator::Greater => "greater",
            Operator::Custom => "custom",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
