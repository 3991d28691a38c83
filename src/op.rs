/// The operation that produced a term, as seen from outside the tape.
///
/// Subtraction, negation and division do not show up here: they are
/// recorded as the additions, multiplications and powers they expand to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Op {
    Leaf,
    Add,
    Mul,
    Pow(f64),
    Exp,
    Tanh,
}

impl Op {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Op::Leaf)
    }

    /// Operator text drawn in the diagram. Empty for leaves.
    pub fn symbol(&self) -> String {
        match self {
            Op::Leaf => String::new(),
            Op::Add => "+".to_string(),
            Op::Mul => "*".to_string(),
            Op::Pow(exponent) => format!("**{exponent}"),
            Op::Exp => "exp".to_string(),
            Op::Tanh => "tanh".to_string(),
        }
    }
}
