//! Implementation of shared memory arena for the terms, aka a tape.
//! See https://rufflewind.com/2016-12-30/reverse-mode-automatic-differentiation
//!
//! Every operation on a [`TapeTerm`] evaluates eagerly and appends a new node
//! to the tape. A node can only refer to nodes pushed before it, so the graph
//! is acyclic by construction.

use std::{
    cell::RefCell,
    fmt::{self, Debug, Display},
    ops::{Add, Div, Mul, Neg, Sub},
};

use crate::{error::GradError, op::Op};

#[derive(Default, Debug)]
pub struct Tape {
    pub(crate) nodes: RefCell<Vec<TapeNode>>,
}

#[derive(Clone, Debug)]
pub(crate) struct TapeNode {
    pub name: String,
    pub value: TapeValue,
    pub data: f64,
    pub grad: f64,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum TapeValue {
    Value(f64),
    Add(u32, u32),
    Mul(u32, u32),
    Pow(u32, f64),
    Exp(u32),
    Tanh(u32),
}

impl TapeValue {
    fn forward(&self, nodes: &[TapeNode]) -> f64 {
        use TapeValue::*;
        let data = |idx: u32| nodes[idx as usize].data;
        match *self {
            Value(val) => val,
            Add(lhs, rhs) => data(lhs) + data(rhs),
            Mul(lhs, rhs) => data(lhs) * data(rhs),
            Pow(term, exponent) => data(term).powf(exponent),
            Exp(term) => data(term).exp(),
            Tanh(term) => data(term).tanh(),
        }
    }

    pub(crate) fn operands(&self) -> [Option<u32>; 2] {
        use TapeValue::*;
        match *self {
            Value(_) => [None, None],
            Add(lhs, rhs) | Mul(lhs, rhs) => [Some(lhs), Some(rhs)],
            Pow(term, _) | Exp(term) | Tanh(term) => [Some(term), None],
        }
    }

    pub(crate) fn op(&self) -> Op {
        match *self {
            TapeValue::Value(_) => Op::Leaf,
            TapeValue::Add(..) => Op::Add,
            TapeValue::Mul(..) => Op::Mul,
            TapeValue::Pow(_, exponent) => Op::Pow(exponent),
            TapeValue::Exp(_) => Op::Exp,
            TapeValue::Tanh(_) => Op::Tanh,
        }
    }

    #[cfg(feature = "expr_name")]
    fn expr_name(&self, nodes: &[TapeNode]) -> String {
        use TapeValue::*;
        let name = |idx: u32| nodes[idx as usize].name.as_str();
        match *self {
            Value(val) => val.to_string(),
            Add(lhs, rhs) => format!("({} + {})", name(lhs), name(rhs)),
            Mul(lhs, rhs) => format!("{} * {}", name(lhs), name(rhs)),
            Pow(term, exponent) => format!("{}^{exponent}", name(term)),
            Exp(term) => format!("exp({})", name(term)),
            Tanh(term) => format!("tanh({})", name(term)),
        }
    }
}

/// A handle to a node on a [`Tape`]. Cheap to copy; identity is the position
/// on the tape, never the value.
#[derive(Copy, Clone)]
pub struct TapeTerm<'a> {
    pub(crate) tape: &'a Tape,
    pub(crate) idx: u32,
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an input leaf.
    pub fn term<'a>(&'a self, name: impl Into<String>, init: f64) -> TapeTerm<'a> {
        self.push(name.into(), TapeValue::Value(init))
    }

    /// Creates a leaf labelled with its own value.
    pub fn constant(&self, value: f64) -> TapeTerm<'_> {
        self.term(value.to_string(), value)
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    /// Clears the gradient of every node on the tape, reachable or not.
    pub fn zero_grad(&self) {
        for node in self.nodes.borrow_mut().iter_mut() {
            node.grad = 0.;
        }
    }

    fn push(&self, name: String, value: TapeValue) -> TapeTerm<'_> {
        let mut nodes = self.nodes.borrow_mut();
        let idx = nodes.len();
        let data = value.forward(&nodes);
        nodes.push(TapeNode {
            name,
            value,
            data,
            grad: 0.,
        });
        TapeTerm {
            tape: self,
            idx: idx as u32,
        }
    }

    fn term0(&self, value: TapeValue) -> TapeTerm<'_> {
        #[cfg(feature = "expr_name")]
        let name = value.expr_name(&self.nodes.borrow());
        #[cfg(not(feature = "expr_name"))]
        let name = format!("a{}", self.len());
        self.push(name, value)
    }
}

impl<'a> TapeTerm<'a> {
    fn with_node<T>(&self, f: impl FnOnce(&TapeNode) -> T) -> T {
        f(&self.tape.nodes.borrow()[self.idx as usize])
    }

    fn same_tape(&self, rhs: &Self) {
        assert!(
            std::ptr::eq(self.tape, rhs.tape),
            "Cannot combine terms from different tapes"
        );
    }

    fn binary(self, rhs: Self, value: fn(u32, u32) -> TapeValue) -> Self {
        self.same_tape(&rhs);
        self.tape.term0(value(self.idx, rhs.idx))
    }

    /// The value computed in the forward pass.
    pub fn data(&self) -> f64 {
        self.with_node(|node| node.data)
    }

    pub fn grad(&self) -> f64 {
        self.with_node(|node| node.grad)
    }

    /// Overwrites the gradient, e.g. to seed `backprop` with something other than 1.
    pub fn set_grad(&self, grad: f64) {
        self.tape.nodes.borrow_mut()[self.idx as usize].grad = grad;
    }

    pub fn name(&self) -> String {
        self.with_node(|node| node.name.clone())
    }

    /// Replaces the label. The label is only ever used for diagrams.
    pub fn named(self, name: impl Into<String>) -> Self {
        self.tape.nodes.borrow_mut()[self.idx as usize].name = name.into();
        self
    }

    pub fn op(&self) -> Op {
        self.with_node(|node| node.value.op())
    }

    pub fn operands(&self) -> [Option<TapeTerm<'a>>; 2] {
        let tape = self.tape;
        self.with_node(|node| node.value.operands())
            .map(|operand| operand.map(|idx| TapeTerm { tape, idx }))
    }

    /// Raises to a constant power. A non-positive base with a negative or
    /// fractional exponent yields `inf` or `NaN` like [`f64::powf`].
    pub fn pow(self, exponent: f64) -> Self {
        self.tape.term0(TapeValue::Pow(self.idx, exponent))
    }

    /// Like [`TapeTerm::pow`], but refuses exponents that are undefined for
    /// the current value instead of producing `inf` or `NaN`: a zero base with
    /// a negative exponent, or a non-positive base with a fractional one.
    /// A negative base with an integer exponent is fine.
    pub fn try_pow(self, exponent: f64) -> Result<Self, GradError> {
        let base = self.data();
        if (base == 0. && exponent < 0.) || (base <= 0. && exponent.fract() != 0.) {
            return Err(GradError::InvalidPower { base, exponent });
        }
        Ok(self.pow(exponent))
    }

    /// Division that fails on a zero divisor instead of producing `inf`.
    pub fn try_div(self, rhs: Self) -> Result<Self, GradError> {
        self.same_tape(&rhs);
        Ok(self * rhs.try_pow(-1.)?)
    }

    pub fn exp(self) -> Self {
        self.tape.term0(TapeValue::Exp(self.idx))
    }

    pub fn tanh(self) -> Self {
        self.tape.term0(TapeValue::Tanh(self.idx))
    }
}

impl<'a> Add for TapeTerm<'a> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        self.binary(rhs, TapeValue::Add)
    }
}

impl<'a> Mul for TapeTerm<'a> {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        self.binary(rhs, TapeValue::Mul)
    }
}

impl<'a> Neg for TapeTerm<'a> {
    type Output = Self;
    fn neg(self) -> Self::Output {
        self * self.tape.constant(-1.)
    }
}

impl<'a> Sub for TapeTerm<'a> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        self.same_tape(&rhs);
        self + -rhs
    }
}

impl<'a> Div for TapeTerm<'a> {
    type Output = Self;
    fn div(self, rhs: Self) -> Self::Output {
        self.same_tape(&rhs);
        self * rhs.pow(-1.)
    }
}

impl<'a> PartialEq for TapeTerm<'a> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tape, other.tape) && self.idx == other.idx
    }
}

impl<'a> Display for TapeTerm<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value(data={:.6})", self.data())
    }
}

impl<'a> Debug for TapeTerm<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_node(|node| {
            f.debug_struct("TapeTerm")
                .field("idx", &self.idx)
                .field("name", &node.name)
                .field("op", &node.value.op())
                .field("data", &node.data)
                .field("grad", &node.grad)
                .finish()
        })
    }
}
