//! Reverse-mode automatic differentiation over scalar values.
//!
//! Terms live on a [`Tape`]; arithmetic on [`TapeTerm`]s evaluates eagerly and
//! records the operation, [`TapeTerm::backprop`] fills in the gradients and
//! [`TapeTerm::dot`] draws the graph for graphviz.
//!
//! ```
//! use scalargrad::Tape;
//!
//! let tape = Tape::new();
//! let a = tape.term("a", 2.);
//! let b = tape.term("b", -3.);
//! let c = (a * b + a).named("c");
//! c.backprop();
//! assert_eq!(a.grad(), -2.);
//! assert_eq!(b.grad(), 2.);
//! ```

mod backprop;
mod dot;
pub mod error;
mod op;
pub mod tape;

pub use dot::{DotBuilder, RankDir};
pub use error::GradError;
pub use op::Op;
pub use tape::{Tape, TapeTerm};
