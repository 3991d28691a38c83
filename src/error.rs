use thiserror::Error;

/// Errors raised by the checked operations and the diagram writer.
#[derive(Error, Debug)]
pub enum GradError {
    #[error("{base} cannot be raised to the power of {exponent}: zero needs a non-negative exponent and a negative base needs an integer one")]
    InvalidPower { base: f64, exponent: f64 },

    #[error("failed to write dot output: {0}")]
    Io(#[from] std::io::Error),
}
