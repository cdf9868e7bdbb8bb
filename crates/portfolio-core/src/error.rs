use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Series length mismatch: portfolio has {left} returns, benchmark has {right}")]
    SeriesLengthMismatch { left: usize, right: usize },

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Invalid price data: {0}")]
    InvalidData(String),

    #[error("Invalid holdings: {0}")]
    InvalidHoldings(String),

    #[error("Simulation cancelled before completion")]
    Cancelled,
}
