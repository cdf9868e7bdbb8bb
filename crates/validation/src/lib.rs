pub mod comparison;
pub mod prediction;

pub use comparison::*;
pub use prediction::*;
