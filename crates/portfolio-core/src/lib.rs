pub mod cache;
pub mod error;
pub mod models;
pub mod traits;
pub mod types;

pub use cache::*;
pub use error::*;
pub use models::*;
pub use traits::*;
pub use types::*;
