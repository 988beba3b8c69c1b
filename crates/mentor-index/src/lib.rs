pub mod corpus;
pub mod engine;
pub mod error;
pub mod vector;

pub use corpus::*;
pub use engine::*;
pub use error::{IndexError, RetrievalError};
pub use vector::*;
