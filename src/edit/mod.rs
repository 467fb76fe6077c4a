//! Reading and rewriting located parameters

mod buffer;
pub mod mutator;
pub mod reader;

pub use buffer::{write_atomic, LineBuffer};
pub use mutator::Mutation;
