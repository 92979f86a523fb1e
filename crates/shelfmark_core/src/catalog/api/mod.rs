pub mod catalog;
pub mod types;

pub use types::*;
