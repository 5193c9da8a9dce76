//! CLI commands implementation

pub mod check;
pub mod query;

pub use check::*;
pub use query::*;
