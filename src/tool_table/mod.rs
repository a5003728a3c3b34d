//! Tool table file access

mod store;

pub use store::{AddOutcome, ToolTableError, ToolTableStore};
