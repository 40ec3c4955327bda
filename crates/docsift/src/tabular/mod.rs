//! Tabular file parsing into ordered, format-agnostic row sets

mod parser;
mod rowset;

pub use parser::TabularParser;
pub use rowset::{RowSet, SheetSummary};
