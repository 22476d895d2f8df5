//! Table state components
//!
//! Search, sort and column layout live in `table_state`; selection is
//! kept separately because it is session-only and scoped to loaded rows.

pub mod selection;
pub mod table_state;
