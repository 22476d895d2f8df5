//! Data layer for the table engine
//!
//! Rows are opaque snapshots read through column keys. This module holds
//! the column model, value coercion and the filter/sort working set.

pub mod column_model;
pub mod data_view;
pub mod row;
pub mod value;
pub mod value_compare;
