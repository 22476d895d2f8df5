//! Cell rendering
//!
//! Pure mapping from (row, column key) to displayable content.

pub mod cell_renderer;
