//! Pagination coordinator
//!
//! Two mutually exclusive modes: `client` slices an in-memory working set,
//! `server` delegates each page to a caller-supplied fetcher.

pub mod client;
pub mod paginator;
pub mod server;
