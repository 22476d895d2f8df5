//! tablekit: a data-table engine.
//!
//! Column model, search, stable type-aware sorting, client or server
//! pagination with latest-wins request handling, row selection with bulk
//! actions, persisted column layout and CSV/JSON export.

pub mod config;
pub mod data;
pub mod debouncer;
pub mod export;
pub mod notify;
pub mod pagination;
pub mod render;
pub mod state;
pub mod storage;
pub mod table;
pub mod utils;

pub use data::column_model::{ColumnDescriptor, ColumnModel, ACTIONS_COLUMN};
pub use data::data_view::{compute_working_set, DataView};
pub use data::row::Row;
pub use data::value::{DataValue, ValueType};
pub use export::{ExportFormat, ExportScope, ExportSummary};
pub use pagination::paginator::{PageItem, PaginationState};
pub use pagination::server::{FetchOutcome, FnFetcher, PageFetcher, PageQuery, PageResponse};
pub use state::selection::{SelectAllState, SelectionPolicy};
pub use state::table_state::SortDirection;
pub use table::{DataSource, EnhancedTable, TableOptions};
