//! Export of the working set to CSV or JSON files

pub mod data_exporter;

pub use data_exporter::{
    DataExporter, DirectoryTarget, ExportFormat, ExportScope, ExportSummary, ExportTarget,
};
