//! # Repositories
//!
//! Repository layer encapsulating SeaORM operations with tenant-aware
//! access patterns.

pub mod connector;
pub mod report_history;

pub use connector::ConnectorRepository;
pub use report_history::ReportHistoryRepository;
