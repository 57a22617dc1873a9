//! # costmerge-core
//!
//! Join engine and interactive state for merging a cost sheet into an order
//! sheet.
//!
//! This crate provides:
//! - the cost/order join with anchor-based column placement
//! - column-name heuristics (anchor, key and value suggestions)
//! - the merge session with delta-counted cell edits
//! - filtering, search and paging over merge results
//! - export file naming

/// Column-name heuristics.
pub mod detect;
/// Error types.
pub mod error;
/// Export file naming.
pub mod export;
/// The join engine.
pub mod join;
/// Interactive merge state.
pub mod session;
/// Read-side projection.
pub mod view;

/// Re-export heuristics.
pub use detect::{detect_anchor_column, suggest_key_column, suggest_value_column};
/// Re-export error types.
pub use error::{JoinError, SessionError};
/// Re-export export naming helpers.
pub use export::{default_export_name, export_file_name, with_extension};
/// Re-export the join engine.
pub use join::{merge, JoinResult, MergeColumns};
/// Re-export session types.
pub use session::{MergeRequest, MergeSession, MergeStats, Slot};
/// Re-export view types.
pub use view::{project, MatchFilter, Page, RowId, SearchField, ViewQuery, DEFAULT_PAGE_SIZE};
