//! Testing utilities for reportstore-storage
//!
//! Enabled by the `testing` feature:
//! - mockall doubles of [`Database`](crate::Database),
//!   [`CollectionHandle`](crate::CollectionHandle) and [`Cursor`](crate::Cursor)
//! - scripted cursors that replay a fixed list of records
//! - report document fixtures

pub mod fixtures;
pub mod mocks;

pub use fixtures::{attached_report, deleted_report, plain_report, report_with_metadata};
pub use mocks::{database_with, failing_cursor, mock_cursor, MockCollection, MockRecordCursor, MockStore};
