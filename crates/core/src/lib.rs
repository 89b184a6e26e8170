//! Pure domain logic for the contractor lead platform.
//!
//! This crate has zero I/O dependencies (no DB, no HTTP, no async). It
//! provides:
//!
//! - [`error::CoreError`] — the closed domain error enum.
//! - [`normalize`] — business name / phone / address normalization.
//! - [`dedup`] — identity keys, the field merge policy, and completeness
//!   scoring used by the duplicate cleanup engine.
//! - [`contact`] — validation of AI-extracted contact information.
//! - [`catalog`] — the contractor category table and default search
//!   locations.

pub mod catalog;
pub mod contact;
pub mod dedup;
pub mod error;
pub mod normalize;

pub use error::CoreError;

/// All record ids are SQLite `INTEGER PRIMARY KEY` rowids.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
