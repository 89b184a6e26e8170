//! External capability clients consumed by job unit tasks.
//!
//! The engine never calls these directly; they are injected into the
//! unit-source adapters in [`crate::jobs`], so tests can substitute
//! in-memory fakes.

pub mod extract;
pub mod search;

pub use extract::{ExtractionContext, LeadExtractor, OpenAiExtractor};
pub use search::{SearchClient, SearchHit, TavilySearch};
