//! Validation of AI-extracted contact information.
//!
//! The extraction client returns a structured guess; nothing it produces
//! is trusted until it passes these checks. Fields that fail validation
//! are dropped, not fixed up.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Maximum number of source URLs retained per extraction.
pub const MAX_SOURCE_URLS: usize = 5;

/// Name fragments that indicate a business name rather than a person.
const BUSINESS_INDICATORS: &[&str] = &[
    "llc", "inc", "corp", "company", "services", "contracting", "plumbing", "electric",
];

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email regex is valid")
    })
}

/// Structured contact information extracted from search results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedContact {
    /// Owner's full name (first and last).
    pub owner_name: Option<String>,
    /// Professional email address.
    pub email: Option<String>,
    /// LinkedIn profile URL for the owner or business.
    pub linkedin_url: Option<String>,
    /// Extraction confidence in `0.0..=1.0`.
    #[serde(default)]
    pub confidence: f64,
    /// URLs where the information was found.
    #[serde(default)]
    pub source_urls: Vec<String>,
}

impl ExtractedContact {
    /// Drop fields that fail validation and clamp the confidence score.
    ///
    /// - `owner_name` must be at least two words and must not contain a
    ///   business indicator (`LLC`, `Plumbing`, ...).
    /// - `email` must match a basic address shape; lowercased on accept.
    /// - `linkedin_url` must point at linkedin.com.
    /// - `source_urls` is truncated to [`MAX_SOURCE_URLS`].
    pub fn sanitized(mut self) -> Self {
        self.owner_name = self.owner_name.and_then(|n| validate_owner_name(&n));
        self.email = self.email.and_then(|e| validate_email(&e));
        self.linkedin_url = self.linkedin_url.and_then(|u| validate_linkedin_url(&u));
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self.source_urls.truncate(MAX_SOURCE_URLS);
        self
    }

    /// Returns `true` when the extraction produced at least one usable field.
    pub fn has_data(&self) -> bool {
        self.owner_name.is_some() || self.email.is_some() || self.linkedin_url.is_some()
    }
}

/// Accept an owner name only when it looks like a real person's name.
pub fn validate_owner_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.split_whitespace().count() < 2 {
        return None;
    }
    let lower = name.to_lowercase();
    if BUSINESS_INDICATORS.iter().any(|ind| lower.contains(ind)) {
        return None;
    }
    Some(name.to_string())
}

/// Accept an email only when it matches a basic address shape.
pub fn validate_email(email: &str) -> Option<String> {
    let email = email.trim();
    if email_regex().is_match(email) {
        Some(email.to_lowercase())
    } else {
        None
    }
}

/// Accept a LinkedIn URL only when it actually points at linkedin.com.
pub fn validate_linkedin_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.to_lowercase().contains("linkedin.com") {
        Some(url.to_string())
    } else {
        None
    }
}
