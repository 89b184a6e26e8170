//! AI extraction capability.
//!
//! Given raw search text, returns a structured guess with a confidence
//! score. The production implementation calls an OpenAI-compatible
//! chat-completions endpoint and validates everything it returns:
//! nothing the model produces is stored unchecked.

use async_trait::async_trait;
use serde::Deserialize;

use prospector_core::contact::ExtractedContact;
use prospector_db::models::NewContractor;

/// Business context handed to the extractor alongside the raw text.
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    pub business_name: String,
    pub city: String,
    pub state: String,
    pub category: String,
}

/// Opaque AI-extraction capability.
#[async_trait]
pub trait LeadExtractor: Send + Sync {
    /// Extract owner/email/LinkedIn contact data for an existing record.
    async fn extract_contact(
        &self,
        context: &ExtractionContext,
        search_text: &str,
        source_urls: &[String],
    ) -> anyhow::Result<ExtractedContact>;

    /// Extract a full business record from one candidate page.
    ///
    /// Returns `None` when the page should be skipped (wrong location,
    /// national chain, not actually in the category).
    async fn extract_record(
        &self,
        category: &str,
        location: &str,
        page_url: &str,
        page_text: &str,
    ) -> anyhow::Result<Option<NewContractor>>;
}

// ---------------------------------------------------------------------------
// OpenAI implementation
// ---------------------------------------------------------------------------

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Context is truncated before prompting to bound request size.
const MAX_CONTEXT_CHARS: usize = 8_000;

const CONTACT_SYSTEM_PROMPT: &str = "You extract business contact information. \
    Be accurate and conservative - only extract data you're confident about. \
    Return only valid JSON.";

const RECORD_SYSTEM_PROMPT: &str = "You extract local business records from web pages. \
    Only extract businesses physically located in the requested area. \
    Return only valid JSON.";

/// Extractor backed by an OpenAI-compatible chat-completions API.
pub struct OpenAiExtractor {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Raw record shape returned by the record-extraction prompt.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    skip: bool,
    name: Option<String>,
    owner_name: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    phone: Option<String>,
    email: Option<String>,
}

impl OpenAiExtractor {
    pub fn new(api_key: String, model: String) -> Self {
        if api_key.is_empty() {
            tracing::warn!("OPENAI_API_KEY not set; extraction-backed jobs will fail per unit");
        }
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    /// One chat-completions round trip; returns the raw message text.
    async fn complete(&self, system: &str, prompt: String) -> anyhow::Result<String> {
        if self.api_key.is_empty() {
            anyhow::bail!("extraction unavailable: OPENAI_API_KEY not configured");
        }

        let response = self
            .http
            .post(OPENAI_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "temperature": 0.1,
                "messages": [
                    { "role": "system", "content": system },
                    { "role": "user", "content": prompt },
                ],
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        Ok(content)
    }
}

#[async_trait]
impl LeadExtractor for OpenAiExtractor {
    async fn extract_contact(
        &self,
        context: &ExtractionContext,
        search_text: &str,
        source_urls: &[String],
    ) -> anyhow::Result<ExtractedContact> {
        let prompt = contact_prompt(context, truncate(search_text, MAX_CONTEXT_CHARS));
        let content = self.complete(CONTACT_SYSTEM_PROMPT, prompt).await?;

        let mut contact: ExtractedContact = serde_json::from_str(json_slice(&content))?;
        contact.source_urls = source_urls.to_vec();
        Ok(contact.sanitized())
    }

    async fn extract_record(
        &self,
        category: &str,
        location: &str,
        page_url: &str,
        page_text: &str,
    ) -> anyhow::Result<Option<NewContractor>> {
        let prompt = record_prompt(category, location, page_url, truncate(page_text, MAX_CONTEXT_CHARS));
        let content = self.complete(RECORD_SYSTEM_PROMPT, prompt).await?;

        let raw: RawRecord = serde_json::from_str(json_slice(&content))?;
        if raw.skip {
            return Ok(None);
        }
        let Some(name) = raw.name.filter(|n| !n.trim().is_empty()) else {
            return Ok(None);
        };

        Ok(Some(NewContractor {
            name,
            owner_name: raw.owner_name,
            category: category.to_string(),
            address: raw.address,
            city: raw.city,
            state: raw.state,
            zip_code: raw.zip_code,
            phone: raw.phone,
            email: raw.email,
            website: Some(page_url.to_string()),
            linkedin_url: None,
            source: Some("scraper".to_string()),
            location_searched: Some(location.to_string()),
        }))
    }
}

// ---------------------------------------------------------------------------
// Prompts & parsing helpers
// ---------------------------------------------------------------------------

fn contact_prompt(context: &ExtractionContext, search_text: &str) -> String {
    format!(
        "You are a business intelligence analyst. Extract contact information \
         from these search results.\n\
         \n\
         Business: {name}\n\
         Location: {city}, {state}\n\
         Category: {category}\n\
         \n\
         Search Results:\n{search_text}\n\
         \n\
         Extract for THIS SPECIFIC BUSINESS only:\n\
         1. owner_name: the owner/founder/president's FULL NAME (first and last)\n\
         2. email: a professional email address (prefer personal over generic info@)\n\
         3. linkedin_url: LinkedIn profile URL for the owner or business\n\
         \n\
         Set confidence to a value 0-1 based on how certain you are. Use null \
         for fields you cannot find reliable information for.\n\
         \n\
         Return ONLY valid JSON:\n\
         {{\"owner_name\": \"First Last\" or null, \"email\": \"...\" or null, \
         \"linkedin_url\": \"...\" or null, \"confidence\": 0.0}}",
        name = context.business_name,
        city = context.city,
        state = context.state,
        category = context.category,
    )
}

fn record_prompt(category: &str, location: &str, page_url: &str, page_text: &str) -> String {
    format!(
        "Extract contact information for a {category} business from this web page.\n\
         \n\
         The business MUST be physically located in or near: {location}. \
         If it is in a different state or far from {location}, or is a national \
         chain with no local address, return {{\"skip\": true}}.\n\
         \n\
         Page URL: {page_url}\n\
         Page content:\n{page_text}\n\
         \n\
         Return ONLY a valid JSON object with fields: name, owner_name, address, \
         city, state, zip_code, phone, email. Use null for missing fields. \
         owner_name must be an actual person's name, never the business name."
    )
}

/// Cut the raw model output down to the outermost JSON object, tolerating
/// prose or code fences around it.
fn json_slice(content: &str) -> &str {
    let start = content.find('{');
    let end = content.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if end > start => &content[start..=end],
        _ => content,
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
