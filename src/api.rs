//! Generative-text API client.
//!
//! [`AskAsync`] is the seam the narrative step talks to; [`GeminiClient`]
//! implements it against the Gemini `generateContent` REST endpoint.
//! Requests are sent exactly once. A failed call surfaces as an error and the
//! caller decides what to show instead.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

use crate::utils::truncate_for_log;

/// Public Gemini API host.
pub const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Model used when none is configured.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

const GENERATE_TIMEOUT: Duration = Duration::from_secs(60);

/// Trait for async LLM interaction.
///
/// Implementors send a prompt to a text model and return its reply.
pub trait AskAsync {
    /// Send `text` to the model and return the generated reply.
    async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, if it has any.
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Gemini `generateContent` client.
#[derive(Debug)]
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: SecretString,
}

impl GeminiClient {
    pub fn new(endpoint: &str, model: &str, api_key: SecretString) -> Result<Self, Box<dyn Error>> {
        let client = reqwest::Client::builder()
            .timeout(GENERATE_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }
}

impl AskAsync for GeminiClient {
    #[instrument(level = "info", skip_all, fields(model = %self.model, prompt_bytes = text.len()))]
    async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        );
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text }],
            }],
        };

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(
                %status,
                elapsed_ms = t0.elapsed().as_millis(),
                body = %truncate_for_log(&body, 300),
                "Gemini call failed"
            );
            return Err(format!("Gemini returned status {status}").into());
        }

        let body: GenerateResponse = resp.json().await?;
        let reply = body.into_text().ok_or("Gemini returned no candidate text")?;
        info!(
            elapsed_ms = t0.elapsed().as_millis(),
            reply_bytes = reply.len(),
            "Gemini call succeeded"
        );
        Ok(reply)
    }
}
