//! Drug information lookup against a local Ollama-compatible endpoint.
//!
//! This is a presentation-layer collaborator: it formats a clinical prompt,
//! sends it, and hands back whatever text comes out. Failures are
//! translated into user-facing advisory strings and never touch schedule
//! state.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are a helpful medical assistant for a nurse. \
Keep answers extremely brief, concise, and clinically relevant.";

/// HTTP client for free-text drug Q&A.
pub struct DrugInfoClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
}

/// Request body for the /api/generate endpoint
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

/// Response body from /api/generate
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl DrugInfoClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
        }
    }

    /// Ask a free-text clinical question. Always returns displayable text:
    /// errors come back as advisory messages, never as failures.
    pub fn ask_drug_info(&self, query: &str) -> String {
        match self.generate(query) {
            Ok(text) if text.trim().is_empty() => "No information available.".into(),
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Drug info lookup failed: {}", e);
                advisory_message(&e)
            }
        }
    }

    /// The canned prompt used for per-medication summaries.
    pub fn summary_prompt(medication_name: &str) -> String {
        format!(
            "Provide a concise clinical summary for {} including indications, \
common dosage, and key nursing warnings/adverse effects. Keep it under 100 words.",
            medication_name
        )
    }

    fn generate(&self, prompt: &str) -> reqwest::Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            system: SYSTEM_PROMPT,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()?
            .error_for_status()?;

        let parsed: GenerateResponse = response.json()?;
        Ok(parsed.response)
    }
}

/// Map a transport or HTTP failure to a user-facing advisory string.
fn advisory_message(err: &reqwest::Error) -> String {
    if let Some(status) = err.status() {
        match status.as_u16() {
            403 => "Permission denied (403). Check the configured AI endpoint and model access."
                .into(),
            429 => "Rate limit exceeded (429). Please try again in a minute.".into(),
            code => format!("Error retrieving information (HTTP {}).", code),
        }
    } else if err.is_timeout() || err.is_connect() {
        "AI service unavailable: cannot reach the configured endpoint. \
Is the local model server running?"
            .into()
    } else {
        "Error retrieving information. Please check your connection.".into()
    }
}
