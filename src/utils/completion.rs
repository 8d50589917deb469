#![forbid(unsafe_code)]

use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::utils::errors::Errors;
use crate::utils::prompt::{build_prompt, PERSONA};

// ***************************************************************************
//                                Constants
// ***************************************************************************
/// Model used for every request, there is no per-request override.
pub const COMPLETION_MODEL: &str = "gpt-4o";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

// ***************************************************************************
//                                  Traits
// ***************************************************************************
/// Source of new names.  Implementations report every failure as
/// `Errors::UpstreamFailure`.
#[async_trait]
pub trait NameGenerator: Send + Sync {
    async fn generate(&self, name: &str) -> Result<String, Errors>;
}

// ***************************************************************************
//                               Wire Structs
// ***************************************************************************
#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChatChoiceMessage {
    content: Option<String>,
}

// ***************************************************************************
//                              OpenAiClient
// ***************************************************************************
/// Chat-completion client built once at startup and shared by all requests.
/// The reqwest client pools its connections internally.
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, base_url: &str) -> Self {
        let endpoint = base_url.trim_end_matches('/').to_string() + CHAT_COMPLETIONS_PATH;
        Self {http: Client::new(), api_key, endpoint}
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    // ---------------------------------------------------------------------------
    // complete:
    // ---------------------------------------------------------------------------
    /** Send the persona and prompt turns and return the first choice's text,
     * trimmed.  Errors keep only their text.
     */
    async fn complete(&self, prompt: &str) -> Result<String, Errors> {
        let req = ChatRequest {
            model: COMPLETION_MODEL,
            messages: vec![
                ChatMessage {role: "system", content: PERSONA},
                ChatMessage {role: "user", content: prompt},
            ],
        };

        let resp = self.http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| Errors::UpstreamFailure(format!("OpenAI API request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Errors::UpstreamFailure(format!("OpenAI API error ({}): {}", status, body)));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| Errors::UpstreamFailure(format!("Failed to parse OpenAI response: {}", e)))?;

        let text = parsed.choices
            .into_iter()
            .next()
            .ok_or_else(|| Errors::UpstreamFailure("OpenAI response contained no choices".to_string()))?
            .message
            .content
            .ok_or_else(|| Errors::UpstreamFailure("OpenAI response choice has no content".to_string()))?;

        let text = text.trim();
        if text.is_empty() {
            return Err(Errors::UpstreamFailure("OpenAI response text is empty".to_string()));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl NameGenerator for OpenAiClient {
    async fn generate(&self, name: &str) -> Result<String, Errors> {
        let prompt = build_prompt(name);
        debug!("Sending prompt to {}:\n{}", self.endpoint(), prompt);

        match self.complete(&prompt).await {
            Ok(text) => {
                info!("Generated '{}' from '{}'.", text, name);
                Ok(text)
            },
            Err(e) => {
                error!("{}", e);
                Err(e)
            },
        }
    }
}
