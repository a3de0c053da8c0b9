//! Flashcard generation against an OpenAI-style chat completion API.
//!
//! The hosting page extracts text from uploaded documents; this service only
//! turns that text into question/answer pairs.

use std::env;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

#[derive(Clone, Debug)]
pub struct CardGeneratorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl CardGeneratorConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("STUDY_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("STUDY_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("STUDY_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// One generated question/answer pair.
///
/// `options` is empty for free-recall cards; when present it always contains
/// the answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCard {
    pub question: String,
    pub answer: String,
    pub options: Vec<String>,
}

#[derive(Clone)]
pub struct CardGeneratorService {
    client: Client,
    config: Option<CardGeneratorConfig>,
}

impl CardGeneratorService {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(CardGeneratorConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<CardGeneratorConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Generate up to `count` flashcards from the given source text.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` when the service is disabled, the request
    /// fails, or the response cannot be parsed into cards.
    pub async fn generate_cards(
        &self,
        source_text: &str,
        count: usize,
    ) -> Result<Vec<GeneratedCard>, GenerationError> {
        let config = self.config.as_ref().ok_or(GenerationError::Disabled)?;

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(source_text, count),
            }],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerationError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyResponse)?;

        parse_generated(&content)
    }
}

fn build_prompt(source_text: &str, count: usize) -> String {
    format!(
        "You create study flashcards. From the material below, write up to {count} \
         question/answer pairs. Reply with ONLY a JSON array; each element is an object \
         with \"question\", \"answer\", and optionally \"options\" (3-4 short candidate \
         answers that include the correct one). Prefer plain question/answer pairs; use \
         options only where distractors are natural.\n\nMaterial:\n{source_text}"
    )
}

/// Parse the model's reply into validated cards.
///
/// Tolerates a fenced ```json block around the array, since models add one
/// regardless of instructions.
fn parse_generated(content: &str) -> Result<Vec<GeneratedCard>, GenerationError> {
    let json = strip_code_fence(content.trim());
    let raw: Vec<RawCard> =
        serde_json::from_str(json).map_err(|e| GenerationError::Parse(e.to_string()))?;

    if raw.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    let mut cards = Vec::with_capacity(raw.len());
    for (index, card) in raw.into_iter().enumerate() {
        let question = card.question.trim().to_owned();
        let answer = card.answer.trim().to_owned();
        if question.is_empty() || answer.is_empty() {
            return Err(GenerationError::Parse(format!(
                "card {index} has a blank question or answer"
            )));
        }

        let options: Vec<String> = card
            .options
            .into_iter()
            .map(|option| option.trim().to_owned())
            .filter(|option| !option.is_empty())
            .collect();
        if !options.is_empty() && !options.iter().any(|option| *option == answer) {
            return Err(GenerationError::Parse(format!(
                "card {index} options do not include the answer"
            )));
        }

        cards.push(GeneratedCard {
            question,
            answer,
            options,
        });
    }

    Ok(cards)
}

fn strip_code_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches('\n')
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCard {
    question: String,
    answer: String,
    #[serde(default)]
    options: Vec<String>,
}
