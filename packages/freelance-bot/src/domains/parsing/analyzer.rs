//! LLM extraction of job postings from batches of chat messages.

use std::sync::Arc;

use openai_client::strip_code_blocks;
use serde_json::Value;
use thiserror::Error;

use super::message::ChatMessage;
use crate::domains::requests::{NewFreelanceRequest, Urgency};
use crate::kernel::BaseAI;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("batch_size must be positive")]
    InvalidBatchSize,

    #[error("Invalid JSON in LLM response: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

pub const SYSTEM_PROMPT: &str =
    "You extract freelance job requests from Telegram messages. Respond with JSON only.";

const ANALYSIS_PROMPT: &str = r#"Analyze the following Telegram messages and extract ONLY genuine freelance job requests.
Ignore resumes, questions, spam, and non-job-related messages.

For each job request found, extract:
- title: Brief job title (max 200 chars)
- description: Job description
- budget: Budget if mentioned, otherwise "Не указан"
- skills: List of required skills
- contact: Contact information if provided
- urgency: "urgent" if urgent, otherwise "normal"
- source_message_id: The message_id shown above the message in the input

Return a JSON array of extracted requests. If no valid job requests found, return empty array [].

Messages to analyze:
{messages}

Return ONLY valid JSON array, no other text."#;

/// One job posting as the model reported it, before it is joined back to
/// the message it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedRequest {
    pub title: String,
    pub description: String,
    pub budget: Option<String>,
    pub skills: Vec<String>,
    pub contact: Option<String>,
    pub urgency: Urgency,
    /// The `[message_id: N]` label the model copied from the prompt. It is a
    /// 1-based position within the batch, not a Telegram message id.
    pub message_key: Option<i64>,
}

impl ExtractedRequest {
    fn from_object(object: &serde_json::Map<String, Value>) -> Self {
        Self {
            title: text_field(object.get("title")).unwrap_or_default(),
            description: text_field(object.get("description")).unwrap_or_default(),
            budget: text_field(object.get("budget")),
            skills: skills_field(object.get("skills")),
            contact: text_field(object.get("contact")),
            urgency: text_field(object.get("urgency"))
                .map(|u| Urgency::parse(&u))
                .unwrap_or_default(),
            message_key: id_field(object.get("source_message_id")),
        }
    }
}

fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn skills_field(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(|v| text_field(Some(v))).collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

fn id_field(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Split `items` into consecutive batches of at most `batch_size`.
pub fn split_into_batches<T: Clone>(
    items: &[T],
    batch_size: usize,
) -> Result<Vec<Vec<T>>, AnalyzerError> {
    if batch_size == 0 {
        return Err(AnalyzerError::InvalidBatchSize);
    }
    Ok(items.chunks(batch_size).map(<[T]>::to_vec).collect())
}

/// The extraction prompt with every message rendered as
/// `[message_id: N]` followed by its text, where N is the message's 1-based
/// position in the batch.
///
/// Telegram ids are only unique within one chat and a batch mixes chats, so
/// the label has to be batch-local for [`attach_metadata`] to find the right
/// message.
pub fn build_prompt(batch: &[ChatMessage]) -> String {
    let messages = batch
        .iter()
        .enumerate()
        .map(|(i, m)| format!("[message_id: {}]\n{}", i + 1, m.text))
        .collect::<Vec<_>>()
        .join("\n\n");
    ANALYSIS_PROMPT.replace("{messages}", &messages)
}

/// Parse the model's reply. Code fences are stripped. A valid JSON document
/// that is not an array yields no requests; elements that are not objects
/// are skipped.
pub fn parse_llm_response(response: &str) -> Result<Vec<ExtractedRequest>, AnalyzerError> {
    let value: Value = serde_json::from_str(strip_code_blocks(response))?;

    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };

    Ok(items
        .iter()
        .filter_map(Value::as_object)
        .map(ExtractedRequest::from_object)
        .collect())
}

/// Join extracted requests to the batch they were extracted from by their
/// `message_key` (see [`build_prompt`]).
///
/// Requests whose key points at no message in `batch`, or that have no
/// title, are dropped.
pub fn attach_metadata(
    extracted: Vec<ExtractedRequest>,
    batch: &[ChatMessage],
) -> Vec<NewFreelanceRequest> {
    extracted
        .into_iter()
        .filter_map(|request| {
            let Some(source) = request.message_key.and_then(|key| message_at(batch, key)) else {
                tracing::warn!(
                    message_key = ?request.message_key,
                    "Dropping extracted request without a matching message"
                );
                return None;
            };
            if request.title.is_empty() {
                tracing::warn!(
                    source_message_id = source.message_id,
                    "Dropping extracted request without a title"
                );
                return None;
            }

            Some(NewFreelanceRequest {
                category: source.category.clone(),
                title: request.title,
                description: request.description,
                budget: request.budget,
                skills: request.skills,
                contact: request.contact,
                urgency: request.urgency,
                source_chat: source.chat_id.clone(),
                source_message_id: source.message_id,
                message_date: source.message_date,
                source_text: source.text.clone(),
            })
        })
        .collect()
}

fn message_at(batch: &[ChatMessage], key: i64) -> Option<&ChatMessage> {
    let index = usize::try_from(key.checked_sub(1)?).ok()?;
    batch.get(index)
}

/// Sends message batches to the LLM and turns replies into storable requests.
pub struct Analyzer {
    ai: Arc<dyn BaseAI>,
    batch_size: usize,
}

impl Analyzer {
    pub fn new(ai: Arc<dyn BaseAI>, batch_size: usize) -> Self {
        Self { ai, batch_size }
    }

    /// Analyze one batch. LLM and parse failures are logged and yield no
    /// requests so the rest of the run can continue.
    pub async fn analyze_batch(&self, batch: &[ChatMessage]) -> Vec<NewFreelanceRequest> {
        if batch.is_empty() {
            return Vec::new();
        }

        let response = match self.ai.complete(SYSTEM_PROMPT, &build_prompt(batch)).await {
            Ok(response) if response.trim().is_empty() => {
                tracing::warn!("Empty response from LLM");
                return Vec::new();
            }
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, messages = batch.len(), "LLM request failed");
                return Vec::new();
            }
        };

        let extracted = match parse_llm_response(&response) {
            Ok(extracted) => extracted,
            Err(e) => {
                tracing::error!(error = %e, "Could not parse LLM response");
                return Vec::new();
            }
        };

        let requests = attach_metadata(extracted, batch);
        tracing::info!(
            messages = batch.len(),
            extracted = requests.len(),
            "Analyzed batch"
        );
        requests
    }

    pub async fn analyze_all(&self, messages: &[ChatMessage]) -> Vec<NewFreelanceRequest> {
        if messages.is_empty() {
            return Vec::new();
        }

        let batches = match split_into_batches(messages, self.batch_size) {
            Ok(batches) => batches,
            Err(e) => {
                tracing::error!(error = %e, "Cannot batch messages");
                return Vec::new();
            }
        };

        let total = batches.len();
        let mut all = Vec::new();
        for (i, batch) in batches.iter().enumerate() {
            tracing::debug!(batch = i + 1, total = total, "Processing batch");
            all.extend(self.analyze_batch(batch).await);
        }

        tracing::info!(
            messages = messages.len(),
            extracted = all.len(),
            "Analysis complete"
        );
        all
    }
}
