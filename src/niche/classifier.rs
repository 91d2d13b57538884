// src/niche/classifier.rs
use serde::Deserialize;

use crate::niche::openai::{ChatCompletion, ChatRequest, Message, DEFAULT_MODEL};
use crate::portal::models::NoticeRecord;
use crate::utils::error::NicheError;

pub const DEFAULT_CHUNK_SIZE: usize = 25;
const SYSTEM_PROMPT: &str = "Respond only with valid JSON.";
const TEMPERATURE: f32 = 0.2;

/// Object-wrapped answers some models produce instead of a bare array.
#[derive(Deserialize)]
struct WrappedItems {
    #[serde(alias = "itens")]
    items: Vec<NoticeRecord>,
}

/// What one batch contributed to the run.
#[derive(Debug)]
pub enum BatchOutcome {
    Accepted { batch: usize, records: Vec<NoticeRecord> },
    Skipped { batch: usize, reason: NicheError },
}

#[derive(Debug, Default)]
pub struct NicheReport {
    pub outcomes: Vec<BatchOutcome>,
}

impl NicheReport {
    pub fn batches_skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, BatchOutcome::Skipped { .. }))
            .count()
    }

    pub fn into_records(self) -> Vec<NoticeRecord> {
        self.outcomes
            .into_iter()
            .flat_map(|o| match o {
                BatchOutcome::Accepted { records, .. } => records,
                BatchOutcome::Skipped { .. } => Vec::new(),
            })
            .collect()
    }
}

/// Strips a surrounding Markdown code fence (```json ... ```), if any.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop the info string ("json") on the opening line.
    match inner.find('\n') {
        Some(idx) if !inner[..idx].trim_start().starts_with(['[', '{']) => inner[idx + 1..].trim(),
        _ => inner.trim(),
    }
}

/// Accepts a JSON array of records or an object with an `items`/`itens` array.
pub fn parse_classifier_response(content: &str) -> Result<Vec<NoticeRecord>, NicheError> {
    let body = strip_code_fence(content);
    if body.is_empty() {
        return Err(NicheError::Shape("empty content".into()));
    }
    // An array is only ever a list of records; report its own error.
    if body.starts_with('[') {
        return serde_json::from_str::<Vec<NoticeRecord>>(body)
            .map_err(|e| NicheError::Shape(e.to_string()));
    }
    serde_json::from_str::<WrappedItems>(body)
        .map(|w| w.items)
        .map_err(|e| NicheError::Shape(e.to_string()))
}

pub fn build_prompt(niche: &str, items: &[NoticeRecord]) -> String {
    let mut lines = vec![
        "You are a procurement analyst. Return ONLY a JSON array with the notices relevant to the target niche.".to_string(),
        "Each item must have: title, organization, modality, value (number or null), value_text (string or null), link.".to_string(),
        format!("Target niche: {}", niche),
        "Notices to evaluate:".to_string(),
    ];
    lines.extend(
        items
            .iter()
            .filter_map(|item| serde_json::to_string(item).ok()),
    );
    lines.join("\n")
}

/// Sends records to a chat model in fixed-size batches and keeps what it deems relevant.
pub struct NicheClassifier<C> {
    chat: C,
    model: String,
    chunk_size: usize,
    max_chunks: Option<usize>,
}

impl<C: ChatCompletion> NicheClassifier<C> {
    pub fn new(chat: C) -> Self {
        Self {
            chat,
            model: DEFAULT_MODEL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_chunks: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_max_chunks(mut self, max_chunks: Option<usize>) -> Self {
        self.max_chunks = max_chunks;
        self
    }

    /// Classifies every batch; a failing batch contributes nothing and the run goes on.
    pub async fn classify(&self, records: &[NoticeRecord], niche: &str) -> NicheReport {
        let mut report = NicheReport::default();
        let limit = self.max_chunks.unwrap_or(usize::MAX);

        for (batch, subset) in records.chunks(self.chunk_size).enumerate().take(limit) {
            let request = ChatRequest {
                model: self.model.clone(),
                messages: vec![Message::system(SYSTEM_PROMPT), Message::user(build_prompt(niche, subset))],
                temperature: Some(TEMPERATURE),
            };

            let parsed = match self.chat.complete(request).await {
                Ok(content) => parse_classifier_response(&content),
                Err(e) => Err(e),
            };

            let outcome = match parsed {
                Ok(records) => {
                    tracing::info!("Batch {}: {} of {} notices kept", batch, records.len(), subset.len());
                    BatchOutcome::Accepted { batch, records }
                }
                Err(reason) => {
                    tracing::warn!("Skipping batch {}: {}", batch, reason);
                    BatchOutcome::Skipped { batch, reason }
                }
            };
            report.outcomes.push(outcome);
        }

        report
    }
}
