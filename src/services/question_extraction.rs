use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::task::JoinSet;

use crate::core::config::Settings;
use crate::db::models::QuestionOption;
use crate::db::types::{DifficultyLevel, QuestionType};
use crate::services::ai_response::{message_content, strip_code_fences};

const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are an expert teacher creating practice questions from study material.

Instructions:
1. Generate at least 5 unique questions from the provided text.
2. Vary the difficulty: include "easy", "medium" and "hard" questions.
3. Vary the type: include "mcq", "true-false" and "short-answer" questions.
4. Reply with a valid JSON array only, no markdown formatting.

Required JSON structure:
[
  {
    "prompt": "Question text here?",
    "qtype": "mcq",
    "difficulty": "medium",
    "topic": "Extracted topic",
    "options": [{"text": "Option A", "is_correct": true}, {"text": "Option B", "is_correct": false}],
    "correct_answer": "Option A",
    "marks": 5
  }
]

For "short-answer" and "descriptive" questions omit "options" and put the model answer in "correct_answer"."#;

// Keeps each request comfortably under the model's context limit.
const CHUNK_SIZE_CHARS: usize = 15_000;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ExtractedQuestion {
    #[serde(alias = "question")]
    pub(crate) prompt: String,
    #[serde(alias = "type")]
    pub(crate) qtype: QuestionType,
    #[serde(default = "default_difficulty")]
    pub(crate) difficulty: DifficultyLevel,
    #[serde(default)]
    pub(crate) topic: Option<String>,
    #[serde(default)]
    pub(crate) options: Vec<QuestionOption>,
    #[serde(default)]
    #[serde(alias = "correctAnswer")]
    pub(crate) correct_answer: Option<String>,
    #[serde(default)]
    pub(crate) explanation: Option<String>,
    #[serde(default = "default_marks")]
    pub(crate) marks: f64,
}

#[async_trait]
pub(crate) trait QuestionExtractor: Send + Sync {
    async fn extract(&self, text: &str, subject: &str) -> Result<Vec<ExtractedQuestion>>;
}

#[derive(Debug, Clone)]
pub(crate) struct AiQuestionExtractor {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl AiQuestionExtractor {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.ai().request_timeout);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.ai().api_key.clone(),
            base_url: settings.ai().base_url.trim_end_matches('/').to_string(),
            model: settings.ai().model.clone(),
            max_tokens: settings.ai().max_tokens,
            temperature: settings.ai().temperature,
        })
    }

    async fn extract_chunk(
        &self,
        chunk: String,
        subject: String,
        chunk_index: usize,
        total_chunks: usize,
    ) -> Result<Vec<ExtractedQuestion>> {
        let user_prompt = format!(
            "Subject: {subject}\nChunk {} of {total_chunks}.\n\nText to analyze:\n{chunk}",
            chunk_index + 1
        );

        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": EXTRACTION_SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt}
            ],
            "max_completion_tokens": self.max_tokens,
            "temperature": self.temperature
        });

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to call AI API")?;

        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        if !status.is_success() {
            anyhow::bail!("AI API error (status {status}): {body}");
        }

        let content = message_content(&body).context("Missing AI response content")?;
        parse_extracted_questions(content)
    }
}

#[async_trait]
impl QuestionExtractor for AiQuestionExtractor {
    async fn extract(&self, text: &str, subject: &str) -> Result<Vec<ExtractedQuestion>> {
        let chunks = chunk_text(text, CHUNK_SIZE_CHARS);
        let total_chunks = chunks.len();
        tracing::info!(total_chunks, "Extracting questions from text");

        let mut tasks = JoinSet::new();
        for (index, chunk) in chunks.into_iter().enumerate() {
            let extractor = self.clone();
            let subject = subject.to_string();
            tasks.spawn(async move {
                (index, extractor.extract_chunk(chunk, subject, index, total_chunks).await)
            });
        }

        let mut per_chunk: Vec<Vec<ExtractedQuestion>> = (0..total_chunks).map(|_| Vec::new()).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(questions))) => per_chunk[index] = questions,
                Ok((index, Err(err))) => {
                    tracing::warn!(chunk = index + 1, error = %err, "Question extraction failed for chunk; skipping");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Question extraction task failed; skipping chunk");
                }
            }
        }

        let questions: Vec<ExtractedQuestion> = per_chunk.into_iter().flatten().collect();
        if questions.is_empty() {
            anyhow::bail!("Question extraction produced no questions");
        }

        tracing::info!(count = questions.len(), "Question extraction completed");
        Ok(questions)
    }
}

pub(crate) fn parse_extracted_questions(content: &str) -> Result<Vec<ExtractedQuestion>> {
    serde_json::from_str(strip_code_fences(content))
        .context("Failed to parse extracted questions JSON")
}

pub(crate) fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(chunk_size).map(|chunk| chunk.iter().collect()).collect()
}

fn default_difficulty() -> DifficultyLevel {
    DifficultyLevel::Medium
}

fn default_marks() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_text_splits_on_char_boundaries() {
        let chunks = chunk_text("abcdef", 4);
        assert_eq!(chunks, vec!["abcd".to_string(), "ef".to_string()]);

        let cyrillic = chunk_text("абвгд", 2);
        assert_eq!(cyrillic, vec!["аб".to_string(), "вг".to_string(), "д".to_string()]);
    }

    #[test]
    fn chunk_text_single_chunk_for_short_input() {
        assert_eq!(chunk_text("short", 100), vec!["short".to_string()]);
    }

    #[test]
    fn parse_extracted_questions_applies_defaults() {
        let parsed = parse_extracted_questions(
            "[{\"prompt\":\"What is 2+2?\",\"qtype\":\"short-answer\",\"correct_answer\":\"4\"}]",
        )
        .expect("questions");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].marks, 1.0);
        assert_eq!(parsed[0].difficulty, DifficultyLevel::Medium);
        assert!(parsed[0].options.is_empty());
    }

    #[test]
    fn parse_extracted_questions_accepts_fenced_array() {
        let content = "```json\n[{\"prompt\":\"True or false?\",\"qtype\":\"true-false\",\"options\":[{\"text\":\"True\",\"is_correct\":true},{\"text\":\"False\",\"is_correct\":false}]}]\n```";
        let parsed = parse_extracted_questions(content).expect("questions");
        assert_eq!(parsed[0].qtype, QuestionType::TrueFalse);
        assert_eq!(parsed[0].options.len(), 2);
    }

    #[test]
    fn parse_extracted_questions_rejects_non_array() {
        assert!(parse_extracted_questions("{\"prompt\":\"x\"}").is_err());
        assert!(parse_extracted_questions("oops").is_err());
    }
}
