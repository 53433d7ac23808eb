use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::Settings;
use crate::services::ai_response::{message_content, strip_code_fences};

const EVALUATION_SYSTEM_PROMPT: &str = r#"You are an expert teacher grading a student's answer.
Compare the student answer against the reference answer and reply with a strict JSON object:
{
  "is_correct": true,
  "marks": 0.8,
  "similarity": 0.85,
  "feedback": "Short, constructive feedback for the student."
}

- "is_correct": boolean, true when the answer is mostly correct (similarity above 0.7).
- "marks": float between 0.0 and 1.0, the fraction of full credit earned.
- "similarity": float between 0.0 and 1.0, semantic similarity of the answers.
- "feedback": one or two sentences of constructive feedback.

Reply with JSON only, no markdown formatting."#;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AnswerEvaluation {
    pub(crate) is_correct: bool,
    pub(crate) marks: f64,
    pub(crate) similarity: f64,
    pub(crate) feedback: String,
}

#[async_trait]
pub(crate) trait AnswerGrader: Send + Sync {
    async fn evaluate(
        &self,
        student_answer: &str,
        correct_answer: &str,
    ) -> Result<AnswerEvaluation>;
}

#[derive(Debug, Clone)]
pub(crate) struct AiAnswerGrader {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    max_retries: u32,
}

impl AiAnswerGrader {
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
            max_retries: settings.ai().max_retries,
        })
    }

    async fn request_chat_completion(&self, payload: &Value) -> Result<Value> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            let response =
                self.client.post(&url).bearer_auth(&self.api_key).json(payload).send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.json::<Value>().await.unwrap_or(Value::Null);
                    if status.is_success() {
                        return Ok(body);
                    }
                    last_error = Some(anyhow::anyhow!("AI API error (status {status}): {body}"));
                }
                Err(err) => {
                    last_error = Some(anyhow::anyhow!(err).context("Failed to call AI API"));
                }
            }

            if attempt < self.max_retries {
                tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Unknown AI API error")))
    }
}

#[async_trait]
impl AnswerGrader for AiAnswerGrader {
    async fn evaluate(
        &self,
        student_answer: &str,
        correct_answer: &str,
    ) -> Result<AnswerEvaluation> {
        let user_prompt = format!(
            "STUDENT ANSWER:\n{student_answer}\n\nREFERENCE ANSWER:\n{correct_answer}"
        );

        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": EVALUATION_SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt}
            ],
            "max_completion_tokens": self.max_tokens,
            "temperature": self.temperature,
            "response_format": {"type": "json_object"}
        });

        let body = self.request_chat_completion(&payload).await?;
        let content = message_content(&body).context("Missing AI response content")?;

        parse_evaluation(content)
    }
}

pub(crate) fn parse_evaluation(content: &str) -> Result<AnswerEvaluation> {
    let value: Value = serde_json::from_str(strip_code_fences(content))
        .context("Failed to parse AI evaluation JSON")?;

    let is_correct = value
        .get("is_correct")
        .and_then(Value::as_bool)
        .context("AI evaluation missing boolean is_correct")?;
    let marks = value
        .get("marks")
        .and_then(Value::as_f64)
        .context("AI evaluation missing numeric marks")?;
    let similarity = value.get("similarity").and_then(Value::as_f64).unwrap_or(0.0);
    let feedback =
        value.get("feedback").and_then(Value::as_str).unwrap_or_default().to_string();

    Ok(AnswerEvaluation {
        is_correct,
        marks: marks.clamp(0.0, 1.0),
        similarity: similarity.clamp(0.0, 1.0),
        feedback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_evaluation_reads_all_fields() {
        let parsed = parse_evaluation(
            "{\"is_correct\":true,\"marks\":0.8,\"similarity\":0.85,\"feedback\":\"Good\"}",
        )
        .expect("evaluation");
        assert!(parsed.is_correct);
        assert_eq!(parsed.marks, 0.8);
        assert_eq!(parsed.similarity, 0.85);
        assert_eq!(parsed.feedback, "Good");
    }

    #[test]
    fn parse_evaluation_clamps_out_of_range_scores() {
        let parsed = parse_evaluation(
            "{\"is_correct\":false,\"marks\":1.4,\"similarity\":-0.2,\"feedback\":\"\"}",
        )
        .expect("evaluation");
        assert_eq!(parsed.marks, 1.0);
        assert_eq!(parsed.similarity, 0.0);
    }

    #[test]
    fn parse_evaluation_accepts_fenced_json() {
        let parsed = parse_evaluation(
            "```json\n{\"is_correct\":true,\"marks\":1.0,\"similarity\":1.0,\"feedback\":\"ok\"}\n```",
        )
        .expect("evaluation");
        assert!(parsed.is_correct);
    }

    #[test]
    fn parse_evaluation_rejects_malformed_payloads() {
        assert!(parse_evaluation("not json").is_err());
        assert!(parse_evaluation("{\"marks\":0.5}").is_err());
        assert!(parse_evaluation("{\"is_correct\":\"yes\",\"marks\":0.5}").is_err());
    }
}
