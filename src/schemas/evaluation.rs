use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use validator::Validate;

use crate::db::types::ResultStatus;
use crate::schemas::question::QuestionResponse;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub(crate) struct AnswerSubmission {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[serde(default)]
    #[serde(alias = "userAnswer")]
    pub(crate) user_answer: String,
    #[serde(default)]
    #[serde(alias = "timeSpent")]
    #[validate(range(min = 0, message = "time_spent_seconds must be non-negative"))]
    pub(crate) time_spent_seconds: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmitTestRequest {
    #[serde(alias = "testId")]
    #[validate(length(min = 1, message = "test_id must not be empty"))]
    pub(crate) test_id: String,
    #[serde(alias = "userId")]
    #[validate(length(min = 1, message = "user_id must not be empty"))]
    pub(crate) user_id: String,
    #[validate(length(min = 1, message = "answers must not be empty"), nested)]
    pub(crate) answers: Vec<AnswerSubmission>,
    #[serde(alias = "timeTaken")]
    #[validate(range(min = 0, message = "time_taken_seconds must be non-negative"))]
    pub(crate) time_taken_seconds: i32,
    #[serde(default)]
    #[serde(alias = "startedAt", deserialize_with = "deserialize_option_offset_datetime")]
    pub(crate) started_at: Option<OffsetDateTime>,
}

fn deserialize_option_offset_datetime<'de, D>(
    deserializer: D,
) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        Some(value) => OffsetDateTime::parse(&value, &Rfc3339)
            .map(Some)
            .map_err(|err| D::Error::custom(format!("invalid started_at: {err}"))),
        None => Ok(None),
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct GradedAnswerResponse {
    pub(crate) question: Option<QuestionResponse>,
    pub(crate) question_id: String,
    pub(crate) user_answer: String,
    pub(crate) is_correct: bool,
    pub(crate) marks_obtained: f64,
    pub(crate) question_marks: f64,
    pub(crate) feedback: Option<String>,
    pub(crate) time_spent_seconds: i32,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct EvaluationSummaryResponse {
    pub(crate) weak_areas: Vec<String>,
    pub(crate) strengths: Vec<String>,
    pub(crate) recommendations: Vec<String>,
    pub(crate) overall_feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ResultResponse {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) user_id: String,
    pub(crate) answers: Vec<GradedAnswerResponse>,
    pub(crate) score: f64,
    pub(crate) total_marks: f64,
    pub(crate) percentage: f64,
    pub(crate) time_taken_seconds: i32,
    pub(crate) started_at: String,
    pub(crate) submitted_at: String,
    pub(crate) status: ResultStatus,
    pub(crate) evaluation: EvaluationSummaryResponse,
}
