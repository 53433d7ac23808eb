use serde::{Deserialize, Serialize};
use validator::Validate;

pub(crate) use crate::core::time::format_primitive;
use crate::db::models::{Question, QuestionOption};
use crate::db::types::{DifficultyLevel, QuestionType};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub(crate) struct QuestionOptionDto {
    #[validate(length(min = 1, message = "option text must not be empty"))]
    pub(crate) text: String,
    #[serde(default)]
    #[serde(alias = "isCorrect")]
    pub(crate) is_correct: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[serde(alias = "type")]
    pub(crate) qtype: QuestionType,
    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub(crate) prompt: String,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) options: Vec<QuestionOptionDto>,
    #[serde(default)]
    #[serde(alias = "correctAnswer")]
    pub(crate) correct_answer: Option<String>,
    #[serde(default)]
    pub(crate) explanation: Option<String>,
    #[serde(default = "default_difficulty")]
    pub(crate) difficulty: DifficultyLevel,
    #[validate(length(min = 1, message = "subject must not be empty"))]
    pub(crate) subject: String,
    #[validate(length(min = 1, message = "topic must not be empty"))]
    pub(crate) topic: String,
    #[serde(default = "default_marks")]
    #[validate(range(exclusive_min = 0.0, message = "marks must be positive"))]
    pub(crate) marks: f64,
    #[serde(alias = "createdBy")]
    #[validate(length(min = 1, message = "created_by must not be empty"))]
    pub(crate) created_by: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExtractQuestionsRequest {
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub(crate) text: String,
    #[serde(default = "default_subject")]
    pub(crate) subject: String,
    #[serde(alias = "createdBy")]
    #[validate(length(min = 1, message = "created_by must not be empty"))]
    pub(crate) created_by: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) qtype: QuestionType,
    pub(crate) prompt: String,
    pub(crate) options: Vec<QuestionOptionDto>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) explanation: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) subject: String,
    pub(crate) topic: String,
    pub(crate) marks: f64,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<Question> for QuestionResponse {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            qtype: question.qtype,
            prompt: question.prompt,
            options: question.options.0.into_iter().map(QuestionOptionDto::from).collect(),
            correct_answer: question.correct_answer,
            explanation: question.explanation,
            difficulty: question.difficulty,
            subject: question.subject,
            topic: question.topic,
            marks: question.marks,
            created_by: question.created_by,
            created_at: format_primitive(question.created_at),
            updated_at: format_primitive(question.updated_at),
        }
    }
}

impl From<QuestionOption> for QuestionOptionDto {
    fn from(option: QuestionOption) -> Self {
        Self { text: option.text, is_correct: option.is_correct }
    }
}

impl From<QuestionOptionDto> for QuestionOption {
    fn from(dto: QuestionOptionDto) -> Self {
        Self { text: dto.text, is_correct: dto.is_correct }
    }
}

fn default_difficulty() -> DifficultyLevel {
    DifficultyLevel::Medium
}

fn default_marks() -> f64 {
    1.0
}

fn default_subject() -> String {
    "General".to_string()
}
