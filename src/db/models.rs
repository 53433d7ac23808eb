use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{DifficultyLevel, QuestionType, ResultStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct QuestionOption {
    pub(crate) text: String,
    pub(crate) is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) qtype: QuestionType,
    pub(crate) prompt: String,
    pub(crate) options: Json<Vec<QuestionOption>>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) explanation: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) subject: String,
    pub(crate) topic: String,
    pub(crate) marks: f64,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TestResult {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) user_id: String,
    pub(crate) score: f64,
    pub(crate) total_marks: f64,
    pub(crate) percentage: f64,
    pub(crate) time_taken_seconds: i32,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) status: ResultStatus,
    pub(crate) weak_areas: Json<Vec<String>>,
    pub(crate) strengths: Json<Vec<String>>,
    pub(crate) recommendations: Json<Vec<String>>,
    pub(crate) overall_feedback: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ResultAnswer {
    pub(crate) id: String,
    pub(crate) result_id: String,
    pub(crate) question_id: String,
    pub(crate) order_index: i32,
    pub(crate) user_answer: String,
    pub(crate) is_correct: bool,
    pub(crate) marks_obtained: f64,
    pub(crate) question_marks: f64,
    pub(crate) feedback: Option<String>,
    pub(crate) time_spent_seconds: i32,
    pub(crate) created_at: PrimitiveDateTime,
}
