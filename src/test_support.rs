use std::sync::{Arc, OnceLock};

use anyhow::Result;
use async_trait::async_trait;
use sqlx::types::Json;
use time::macros::datetime;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db::models::{Question, QuestionOption};
use crate::db::types::{DifficultyLevel, QuestionType};
use crate::schemas::evaluation::AnswerSubmission;
use crate::services::answer_grading::{AnswerEvaluation, AnswerGrader};
use crate::services::evaluation::GradedAnswer;

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn question(id: &str, qtype: QuestionType, marks: f64, topic: &str) -> Question {
    let now = datetime!(2025-01-01 00:00);
    Question {
        id: id.to_string(),
        qtype,
        prompt: format!("Prompt for {id}"),
        options: Json(Vec::new()),
        correct_answer: Some("Reference answer".to_string()),
        explanation: None,
        difficulty: DifficultyLevel::Medium,
        subject: "General".to_string(),
        topic: topic.to_string(),
        marks,
        created_by: "teacher-1".to_string(),
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn mcq_question(
    id: &str,
    marks: f64,
    topic: &str,
    options: &[(&str, bool)],
) -> Question {
    let mut built = question(id, QuestionType::Mcq, marks, topic);
    built.options = Json(
        options
            .iter()
            .map(|(text, is_correct)| QuestionOption {
                text: text.to_string(),
                is_correct: *is_correct,
            })
            .collect(),
    );
    built.correct_answer = None;
    built
}

pub(crate) fn submitted_answer(question_id: &str, user_answer: &str) -> AnswerSubmission {
    AnswerSubmission {
        question_id: question_id.to_string(),
        user_answer: user_answer.to_string(),
        time_spent_seconds: 30,
    }
}

pub(crate) fn graded_answer(
    question: Question,
    is_correct: bool,
    marks_obtained: f64,
) -> GradedAnswer {
    GradedAnswer {
        question,
        user_answer: "answer".to_string(),
        is_correct,
        marks_obtained,
        feedback: None,
        time_spent_seconds: 30,
    }
}

pub(crate) struct StaticGrader {
    evaluation: AnswerEvaluation,
}

impl StaticGrader {
    pub(crate) fn new(evaluation: AnswerEvaluation) -> Self {
        Self { evaluation }
    }
}

#[async_trait]
impl AnswerGrader for StaticGrader {
    async fn evaluate(
        &self,
        _student_answer: &str,
        _correct_answer: &str,
    ) -> Result<AnswerEvaluation> {
        Ok(self.evaluation.clone())
    }
}

pub(crate) struct FailingGrader;

#[async_trait]
impl AnswerGrader for FailingGrader {
    async fn evaluate(
        &self,
        _student_answer: &str,
        _correct_answer: &str,
    ) -> Result<AnswerEvaluation> {
        Err(anyhow::anyhow!("grader unavailable"))
    }
}
