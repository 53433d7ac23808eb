use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use time::PrimitiveDateTime;

use crate::db::models::{Question, QuestionOption};
use crate::db::types::{DifficultyLevel, QuestionType};

const COLUMNS: &str = "\
    id, qtype, prompt, options, correct_answer, explanation, difficulty, subject, topic, \
    marks, created_by, created_at, updated_at";

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) qtype: QuestionType,
    pub(crate) prompt: &'a str,
    pub(crate) options: Vec<QuestionOption>,
    pub(crate) correct_answer: Option<&'a str>,
    pub(crate) explanation: Option<&'a str>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) subject: &'a str,
    pub(crate) topic: &'a str,
    pub(crate) marks: f64,
    pub(crate) created_by: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    params: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions ({COLUMNS})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.qtype)
    .bind(params.prompt)
    .bind(Json(params.options))
    .bind(params.correct_answer)
    .bind(params.explanation)
    .bind(params.difficulty)
    .bind(params.subject)
    .bind(params.topic)
    .bind(params.marks)
    .bind(params.created_by)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS}
         FROM questions
         WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_by_ids(
    pool: &PgPool,
    ids: &[String],
) -> Result<Vec<Question>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS}
         FROM questions
         WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await
}
