use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use time::PrimitiveDateTime;

use crate::db::models::{ResultAnswer, TestResult};
use crate::db::types::ResultStatus;

const RESULT_COLUMNS: &str = "\
    id, test_id, user_id, score, total_marks, percentage, time_taken_seconds, started_at, \
    submitted_at, status, weak_areas, strengths, recommendations, overall_feedback, created_at";

const ANSWER_COLUMNS: &str = "\
    id, result_id, question_id, order_index, user_answer, is_correct, marks_obtained, \
    question_marks, feedback, time_spent_seconds, created_at";

pub(crate) struct CreateResult<'a> {
    pub(crate) id: &'a str,
    pub(crate) test_id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) score: f64,
    pub(crate) total_marks: f64,
    pub(crate) percentage: f64,
    pub(crate) time_taken_seconds: i32,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) status: ResultStatus,
    pub(crate) weak_areas: Vec<String>,
    pub(crate) strengths: Vec<String>,
    pub(crate) recommendations: Vec<String>,
    pub(crate) overall_feedback: Option<&'a str>,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) struct CreateResultAnswer<'a> {
    pub(crate) id: &'a str,
    pub(crate) result_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) order_index: i32,
    pub(crate) user_answer: &'a str,
    pub(crate) is_correct: bool,
    pub(crate) marks_obtained: f64,
    pub(crate) question_marks: f64,
    pub(crate) feedback: Option<&'a str>,
    pub(crate) time_spent_seconds: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn insert_result(
    executor: impl PgExecutor<'_>,
    params: CreateResult<'_>,
) -> Result<TestResult, sqlx::Error> {
    sqlx::query_as::<_, TestResult>(&format!(
        "INSERT INTO results ({RESULT_COLUMNS})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
         RETURNING {RESULT_COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.test_id)
    .bind(params.user_id)
    .bind(params.score)
    .bind(params.total_marks)
    .bind(params.percentage)
    .bind(params.time_taken_seconds)
    .bind(params.started_at)
    .bind(params.submitted_at)
    .bind(params.status)
    .bind(Json(params.weak_areas))
    .bind(Json(params.strengths))
    .bind(Json(params.recommendations))
    .bind(params.overall_feedback)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn insert_answer(
    executor: impl PgExecutor<'_>,
    params: CreateResultAnswer<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "INSERT INTO result_answers ({ANSWER_COLUMNS})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
    ))
    .bind(params.id)
    .bind(params.result_id)
    .bind(params.question_id)
    .bind(params.order_index)
    .bind(params.user_answer)
    .bind(params.is_correct)
    .bind(params.marks_obtained)
    .bind(params.question_marks)
    .bind(params.feedback)
    .bind(params.time_spent_seconds)
    .bind(params.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn list_by_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<TestResult>, sqlx::Error> {
    sqlx::query_as::<_, TestResult>(&format!(
        "SELECT {RESULT_COLUMNS}
         FROM results
         WHERE user_id = $1
         ORDER BY submitted_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_by_test(
    pool: &PgPool,
    test_id: &str,
) -> Result<Vec<TestResult>, sqlx::Error> {
    sqlx::query_as::<_, TestResult>(&format!(
        "SELECT {RESULT_COLUMNS}
         FROM results
         WHERE test_id = $1
         ORDER BY submitted_at DESC"
    ))
    .bind(test_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_answers_by_results(
    pool: &PgPool,
    result_ids: &[String],
) -> Result<Vec<ResultAnswer>, sqlx::Error> {
    if result_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, ResultAnswer>(&format!(
        "SELECT {ANSWER_COLUMNS}
         FROM result_answers
         WHERE result_id = ANY($1)
         ORDER BY result_id, order_index"
    ))
    .bind(result_ids)
    .fetch_all(pool)
    .await
}
