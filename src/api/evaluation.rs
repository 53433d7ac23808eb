use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::core::time::format_primitive;
use crate::db::models::{Question, ResultAnswer, TestResult};
use crate::repositories;
use crate::schemas::evaluation::{
    EvaluationSummaryResponse, GradedAnswerResponse, ResultResponse, SubmitTestRequest,
};
use crate::schemas::question::QuestionResponse;
use crate::services;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/submit", post(submit_test))
        .route("/results/user/:user_id", get(results_by_user))
        .route("/results/test/:test_id", get(results_by_test))
}

async fn submit_test(
    State(state): State<AppState>,
    Json(payload): Json<SubmitTestRequest>,
) -> Result<(StatusCode, Json<ResultResponse>), ApiError> {
    let result = match services::evaluation::submit_test(&state, payload).await {
        Ok(result) => result,
        Err(err) => {
            metrics::counter!("evaluation_submissions_total", "status" => "failed").increment(1);
            return Err(err.into());
        }
    };

    Ok((StatusCode::CREATED, Json(result)))
}

async fn results_by_user(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ResultResponse>>, ApiError> {
    let results = repositories::results::list_by_user(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch results"))?;

    Ok(Json(populate_results(&state, results).await?))
}

async fn results_by_test(
    Path(test_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ResultResponse>>, ApiError> {
    let results = repositories::results::list_by_test(state.db(), &test_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch results"))?;

    Ok(Json(populate_results(&state, results).await?))
}

async fn populate_results(
    state: &AppState,
    results: Vec<TestResult>,
) -> Result<Vec<ResultResponse>, ApiError> {
    let result_ids: Vec<String> = results.iter().map(|result| result.id.clone()).collect();
    let answers = repositories::results::list_answers_by_results(state.db(), &result_ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch result answers"))?;

    let question_ids: Vec<String> = answers
        .iter()
        .map(|answer| answer.question_id.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let questions = repositories::questions::find_by_ids(state.db(), &question_ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch questions for results"))?;
    let question_map: HashMap<String, Question> =
        questions.into_iter().map(|question| (question.id.clone(), question)).collect();

    let mut answers_by_result: HashMap<String, Vec<ResultAnswer>> = HashMap::new();
    for answer in answers {
        answers_by_result.entry(answer.result_id.clone()).or_default().push(answer);
    }

    let responses = results
        .into_iter()
        .map(|result| {
            let answers = answers_by_result
                .remove(&result.id)
                .unwrap_or_default()
                .into_iter()
                .map(|answer| to_graded_answer_response(answer, &question_map))
                .collect();
            to_result_response(result, answers)
        })
        .collect();

    Ok(responses)
}

fn to_graded_answer_response(
    answer: ResultAnswer,
    question_map: &HashMap<String, Question>,
) -> GradedAnswerResponse {
    GradedAnswerResponse {
        question: question_map.get(&answer.question_id).cloned().map(QuestionResponse::from),
        question_id: answer.question_id,
        user_answer: answer.user_answer,
        is_correct: answer.is_correct,
        marks_obtained: answer.marks_obtained,
        question_marks: answer.question_marks,
        feedback: answer.feedback,
        time_spent_seconds: answer.time_spent_seconds,
    }
}

fn to_result_response(result: TestResult, answers: Vec<GradedAnswerResponse>) -> ResultResponse {
    ResultResponse {
        id: result.id,
        test_id: result.test_id,
        user_id: result.user_id,
        answers,
        score: result.score,
        total_marks: result.total_marks,
        percentage: result.percentage,
        time_taken_seconds: result.time_taken_seconds,
        started_at: format_primitive(result.started_at),
        submitted_at: format_primitive(result.submitted_at),
        status: result.status,
        evaluation: EvaluationSummaryResponse {
            weak_areas: result.weak_areas.0,
            strengths: result.strengths.0,
            recommendations: result.recommendations.0,
            overall_feedback: result.overall_feedback,
        },
    }
}
