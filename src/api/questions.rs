use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::QuestionOption;
use crate::repositories;
use crate::schemas::question::{ExtractQuestionsRequest, QuestionCreate, QuestionResponse};
use crate::services::question_extraction::ExtractedQuestion;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_question))
        .route("/extract", post(extract_questions))
        .route("/:question_id", get(get_question))
}

async fn create_question(
    State(state): State<AppState>,
    Json(payload): Json<QuestionCreate>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if payload.qtype.is_objective() {
        let correct = payload.options.iter().filter(|option| option.is_correct).count();
        if correct != 1 {
            return Err(ApiError::BadRequest(
                "Objective questions must have exactly one correct option".to_string(),
            ));
        }
    } else if payload.correct_answer.as_deref().unwrap_or_default().is_empty() {
        return Err(ApiError::BadRequest(
            "Subjective questions must include a correct answer".to_string(),
        ));
    }

    let now = primitive_now_utc();
    let question_id = Uuid::new_v4().to_string();
    let options: Vec<QuestionOption> =
        payload.options.into_iter().map(QuestionOption::from).collect();

    let question = repositories::questions::create(
        state.db(),
        repositories::questions::CreateQuestion {
            id: &question_id,
            qtype: payload.qtype,
            prompt: &payload.prompt,
            options,
            correct_answer: payload.correct_answer.as_deref(),
            explanation: payload.explanation.as_deref(),
            difficulty: payload.difficulty,
            subject: &payload.subject,
            topic: &payload.topic,
            marks: payload.marks,
            created_by: &payload.created_by,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create question"))?;

    Ok((StatusCode::CREATED, Json(QuestionResponse::from(question))))
}

async fn get_question(
    Path(question_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let question = repositories::questions::find_by_id(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

    Ok(Json(QuestionResponse::from(question)))
}

async fn extract_questions(
    State(state): State<AppState>,
    Json(payload): Json<ExtractQuestionsRequest>,
) -> Result<(StatusCode, Json<Vec<QuestionResponse>>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let extracted = state
        .extractor()
        .extract(&payload.text, &payload.subject)
        .await
        .map_err(|e| ApiError::internal(e, "Question extraction failed"))?;

    let now = primitive_now_utc();
    let mut created = Vec::with_capacity(extracted.len());
    for question in extracted {
        if !is_usable(&question) {
            tracing::warn!(prompt = %question.prompt, "Skipping extracted question with unusable answer key");
            continue;
        }

        let question_id = Uuid::new_v4().to_string();
        let stored = repositories::questions::create(
            state.db(),
            repositories::questions::CreateQuestion {
                id: &question_id,
                qtype: question.qtype,
                prompt: &question.prompt,
                options: question.options,
                correct_answer: question.correct_answer.as_deref(),
                explanation: question.explanation.as_deref(),
                difficulty: question.difficulty,
                subject: &payload.subject,
                topic: question.topic.as_deref().unwrap_or("General"),
                marks: question.marks,
                created_by: &payload.created_by,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store extracted question"))?;

        created.push(QuestionResponse::from(stored));
    }

    if created.is_empty() {
        return Err(ApiError::Internal(
            "Question extraction produced no usable questions".to_string(),
        ));
    }

    tracing::info!(count = created.len(), subject = %payload.subject, "Stored extracted questions");

    Ok((StatusCode::CREATED, Json(created)))
}

fn is_usable(question: &ExtractedQuestion) -> bool {
    if question.prompt.is_empty() || question.marks <= 0.0 {
        return false;
    }

    if question.qtype.is_objective() {
        question.options.iter().filter(|option| option.is_correct).count() == 1
    } else {
        question.correct_answer.as_deref().is_some_and(|answer| !answer.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::is_usable;
    use crate::db::models::QuestionOption;
    use crate::db::types::{DifficultyLevel, QuestionType};
    use crate::services::question_extraction::ExtractedQuestion;

    fn extracted(qtype: QuestionType) -> ExtractedQuestion {
        ExtractedQuestion {
            prompt: "What is the capital of France?".to_string(),
            qtype,
            difficulty: DifficultyLevel::Easy,
            topic: Some("Capitals".to_string()),
            options: vec![
                QuestionOption { text: "Paris".to_string(), is_correct: true },
                QuestionOption { text: "London".to_string(), is_correct: false },
            ],
            correct_answer: Some("Paris".to_string()),
            explanation: None,
            marks: 5.0,
        }
    }

    #[test]
    fn objective_requires_exactly_one_correct_option() {
        assert!(is_usable(&extracted(QuestionType::Mcq)));

        let mut no_key = extracted(QuestionType::Mcq);
        no_key.options[0].is_correct = false;
        assert!(!is_usable(&no_key));

        let mut two_keys = extracted(QuestionType::Mcq);
        two_keys.options[1].is_correct = true;
        assert!(!is_usable(&two_keys));
    }

    #[test]
    fn subjective_requires_reference_answer() {
        assert!(is_usable(&extracted(QuestionType::ShortAnswer)));

        let mut missing = extracted(QuestionType::Descriptive);
        missing.correct_answer = None;
        assert!(!is_usable(&missing));
    }

    #[test]
    fn zero_marks_are_unusable() {
        let mut zero = extracted(QuestionType::Mcq);
        zero.marks = 0.0;
        assert!(!is_usable(&zero));
    }
}
