pub(crate) mod analysis;
pub(crate) mod grade;

use std::collections::HashMap;
use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc, to_primitive_utc};
use crate::db::models::{Question, TestResult};
use crate::db::types::ResultStatus;
use crate::repositories;
use crate::schemas::evaluation::{
    AnswerSubmission, EvaluationSummaryResponse, GradedAnswerResponse, ResultResponse,
    SubmitTestRequest,
};
use crate::schemas::question::QuestionResponse;

#[derive(Debug, Error)]
pub(crate) enum EvaluationError {
    #[error("invalid submission: {0}")]
    Validation(String),
    #[error("question {question_id} has an invalid answer key: {reason}")]
    DataIntegrity { question_id: String, reason: String },
    #[error("failed to load questions for grading")]
    QuestionLookup(#[source] sqlx::Error),
    #[error("grading failed: {0}")]
    Grading(String),
    #[error("failed to persist result")]
    Persistence(#[source] sqlx::Error),
}

#[derive(Debug, Clone)]
pub(crate) struct GradedAnswer {
    pub(crate) question: Question,
    pub(crate) user_answer: String,
    pub(crate) is_correct: bool,
    pub(crate) marks_obtained: f64,
    pub(crate) feedback: Option<String>,
    pub(crate) time_spent_seconds: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Totals {
    pub(crate) score: f64,
    pub(crate) total_marks: f64,
    pub(crate) percentage: f64,
}

pub(crate) async fn submit_test(
    state: &AppState,
    request: SubmitTestRequest,
) -> Result<ResultResponse, EvaluationError> {
    request.validate().map_err(|e| EvaluationError::Validation(e.to_string()))?;

    let timer = Instant::now();
    let question_ids: Vec<String> =
        request.answers.iter().map(|answer| answer.question_id.clone()).collect();
    let questions = repositories::questions::find_by_ids(state.db(), &question_ids)
        .await
        .map_err(EvaluationError::QuestionLookup)?;

    let resolved = resolve_answers(request.answers, questions);
    let graded = grade::grade_answers(state.grader().clone(), resolved).await?;
    let totals = aggregate(&graded);
    let summary = analysis::analyze(&graded);

    let submitted_at = primitive_now_utc();
    let started_at = request
        .started_at
        .map(to_primitive_utc)
        .unwrap_or_else(|| submitted_at - time::Duration::seconds(request.time_taken_seconds as i64));

    let result_id = Uuid::new_v4().to_string();
    let mut tx = state.db().begin().await.map_err(EvaluationError::Persistence)?;

    let record = repositories::results::insert_result(
        &mut *tx,
        repositories::results::CreateResult {
            id: &result_id,
            test_id: &request.test_id,
            user_id: &request.user_id,
            score: totals.score,
            total_marks: totals.total_marks,
            percentage: totals.percentage,
            time_taken_seconds: request.time_taken_seconds,
            started_at,
            submitted_at,
            status: ResultStatus::Completed,
            weak_areas: summary.weak_areas.clone(),
            strengths: summary.strengths.clone(),
            recommendations: summary.recommendations.clone(),
            overall_feedback: None,
            created_at: submitted_at,
        },
    )
    .await
    .map_err(EvaluationError::Persistence)?;

    for (index, answer) in graded.iter().enumerate() {
        let answer_id = Uuid::new_v4().to_string();
        repositories::results::insert_answer(
            &mut *tx,
            repositories::results::CreateResultAnswer {
                id: &answer_id,
                result_id: &record.id,
                question_id: &answer.question.id,
                order_index: index as i32,
                user_answer: &answer.user_answer,
                is_correct: answer.is_correct,
                marks_obtained: answer.marks_obtained,
                question_marks: answer.question.marks,
                feedback: answer.feedback.as_deref(),
                time_spent_seconds: answer.time_spent_seconds,
                created_at: submitted_at,
            },
        )
        .await
        .map_err(EvaluationError::Persistence)?;
    }

    tx.commit().await.map_err(EvaluationError::Persistence)?;

    metrics::counter!("evaluation_submissions_total", "status" => "completed").increment(1);
    metrics::histogram!("evaluation_duration_seconds").record(timer.elapsed().as_secs_f64());

    tracing::info!(
        result_id = %record.id,
        test_id = %record.test_id,
        user_id = %record.user_id,
        graded = graded.len(),
        score = totals.score,
        total_marks = totals.total_marks,
        "Test submission evaluated"
    );

    Ok(build_response(record, graded, summary))
}

pub(crate) fn resolve_answers(
    answers: Vec<AnswerSubmission>,
    questions: Vec<Question>,
) -> Vec<(AnswerSubmission, Question)> {
    let lookup: HashMap<String, Question> =
        questions.into_iter().map(|question| (question.id.clone(), question)).collect();

    let mut pairs = Vec::with_capacity(answers.len());
    for answer in answers {
        match lookup.get(&answer.question_id) {
            Some(question) => pairs.push((answer, question.clone())),
            None => {
                tracing::warn!(
                    question_id = %answer.question_id,
                    "Dropping answer for unknown question"
                );
            }
        }
    }

    pairs
}

pub(crate) fn aggregate(graded: &[GradedAnswer]) -> Totals {
    let score: f64 = graded.iter().map(|answer| answer.marks_obtained).sum();
    // Sum the questions' marks here, not the marks obtained.
    let total_marks: f64 = graded.iter().map(|answer| answer.question.marks).sum();
    let percentage = if total_marks > 0.0 { score / total_marks * 100.0 } else { 0.0 };

    Totals { score, total_marks, percentage }
}

fn build_response(
    record: TestResult,
    graded: Vec<GradedAnswer>,
    summary: analysis::EvaluationSummary,
) -> ResultResponse {
    let answers = graded
        .into_iter()
        .map(|answer| GradedAnswerResponse {
            question_id: answer.question.id.clone(),
            question_marks: answer.question.marks,
            question: Some(QuestionResponse::from(answer.question)),
            user_answer: answer.user_answer,
            is_correct: answer.is_correct,
            marks_obtained: answer.marks_obtained,
            feedback: answer.feedback,
            time_spent_seconds: answer.time_spent_seconds,
        })
        .collect();

    ResultResponse {
        id: record.id,
        test_id: record.test_id,
        user_id: record.user_id,
        answers,
        score: record.score,
        total_marks: record.total_marks,
        percentage: record.percentage,
        time_taken_seconds: record.time_taken_seconds,
        started_at: format_primitive(record.started_at),
        submitted_at: format_primitive(record.submitted_at),
        status: record.status,
        evaluation: EvaluationSummaryResponse {
            weak_areas: summary.weak_areas,
            strengths: summary.strengths,
            recommendations: summary.recommendations,
            overall_feedback: record.overall_feedback,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{graded_answer, question, submitted_answer};
    use crate::db::types::QuestionType;

    #[test]
    fn resolve_answers_pairs_in_submission_order() {
        let questions = vec![
            question("q1", QuestionType::Mcq, 5.0, "Geography"),
            question("q2", QuestionType::ShortAnswer, 10.0, "Biology"),
        ];
        let answers = vec![
            submitted_answer("q2", "Mitochondria"),
            submitted_answer("q1", "Paris"),
        ];

        let pairs = resolve_answers(answers, questions);

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].1.id, "q2");
        assert_eq!(pairs[1].1.id, "q1");
    }

    #[test]
    fn resolve_answers_drops_unknown_questions() {
        let questions = vec![
            question("q1", QuestionType::Mcq, 5.0, "Geography"),
            question("q3", QuestionType::Mcq, 2.0, "History"),
        ];
        let answers = vec![
            submitted_answer("q1", "Paris"),
            submitted_answer("deleted", "anything"),
            submitted_answer("q3", "1066"),
        ];

        let pairs = resolve_answers(answers, questions);

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].1.id, "q1");
        assert_eq!(pairs[1].1.id, "q3");
    }

    #[test]
    fn aggregate_sums_question_marks_for_total() {
        let graded = vec![
            graded_answer(question("q1", QuestionType::Mcq, 5.0, "Geography"), true, 5.0),
            graded_answer(question("q2", QuestionType::ShortAnswer, 10.0, "Biology"), false, 4.0),
        ];

        let totals = aggregate(&graded);

        assert_eq!(totals.score, 9.0);
        assert_eq!(totals.total_marks, 15.0);
        assert!((totals.percentage - 60.0).abs() < 1e-9);
    }

    #[test]
    fn aggregate_total_equals_score_only_when_all_correct() {
        let graded = vec![
            graded_answer(question("q1", QuestionType::Mcq, 5.0, "Geography"), true, 5.0),
            graded_answer(question("q2", QuestionType::Mcq, 3.0, "History"), true, 3.0),
        ];

        let totals = aggregate(&graded);

        assert_eq!(totals.score, totals.total_marks);
        assert!((totals.percentage - 100.0).abs() < 1e-9);
    }

    #[test]
    fn aggregate_empty_set_has_zero_percentage() {
        let totals = aggregate(&[]);

        assert_eq!(totals.score, 0.0);
        assert_eq!(totals.total_marks, 0.0);
        assert_eq!(totals.percentage, 0.0);
    }
}
