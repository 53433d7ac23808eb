use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::{EvaluationError, GradedAnswer};
use crate::db::models::Question;
use crate::schemas::evaluation::AnswerSubmission;
use crate::services::answer_grading::AnswerGrader;

// Caps concurrent external grader calls within one submission.
const GRADER_FANOUT_LIMIT: usize = 4;

const FALLBACK_FEEDBACK: &str =
    "Automatic evaluation was unavailable for this answer; it was scored 0 pending manual review.";

pub(crate) async fn grade_answers(
    grader: Arc<dyn AnswerGrader>,
    pairs: Vec<(AnswerSubmission, Question)>,
) -> Result<Vec<GradedAnswer>, EvaluationError> {
    let total = pairs.len();
    let semaphore = Arc::new(Semaphore::new(GRADER_FANOUT_LIMIT));
    let mut tasks = JoinSet::new();

    for (index, (answer, question)) in pairs.into_iter().enumerate() {
        let grader = Arc::clone(&grader);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| EvaluationError::Grading("grader semaphore closed".to_string()))?;
            let graded = grade_one(grader.as_ref(), answer, question).await?;
            Ok::<_, EvaluationError>((index, graded))
        });
    }

    let mut graded: Vec<Option<GradedAnswer>> = (0..total).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        let (index, answer) =
            joined.map_err(|err| EvaluationError::Grading(err.to_string()))??;
        graded[index] = Some(answer);
    }

    Ok(graded.into_iter().flatten().collect())
}

pub(crate) async fn grade_one(
    grader: &dyn AnswerGrader,
    answer: AnswerSubmission,
    question: Question,
) -> Result<GradedAnswer, EvaluationError> {
    let (is_correct, raw_marks, feedback) = if question.qtype.is_objective() {
        let (is_correct, marks) = grade_objective(&question, &answer.user_answer)?;
        (is_correct, marks, None)
    } else {
        grade_subjective(grader, &question, &answer.user_answer).await
    };

    let marks_obtained = round_marks(raw_marks).clamp(0.0, question.marks);

    Ok(GradedAnswer {
        question,
        user_answer: answer.user_answer,
        is_correct,
        marks_obtained,
        feedback,
        time_spent_seconds: answer.time_spent_seconds,
    })
}

pub(crate) fn grade_objective(
    question: &Question,
    user_answer: &str,
) -> Result<(bool, f64), EvaluationError> {
    let correct_options: Vec<&str> = question
        .options
        .0
        .iter()
        .filter(|option| option.is_correct)
        .map(|option| option.text.as_str())
        .collect();

    if correct_options.len() != 1 {
        return Err(EvaluationError::DataIntegrity {
            question_id: question.id.clone(),
            reason: format!(
                "expected exactly one correct option, found {}",
                correct_options.len()
            ),
        });
    }

    // Literal comparison: no trimming or case folding.
    let is_correct = user_answer == correct_options[0];
    Ok((is_correct, if is_correct { question.marks } else { 0.0 }))
}

async fn grade_subjective(
    grader: &dyn AnswerGrader,
    question: &Question,
    user_answer: &str,
) -> (bool, f64, Option<String>) {
    let correct_answer = question.correct_answer.as_deref().unwrap_or_default();

    match grader.evaluate(user_answer, correct_answer).await {
        Ok(evaluation) => {
            let feedback = Some(evaluation.feedback).filter(|text| !text.is_empty());
            (evaluation.is_correct, evaluation.marks * question.marks, feedback)
        }
        Err(err) => {
            tracing::warn!(
                question_id = %question.id,
                error = %err,
                "External answer evaluation failed; falling back to zero marks"
            );
            metrics::counter!("answer_grader_fallbacks_total").increment(1);
            (false, 0.0, Some(FALLBACK_FEEDBACK.to_string()))
        }
    }
}

pub(crate) fn round_marks(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::QuestionType;
    use crate::services::answer_grading::AnswerEvaluation;
    use crate::test_support::{
        mcq_question, question, submitted_answer, FailingGrader, StaticGrader,
    };

    fn paris_question(marks: f64) -> Question {
        mcq_question("q1", marks, "Geography", &[("Paris", true), ("London", false)])
    }

    #[test]
    fn correct_option_earns_full_marks() {
        let question = paris_question(5.0);
        let (is_correct, marks) = grade_objective(&question, "Paris").expect("graded");
        assert!(is_correct);
        assert_eq!(marks, 5.0);
    }

    #[test]
    fn wrong_option_earns_zero() {
        let question = paris_question(5.0);
        let (is_correct, marks) = grade_objective(&question, "London").expect("graded");
        assert!(!is_correct);
        assert_eq!(marks, 0.0);
    }

    #[test]
    fn comparison_is_literal_and_case_sensitive() {
        let question = paris_question(5.0);
        let (is_correct, _) = grade_objective(&question, "paris").expect("graded");
        assert!(!is_correct);
        let (is_correct, _) = grade_objective(&question, " Paris").expect("graded");
        assert!(!is_correct);
    }

    #[test]
    fn objective_grading_is_idempotent() {
        let question = paris_question(5.0);
        let first = grade_objective(&question, "Paris").expect("graded");
        let second = grade_objective(&question, "Paris").expect("graded");
        assert_eq!(first, second);
    }

    #[test]
    fn no_correct_option_is_a_data_integrity_error() {
        let question = mcq_question("q1", 5.0, "Geography", &[("Paris", false), ("London", false)]);
        let err = grade_objective(&question, "Paris").unwrap_err();
        assert!(matches!(err, EvaluationError::DataIntegrity { ref question_id, .. } if question_id == "q1"));
    }

    #[test]
    fn multiple_correct_options_is_a_data_integrity_error() {
        let question = mcq_question("q1", 5.0, "Geography", &[("Paris", true), ("London", true)]);
        let err = grade_objective(&question, "Paris").unwrap_err();
        assert!(matches!(err, EvaluationError::DataIntegrity { .. }));
    }

    #[tokio::test]
    async fn subjective_marks_scale_with_question_marks() {
        let grader = StaticGrader::new(AnswerEvaluation {
            is_correct: true,
            marks: 0.8,
            similarity: 0.85,
            feedback: "Good".to_string(),
        });

        let graded = grade_one(
            &grader,
            submitted_answer("q2", "Plants make food from light"),
            question("q2", QuestionType::Descriptive, 10.0, "Biology"),
        )
        .await
        .expect("graded");

        assert!(graded.is_correct);
        assert_eq!(graded.marks_obtained, 8.0);
        assert_eq!(graded.feedback.as_deref(), Some("Good"));
    }

    #[tokio::test]
    async fn subjective_marks_are_rounded_to_two_decimals() {
        let grader = StaticGrader::new(AnswerEvaluation {
            is_correct: false,
            marks: 1.0 / 3.0,
            similarity: 0.4,
            feedback: String::new(),
        });

        let graded = grade_one(
            &grader,
            submitted_answer("q2", "partial"),
            question("q2", QuestionType::ShortAnswer, 10.0, "Biology"),
        )
        .await
        .expect("graded");

        assert_eq!(graded.marks_obtained, 3.33);
        assert_eq!(graded.feedback, None);
    }

    #[tokio::test]
    async fn marks_stay_bounded_after_rounding() {
        let grader = StaticGrader::new(AnswerEvaluation {
            is_correct: true,
            marks: 1.0,
            similarity: 1.0,
            feedback: String::new(),
        });

        // Rounding 0.125 up to 0.13 would exceed the question's marks.
        let graded = grade_one(
            &grader,
            submitted_answer("q2", "exact"),
            question("q2", QuestionType::ShortAnswer, 0.125, "Biology"),
        )
        .await
        .expect("graded");

        assert!(graded.marks_obtained <= 0.125);
        assert!(graded.marks_obtained >= 0.0);
    }

    #[tokio::test]
    async fn grader_failure_falls_back_to_zero_with_feedback() {
        let graded = grade_one(
            &FailingGrader,
            submitted_answer("q2", "anything"),
            question("q2", QuestionType::Descriptive, 10.0, "Biology"),
        )
        .await
        .expect("graded");

        assert!(!graded.is_correct);
        assert_eq!(graded.marks_obtained, 0.0);
        assert_eq!(graded.feedback.as_deref(), Some(FALLBACK_FEEDBACK));
    }

    #[tokio::test]
    async fn grade_answers_preserves_submission_order() {
        let grader: Arc<dyn AnswerGrader> = Arc::new(StaticGrader::new(AnswerEvaluation {
            is_correct: true,
            marks: 0.5,
            similarity: 0.5,
            feedback: "ok".to_string(),
        }));

        let pairs = vec![
            (submitted_answer("q1", "Paris"), paris_question(5.0)),
            (
                submitted_answer("q2", "free text"),
                question("q2", QuestionType::Descriptive, 10.0, "Biology"),
            ),
            (
                submitted_answer("q3", "London"),
                mcq_question("q3", 2.0, "Geography", &[("London", true), ("Paris", false)]),
            ),
        ];

        let graded = grade_answers(grader, pairs).await.expect("graded");

        assert_eq!(graded.len(), 3);
        assert_eq!(graded[0].question.id, "q1");
        assert_eq!(graded[1].question.id, "q2");
        assert_eq!(graded[2].question.id, "q3");
        assert_eq!(graded[0].marks_obtained, 5.0);
        assert_eq!(graded[1].marks_obtained, 5.0);
        assert_eq!(graded[2].marks_obtained, 2.0);
    }

    #[tokio::test]
    async fn grade_answers_propagates_data_integrity_errors() {
        let grader: Arc<dyn AnswerGrader> = Arc::new(FailingGrader);
        let pairs = vec![(
            submitted_answer("q1", "Paris"),
            mcq_question("q1", 5.0, "Geography", &[("Paris", false)]),
        )];

        let err = grade_answers(grader, pairs).await.unwrap_err();
        assert!(matches!(err, EvaluationError::DataIntegrity { .. }));
    }

    #[test]
    fn round_marks_two_decimals() {
        assert_eq!(round_marks(3.333333), 3.33);
        assert_eq!(round_marks(6.666666), 6.67);
        assert_eq!(round_marks(0.8 * 10.0), 8.0);
        assert_eq!(round_marks(0.0), 0.0);
    }
}
