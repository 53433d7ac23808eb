use super::GradedAnswer;

const MAX_TOPIC_HIGHLIGHTS: usize = 3;
const ACCURACY_LOW: f64 = 0.5;
const ACCURACY_HIGH: f64 = 0.8;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EvaluationSummary {
    pub(crate) weak_areas: Vec<String>,
    pub(crate) strengths: Vec<String>,
    pub(crate) recommendations: Vec<String>,
}

pub(crate) fn analyze(graded: &[GradedAnswer]) -> EvaluationSummary {
    EvaluationSummary {
        weak_areas: topic_highlights(graded, false),
        strengths: topic_highlights(graded, true),
        recommendations: recommendations(accuracy_ratio(graded)),
    }
}

// First-seen order, not frequency-ranked.
fn topic_highlights(graded: &[GradedAnswer], correct: bool) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    for answer in graded.iter().filter(|answer| answer.is_correct == correct) {
        let topic = if answer.question.topic.is_empty() {
            "Unknown"
        } else {
            answer.question.topic.as_str()
        };
        if !topics.iter().any(|seen| seen == topic) {
            topics.push(topic.to_string());
            if topics.len() == MAX_TOPIC_HIGHLIGHTS {
                break;
            }
        }
    }

    topics
}

fn accuracy_ratio(graded: &[GradedAnswer]) -> f64 {
    if graded.is_empty() {
        return 0.0;
    }

    let correct = graded.iter().filter(|answer| answer.is_correct).count();
    correct as f64 / graded.len() as f64
}

pub(crate) fn recommendations(ratio: f64) -> Vec<String> {
    if ratio < ACCURACY_LOW {
        vec![
            "Focus on fundamental concepts".to_string(),
            "Practice more basic questions".to_string(),
        ]
    } else if ratio < ACCURACY_HIGH {
        vec![
            "Work on time management".to_string(),
            "Focus on weak areas identified".to_string(),
        ]
    } else {
        vec!["Excellent performance! Maintain consistency".to_string()]
    }
}
