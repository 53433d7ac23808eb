use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::answer_grading::AnswerGrader;
use crate::services::question_extraction::QuestionExtractor;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    grader: Arc<dyn AnswerGrader>,
    extractor: Arc<dyn QuestionExtractor>,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        db: PgPool,
        grader: Arc<dyn AnswerGrader>,
        extractor: Arc<dyn QuestionExtractor>,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, grader, extractor }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn grader(&self) -> &Arc<dyn AnswerGrader> {
        &self.inner.grader
    }

    pub(crate) fn extractor(&self) -> &Arc<dyn QuestionExtractor> {
        &self.inner.extractor
    }
}
