use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "questiontype", rename_all = "kebab-case")]
pub(crate) enum QuestionType {
    Mcq,
    TrueFalse,
    ShortAnswer,
    Descriptive,
}

impl QuestionType {
    pub(crate) fn is_objective(self) -> bool {
        matches!(self, Self::Mcq | Self::TrueFalse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "difficultylevel", rename_all = "lowercase")]
pub(crate) enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "resultstatus", rename_all = "kebab-case")]
pub(crate) enum ResultStatus {
    InProgress,
    Completed,
    Abandoned,
}
