use crate::{ConditionError, OptionId};

/// Error raised while loading a survey definition.
///
/// Every variant is a configuration bug: a survey that fails to load must not
/// be run, since it would mis-route respondents silently.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Survey has no questions")]
    Empty,

    #[error("Duplicate question id '{0}'")]
    DuplicateQuestion(String),

    #[error("Question '{question}' declares option id {option} more than once")]
    DuplicateOption { question: String, option: OptionId },

    #[error("Question '{question}' routes to unknown question '{target}' via {field}")]
    DanglingReference {
        question: String,
        field: &'static str,
        target: String,
    },

    #[error("Question '{question}' has a malformed {field}: {source}")]
    MalformedCondition {
        question: String,
        field: &'static str,
        #[source]
        source: ConditionError,
    },

    #[error("Question '{question}' has a {field} reading unknown question '{target}'")]
    UnknownConditionReference {
        question: String,
        field: &'static str,
        target: String,
    },

    #[error("Start question '{0}' does not exist")]
    UnknownStartQuestion(String),

    #[error("Survey file could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
}
