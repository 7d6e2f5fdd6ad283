//! Core types for the questflow crates.
//!
//! This crate provides the data model of a conditional survey:
//! - `SurveyDefinition` and `QuestionGraph` - The validated question graph and its entry point
//! - `Question`, `QuestionKind` and `SurveyOption` - Individual nodes and their routing
//! - `Answers` and `AnswerValue` - Collected data, keyed by question id
//! - `condition` - The expression language used for skipping and routing

mod answer_value;
pub use answer_value::{AnswerValue, OptionId};

mod answers;
pub use answers::{AnswerError, Answers};

pub mod condition;
pub use condition::{Condition, ConditionError, Literal};

mod question;
pub use question::{
    ConditionalLogic, ConditionalRoute, END, LookupSource, Question, QuestionKind, SurveyOption,
    Validation,
};

mod graph;
pub use graph::QuestionGraph;

mod survey_definition;
pub use survey_definition::SurveyDefinition;

mod error;
pub use error::GraphError;
