//! # questflow
//!
//! Conditional surveys: a validated question graph, a navigation engine that
//! routes between questions based on earlier answers, and a backend trait
//! for front ends that present the questions.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use questflow::{AnswerOutcome, NavigationEngine, SurveyDefinition};
//!
//! let survey = SurveyDefinition::from_json(&std::fs::read_to_string("survey.json")?)?;
//! let mut engine = NavigationEngine::new(&survey);
//!
//! while let Some(view) = engine.view() {
//!     println!("{}", view.text);
//!     match engine.answer(read_answer()) {
//!         AnswerOutcome::Rejected(reason) => println!("{reason}"),
//!         _ => {}
//!     }
//! }
//! let answers = engine.into_answers();
//! ```
//!
//! ## Routing
//!
//! After an answer the next question is, first match wins:
//! 1. the `next_if_selected` of a chosen option (single choice also honours
//!    the option's `next`),
//! 2. the first `conditionalNext` route that matches,
//! 3. the question's `next`, then its `fallbackNext`,
//! 4. otherwise the survey is complete.
//!
//! Questions whose `condition` is false are then skipped through their
//! `fallbackNext` (else `next`).
//!
//! ## Backends
//!
//! Front ends implement [`SurveyBackend`]:
//! - `questflow-wizard-dialoguer` - CLI prompts via dialoguer
//! - [`ScriptedAnswers`] - replays fixed replies, for tests

// Re-export all types from questflow-types
pub use questflow_types::*;

mod navigator;
pub use navigator::{
    AnswerOutcome, DeadEnd, NavigationEngine, NavigationState, NavigationStatus, QuestionView,
};

pub mod validation;
pub use validation::ValidationError;

mod backend;
pub use backend::{Reply, SurveyBackend, collect, run};

mod error;
pub use error::SurveyError;

// Scripted backend for testing surveys without user interaction
mod scripted;
pub use scripted::{ScriptError, ScriptedAnswers};
