//! Scripted backend for running surveys without user interaction.
//!
//! `ScriptedAnswers` replies to each question from a per-question queue, so a
//! test can describe a respondent that goes back, changes their mind, or
//! gives an invalid answer first.
//!
//! # Example
//!
//! ```rust,ignore
//! use questflow::{ScriptedAnswers, collect};
//!
//! let mut respondent = ScriptedAnswers::new()
//!     .with_answer("AGE", 34)
//!     .with_answer("CITY", "Vannes");
//!
//! let answers = collect(&survey, &mut respondent).unwrap();
//! assert_eq!(respondent.prompted(), ["AGE", "CITY"]);
//! ```

use std::collections::{HashMap, VecDeque};

use questflow_types::{AnswerValue, QuestionKind};

use crate::{QuestionView, Reply, SurveyBackend};

/// A backend that replays pre-configured replies.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAnswers {
    replies: HashMap<String, VecDeque<Reply>>,
    prompted: Vec<String>,
}

/// Error type for `ScriptedAnswers`.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("No scripted reply left for question: {0}")]
    MissingReply(String),

    #[error("Reply for '{question}' was rejected: {message}")]
    Rejected { question: String, message: String },
}

impl ScriptedAnswers {
    /// Create a backend with no replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an answer for a question.
    pub fn with_answer(self, question: impl Into<String>, value: impl Into<AnswerValue>) -> Self {
        self.with_reply(question, Reply::Answer(value.into()))
    }

    /// Queue a "back" press on a question.
    pub fn with_back(self, question: impl Into<String>) -> Self {
        self.with_reply(question, Reply::Back)
    }

    /// Queue any reply for a question. Replies for one question are used in order.
    pub fn with_reply(mut self, question: impl Into<String>, reply: Reply) -> Self {
        self.replies.entry(question.into()).or_default().push_back(reply);
        self
    }

    /// Question ids in the order they were shown.
    pub fn prompted(&self) -> &[String] {
        &self.prompted
    }
}

impl SurveyBackend for ScriptedAnswers {
    type Error = ScriptError;

    fn prompt(&mut self, view: &QuestionView<'_>) -> Result<Reply, Self::Error> {
        let id = view.question.id();
        self.prompted.push(id.to_string());

        if let Some(reply) = self.replies.get_mut(id).and_then(VecDeque::pop_front) {
            return Ok(reply);
        }
        // Statements need no script entry.
        if view.question.kind() == QuestionKind::Statement {
            return Ok(Reply::Acknowledge);
        }
        Err(ScriptError::MissingReply(id.to_string()))
    }

    fn rejected(&mut self, view: &QuestionView<'_>, message: &str) -> Result<(), Self::Error> {
        Err(ScriptError::Rejected {
            question: view.question.id().to_string(),
            message: message.to_string(),
        })
    }
}
