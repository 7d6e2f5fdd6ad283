//! The navigation engine: walks a question graph one answer at a time.

use std::collections::HashSet;

use questflow_types::{
    AnswerValue, Answers, END, Question, QuestionGraph, QuestionKind, SurveyDefinition,
};

use crate::validation::{self, ValidationError};

/// The mutable part of a traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationState {
    /// The question awaiting an answer, or `end` once complete.
    pub current_question_id: String,

    /// Questions answered or acknowledged before the current one, oldest first.
    pub history: Vec<String>,

    pub answers: Answers,
}

impl NavigationState {
    fn at(start: impl Into<String>) -> Self {
        Self {
            current_question_id: start.into(),
            history: Vec::new(),
            answers: Answers::new(),
        }
    }
}

/// Where the traversal stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationStatus {
    AwaitingAnswer(String),
    Complete,
    /// The current id is not part of the graph (only reachable through `resume`).
    NotFound(String),
}

/// Result of `answer` and `acknowledge`.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerOutcome {
    /// Moved on to the given question.
    Next(String),
    /// The traversal reached `end`.
    Complete,
    /// The input was refused; nothing changed.
    Rejected(ValidationError),
    /// Routing could not reach a question; the answer was rolled back.
    DeadEnd(DeadEnd),
}

impl AnswerOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Why routing could not settle on a question.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeadEnd {
    #[error("Routing reached unknown question '{0}'")]
    UnknownQuestion(String),

    #[error("Skipped questions loop back to '{0}'")]
    SkipCycle(String),
}

/// What the presentation layer needs to render the current question.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionView<'a> {
    pub question: &'a Question,

    /// Display text, after conditional overrides.
    pub text: &'a str,

    pub can_go_back: bool,

    /// 1-based position in the traversal.
    pub progress_index: usize,

    /// The answer given on an earlier visit, for pre-filling.
    pub previous_answer: Option<&'a AnswerValue>,
}

/// Drives one traversal of a question graph.
///
/// The graph is borrowed and never changes; all mutable state lives in
/// [`NavigationState`] and only `answer`, `acknowledge`, `go_back` and
/// `restart` touch it.
#[derive(Debug, Clone)]
pub struct NavigationEngine<'g> {
    graph: &'g QuestionGraph,
    start: String,
    state: NavigationState,
}

impl<'g> NavigationEngine<'g> {
    /// Start a traversal at the survey's entry point.
    pub fn new(survey: &'g SurveyDefinition) -> Self {
        Self::with_start(survey.graph(), survey.start_question_id())
    }

    /// Start a traversal of `graph` at `start`.
    pub fn with_start(graph: &'g QuestionGraph, start: impl Into<String>) -> Self {
        let start = start.into();
        let mut engine = Self {
            graph,
            state: NavigationState::at(start.clone()),
            start,
        };
        engine.settle_start();
        engine
    }

    /// Continue a traversal from a saved state.
    pub fn resume(graph: &'g QuestionGraph, start: impl Into<String>, state: NavigationState) -> Self {
        Self {
            graph,
            start: start.into(),
            state,
        }
    }

    /// Back to the entry point with no answers.
    pub fn restart(&mut self) {
        self.state = NavigationState::at(self.start.clone());
        self.settle_start();
    }

    // The entry question is subject to its own condition like any other.
    fn settle_start(&mut self) {
        let Some(start) = self.graph.get(&self.state.current_question_id) else {
            return;
        };
        if let Ok(Landing { target, .. }) = self.resolve(Some(start.id())) {
            self.state.current_question_id = target.unwrap_or(END).to_string();
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn answers(&self) -> &Answers {
        &self.state.answers
    }

    pub fn history(&self) -> &[String] {
        &self.state.history
    }

    /// Consume the engine, keeping the collected answers.
    pub fn into_answers(self) -> Answers {
        self.state.answers
    }

    pub fn status(&self) -> NavigationStatus {
        let id = &self.state.current_question_id;
        if id == END {
            NavigationStatus::Complete
        } else if self.graph.contains(id) {
            NavigationStatus::AwaitingAnswer(id.clone())
        } else {
            NavigationStatus::NotFound(id.clone())
        }
    }

    /// The question awaiting an answer.
    pub fn current(&self) -> Option<&'g Question> {
        self.graph.get(&self.state.current_question_id)
    }

    /// Text of the current question, with conditional overrides applied.
    ///
    /// Recomputed on every call, since earlier answers may have changed
    /// after going back.
    pub fn display_text(&self) -> Option<&'g str> {
        self.current().map(|question| self.text_for(question))
    }

    fn text_for(&self, question: &'g Question) -> &'g str {
        question
            .conditional_text()
            .and_then(|logic| self.graph.select_route(logic, &self.state.answers))
            .and_then(|route| route.text.as_deref())
            .unwrap_or(question.text())
    }

    /// Everything needed to render the current question.
    pub fn view(&self) -> Option<QuestionView<'_>> {
        let question = self.current()?;
        Some(QuestionView {
            question,
            text: self.text_for(question),
            can_go_back: !self.state.history.is_empty(),
            progress_index: self.state.history.len() + 1,
            previous_answer: self.state.answers.get(question.id()),
        })
    }

    /// Answer the current question and move on.
    pub fn answer(&mut self, value: impl Into<AnswerValue>) -> AnswerOutcome {
        let Some(question) = self.current() else {
            return AnswerOutcome::Rejected(ValidationError::NotAwaiting);
        };
        let value = match validation::validate(question, value.into()) {
            Ok(value) => value,
            Err(reason) => {
                tracing::debug!(question = question.id(), %reason, "answer rejected");
                return AnswerOutcome::Rejected(reason);
            }
        };

        let previous = self.state.answers.insert(question.id(), value);
        match self.resolve(self.route(question)) {
            Ok(landing) => self.advance(question, landing),
            Err(dead_end) => {
                match previous {
                    Some(previous) => self.state.answers.insert(question.id(), previous),
                    None => self.state.answers.remove(question.id()),
                };
                tracing::warn!(question = question.id(), %dead_end, "navigation dead end");
                AnswerOutcome::DeadEnd(dead_end)
            }
        }
    }

    /// Move past a display-only statement.
    pub fn acknowledge(&mut self) -> AnswerOutcome {
        let Some(question) = self.current() else {
            return AnswerOutcome::Rejected(ValidationError::NotAwaiting);
        };
        if question.kind() != QuestionKind::Statement {
            return AnswerOutcome::Rejected(ValidationError::NotAStatement(
                question.id().to_string(),
            ));
        }

        match self.resolve(self.route(question)) {
            Ok(landing) => self.advance(question, landing),
            Err(dead_end) => {
                tracing::warn!(question = question.id(), %dead_end, "navigation dead end");
                AnswerOutcome::DeadEnd(dead_end)
            }
        }
    }

    /// Return to the previous question. Answers are kept.
    pub fn go_back(&mut self) -> bool {
        match self.state.history.pop() {
            Some(previous) => {
                tracing::debug!(from = %self.state.current_question_id, to = %previous, "going back");
                self.state.current_question_id = previous;
                true
            }
            None => false,
        }
    }

    /// The candidate successor of an answered (or acknowledged) question.
    fn route(&self, question: &'g Question) -> Option<&'g str> {
        let answer = self.state.answers.get(question.id());

        match (question.kind(), answer) {
            (QuestionKind::MultipleChoice, Some(AnswerValue::Choices(chosen))) => {
                let detour = question
                    .options()
                    .iter()
                    .filter(|option| chosen.contains(&option.id))
                    .find_map(|option| option.next_if_selected.as_deref());
                if detour.is_some() {
                    return detour;
                }
            }
            (QuestionKind::SingleChoice, Some(answer)) => {
                let target = answer
                    .as_option_id()
                    .and_then(|id| question.option(id))
                    .and_then(|option| option.target());
                if target.is_some() {
                    return target;
                }
            }
            _ => {}
        }

        for logic in question.conditional_next() {
            let next = self
                .graph
                .select_route(logic, &self.state.answers)
                .and_then(|route| route.next.as_deref());
            if next.is_some() {
                return next;
            }
        }

        question.next().or(question.fallback_next())
    }

    /// Follow skip rules from `candidate` until a question whose condition
    /// holds, or the end.
    ///
    /// Conditions further down the chain see the answers without those of
    /// the questions already skipped.
    fn resolve(&self, candidate: Option<&'g str>) -> Result<Landing<'g>, DeadEnd> {
        let mut skipped = Vec::new();
        let mut seen = HashSet::new();
        let mut target = candidate;
        let mut remaining: Option<Answers> = None;

        loop {
            let id = match target {
                Some(id) if id != END => id,
                _ => return Ok(Landing { target: None, skipped }),
            };
            let question = self
                .graph
                .get(id)
                .ok_or_else(|| DeadEnd::UnknownQuestion(id.to_string()))?;

            let answers = remaining.as_ref().unwrap_or(&self.state.answers);
            match question.condition() {
                Some(condition) if !self.graph.evaluate(condition, answers) => {
                    if !seen.insert(id) {
                        return Err(DeadEnd::SkipCycle(id.to_string()));
                    }
                    tracing::debug!(question = id, condition, "condition false, skipping");
                    if self.state.answers.contains(id) {
                        remaining
                            .get_or_insert_with(|| self.state.answers.clone())
                            .remove(id);
                    }
                    skipped.push(id);
                    target = question.skip_target();
                }
                _ => {
                    return Ok(Landing {
                        target: Some(question.id()),
                        skipped,
                    });
                }
            }
        }
    }

    fn advance(&mut self, from: &'g Question, landing: Landing<'g>) -> AnswerOutcome {
        // A skipped question never keeps an answer from an abandoned branch.
        for id in landing.skipped {
            self.state.answers.remove(id);
        }

        self.state.history.push(from.id().to_string());
        match landing.target {
            Some(next) => {
                tracing::debug!(from = from.id(), to = next, "advancing");
                self.state.current_question_id = next.to_string();
                AnswerOutcome::Next(next.to_string())
            }
            None => {
                tracing::debug!(from = from.id(), answers = self.state.answers.len(), "survey complete");
                self.state.current_question_id = END.to_string();
                AnswerOutcome::Complete
            }
        }
    }
}

struct Landing<'g> {
    target: Option<&'g str>,
    skipped: Vec<&'g str>,
}
