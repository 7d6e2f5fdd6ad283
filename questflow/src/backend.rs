use questflow_types::{AnswerValue, Answers, SurveyDefinition};

use crate::{AnswerOutcome, NavigationEngine, NavigationStatus, QuestionView, SurveyError};

/// What the respondent did on a question screen.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Answer(AnswerValue),
    /// Continue past a statement.
    Acknowledge,
    Back,
    Cancel,
}

/// Trait for front ends that present questions one at a time.
///
/// Backends only render a [`QuestionView`] and report what the user did;
/// routing, validation and history stay in the [`NavigationEngine`].
pub trait SurveyBackend {
    /// The error type for this backend.
    type Error: Into<anyhow::Error>;

    /// Show a question and wait for the respondent.
    fn prompt(&mut self, view: &QuestionView<'_>) -> Result<Reply, Self::Error>;

    /// Tell the respondent their last reply was refused; the same question
    /// is prompted again afterwards.
    fn rejected(&mut self, _view: &QuestionView<'_>, _message: &str) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Drive `engine` with `backend` until the survey completes.
pub fn run<B: SurveyBackend>(
    engine: &mut NavigationEngine<'_>,
    backend: &mut B,
) -> Result<(), SurveyError> {
    loop {
        let reply = match engine.view() {
            Some(view) => backend.prompt(&view).map_err(SurveyError::backend)?,
            None => {
                return match engine.status() {
                    NavigationStatus::NotFound(id) => Err(SurveyError::UnknownQuestion(id)),
                    NavigationStatus::Complete | NavigationStatus::AwaitingAnswer(_) => Ok(()),
                };
            }
        };

        let outcome = match reply {
            Reply::Answer(value) => engine.answer(value),
            Reply::Acknowledge => engine.acknowledge(),
            Reply::Back => {
                engine.go_back();
                continue;
            }
            Reply::Cancel => return Err(SurveyError::Cancelled),
        };

        let message = match outcome {
            AnswerOutcome::Next(_) | AnswerOutcome::Complete => continue,
            AnswerOutcome::Rejected(reason) => reason.to_string(),
            AnswerOutcome::DeadEnd(reason) => reason.to_string(),
        };
        if let Some(view) = engine.view() {
            backend
                .rejected(&view, &message)
                .map_err(SurveyError::backend)?;
        }
    }
}

/// Run a whole survey from its entry point and return the answers.
pub fn collect<B: SurveyBackend>(
    survey: &SurveyDefinition,
    backend: &mut B,
) -> Result<Answers, SurveyError> {
    let mut engine = NavigationEngine::new(survey);
    run(&mut engine, backend)?;
    Ok(engine.into_answers())
}
