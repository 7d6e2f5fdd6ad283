//! Dialoguer implementation of the SurveyBackend trait.

use dialoguer::theme::{ColorfulTheme, SimpleTheme, Theme};
use dialoguer::{Input, MultiSelect, Select};
use questflow::{AnswerValue, QuestionKind, QuestionView, Reply, SurveyBackend};
use thiserror::Error;

/// Extra entry appended to choice lists when going back is possible.
const BACK_ITEM: &str = "← Back";
/// Typed into a text prompt to go back.
const BACK_TOKEN: &str = "<";

/// Error type for the Dialoguer backend.
#[derive(Debug, Error)]
pub enum DialoguerError {
    /// An I/O error occurred during prompting.
    #[error("Dialoguer error: {0}")]
    Dialoguer(#[from] dialoguer::Error),
}

/// Helper to check if a dialoguer error is a cancellation (Ctrl+C / Escape)
fn is_cancelled(err: &dialoguer::Error) -> bool {
    matches!(err, dialoguer::Error::IO(io_err) if io_err.kind() == std::io::ErrorKind::Interrupted)
}

/// `None` when the user cancelled the prompt.
fn interacted<T>(result: dialoguer::Result<T>) -> Result<Option<T>, DialoguerError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if is_cancelled(&e) => Ok(None),
        Err(e) => Err(DialoguerError::Dialoguer(e)),
    }
}

/// Step-by-step terminal wizard, one prompt per question.
#[derive(Debug, Default, Clone)]
pub struct DialoguerWizard {
    /// Use colorful theme for prompts.
    colorful: bool,
}

impl DialoguerWizard {
    /// Create a new wizard with the colorful theme.
    pub fn new() -> Self {
        Self { colorful: true }
    }

    /// Create a wizard with plain (no color) prompts.
    pub fn plain() -> Self {
        Self { colorful: false }
    }

    fn theme(&self) -> Box<dyn Theme> {
        if self.colorful {
            Box::new(ColorfulTheme::default())
        } else {
            Box::new(SimpleTheme)
        }
    }

    /// Ask who is conducting the interview. `None` if cancelled.
    pub fn ask_surveyor_name(&self) -> Result<Option<String>, DialoguerError> {
        let theme = self.theme();
        let name = Input::<String>::with_theme(theme.as_ref())
            .with_prompt("Surveyor name")
            .interact_text();
        interacted(name)
    }

    fn ask_statement(&self, view: &QuestionView<'_>) -> Result<Reply, DialoguerError> {
        println!("{}", view.text);
        if !view.can_go_back {
            return Ok(Reply::Acknowledge);
        }
        let theme = self.theme();
        let choice = Select::with_theme(theme.as_ref())
            .items(&["Continue", BACK_ITEM])
            .default(0)
            .interact();
        Ok(match interacted(choice)? {
            Some(0) => Reply::Acknowledge,
            Some(_) => Reply::Back,
            None => Reply::Cancel,
        })
    }

    fn ask_single(&self, view: &QuestionView<'_>) -> Result<Reply, DialoguerError> {
        let theme = self.theme();
        let mut builder = Select::with_theme(theme.as_ref())
            .with_prompt(view.text)
            .items(&choice_items(view));
        if let Some(index) = single_default(view) {
            builder = builder.default(index);
        }
        Ok(match interacted(builder.interact())? {
            Some(index) => single_reply(view, index),
            None => Reply::Cancel,
        })
    }

    fn ask_multiple(&self, view: &QuestionView<'_>) -> Result<Reply, DialoguerError> {
        let theme = self.theme();
        let selection = MultiSelect::with_theme(theme.as_ref())
            .with_prompt(view.text)
            .items(&choice_items(view))
            .defaults(&multi_defaults(view))
            .interact();
        Ok(match interacted(selection)? {
            Some(indices) => multi_reply(view, &indices),
            None => Reply::Cancel,
        })
    }

    fn ask_text(&self, view: &QuestionView<'_>) -> Result<Reply, DialoguerError> {
        let theme = self.theme();
        let mut builder = Input::<String>::with_theme(theme.as_ref())
            .with_prompt(text_prompt(view))
            .allow_empty(true);
        if let Some(previous) = view.previous_answer.filter(|v| !v.is_empty()) {
            builder = builder.with_initial_text(previous.to_string());
        }
        Ok(match interacted(builder.interact_text())? {
            Some(input) => text_reply(view, &input),
            None => Reply::Cancel,
        })
    }
}

impl SurveyBackend for DialoguerWizard {
    type Error = DialoguerError;

    fn prompt(&mut self, view: &QuestionView<'_>) -> Result<Reply, Self::Error> {
        match view.question.kind() {
            QuestionKind::Statement => self.ask_statement(view),
            QuestionKind::SingleChoice => self.ask_single(view),
            QuestionKind::MultipleChoice => self.ask_multiple(view),
            QuestionKind::FreeText | QuestionKind::Number | QuestionKind::Lookup(_) => {
                self.ask_text(view)
            }
        }
    }

    fn rejected(&mut self, _view: &QuestionView<'_>, message: &str) -> Result<(), Self::Error> {
        println!("Error: {message}");
        Ok(())
    }
}

fn choice_items<'a>(view: &QuestionView<'a>) -> Vec<&'a str> {
    let mut items: Vec<&str> = view
        .question
        .options()
        .iter()
        .map(|option| option.text.as_str())
        .collect();
    if view.can_go_back {
        items.push(BACK_ITEM);
    }
    items
}

fn single_default(view: &QuestionView<'_>) -> Option<usize> {
    let chosen = view.previous_answer?.as_option_id()?;
    view.question.options().iter().position(|o| o.id == chosen)
}

fn multi_defaults(view: &QuestionView<'_>) -> Vec<bool> {
    let chosen = view
        .previous_answer
        .and_then(AnswerValue::as_choices)
        .unwrap_or_default();
    let mut defaults: Vec<bool> = view
        .question
        .options()
        .iter()
        .map(|option| chosen.contains(&option.id))
        .collect();
    if view.can_go_back {
        defaults.push(false);
    }
    defaults
}

fn single_reply(view: &QuestionView<'_>, index: usize) -> Reply {
    match view.question.options().get(index) {
        Some(option) => Reply::Answer(option.id.into()),
        None => Reply::Back,
    }
}

/// Ticking the back entry wins over any other selection.
fn multi_reply(view: &QuestionView<'_>, indices: &[usize]) -> Reply {
    let options = view.question.options();
    if indices.iter().any(|&i| i >= options.len()) {
        return Reply::Back;
    }
    let ids: Vec<_> = indices.iter().map(|&i| options[i].id).collect();
    Reply::Answer(ids.into())
}

fn text_prompt(view: &QuestionView<'_>) -> String {
    let mut prompt = view.text.to_string();
    if let Some(placeholder) = view.question.placeholder() {
        prompt.push_str(&format!(" ({placeholder})"));
    }
    if view.can_go_back {
        prompt.push_str(&format!(" [{BACK_TOKEN} to go back]"));
    }
    prompt
}

fn text_reply(view: &QuestionView<'_>, input: &str) -> Reply {
    let input = input.trim();
    if view.can_go_back && input == BACK_TOKEN {
        return Reply::Back;
    }
    if input.is_empty() && view.question.kind() == QuestionKind::Number {
        return Reply::Answer(AnswerValue::Null);
    }
    Reply::Answer(input.into())
}
