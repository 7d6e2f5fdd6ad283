//! Checks an answer against the question it is given for.
//!
//! Validation also normalizes: numeric input arrives as text from most front
//! ends and is stored as a number, a single-choice pick is stored as its
//! option id.

use questflow_types::{AnswerValue, OptionId, Question, QuestionKind, Validation};

/// Why an answer (or acknowledgement) was refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("The survey is not waiting for an answer")]
    NotAwaiting,

    #[error("'{0}' is a statement and takes no answer")]
    Statement(String),

    #[error("'{0}' expects an answer")]
    NotAStatement(String),

    #[error("Option {option} does not exist for '{question}'")]
    UnknownOption { question: String, option: OptionId },

    #[error("'{question}' expects {expected}, got {actual}")]
    WrongShape {
        question: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Please enter a valid number")]
    NotANumber(String),

    #[error("Please enter a valid email address")]
    InvalidEmail(String),
}

/// Validate `value` for `question`, returning the value to record.
///
/// `Null` is accepted for every answerable kind: the engine does not enforce
/// required questions.
pub fn validate(question: &Question, value: AnswerValue) -> Result<AnswerValue, ValidationError> {
    match question.kind() {
        QuestionKind::Statement => Err(ValidationError::Statement(question.id().to_string())),
        QuestionKind::SingleChoice => single_choice(question, value),
        QuestionKind::MultipleChoice => multiple_choice(question, value),
        QuestionKind::Number => numeric(question, value),
        QuestionKind::FreeText | QuestionKind::Lookup(_) => match question.validation() {
            Some(Validation::Numeric) => numeric(question, value),
            Some(Validation::Email) => email(question, value),
            None => text(question, value),
        },
    }
}

fn single_choice(question: &Question, value: AnswerValue) -> Result<AnswerValue, ValidationError> {
    let id = match &value {
        AnswerValue::Null => return Ok(value),
        AnswerValue::Choices(ids) if ids.len() == 1 => ids[0],
        other => other
            .as_option_id()
            .ok_or_else(|| wrong_shape(question, "an option id", other))?,
    };
    known_option(question, id)?;
    Ok(AnswerValue::Number(f64::from(id)))
}

fn multiple_choice(
    question: &Question,
    value: AnswerValue,
) -> Result<AnswerValue, ValidationError> {
    let ids = match value {
        AnswerValue::Null => return Ok(AnswerValue::Null),
        AnswerValue::Choices(ids) => ids,
        other => vec![
            other
                .as_option_id()
                .ok_or_else(|| wrong_shape(question, "a list of option ids", &other))?,
        ],
    };

    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        known_option(question, id)?;
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    Ok(AnswerValue::Choices(unique))
}

fn numeric(question: &Question, value: AnswerValue) -> Result<AnswerValue, ValidationError> {
    if value.is_null() {
        return Ok(value);
    }
    match value.coerce_number() {
        Some(n) if n.is_finite() => Ok(AnswerValue::Number(n)),
        _ => Err(ValidationError::NotANumber(question.id().to_string())),
    }
}

fn email(question: &Question, value: AnswerValue) -> Result<AnswerValue, ValidationError> {
    match value {
        AnswerValue::Null => Ok(AnswerValue::Null),
        AnswerValue::Text(s) if is_plausible_email(s.trim()) => {
            Ok(AnswerValue::Text(s.trim().to_string()))
        }
        _ => Err(ValidationError::InvalidEmail(question.id().to_string())),
    }
}

fn text(question: &Question, value: AnswerValue) -> Result<AnswerValue, ValidationError> {
    match value {
        AnswerValue::Null | AnswerValue::Text(_) => Ok(value),
        AnswerValue::Number(_) => Ok(AnswerValue::Text(value.to_string())),
        AnswerValue::Choices(_) => Err(wrong_shape(question, "text", &value)),
    }
}

fn known_option(question: &Question, id: OptionId) -> Result<(), ValidationError> {
    match question.option(id) {
        Some(_) => Ok(()),
        None => Err(ValidationError::UnknownOption {
            question: question.id().to_string(),
            option: id,
        }),
    }
}

fn wrong_shape(question: &Question, expected: &'static str, actual: &AnswerValue) -> ValidationError {
    ValidationError::WrongShape {
        question: question.id().to_string(),
        expected,
        actual: actual.type_name(),
    }
}

/// `local@domain.tld`, no whitespace, exactly one `@`.
fn is_plausible_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !s.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}
