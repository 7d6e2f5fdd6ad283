use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{AnswerValue, OptionId};

/// Error type for typed answer access.
#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    #[error("Missing answer for question: {0}")]
    Missing(String),

    #[error("Type mismatch for question '{question}': expected {expected}, got {actual}")]
    TypeMismatch {
        question: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Answers collected during one traversal of a survey.
///
/// Keyed by question id. Iteration follows insertion order, which is the
/// order questions were first answered in; re-answering a question replaces
/// its value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Answers {
    values: IndexMap<String, AnswerValue>,
}

impl Answers {
    /// Create a new empty answer map.
    pub fn new() -> Self {
        Self {
            values: IndexMap::new(),
        }
    }

    /// Record an answer, returning the previous value for that question.
    pub fn insert(
        &mut self,
        question: impl Into<String>,
        value: impl Into<AnswerValue>,
    ) -> Option<AnswerValue> {
        self.values.insert(question.into(), value.into())
    }

    /// Get the answer for a question.
    pub fn get(&self, question: &str) -> Option<&AnswerValue> {
        self.values.get(question)
    }

    /// Check if an answer exists for a question.
    pub fn contains(&self, question: &str) -> bool {
        self.values.contains_key(question)
    }

    /// Remove an answer, keeping the order of the remaining entries.
    pub fn remove(&mut self, question: &str) -> Option<AnswerValue> {
        self.values.shift_remove(question)
    }

    /// Iterate over question ids and answers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnswerValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Question ids in insertion order.
    pub fn question_ids(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Get the number of answers.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no answers.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    // === Convenience accessors ===

    /// Get a text answer.
    pub fn get_text(&self, question: &str) -> Result<&str, AnswerError> {
        match self.get(question) {
            Some(AnswerValue::Text(s)) => Ok(s),
            Some(other) => Err(self.mismatch(question, "Text", other)),
            None => Err(AnswerError::Missing(question.to_string())),
        }
    }

    /// Get a numeric answer.
    pub fn get_number(&self, question: &str) -> Result<f64, AnswerError> {
        match self.get(question) {
            Some(AnswerValue::Number(n)) => Ok(*n),
            Some(other) => Err(self.mismatch(question, "Number", other)),
            None => Err(AnswerError::Missing(question.to_string())),
        }
    }

    /// Get the chosen option ids of a multiple-choice answer.
    pub fn get_choices(&self, question: &str) -> Result<&[OptionId], AnswerError> {
        match self.get(question) {
            Some(AnswerValue::Choices(ids)) => Ok(ids),
            Some(other) => Err(self.mismatch(question, "Choices", other)),
            None => Err(AnswerError::Missing(question.to_string())),
        }
    }

    /// Check if a question has a non-empty answer.
    ///
    /// Returns `false` if the answer is missing, null, an empty string or an
    /// empty selection.
    pub fn has_value(&self, question: &str) -> bool {
        self.get(question).is_some_and(|v| !v.is_empty())
    }

    fn mismatch(&self, question: &str, expected: &'static str, actual: &AnswerValue) -> AnswerError {
        AnswerError::TypeMismatch {
            question: question.to_string(),
            expected,
            actual: actual.type_name(),
        }
    }
}

impl FromIterator<(String, AnswerValue)> for Answers {
    fn from_iter<I: IntoIterator<Item = (String, AnswerValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Answers {
    type Item = (String, AnswerValue);
    type IntoIter = indexmap::map::IntoIter<String, AnswerValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a> IntoIterator for &'a Answers {
    type Item = (&'a String, &'a AnswerValue);
    type IntoIter = indexmap::map::Iter<'a, String, AnswerValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_and_get() {
        let mut answers = Answers::new();
        answers.insert("NAME", "Alice");
        answers.insert("AGE", 30);

        assert_eq!(answers.get_text("NAME").unwrap(), "Alice");
        assert_eq!(answers.get_number("AGE").unwrap(), 30.0);
    }

    #[test]
    fn reanswering_keeps_position() {
        let mut answers = Answers::new();
        answers.insert("Q1", 1);
        answers.insert("Q2", 2);
        let previous = answers.insert("Q1", 7);

        assert_eq!(previous, Some(AnswerValue::Number(1.0)));
        let ids: Vec<_> = answers.question_ids().collect();
        assert_eq!(ids, vec!["Q1", "Q2"]);
        assert_eq!(answers.get_number("Q1").unwrap(), 7.0);
    }

    #[test]
    fn serializes_in_insertion_order() {
        let mut answers = Answers::new();
        answers.insert("Z", 1);
        answers.insert("A", vec![1u32, 3]);

        let json = serde_json::to_string(&answers).unwrap();
        assert_eq!(json, r#"{"Z":1,"A":[1,3]}"#);
    }

    #[test]
    fn type_mismatch_error() {
        let mut answers = Answers::new();
        answers.insert("AGE", 30);

        let result = answers.get_text("AGE");
        assert!(matches!(result, Err(AnswerError::TypeMismatch { .. })));
    }

    #[test]
    fn has_value_ignores_empty_answers() {
        let mut answers = Answers::new();
        answers.insert("EMPTY", "");
        answers.insert("NONE", AnswerValue::Null);
        answers.insert("SET", "x");

        assert!(!answers.has_value("EMPTY"));
        assert!(!answers.has_value("NONE"));
        assert!(!answers.has_value("MISSING"));
        assert!(answers.has_value("SET"));
    }
}
