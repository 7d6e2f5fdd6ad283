use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// Identifier of an option within a choice question.
pub type OptionId = u32;

/// A single answer collected during a survey.
///
/// This is the value stored in `Answers` for each answered question. It maps
/// one-to-one onto plain JSON: `null`, a number, a string, or an array of
/// option ids.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// An explicit empty answer.
    Null,

    /// A numeric answer (number questions, and the chosen option of a single-choice question).
    Number(f64),

    /// A text answer (free text, lookups).
    Text(String),

    /// The chosen option ids of a multiple-choice question, in selection order.
    Choices(Vec<OptionId>),
}

impl AnswerValue {
    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a number, without coercion.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to get this value as a list of chosen option ids.
    pub fn as_choices(&self) -> Option<&[OptionId]> {
        match self {
            Self::Choices(ids) => Some(ids),
            _ => None,
        }
    }

    /// Try to get this value as a single chosen option id.
    pub fn as_option_id(&self) -> Option<OptionId> {
        let n = self.coerce_number()?;
        (n >= 0.0 && n.fract() == 0.0 && n <= f64::from(OptionId::MAX)).then_some(n as OptionId)
    }

    /// Numeric view of the value: numbers as-is, text when it parses as a number.
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Check if this is the `Null` variant.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if the value carries no usable content (null, empty text, empty selection).
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            Self::Choices(ids) => ids.is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Get the type name of this value for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Number(_) => "Number",
            Self::Text(_) => "Text",
            Self::Choices(_) => "Choices",
        }
    }
}

/// Integral view of a float, if it has no fractional part and fits losslessly.
pub(crate) fn whole_number(n: f64) -> Option<i64> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    (n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_EXACT).then_some(n as i64)
}

impl Serialize for AnswerValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Number(n) => match whole_number(*n) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
            Self::Text(s) => serializer.serialize_str(s),
            Self::Choices(ids) => ids.serialize(serializer),
        }
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Number(n) => match whole_number(*n) {
                Some(i) => write!(f, "{i}"),
                None => write!(f, "{n}"),
            },
            Self::Text(s) => f.write_str(s),
            Self::Choices(ids) => {
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{id}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<String> for AnswerValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for AnswerValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<f64> for AnswerValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for AnswerValue {
    fn from(i: i64) -> Self {
        Self::Number(i as f64)
    }
}

impl From<i32> for AnswerValue {
    fn from(i: i32) -> Self {
        Self::Number(f64::from(i))
    }
}

impl From<u32> for AnswerValue {
    fn from(id: u32) -> Self {
        Self::Number(f64::from(id))
    }
}

impl From<Vec<OptionId>> for AnswerValue {
    fn from(ids: Vec<OptionId>) -> Self {
        Self::Choices(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_numbers_serialize_without_fraction() {
        let json = serde_json::to_string(&AnswerValue::Number(15.0)).unwrap();
        assert_eq!(json, "15");

        let json = serde_json::to_string(&AnswerValue::Number(1.5)).unwrap();
        assert_eq!(json, "1.5");
    }

    #[test]
    fn deserializes_plain_json() {
        let values: Vec<AnswerValue> = serde_json::from_str(r#"[null, 4, "Paris", [1, 3]]"#).unwrap();
        assert_eq!(
            values,
            vec![
                AnswerValue::Null,
                AnswerValue::Number(4.0),
                AnswerValue::Text("Paris".into()),
                AnswerValue::Choices(vec![1, 3]),
            ]
        );
    }

    #[test]
    fn emptiness() {
        assert!(AnswerValue::Null.is_empty());
        assert!(AnswerValue::Text(String::new()).is_empty());
        assert!(AnswerValue::Choices(vec![]).is_empty());
        assert!(!AnswerValue::Number(0.0).is_empty());
    }

    #[test]
    fn numeric_text_coerces() {
        assert_eq!(AnswerValue::from(" 42 ").coerce_number(), Some(42.0));
        assert_eq!(AnswerValue::from("abc").coerce_number(), None);
        assert_eq!(AnswerValue::from(4).as_option_id(), Some(4));
        assert_eq!(AnswerValue::from(4.5).as_option_id(), None);
    }
}
