use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Literal, OptionId};

/// Successor id that terminates the survey.
pub const END: &str = "end";

/// A single node of the question graph.
///
/// Field names follow the JSON survey files (`conditionalNext`,
/// `fallbackNext`, ...), so definitions authored for the mobile client load
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Unique key of this question in the graph and in the answers.
    id: String,

    /// The default prompt text.
    #[serde(default)]
    text: String,

    /// The kind of question (determines input type).
    #[serde(rename = "type")]
    kind: QuestionKind,

    /// Options for choice questions, in display order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    options: Vec<SurveyOption>,

    /// Default successor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next: Option<String>,

    /// Informational; the navigation engine never enforces it.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    required: bool,

    /// When present and false on arrival, the question is skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    condition: Option<String>,

    /// Display text overrides depending on earlier answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    conditional_text: Option<ConditionalLogic>,

    /// Routing rules consulted in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    conditional_next: Vec<ConditionalLogic>,

    /// Successor used when neither options, conditional routes nor `next` apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fallback_next: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    free_text_placeholder: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    validation: Option<Validation>,
}

impl Question {
    /// Create a new question with no routing.
    pub fn new(id: impl Into<String>, text: impl Into<String>, kind: QuestionKind) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            kind,
            options: Vec::new(),
            next: None,
            required: false,
            condition: None,
            conditional_text: None,
            conditional_next: Vec::new(),
            fallback_next: None,
            free_text_placeholder: None,
            validation: None,
        }
    }

    /// Set the options of a choice question.
    pub fn with_options(mut self, options: Vec<SurveyOption>) -> Self {
        self.options = options;
        self
    }

    /// Set the default successor.
    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next = Some(next.into());
        self
    }

    /// Set the display condition.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Set the conditional display text.
    pub fn with_conditional_text(mut self, logic: ConditionalLogic) -> Self {
        self.conditional_text = Some(logic);
        self
    }

    /// Append a conditional routing rule.
    pub fn with_conditional_next(mut self, logic: ConditionalLogic) -> Self {
        self.conditional_next.push(logic);
        self
    }

    /// Set the fallback successor.
    pub fn with_fallback_next(mut self, next: impl Into<String>) -> Self {
        self.fallback_next = Some(next.into());
        self
    }

    /// Set the placeholder shown in free-text inputs.
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.free_text_placeholder = Some(placeholder.into());
        self
    }

    /// Set the input validation.
    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Mark the question as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the default prompt text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    pub fn options(&self) -> &[SurveyOption] {
        &self.options
    }

    /// Look up an option by id.
    pub fn option(&self, id: OptionId) -> Option<&SurveyOption> {
        self.options.iter().find(|o| o.id == id)
    }

    pub fn next(&self) -> Option<&str> {
        self.next.as_deref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    pub fn conditional_text(&self) -> Option<&ConditionalLogic> {
        self.conditional_text.as_ref()
    }

    pub fn conditional_next(&self) -> &[ConditionalLogic] {
        &self.conditional_next
    }

    pub fn fallback_next(&self) -> Option<&str> {
        self.fallback_next.as_deref()
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.free_text_placeholder.as_deref()
    }

    pub fn validation(&self) -> Option<Validation> {
        self.validation
    }

    /// Successor used when this question is skipped: `fallbackNext`, else `next`.
    pub fn skip_target(&self) -> Option<&str> {
        self.fallback_next().or_else(|| self.next())
    }

    /// Every successor id this question can route to, with the field it came from.
    pub fn successors(&self) -> Vec<(&'static str, &str)> {
        let mut refs = Vec::new();
        if let Some(next) = self.next() {
            refs.push(("next", next));
        }
        if let Some(next) = self.fallback_next() {
            refs.push(("fallbackNext", next));
        }
        for option in &self.options {
            if let Some(next) = option.next.as_deref() {
                refs.push(("options[].next", next));
            }
            if let Some(next) = option.next_if_selected.as_deref() {
                refs.push(("options[].next_if_selected", next));
            }
        }
        for logic in &self.conditional_next {
            for route in &logic.routes {
                if let Some(next) = route.next.as_deref() {
                    refs.push(("conditionalNext[].routes[].next", next));
                }
            }
        }
        refs
    }
}

/// The kind of question, determining the expected answer shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum QuestionKind {
    /// Pick exactly one option; answered with the option id.
    SingleChoice,

    /// Pick any number of options; answered with the list of option ids.
    MultipleChoice,

    /// Free text input.
    FreeText,

    /// Numeric input.
    Number,

    /// Display-only statement (closing messages). Acknowledged, never answered.
    Statement,

    /// Free text backed by an external autocomplete source.
    Lookup(LookupSource),
}

impl QuestionKind {
    /// Name used in survey files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleChoice => "singleChoice",
            Self::MultipleChoice => "multipleChoice",
            Self::FreeText => "freeText",
            Self::Number => "number",
            Self::Statement => "text",
            Self::Lookup(source) => source.as_str(),
        }
    }

    /// Check if this kind carries options.
    pub fn is_choice(&self) -> bool {
        matches!(self, Self::SingleChoice | Self::MultipleChoice)
    }

    /// Check if this kind collects free text (plain or lookup).
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::FreeText | Self::Lookup(_))
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for QuestionKind {
    type Error = String;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Ok(match name.as_str() {
            "singleChoice" => Self::SingleChoice,
            "multipleChoice" => Self::MultipleChoice,
            "freeText" => Self::FreeText,
            "number" => Self::Number,
            "text" => Self::Statement,
            "commune" => Self::Lookup(LookupSource::Commune),
            "street" => Self::Lookup(LookupSource::Street),
            "gare" => Self::Lookup(LookupSource::Gare),
            "station" => Self::Lookup(LookupSource::Station),
            other => return Err(format!("unknown question type '{other}'")),
        })
    }
}

impl From<QuestionKind> for String {
    fn from(kind: QuestionKind) -> Self {
        kind.as_str().to_string()
    }
}

/// External reference list backing a lookup question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupSource {
    Commune,
    Street,
    Gare,
    Station,
}

impl LookupSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commune => "commune",
            Self::Street => "street",
            Self::Gare => "gare",
            Self::Station => "station",
        }
    }
}

/// Input validation attached to a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Validation {
    Numeric,
    Email,
}

/// An option of a choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyOption {
    /// Unique within its question.
    pub id: OptionId,

    pub text: String,

    /// Successor when this option is chosen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,

    /// Precision detour taken when this option is chosen; overrides `next`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_if_selected: Option<String>,
}

impl SurveyOption {
    /// Create an option without routing.
    pub fn new(id: OptionId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            next: None,
            next_if_selected: None,
        }
    }

    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next = Some(next.into());
        self
    }

    pub fn with_next_if_selected(mut self, next: impl Into<String>) -> Self {
        self.next_if_selected = Some(next.into());
        self
    }

    /// The successor chosen by selecting this option, `next_if_selected` first.
    pub fn target(&self) -> Option<&str> {
        self.next_if_selected.as_deref().or(self.next.as_deref())
    }
}

/// A condition plus the routes it selects between.
///
/// Two forms are found in survey files:
/// - answer-keyed: `condition` is a question id, each route `value` is an
///   expected answer of that question;
/// - expression: `condition` is a boolean expression, and routes are picked
///   when it holds (route values repeat the expression or refine it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalLogic {
    pub condition: String,
    pub routes: Vec<ConditionalRoute>,
}

impl ConditionalLogic {
    pub fn new(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            routes: Vec::new(),
        }
    }

    /// Append a route.
    pub fn with_route(mut self, route: ConditionalRoute) -> Self {
        self.routes.push(route);
        self
    }
}

/// One route of a `ConditionalLogic`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalRoute {
    pub value: Literal,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ConditionalRoute {
    /// A routing entry.
    pub fn to_next(value: impl Into<Literal>, next: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            next: Some(next.into()),
            text: None,
        }
    }

    /// A display-text entry.
    pub fn to_text(value: impl Into<Literal>, text: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            next: None,
            text: Some(text.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_survey_file_fields() {
        let json = r#"{
            "id": "STUDIES_TYPE",
            "text": "Quel type d'études ?",
            "type": "multipleChoice",
            "condition": "STUDENT_CHECK == 1",
            "options": [
                { "id": 1, "text": "Université" },
                { "id": 6, "text": "Autre", "next_if_selected": "STUDIES_OTHER" }
            ],
            "next": "TRANSPORT_FREQUENCY"
        }"#;

        let question: Question = serde_json::from_str(json).unwrap();
        assert_eq!(question.id(), "STUDIES_TYPE");
        assert_eq!(question.kind(), QuestionKind::MultipleChoice);
        assert_eq!(question.condition(), Some("STUDENT_CHECK == 1"));
        assert_eq!(question.option(6).unwrap().target(), Some("STUDIES_OTHER"));
        assert_eq!(question.next(), Some("TRANSPORT_FREQUENCY"));
    }

    #[test]
    fn lookup_kinds_share_one_variant() {
        for name in ["commune", "street", "gare", "station"] {
            let kind = QuestionKind::try_from(name.to_string()).unwrap();
            assert!(kind.is_textual());
            assert_eq!(kind.as_str(), name);
        }
        assert!(QuestionKind::try_from("slider".to_string()).is_err());
    }

    #[test]
    fn next_if_selected_wins_over_next() {
        let option = SurveyOption::new(4, "Autre")
            .with_next("Q2")
            .with_next_if_selected("Q1_AUTRE");
        assert_eq!(option.target(), Some("Q1_AUTRE"));
    }

    #[test]
    fn skip_target_prefers_fallback() {
        let question = Question::new("Q", "?", QuestionKind::FreeText)
            .with_next("A")
            .with_fallback_next("B");
        assert_eq!(question.skip_target(), Some("B"));
    }
}
