use serde::Deserialize;

use crate::{GraphError, Question, QuestionGraph};

/// A loaded survey: metadata, entry point and the validated question graph.
#[derive(Debug, Clone)]
pub struct SurveyDefinition {
    /// Title shown in headers and stored with each record.
    pub title: String,

    pub description: Option<String>,

    /// Optional message shown before the first question.
    pub welcome_message: Option<String>,

    pub version: Option<String>,

    start_question_id: String,
    graph: QuestionGraph,
}

/// On-disk shape of a survey file.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SurveyFile {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    welcome_message: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    start_question_id: Option<String>,
    questions: Vec<Question>,
}

impl SurveyDefinition {
    /// Create a survey starting at `start_question_id`.
    pub fn new(
        start_question_id: impl Into<String>,
        questions: Vec<Question>,
    ) -> Result<Self, GraphError> {
        let graph = QuestionGraph::new(questions)?;
        Self::from_graph(start_question_id, graph)
    }

    /// Wrap an already validated graph.
    pub fn from_graph(
        start_question_id: impl Into<String>,
        graph: QuestionGraph,
    ) -> Result<Self, GraphError> {
        let start_question_id = start_question_id.into();
        if !graph.contains(&start_question_id) {
            return Err(GraphError::UnknownStartQuestion(start_question_id));
        }
        Ok(Self {
            title: String::new(),
            description: None,
            welcome_message: None,
            version: None,
            start_question_id,
            graph,
        })
    }

    /// Parse a survey file.
    ///
    /// When `startQuestionId` is omitted the first declared question is the
    /// entry point.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let file: SurveyFile = serde_json::from_str(json)?;
        let start = match file.start_question_id {
            Some(start) => start,
            None => file
                .questions
                .first()
                .map(|q| q.id().to_string())
                .ok_or(GraphError::Empty)?,
        };

        let mut survey = Self::new(start, file.questions)?;
        survey.title = file.title;
        survey.description = file.description;
        survey.welcome_message = file.welcome_message;
        survey.version = file.version;
        Ok(survey)
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the welcome message.
    pub fn with_welcome_message(mut self, message: impl Into<String>) -> Self {
        self.welcome_message = Some(message.into());
        self
    }

    /// Set the version tag.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn start_question_id(&self) -> &str {
        &self.start_question_id
    }

    pub fn graph(&self) -> &QuestionGraph {
        &self.graph
    }

    /// All questions in declaration order.
    pub fn questions(&self) -> &[Question] {
        self.graph.all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_metadata_and_start() {
        let survey = SurveyDefinition::from_json(
            r#"{
                "title": "Enquête",
                "version": "2.0-test",
                "startQuestionId": "B",
                "questions": [
                    {"id": "A", "text": "a", "type": "freeText"},
                    {"id": "B", "text": "b", "type": "freeText", "next": "A"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(survey.title, "Enquête");
        assert_eq!(survey.version.as_deref(), Some("2.0-test"));
        assert_eq!(survey.start_question_id(), "B");
        assert_eq!(survey.questions().len(), 2);
    }

    #[test]
    fn start_defaults_to_first_question() {
        let survey = SurveyDefinition::from_json(
            r#"{"questions": [{"id": "FIRST", "text": "?", "type": "number"}]}"#,
        )
        .unwrap();
        assert_eq!(survey.start_question_id(), "FIRST");
    }

    #[test]
    fn rejects_unknown_start() {
        let result = SurveyDefinition::from_json(
            r#"{"startQuestionId": "NOPE", "questions": [{"id": "A", "text": "?", "type": "number"}]}"#,
        );
        assert!(matches!(result, Err(GraphError::UnknownStartQuestion(id)) if id == "NOPE"));
    }

    #[test]
    fn rejects_unparseable_file() {
        assert!(matches!(
            SurveyDefinition::from_json("{not json"),
            Err(GraphError::Parse(_))
        ));
    }
}
