use std::collections::{HashMap, HashSet};

use crate::condition::{self, Condition};
use crate::{Answers, ConditionalLogic, ConditionalRoute, END, GraphError, Literal, Question};

/// The immutable set of questions and routing rules of a survey.
///
/// Built once at startup. Construction validates the whole graph and compiles
/// every condition, so traversal never meets a dangling id or an expression
/// it cannot parse.
#[derive(Debug, Clone)]
pub struct QuestionGraph {
    questions: Vec<Question>,
    index: HashMap<String, usize>,
    conditions: HashMap<String, Condition>,
}

impl QuestionGraph {
    /// Validate and index the given questions.
    pub fn new(questions: Vec<Question>) -> Result<Self, GraphError> {
        if questions.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut index = HashMap::with_capacity(questions.len());
        for (position, question) in questions.iter().enumerate() {
            if index.insert(question.id().to_string(), position).is_some() {
                return Err(GraphError::DuplicateQuestion(question.id().to_string()));
            }
        }

        let mut graph = Self {
            questions,
            index,
            conditions: HashMap::new(),
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Parse a JSON array of questions.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let questions: Vec<Question> = serde_json::from_str(json)?;
        Self::new(questions)
    }

    fn validate(&mut self) -> Result<(), GraphError> {
        let mut conditions = HashMap::new();

        for question in &self.questions {
            let mut seen = HashSet::new();
            for option in question.options() {
                if !seen.insert(option.id) {
                    return Err(GraphError::DuplicateOption {
                        question: question.id().to_string(),
                        option: option.id,
                    });
                }
            }

            for (field, target) in question.successors() {
                if target != END && !self.contains(target) {
                    return Err(GraphError::DanglingReference {
                        question: question.id().to_string(),
                        field,
                        target: target.to_string(),
                    });
                }
            }

            if let Some(expression) = question.condition() {
                self.compile(&mut conditions, question, "condition", expression)?;
            }
            if let Some(logic) = question.conditional_text() {
                self.compile_logic(&mut conditions, question, "conditionalText", logic)?;
            }
            for logic in question.conditional_next() {
                self.compile_logic(&mut conditions, question, "conditionalNext", logic)?;
            }
        }

        self.conditions = conditions;
        Ok(())
    }

    fn compile_logic(
        &self,
        conditions: &mut HashMap<String, Condition>,
        question: &Question,
        field: &'static str,
        logic: &ConditionalLogic,
    ) -> Result<(), GraphError> {
        let condition = self.compile(conditions, question, field, &logic.condition)?;
        if condition.as_question_id().is_some() {
            // Answer-keyed routes: values are plain answers, not expressions.
            return Ok(());
        }
        for route in &logic.routes {
            let expression = route.value.to_string();
            if expression.trim() != logic.condition.trim() {
                self.compile(conditions, question, field, &expression)?;
            }
        }
        Ok(())
    }

    fn compile(
        &self,
        conditions: &mut HashMap<String, Condition>,
        question: &Question,
        field: &'static str,
        expression: &str,
    ) -> Result<Condition, GraphError> {
        if let Some(compiled) = conditions.get(expression) {
            return Ok(compiled.clone());
        }

        let compiled =
            Condition::parse(expression).map_err(|source| GraphError::MalformedCondition {
                question: question.id().to_string(),
                field,
                source,
            })?;
        if let Some(target) = compiled.referenced_questions().find(|id| !self.contains(id)) {
            return Err(GraphError::UnknownConditionReference {
                question: question.id().to_string(),
                field,
                target: target.to_string(),
            });
        }

        conditions.insert(expression.to_string(), compiled.clone());
        Ok(compiled)
    }

    /// Get a question by id.
    pub fn get(&self, id: &str) -> Option<&Question> {
        self.index.get(id).map(|&i| &self.questions[i])
    }

    /// All questions in declaration order.
    pub fn all(&self) -> &[Question] {
        &self.questions
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// The compiled form of an expression used somewhere in this graph.
    pub fn condition(&self, expression: &str) -> Option<&Condition> {
        self.conditions.get(expression)
    }

    /// Evaluate an expression, using the compiled form when the graph has one.
    pub fn evaluate(&self, expression: &str, answers: &Answers) -> bool {
        match self.conditions.get(expression) {
            Some(compiled) => compiled.evaluate(answers),
            None => condition::evaluate(expression, answers),
        }
    }

    /// The first route of `logic` selected by the current answers.
    ///
    /// When the condition is a bare question id, routes are keyed by that
    /// question's answer. Otherwise the condition is a boolean guard, and
    /// once it holds the first route whose value repeats the guard or is an
    /// expression that also holds is selected.
    pub fn select_route<'q>(
        &self,
        logic: &'q ConditionalLogic,
        answers: &Answers,
    ) -> Option<&'q ConditionalRoute> {
        let keyed_by = self
            .condition(&logic.condition)
            .and_then(Condition::as_question_id);

        if let Some(question) = keyed_by {
            let answer = answers.get(question)?;
            return logic
                .routes
                .iter()
                .find(|route| route.value.matches_answer(answer));
        }

        if !self.evaluate(&logic.condition, answers) {
            return None;
        }
        logic.routes.iter().find(|route| match &route.value {
            Literal::Text(text) if text.trim() == logic.condition.trim() => true,
            value => self.evaluate(&value.to_string(), answers),
        })
    }
}
