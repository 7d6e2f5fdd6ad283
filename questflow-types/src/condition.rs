//! The condition language used by `condition`, `conditionalNext` and
//! `conditionalText` entries.
//!
//! ```text
//! START >= 16
//! AGE_GROUP == 1 AND STUDENT_CHECK == 1
//! STUDIES_TYPE CONTAINS 6
//! TRANSPORT_FREQUENCY IN [1, 2]
//! WORK_STATUS != 6 AND WORK_STATUS IS NOT NULL
//! EMAIL_INPUT
//! ```
//!
//! Clauses joined by `AND` / `OR` are folded strictly left to right with no
//! precedence: `A OR B AND C` means `(A OR B) AND C`. Survey files in the
//! field rely on that order, so it must not be "fixed" into the usual
//! precedence.

use std::fmt;
use std::str::FromStr;

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, multispace0, multispace1, satisfy},
    combinator::{all_consuming, map, not, opt, recognize, value},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
};
use serde::{Deserialize, Serialize};

use crate::{AnswerValue, Answers};

/// Error produced when an expression cannot be parsed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionError {
    #[error("empty condition")]
    Empty,

    #[error("malformed condition '{expression}' (at byte {position})")]
    Malformed { expression: String, position: usize },
}

/// A literal operand: a number, or a string.
///
/// Bare words that parse as a finite number are numbers, everything else is text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Number(f64),
    Text(String),
}

impl Literal {
    fn from_bare(word: &str) -> Self {
        match word.parse::<f64>() {
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::Text(word.to_string()),
        }
    }

    /// Numeric view: numbers as-is, text when it parses as a finite number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(t) => t.trim().parse().ok().filter(|n: &f64| n.is_finite()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            Self::Number(_) => None,
        }
    }

    /// Loose scalar equality with an answer.
    ///
    /// Numbers compare numerically (numeric text included); other text
    /// compares as strings. Null and list answers never equal a scalar.
    pub fn loosely_equals(&self, answer: &AnswerValue) -> bool {
        match (self, answer) {
            (_, AnswerValue::Null | AnswerValue::Choices(_)) => false,
            (Self::Number(n), other) => other.coerce_number() == Some(*n),
            (Self::Text(t), AnswerValue::Text(s)) => {
                t == s
                    || matches!((self.as_number(), answer.coerce_number()), (Some(a), Some(b)) if a == b)
            }
            (Self::Text(_), AnswerValue::Number(n)) => self.as_number() == Some(*n),
        }
    }

    /// Equality for scalar answers, membership for list answers.
    pub fn matches_answer(&self, answer: &AnswerValue) -> bool {
        match answer {
            AnswerValue::Choices(ids) => self.contained_in(ids),
            other => self.loosely_equals(other),
        }
    }

    fn contained_in(&self, ids: &[u32]) -> bool {
        self.as_number()
            .is_some_and(|n| ids.iter().any(|id| f64::from(*id) == n))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => match crate::answer_value::whole_number(*n) {
                Some(i) => write!(f, "{i}"),
                None => write!(f, "{n}"),
            },
            Self::Text(t) => f.write_str(t),
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Literal {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Literal {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Literal {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
}

impl CompareOp {
    fn ordering_holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Ge => lhs >= rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Lt => lhs < rhs,
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

/// One simple comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `ID`: answered with something non-empty.
    Existence { question: String },

    /// `ID IS NOT NULL` / `ID IS NULL`. Emptiness is not checked.
    NullCheck { question: String, expect_null: bool },

    /// `ID <op> VALUE`.
    Comparison {
        question: String,
        op: CompareOp,
        value: Literal,
    },

    /// `ID CONTAINS VALUE`: the answer is a list holding the value.
    Containment { question: String, value: Literal },

    /// `ID IN [v1, v2, ...]`.
    Membership { question: String, values: Vec<Literal> },
}

impl Clause {
    /// The question id this clause reads.
    pub fn question(&self) -> &str {
        match self {
            Self::Existence { question }
            | Self::NullCheck { question, .. }
            | Self::Comparison { question, .. }
            | Self::Containment { question, .. }
            | Self::Membership { question, .. } => question,
        }
    }

    pub fn evaluate(&self, answers: &Answers) -> bool {
        let answer = answers.get(self.question());
        match self {
            Self::Existence { .. } => answer.is_some_and(|a| !a.is_empty()),
            Self::NullCheck { expect_null, .. } => {
                let present = answer.is_some_and(|a| !a.is_null());
                present != *expect_null
            }
            Self::Comparison { op, value, .. } => match op {
                CompareOp::Eq => answer.is_some_and(|a| value.loosely_equals(a)),
                CompareOp::Ne => !answer.is_some_and(|a| value.loosely_equals(a)),
                ordering => match (answer.and_then(AnswerValue::coerce_number), value.as_number()) {
                    (Some(lhs), Some(rhs)) => ordering.ordering_holds(lhs, rhs),
                    _ => false,
                },
            },
            Self::Containment { value, .. } => {
                matches!(answer, Some(AnswerValue::Choices(ids)) if value.contained_in(ids))
            }
            Self::Membership { values, .. } => {
                answer.is_some_and(|a| values.iter().any(|v| v.loosely_equals(a)))
            }
        }
    }
}

/// A parsed condition: clauses folded left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    first: Clause,
    rest: Vec<(Connective, Clause)>,
}

impl Condition {
    /// Parse an expression.
    pub fn parse(expression: &str) -> Result<Self, ConditionError> {
        if expression.trim().is_empty() {
            return Err(ConditionError::Empty);
        }
        match parse_expression(expression) {
            Ok((_, condition)) => Ok(condition),
            Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(ConditionError::Malformed {
                expression: expression.to_string(),
                position: expression.len() - e.input.len(),
            }),
            Err(nom::Err::Incomplete(_)) => Err(ConditionError::Malformed {
                expression: expression.to_string(),
                position: expression.len(),
            }),
        }
    }

    /// Evaluate against the answers collected so far.
    pub fn evaluate(&self, answers: &Answers) -> bool {
        self.rest
            .iter()
            .fold(self.first.evaluate(answers), |acc, (connective, clause)| {
                let rhs = clause.evaluate(answers);
                match connective {
                    Connective::And => acc && rhs,
                    Connective::Or => acc || rhs,
                }
            })
    }

    /// All clauses in source order.
    pub fn clauses(&self) -> impl Iterator<Item = &Clause> {
        std::iter::once(&self.first).chain(self.rest.iter().map(|(_, c)| c))
    }

    /// Question ids read by this condition.
    pub fn referenced_questions(&self) -> impl Iterator<Item = &str> {
        self.clauses().map(Clause::question)
    }

    /// The question id when the whole condition is a bare identifier.
    pub fn as_question_id(&self) -> Option<&str> {
        match (&self.first, self.rest.is_empty()) {
            (Clause::Existence { question }, true) => Some(question),
            _ => None,
        }
    }
}

impl FromStr for Condition {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Evaluate an expression against answers.
///
/// A malformed expression is logged and evaluates to `false`; it never aborts
/// the traversal.
pub fn evaluate(expression: &str, answers: &Answers) -> bool {
    match Condition::parse(expression) {
        Ok(condition) => condition.evaluate(answers),
        Err(error) => {
            tracing::warn!(%expression, %error, "condition could not be parsed, treating as false");
            false
        }
    }
}

// =============================================================================
// PARSERS
// =============================================================================

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(word), not(satisfy(is_ident_char)))
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_until("\""), char('"')),
        delimited(char('\''), take_until("'"), char('\'')),
    ))(input)
}

fn bare_word(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | '+' | '.'))(input)
}

fn literal(input: &str) -> IResult<&str, Literal> {
    alt((
        map(quoted, |s: &str| Literal::Text(s.to_string())),
        map(bare_word, Literal::from_bare),
    ))(input)
}

fn literal_list(input: &str) -> IResult<&str, Vec<Literal>> {
    delimited(
        pair(char('['), multispace0),
        separated_list0(delimited(multispace0, char(','), multispace0), literal),
        pair(multispace0, char(']')),
    )(input)
}

fn compare_op(input: &str) -> IResult<&str, CompareOp> {
    alt((
        value(CompareOp::Eq, tag("==")),
        value(CompareOp::Ne, tag("!=")),
        value(CompareOp::Ge, tag(">=")),
        value(CompareOp::Le, tag("<=")),
        value(CompareOp::Gt, tag(">")),
        value(CompareOp::Lt, tag("<")),
    ))(input)
}

#[derive(Clone)]
enum Suffix {
    NotNull,
    Null,
    Contains(Literal),
    In(Vec<Literal>),
    Compare(CompareOp, Literal),
}

fn suffix(input: &str) -> IResult<&str, Suffix> {
    alt((
        value(
            Suffix::NotNull,
            tuple((
                keyword("IS"),
                multispace1,
                keyword("NOT"),
                multispace1,
                keyword("NULL"),
            )),
        ),
        value(
            Suffix::Null,
            tuple((keyword("IS"), multispace1, keyword("NULL"))),
        ),
        map(
            preceded(pair(keyword("CONTAINS"), multispace1), literal),
            Suffix::Contains,
        ),
        map(
            preceded(pair(keyword("IN"), multispace0), literal_list),
            Suffix::In,
        ),
        map(
            pair(compare_op, preceded(multispace0, literal)),
            |(op, value)| Suffix::Compare(op, value),
        ),
    ))(input)
}

fn clause(input: &str) -> IResult<&str, Clause> {
    let (input, question) = identifier(input)?;
    let (input, suffix) = opt(preceded(multispace0, suffix))(input)?;
    let question = question.to_string();

    let clause = match suffix {
        None => Clause::Existence { question },
        Some(Suffix::NotNull) => Clause::NullCheck {
            question,
            expect_null: false,
        },
        Some(Suffix::Null) => Clause::NullCheck {
            question,
            expect_null: true,
        },
        Some(Suffix::Contains(value)) => Clause::Containment { question, value },
        Some(Suffix::In(values)) => Clause::Membership { question, values },
        Some(Suffix::Compare(op, value)) => Clause::Comparison {
            question,
            op,
            value,
        },
    };
    Ok((input, clause))
}

fn connective(input: &str) -> IResult<&str, Connective> {
    delimited(
        multispace0,
        alt((
            value(Connective::And, keyword("AND")),
            value(Connective::Or, keyword("OR")),
        )),
        multispace0,
    )(input)
}

fn parse_expression(input: &str) -> IResult<&str, Condition> {
    map(
        all_consuming(delimited(
            multispace0,
            pair(clause, many0(pair(connective, clause))),
            multispace0,
        )),
        |(first, rest)| Condition { first, rest },
    )(input)
}
