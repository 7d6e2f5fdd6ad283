use questflow_types::{
    ConditionalLogic, ConditionalRoute, GraphError, LookupSource, Question, QuestionKind,
    SurveyDefinition, SurveyOption, Validation,
};

/// Age gate: respondents under 16 are turned away.
pub fn age_check() -> Result<SurveyDefinition, GraphError> {
    let questions = vec![
        Question::new("AGE_CHECK", "Quel âge avez-vous ?", QuestionKind::Number)
            .with_validation(Validation::Numeric)
            .with_conditional_next(
                ConditionalLogic::new("AGE_CHECK < 16")
                    .with_route(ConditionalRoute::to_next("AGE_CHECK < 16", "TOO_YOUNG")),
            )
            .with_fallback_next("CITY"),
        Question::new(
            "TOO_YOUNG",
            "Désolé, cette enquête est réservée aux 16 ans et plus.",
            QuestionKind::Statement,
        ),
        Question::new("CITY", "Dans quelle commune habitez-vous ?", QuestionKind::FreeText)
            .with_condition("AGE_CHECK >= 16"),
    ];
    Ok(SurveyDefinition::new("AGE_CHECK", questions)?.with_title("Contrôle d'âge"))
}

/// "Autre" option with a precision question.
pub fn other_precision() -> Result<SurveyDefinition, GraphError> {
    let questions = vec![
        Question::new("Q1", "Quel mode de transport utilisez-vous ?", QuestionKind::SingleChoice)
            .with_options(vec![
                SurveyOption::new(1, "Bus"),
                SurveyOption::new(2, "Train"),
                SurveyOption::new(3, "Vélo"),
                SurveyOption::new(4, "Autre")
                    .with_next("Q2")
                    .with_next_if_selected("Q1_AUTRE"),
            ])
            .with_next("Q2"),
        Question::new("Q1_AUTRE", "Précisez :", QuestionKind::FreeText)
            .with_placeholder("Ex: trottinette")
            .with_next("Q2"),
        Question::new("Q2", "Combien de trajets par semaine ?", QuestionKind::Number),
    ];
    SurveyDefinition::new("Q1", questions)
}

/// Multiple choice where one option asks for details.
pub fn transport_modes() -> Result<SurveyDefinition, GraphError> {
    let questions = vec![
        Question::new("MODES", "Quels modes utilisez-vous ?", QuestionKind::MultipleChoice)
            .with_options(vec![
                SurveyOption::new(1, "Bus"),
                SurveyOption::new(2, "Train"),
                SurveyOption::new(3, "Autre").with_next_if_selected("PRECISION"),
            ])
            .with_next("DONE"),
        Question::new("PRECISION", "Précisez les autres modes :", QuestionKind::FreeText)
            .with_condition("MODES CONTAINS 3")
            .with_next("DONE"),
        Question::new("DONE", "Merci !", QuestionKind::Statement),
    ];
    SurveyDefinition::new("MODES", questions)
}

/// Routes keyed by the answer to a lookup question.
pub fn city_lines() -> Result<SurveyDefinition, GraphError> {
    let questions = vec![
        Question::new("CITY", "Votre commune ?", QuestionKind::Lookup(LookupSource::Commune))
            .with_conditional_next(
                ConditionalLogic::new("CITY")
                    .with_route(ConditionalRoute::to_next("Vannes", "VANNES_LINES"))
                    .with_route(ConditionalRoute::to_next("Lorient", "LORIENT_LINES")),
            )
            .with_next("OTHER_LINES"),
        Question::new("VANNES_LINES", "Quelle ligne Kicéo ?", QuestionKind::FreeText),
        Question::new("LORIENT_LINES", "Quelle ligne CTRL ?", QuestionKind::FreeText),
        Question::new("OTHER_LINES", "Quelle ligne ?", QuestionKind::FreeText),
    ];
    SurveyDefinition::new("CITY", questions)
}
