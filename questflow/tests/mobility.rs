//! Full traversals of the bundled transport survey.

use example_surveys::mobility;
use pretty_assertions::assert_eq;
use questflow::{
    AnswerOutcome, AnswerValue, Answers, NavigationEngine, NavigationStatus, Reply, ScriptedAnswers,
    SurveyDefinition, SurveyError, collect,
};

fn student() -> ScriptedAnswers {
    ScriptedAnswers::new()
        .with_answer("START", 20)
        .with_answer("AGE_GROUP", 1)
        .with_answer("STUDENT_CHECK", 1)
        .with_answer("STUDIES_TYPE", vec![1u32, 6])
        .with_answer("STUDIES_OTHER", "Beaux-arts")
        .with_answer("TRANSPORT_FREQUENCY", 1)
        .with_answer("REGULAR_USER_QUESTIONS", vec![1u32, 3])
        .with_answer("SATISFACTION_REGULAR", 3)
        .with_answer("PROBLEMS_REGULAR", vec![1u32])
        .with_answer("STATION_PREFERENCE", "Vannes")
        .with_answer("IMPROVEMENT_SUGGESTIONS", "Plus de bus le soir")
        .with_answer("CONTACT_INFO", 1)
        .with_answer("EMAIL_INPUT", "camille@example.fr")
}

/// Questions whose condition is false under the final answers must be absent.
fn assert_no_skipped_answers(survey: &SurveyDefinition, answers: &Answers) {
    let graph = survey.graph();
    for question in graph.all() {
        if let Some(condition) = question.condition()
            && !graph.evaluate(condition, answers)
        {
            assert!(
                !answers.contains(question.id()),
                "{} was skipped but has an answer",
                question.id()
            );
        }
    }
}

#[test]
fn student_path() {
    let survey = mobility().unwrap();
    let mut respondent = student();

    let answers = collect(&survey, &mut respondent).unwrap();

    assert_eq!(
        respondent.prompted(),
        [
            "START",
            "AGE_GROUP",
            "STUDENT_CHECK",
            "STUDIES_TYPE",
            "STUDIES_OTHER",
            "TRANSPORT_FREQUENCY",
            "REGULAR_USER_QUESTIONS",
            "SATISFACTION_REGULAR",
            "PROBLEMS_REGULAR",
            "STATION_PREFERENCE",
            "IMPROVEMENT_SUGGESTIONS",
            "CONTACT_INFO",
            "EMAIL_INPUT",
            "FINAL_THANKS",
        ]
    );
    assert_eq!(answers.len(), 13);
    assert!(!answers.contains("OCCASIONAL_USER_QUESTIONS"));
    assert_no_skipped_answers(&survey, &answers);
}

#[test]
fn student_sees_tailored_texts() {
    let survey = mobility().unwrap();
    let mut engine = NavigationEngine::new(&survey);

    for value in [20, 1, 1] {
        engine.answer(value);
    }
    engine.answer(vec![2u32]);
    engine.answer(2);
    engine.answer(vec![4u32]);

    assert_eq!(
        engine.display_text(),
        Some(
            "En tant qu'étudiant(e), êtes-vous satisfait(e) des transports pour vos trajets quotidiens ?"
        )
    );
}

#[test]
fn worker_location_text_depends_on_status() {
    let survey = mobility().unwrap();
    let mut engine = NavigationEngine::new(&survey);

    engine.answer(30);
    assert_eq!(engine.answer(2), AnswerOutcome::Next("WORK_STATUS".into()));
    assert_eq!(engine.answer(1), AnswerOutcome::Next("WORK_LOCATION".into()));
    assert_eq!(engine.display_text(), Some("Où travaillez-vous principalement ?"));

    engine.go_back();
    engine.answer(3);
    assert_eq!(
        engine.display_text(),
        Some("Où exercez-vous principalement votre activité ?")
    );
}

#[test]
fn job_seeker_goes_to_unemployment_reasons() {
    let survey = mobility().unwrap();
    let mut engine = NavigationEngine::new(&survey);

    engine.answer(40);
    engine.answer(3);
    assert_eq!(engine.answer(6), AnswerOutcome::Next("UNEMPLOYED_REASON".into()));
    assert_eq!(
        engine.answer(vec![6u32]),
        AnswerOutcome::Next("UNEMPLOYED_OTHER".into())
    );
}

#[test]
fn retiree_who_never_rides() {
    let survey = mobility().unwrap();
    let mut respondent = ScriptedAnswers::new()
        .with_answer("START", 70)
        .with_answer("AGE_GROUP", 4)
        .with_answer("RETIREMENT_CHECK", 1)
        .with_answer("RETIREMENT_ACTIVITIES", vec![2u32, 5])
        .with_answer("TRANSPORT_FREQUENCY", 6)
        .with_answer("NO_TRANSPORT_REASON", vec![6u32])
        .with_answer("IMPROVEMENT_SUGGESTIONS", "")
        .with_answer("CONTACT_INFO", 2);

    let answers = collect(&survey, &mut respondent).unwrap();

    assert_eq!(
        respondent.prompted(),
        [
            "START",
            "AGE_GROUP",
            "RETIREMENT_CHECK",
            "RETIREMENT_ACTIVITIES",
            "TRANSPORT_FREQUENCY",
            "NO_TRANSPORT_REASON",
            "IMPROVEMENT_SUGGESTIONS",
            "CONTACT_INFO",
            "FINAL_THANKS",
        ]
    );
    assert_no_skipped_answers(&survey, &answers);
}

#[test]
fn rare_rider_falls_back_to_incentives() {
    let survey = mobility().unwrap();
    let mut engine = NavigationEngine::new(&survey);

    engine.answer(45);
    engine.answer(3);
    engine.answer(4);
    assert_eq!(
        engine.answer("Lorient"),
        AnswerOutcome::Next("TRANSPORT_FREQUENCY".into())
    );
    assert_eq!(
        engine.answer(5),
        AnswerOutcome::Next("RARE_USER_QUESTIONS".into())
    );
}

#[test]
fn replaying_answers_reproduces_the_path() {
    let survey = mobility().unwrap();
    let mut respondent = student();
    let mut first = NavigationEngine::new(&survey);
    questflow::run(&mut first, &mut respondent).unwrap();

    let mut replay = NavigationEngine::new(&survey);
    for (id, value) in first.answers().clone() {
        assert_eq!(replay.current().map(|q| q.id()), Some(id.as_str()));
        replay.answer(value);
    }
    assert_eq!(replay.acknowledge(), AnswerOutcome::Complete);

    assert_eq!(replay.history(), first.history());
    assert_eq!(replay.answers(), first.answers());
}

#[test]
fn back_then_same_answer_reproduces_the_path() {
    let survey = mobility().unwrap();
    let mut engine = NavigationEngine::new(&survey);
    for value in [30, 2, 7] {
        engine.answer(value);
    }
    engine.answer("Congé parental");
    let forward = engine.state().clone();

    assert!(engine.go_back());
    assert!(engine.go_back());
    engine.answer(7);
    engine.answer("Congé parental");

    assert_eq!(engine.state(), &forward);
    assert_eq!(
        engine.status(),
        NavigationStatus::AwaitingAnswer("WORK_LOCATION".into())
    );
}

#[test]
fn respondent_changes_their_mind() {
    let survey = mobility().unwrap();
    let mut respondent = ScriptedAnswers::new()
        .with_answer("START", 30)
        .with_answer("AGE_GROUP", 1)
        .with_reply("STUDENT_CHECK", Reply::Back)
        .with_answer("AGE_GROUP", 3)
        .with_answer("WORK_STATUS", 5)
        .with_answer("WORK_LOCATION", "Auray")
        .with_answer("TRANSPORT_FREQUENCY", 3)
        .with_answer("OCCASIONAL_USER_QUESTIONS", vec![1u32])
        .with_answer("IMPROVEMENT_SUGGESTIONS", "RAS")
        .with_answer("CONTACT_INFO", 2);

    let answers = collect(&survey, &mut respondent).unwrap();

    assert_eq!(
        &respondent.prompted()[..4],
        ["START", "AGE_GROUP", "STUDENT_CHECK", "AGE_GROUP"]
    );
    assert!(!answers.contains("STUDENT_CHECK"));
    assert_eq!(answers.get_number("AGE_GROUP").unwrap(), 3.0);
}

#[test]
fn invalid_email_is_reported_by_the_backend() {
    let survey = mobility().unwrap();
    let script: Vec<(&str, AnswerValue)> = vec![
        ("START", 60.into()),
        ("AGE_GROUP", 4.into()),
        ("RETIREMENT_CHECK", 1.into()),
        ("RETIREMENT_ACTIVITIES", vec![3u32].into()),
        ("TRANSPORT_FREQUENCY", 5.into()),
        ("RARE_USER_QUESTIONS", vec![1u32].into()),
        ("IMPROVEMENT_SUGGESTIONS", "".into()),
        ("CONTACT_INFO", 1.into()),
        ("EMAIL_INPUT", "pas-un-email".into()),
    ];
    let mut respondent = script
        .into_iter()
        .fold(ScriptedAnswers::new(), |r, (id, value)| r.with_answer(id, value));

    let error = collect(&survey, &mut respondent).unwrap_err();
    assert!(matches!(error, SurveyError::Backend(_)));
    assert!(error.to_string().contains("valid email"));
}
