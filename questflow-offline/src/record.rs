use chrono::{DateTime, Utc};
use questflow_types::Answers;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A completed survey waiting for (or past) remote delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineSurveyRecord {
    pub id: String,
    #[serde(rename = "responses")]
    pub answers: Answers,
    #[serde(rename = "enqueteur")]
    pub surveyor_name: String,
    #[serde(rename = "startTime", default)]
    pub started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub synced: bool,
}

impl OfflineSurveyRecord {
    /// A fresh unsynced record stamped with the current time.
    pub fn new(
        answers: Answers,
        surveyor_name: impl Into<String>,
        started_at: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_record_id(now),
            answers,
            surveyor_name: surveyor_name.into(),
            started_at,
            created_at: now,
            synced: false,
        }
    }
}

/// `survey_<unix millis>_<9 hex chars>`.
pub fn new_record_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("survey_{}_{}", now.timestamp_millis(), &suffix[..9])
}

/// The payload sent to the remote store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    /// Local record id, usable by the remote side to drop duplicates.
    pub record_id: String,
    pub responses: Answers,
    pub surveyor: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed: bool,
}

impl From<&OfflineSurveyRecord> for Submission {
    fn from(record: &OfflineSurveyRecord) -> Self {
        Self {
            record_id: record.id.clone(),
            responses: record.answers.clone(),
            surveyor: record.surveyor_name.clone(),
            started_at: record.started_at,
            completed: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_ids_are_unique_and_prefixed() {
        let now = Utc::now();
        let a = new_record_id(now);
        let b = new_record_id(now);
        assert_ne!(a, b);
        assert!(a.starts_with(&format!("survey_{}_", now.timestamp_millis())));
        assert_eq!(a.rsplit('_').next().map(str::len), Some(9));
    }

    #[test]
    fn stored_form_uses_survey_app_keys() {
        let mut answers = Answers::new();
        answers.insert("AGE_GROUP", 2);
        let record = OfflineSurveyRecord::new(answers, "Maël", None);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["enqueteur"], "Maël");
        assert_eq!(json["responses"]["AGE_GROUP"], 2);
        assert_eq!(json["synced"], false);
        assert!(json.get("createdAt").is_some());

        let back: OfflineSurveyRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn submission_is_marked_completed() {
        let record = OfflineSurveyRecord::new(Answers::new(), "Maël", Some(Utc::now()));
        let submission = Submission::from(&record);
        assert!(submission.completed);
        assert_eq!(submission.record_id, record.id);
        assert_eq!(submission.started_at, record.started_at);
    }
}
