use questflow_types::{GraphError, SurveyDefinition};

/// The public transport usage survey, as a survey file.
pub const MOBILITY_JSON: &str = include_str!("../surveys/mobility.json");

/// Load the public transport usage survey.
pub fn mobility() -> Result<SurveyDefinition, GraphError> {
    SurveyDefinition::from_json(MOBILITY_JSON)
}
