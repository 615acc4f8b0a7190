//! Report shape validation.
//!
//! Model output is free text; the first JSON object is carved out of it and
//! checked against a per-meeting-type schema before anything is persisted.
//! Only `summary` is hard-required; section fields are typed but optional so
//! a sparse meeting still yields a report.
use jsonschema::{Draft, JSONSchema};
use once_cell::sync::OnceCell;
use serde_yaml::Value;

use crate::model::MeetingType;
use crate::Error;

/// Compiled validation snippet for one report shape. Schemas are authored in
/// YAML and converted to JSON for compilation.
struct ReportSpec {
    schema: JSONSchema,
}

impl ReportSpec {
    fn from_schema(conf: &str) -> Result<Self, Error> {
        let v: Value = serde_yaml::from_str(conf)?;
        let intermediate = serde_json::to_string(&v)?;
        let f: serde_json::Value = serde_json::from_str(&intermediate)?;

        let schema = match JSONSchema::options().with_draft(Draft::Draft7).compile(&f) {
            Ok(js) => js,
            Err(e) => return Err(Error::InvalidValidationSchema(format!("{e}"))),
        };

        Ok(ReportSpec { schema })
    }

    fn validate(&self, report: &serde_json::Value) -> Result<(), Error> {
        let result = self.schema.validate(report);
        if let Err(errors) = result {
            let errs: Vec<String> = errors.into_iter().map(|i| format!("{}", i)).collect();
            return Err(Error::ReportFailedValidation(errs.join(" ")));
        }
        Ok(())
    }
}

const GENERAL_SCHEMA: &str = "type: object
required:
  - summary
properties:
  summary:
    type: string
  keyTopics:
    type: array
    items:
      type: string
  highlights:
    type: array
  lowlights:
    type: array
  decisions:
    type: array
  actions:
    type: array
    items:
      type: object
      properties:
        task:
          type: string
        owner:
          type: string
        deadline:
          type: string
        priority:
          type: string
          enum: [high, medium, low]
  participants:
    type: array
  duration:
    type: string
  meetingType:
    type: string";

const WEEKLY_SCHEMA: &str = "type: object
required:
  - summary
properties:
  summary:
    type: string
  teamKPI:
    type: object
    properties:
      overview:
        type: string
      individuals:
        type: array
        items:
          type: object
          properties:
            name:
              type: string
            kpi:
              type: string
            status:
              type: string
              enum: [on-track, at-risk, completed]
  announcements:
    type: array
  projectReviews:
    type: array
    items:
      type: object
      properties:
        project:
          type: string
        progress:
          type: string
        followUps:
          type: array
        highlights:
          type: array
        lowlights:
          type: array
        risks:
          type: array
          items:
            type: object
            properties:
              impact:
                type: string
                enum: [high, medium, low]
              mitigation:
                type: string
        challenges:
          type: array
  decisions:
    type: array
  actions:
    type: array
  participants:
    type: array
  nextMeeting:
    type: string";

const TECH_SCHEMA: &str = "type: object
required:
  - summary
properties:
  summary:
    type: string
  topics:
    type: array
    items:
      type: object
      properties:
        topic:
          type: string
        discussion:
          type: string
        conclusion:
          type: string
  highlights:
    type: array
  lowlights:
    type: array
  actions:
    type: array
  knowledgeBase:
    type: array
    items:
      type: object
      properties:
        title:
          type: string
        content:
          type: string
  participants:
    type: array
  techStack:
    type: array";

const CUSTOMER_SCHEMA: &str = "type: object
required:
  - summary
properties:
  summary:
    type: string
  customerInfo:
    type: object
    properties:
      company:
        type: string
      attendees:
        type: array
  awsAttendees:
    type: array
  customerNeeds:
    type: array
    items:
      type: object
      properties:
        need:
          type: string
        priority:
          type: string
          enum: [high, medium, low]
        background:
          type: string
  painPoints:
    type: array
    items:
      type: object
      properties:
        point:
          type: string
        detail:
          type: string
  solutionsDiscussed:
    type: array
    items:
      type: object
      properties:
        solution:
          type: string
        awsServices:
          type: array
        customerFeedback:
          type: string
  commitments:
    type: array
    items:
      type: object
      properties:
        party:
          type: string
          enum: [AWS, 客户]
        commitment:
          type: string
        owner:
          type: string
        deadline:
          type: string
  nextSteps:
    type: array
  participants:
    type: array";

fn spec_for(meeting_type: MeetingType) -> Result<&'static ReportSpec, Error> {
    static GENERAL: OnceCell<ReportSpec> = OnceCell::new();
    static WEEKLY: OnceCell<ReportSpec> = OnceCell::new();
    static TECH: OnceCell<ReportSpec> = OnceCell::new();
    static CUSTOMER: OnceCell<ReportSpec> = OnceCell::new();

    match meeting_type {
        MeetingType::General => GENERAL.get_or_try_init(|| ReportSpec::from_schema(GENERAL_SCHEMA)),
        MeetingType::Weekly => WEEKLY.get_or_try_init(|| ReportSpec::from_schema(WEEKLY_SCHEMA)),
        MeetingType::Tech => TECH.get_or_try_init(|| ReportSpec::from_schema(TECH_SCHEMA)),
        MeetingType::Customer => {
            CUSTOMER.get_or_try_init(|| ReportSpec::from_schema(CUSTOMER_SCHEMA))
        }
    }
}

/// Carve the first JSON object out of a model completion and parse it. The
/// object runs from the first `{` to the last `}`; models habitually wrap
/// their answer in prose despite the prompt.
pub fn extract_report(completion: &str) -> Result<serde_json::Value, Error> {
    let start = completion.find('{').ok_or_else(|| {
        Error::ReportFailedValidation("model output contains no JSON object".into())
    })?;
    let end = completion.rfind('}').filter(|end| *end > start).ok_or_else(|| {
        Error::ReportFailedValidation("model output contains no JSON object".into())
    })?;

    serde_json::from_str(&completion[start..=end]).map_err(|e| {
        Error::ReportFailedValidation(format!("model output is not valid JSON: {e}"))
    })
}

/// Validate a parsed report against its meeting type's schema.
pub fn validate_report(
    meeting_type: MeetingType,
    report: &serde_json::Value,
) -> Result<(), Error> {
    spec_for(meeting_type)?.validate(report)
}
