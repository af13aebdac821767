//! Request assembly.
//!
//! Responses are filtered by their `topic` field against the report's
//! category focus. A response without a topic is kept for every report.

use serde_json::{json, Value};

use super::GenerationRequest;
use crate::config::ReportSpec;
use crate::db::submission_repo::SubmissionRow;

const SYSTEM_PROMPT: &str = "You are a business analyst writing one section of a client \
assessment. Answer with an HTML fragment only: use <h2> for each requested section, \
<p> and <ul> for content. Do not include <html>, <head> or <body> tags.";

/// Builds the generation request for one spec.
pub fn build_request(spec: &ReportSpec, submission: &SubmissionRow) -> GenerationRequest {
    let focused_responses = submission
        .responses
        .iter()
        .filter(|response| match response.get("topic").and_then(Value::as_str) {
            Some(topic) => spec.focuses_on(topic),
            None => true,
        })
        .cloned()
        .collect();

    GenerationRequest {
        report_type: spec.report_type.clone(),
        title: spec.title.clone(),
        sections: spec.sections.clone(),
        company_profile: submission.company_profile.clone(),
        focused_responses,
    }
}

/// Renders the chat messages for a request.
pub fn render_messages(request: &GenerationRequest) -> Vec<Value> {
    let data = json!({
        "companyProfile": request.company_profile,
        "responses": request.focused_responses,
    });
    let user = format!(
        "Write the \"{}\" report.\nSections, in order: {}.\nAssessment data:\n{}",
        request.title,
        request.sections.join(", "),
        data
    );

    vec![
        json!({"role": "system", "content": SYSTEM_PROMPT}),
        json!({"role": "user", "content": user}),
    ]
}
