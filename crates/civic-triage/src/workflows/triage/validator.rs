use serde_json::{Map, Value};

use super::domain::{AssessmentSource, PriorityAssessment, SeverityFactor};

const REQUIRED_FIELDS: [&str; 4] = ["priority", "priorityReason", "severityFactors", "confidence"];
const UNKNOWN_FACTOR: &str = "Unknown";
const MISSING_IMPACT: &str = "No description";
const MISSING_REASON: &str = "Priority assessed from the reported details";

/// Model output that cannot be turned into a `PriorityAssessment`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedResponse {
    #[error("no JSON object found in model response")]
    NoJsonObject,
    #[error("model response is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("model response is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("model response field `{0}` has the wrong type")]
    InvalidField(&'static str),
    #[error("severityFactors[{index}] is missing `{field}`")]
    IncompleteFactor { index: usize, field: &'static str },
}

/// Parse free-form model text into a validated, clamped assessment.
///
/// Structure is strict (missing top-level fields or factor keys are fatal) while prose is
/// lenient (blank factor names, impacts and reasons are replaced with defaults).
pub fn parse_assessment(raw: &str) -> Result<PriorityAssessment, MalformedResponse> {
    let span = extract_json_object(raw).ok_or(MalformedResponse::NoJsonObject)?;
    let value: Value = serde_json::from_str(span)
        .map_err(|err| MalformedResponse::InvalidJson(err.to_string()))?;
    let object = value.as_object().ok_or(MalformedResponse::NoJsonObject)?;

    if let Some(missing) = REQUIRED_FIELDS
        .into_iter()
        .find(|field| !object.contains_key(*field))
    {
        return Err(MalformedResponse::MissingField(missing));
    }

    let priority = number(&object["priority"]).ok_or(MalformedResponse::InvalidField("priority"))?;
    let confidence =
        number(&object["confidence"]).ok_or(MalformedResponse::InvalidField("confidence"))?;

    let priority_reason = match &object["priorityReason"] {
        Value::String(reason) if !reason.trim().is_empty() => reason.trim().to_string(),
        Value::String(_) | Value::Null => MISSING_REASON.to_string(),
        _ => return Err(MalformedResponse::InvalidField("priorityReason")),
    };

    let entries = object["severityFactors"]
        .as_array()
        .ok_or(MalformedResponse::InvalidField("severityFactors"))?;
    let severity_factors = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| parse_factor(index, entry))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PriorityAssessment {
        priority: clamp_score(priority),
        priority_reason,
        severity_factors,
        confidence: confidence.clamp(0.0, 1.0),
        source: AssessmentSource::Model,
    })
}

fn parse_factor(index: usize, entry: &Value) -> Result<SeverityFactor, MalformedResponse> {
    let entry = entry
        .as_object()
        .ok_or(MalformedResponse::InvalidField("severityFactors"))?;

    let factor = required(entry, index, "factor")?;
    let impact = required(entry, index, "impact")?;
    let score = required(entry, index, "score")?;
    let score = number(score).ok_or(MalformedResponse::IncompleteFactor {
        index,
        field: "score",
    })?;

    Ok(SeverityFactor {
        factor: prose_or(factor, UNKNOWN_FACTOR),
        impact: prose_or(impact, MISSING_IMPACT),
        score: clamp_score(score),
    })
}

fn required<'a>(
    entry: &'a Map<String, Value>,
    index: usize,
    field: &'static str,
) -> Result<&'a Value, MalformedResponse> {
    entry
        .get(field)
        .ok_or(MalformedResponse::IncompleteFactor { index, field })
}

fn prose_or(value: &Value, default: &str) -> String {
    match value {
        Value::String(text) if !text.trim().is_empty() => text.trim().to_string(),
        _ => default.to_string(),
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn clamp_score(value: f64) -> u8 {
    value.round().clamp(1.0, 10.0) as u8
}

/// Locate the first balanced `{...}` span, ignoring braces inside JSON strings.
pub(crate) fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = r#"{
        "priority": 8,
        "priorityReason": "Exposed live wires at a bus stop",
        "severityFactors": [
            {"factor": "Safety Impact", "impact": "Electrocution risk", "score": 9}
        ],
        "confidence": 0.85
    }"#;

    #[test]
    fn parses_well_formed_payload() {
        let assessment = parse_assessment(WELL_FORMED).expect("valid");
        assert_eq!(assessment.priority, 8);
        assert_eq!(assessment.priority_reason, "Exposed live wires at a bus stop");
        assert_eq!(assessment.severity_factors.len(), 1);
        assert_eq!(assessment.severity_factors[0].score, 9);
        assert!((assessment.confidence - 0.85).abs() < f64::EPSILON);
        assert_eq!(assessment.source, AssessmentSource::Model);
    }

    #[test]
    fn rejects_missing_confidence() {
        let raw = r#"{"priority": 5, "priorityReason": "x", "severityFactors": []}"#;
        assert_eq!(
            parse_assessment(raw),
            Err(MalformedResponse::MissingField("confidence"))
        );
    }

    #[test]
    fn clamps_out_of_range_factor_score() {
        let raw = r#"{"priority": 5, "priorityReason": "x", "confidence": 0.9,
            "severityFactors": [{"factor": "Safety", "impact": "High", "score": 15}]}"#;
        let assessment = parse_assessment(raw).expect("clamped, not rejected");
        assert_eq!(assessment.severity_factors[0].score, 10);
    }

    #[test]
    fn rounds_and_clamps_top_level_numbers() {
        let raw = r#"{"priority": 7.6, "priorityReason": "x", "severityFactors": [],
            "confidence": 1.7}"#;
        let assessment = parse_assessment(raw).expect("valid");
        assert_eq!(assessment.priority, 8);
        assert_eq!(assessment.confidence, 1.0);

        let raw = r#"{"priority": -3, "priorityReason": "x", "severityFactors": [],
            "confidence": -0.2}"#;
        let assessment = parse_assessment(raw).expect("valid");
        assert_eq!(assessment.priority, 1);
        assert_eq!(assessment.confidence, 0.0);
    }

    #[test]
    fn extracts_json_wrapped_in_prose_and_fences() {
        let raw = format!("Here is my analysis:\n```json\n{WELL_FORMED}\n```\nLet me know!");
        let assessment = parse_assessment(&raw).expect("extracted");
        assert_eq!(assessment.priority, 8);
    }

    #[test]
    fn braces_inside_strings_do_not_end_the_object() {
        let raw = r#"{"priority": 4, "priorityReason": "sign reads \"}{\"", "severityFactors": [],
            "confidence": 0.5} trailing {"priority": 9}"#;
        let assessment = parse_assessment(raw).expect("valid");
        assert_eq!(assessment.priority, 4);
        assert_eq!(assessment.priority_reason, "sign reads \"}{\"");
    }

    #[test]
    fn rejects_text_without_json() {
        assert_eq!(
            parse_assessment("I cannot assess this image."),
            Err(MalformedResponse::NoJsonObject)
        );
        assert_eq!(
            parse_assessment("{\"priority\": 5"),
            Err(MalformedResponse::NoJsonObject)
        );
    }

    #[test]
    fn rejects_non_array_factors() {
        let raw = r#"{"priority": 5, "priorityReason": "x", "severityFactors": "none",
            "confidence": 0.5}"#;
        assert_eq!(
            parse_assessment(raw),
            Err(MalformedResponse::InvalidField("severityFactors"))
        );
    }

    #[test]
    fn rejects_factor_without_score() {
        let raw = r#"{"priority": 5, "priorityReason": "x", "confidence": 0.5,
            "severityFactors": [{"factor": "Safety", "impact": "Low"}]}"#;
        assert_eq!(
            parse_assessment(raw),
            Err(MalformedResponse::IncompleteFactor {
                index: 0,
                field: "score"
            })
        );
    }

    #[test]
    fn blank_prose_gets_defaults() {
        let raw = r#"{"priority": 5, "priorityReason": "", "confidence": 0.5,
            "severityFactors": [{"factor": "", "impact": null, "score": 0}]}"#;
        let assessment = parse_assessment(raw).expect("lenient on prose");
        assert_eq!(assessment.priority_reason, MISSING_REASON);
        let factor = &assessment.severity_factors[0];
        assert_eq!(factor.factor, "Unknown");
        assert_eq!(factor.impact, "No description");
        assert_eq!(factor.score, 1);
    }

    #[test]
    fn rejects_non_numeric_priority() {
        let raw = r#"{"priority": "high", "priorityReason": "x", "severityFactors": [],
            "confidence": 0.5}"#;
        assert_eq!(
            parse_assessment(raw),
            Err(MalformedResponse::InvalidField("priority"))
        );
    }
}
