use super::domain::{AssessmentSource, PriorityAssessment, SeverityFactor};

const DEFAULT_PRIORITY: u8 = 5;
const RULES_CONFIDENCE: f64 = 0.7;
const URGENT_KEYWORDS: [&str; 7] = [
    "emergency",
    "danger",
    "urgent",
    "broken",
    "flooding",
    "blocked",
    "overflow",
];
const LOW_PRIORITY_KEYWORDS: [&str; 4] = ["cosmetic", "minor", "small", "aesthetic"];

/// Base priority per category. Includes categories outside the intake form's fixed set
/// (e.g. `electrical-hazards`) because the raw submitted string is scored.
fn category_priority(category: &str) -> u8 {
    match category {
        "electrical-hazards" => 9,
        "sewage-overflow" | "traffic-signals" => 8,
        "water-leakage" => 7,
        "potholes" | "road-maintenance" | "illegal-construction" => 6,
        "garbage-collection" | "other" => 5,
        "street-lights" | "public-toilets" => 4,
        "noise-pollution" | "park-maintenance" => 3,
        _ => DEFAULT_PRIORITY,
    }
}

fn tier(priority: u8) -> &'static str {
    if priority > 7 {
        "high"
    } else if priority > 4 {
        "medium"
    } else {
        "low"
    }
}

/// Deterministic category and keyword scorer used whenever the model path fails.
pub fn score_by_rules(title: &str, description: &str, category: &str) -> PriorityAssessment {
    let category = category.trim().to_ascii_lowercase();
    let label = if category.is_empty() {
        "other".to_string()
    } else {
        category.replace('-', " ")
    };

    let mut priority = category_priority(&category);
    let mut severity_factors = Vec::new();
    let text = format!("{title} {description}").to_lowercase();

    if URGENT_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
        priority = (priority + 2).min(10);
        severity_factors.push(SeverityFactor {
            factor: "Urgent Keywords".to_string(),
            impact: "Report describes an urgent or hazardous condition".to_string(),
            score: 8,
        });
    }

    if LOW_PRIORITY_KEYWORDS
        .iter()
        .any(|keyword| text.contains(keyword))
    {
        priority = priority.saturating_sub(2).max(1);
        severity_factors.push(SeverityFactor {
            factor: "Minor Issue Indicators".to_string(),
            impact: "Report describes a minor or cosmetic problem".to_string(),
            score: 3,
        });
    }

    let tier = tier(priority);
    severity_factors.push(SeverityFactor {
        factor: "Category Assessment".to_string(),
        impact: format!("{label} issues in this report are treated as {tier} priority"),
        score: priority,
    });

    PriorityAssessment {
        priority,
        priority_reason: format!(
            "Rule-based assessment: {label} issue classified as {tier} priority"
        ),
        severity_factors,
        confidence: RULES_CONFIDENCE,
        source: AssessmentSource::Rules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factor_names(assessment: &PriorityAssessment) -> Vec<&str> {
        assessment
            .severity_factors
            .iter()
            .map(|factor| factor.factor.as_str())
            .collect()
    }

    #[test]
    fn urgent_electrical_hazard_caps_at_ten() {
        let assessment = score_by_rules(
            "Sparking pole",
            "urgent danger near school",
            "electrical-hazards",
        );
        assert_eq!(assessment.priority, 10);
        assert_eq!(assessment.confidence, 0.7);
        assert_eq!(
            factor_names(&assessment),
            ["Urgent Keywords", "Category Assessment"]
        );
        assert_eq!(assessment.severity_factors[1].score, 10);
        assert!(assessment.priority_reason.contains("high"));
    }

    #[test]
    fn minor_park_issue_floors_at_one() {
        let assessment = score_by_rules(
            "Bench paint",
            "minor cosmetic chip in bench paint",
            "park-maintenance",
        );
        assert_eq!(assessment.priority, 1);
        assert_eq!(assessment.confidence, 0.7);
        assert_eq!(
            factor_names(&assessment),
            ["Minor Issue Indicators", "Category Assessment"]
        );
        assert!(assessment.severity_factors[1].impact.contains("low"));
    }

    #[test]
    fn several_urgent_keywords_raise_priority_once() {
        let assessment = score_by_rules("Road cave-in", "urgent danger, broken", "potholes");
        assert_eq!(assessment.priority, 8);
        assert_eq!(
            factor_names(&assessment),
            ["Urgent Keywords", "Category Assessment"]
        );
        assert_eq!(assessment.severity_factors[1].score, 8);
    }

    #[test]
    fn several_low_keywords_lower_priority_once() {
        let assessment = score_by_rules("Road marking", "minor small cosmetic", "potholes");
        assert_eq!(assessment.priority, 4);
        assert_eq!(
            factor_names(&assessment),
            ["Minor Issue Indicators", "Category Assessment"]
        );
        assert!(assessment.priority_reason.contains("low"));
    }

    #[test]
    fn urgent_and_minor_keywords_cancel_out() {
        let assessment = score_by_rules("Road", "small but broken kerb", "potholes");
        assert_eq!(assessment.priority, 6);
        assert_eq!(
            factor_names(&assessment),
            [
                "Urgent Keywords",
                "Minor Issue Indicators",
                "Category Assessment"
            ]
        );
    }

    #[test]
    fn unknown_category_defaults_to_five() {
        let assessment = score_by_rules("Mystery", "Something odd", "alien-landing");
        assert_eq!(assessment.priority, 5);
        assert_eq!(factor_names(&assessment), ["Category Assessment"]);
        assert!(assessment.priority_reason.contains("medium"));
    }

    #[test]
    fn keywords_match_title_case_insensitively() {
        let assessment = score_by_rules("EMERGENCY: main burst", "water everywhere", "water-leakage");
        assert_eq!(assessment.priority, 9);
    }

    #[test]
    fn category_table_matches_reference_priorities() {
        for (category, expected) in [
            ("sewage-overflow", 8),
            ("traffic-signals", 8),
            ("water-leakage", 7),
            ("road-maintenance", 6),
            ("illegal-construction", 6),
            ("garbage-collection", 5),
            ("street-lights", 4),
            ("public-toilets", 4),
            ("noise-pollution", 3),
        ] {
            let assessment = score_by_rules("Report", "Needs attention", category);
            assert_eq!(assessment.priority, expected, "{category}");
        }
    }

    #[test]
    fn output_is_deterministic() {
        let first = score_by_rules("Blocked drain", "overflow onto street", "sewage-overflow");
        let second = score_by_rules("Blocked drain", "overflow onto street", "sewage-overflow");
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).expect("serializes"),
            serde_json::to_string(&second).expect("serializes")
        );
    }
}
