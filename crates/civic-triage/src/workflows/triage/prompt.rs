//! Rubric prompt handed to the scoring model.
//!
//! The criteria weights and bands are part of the scoring contract: changing them changes
//! every score the model produces, so they live in one constant and are rendered verbatim.

use super::domain::Location;

const SCORING_RUBRIC: &str = "\
Score the issue's priority from 1 (lowest) to 10 (highest) using these weighted criteria:

1. Safety Impact (40% weight)
   - 9-10: Immediate danger to life or limb
   - 7-8: Significant risk of injury
   - 4-6: Safety concern but not immediate
   - 1-3: No safety risk

2. Public Health (25% weight)
   - 8-10: Disease risk or contamination
   - 5-7: Sanitation concern
   - 2-4: Minor health impact
   - 1: No health impact

3. Infrastructure Impact (20% weight)
   - 8-10: Critical infrastructure failure
   - 6-7: Major service disruption
   - 3-5: Minor inconvenience
   - 1-2: Cosmetic only

4. Environmental Impact (10% weight)
   - 8-10: Severe environmental damage
   - 5-7: Moderate environmental impact
   - 2-4: Minor environmental impact
   - 1: No environmental impact

5. Urgency (5% weight)
   - 9-10: Emergency, needs action within hours
   - 7-8: Urgent, needs action within a day or two
   - 4-6: Should be addressed within days or weeks
   - 1-3: Can wait for months";

const PHOTO_GUIDANCE: &str = "\
Examine the attached photos carefully and weigh the visible evidence: the severity of any \
damage, hazards that are present, whether people are affected or at risk, and the condition \
of the surrounding environment and infrastructure.";

const RESPONSE_CONTRACT: &str = r#"Respond with a single JSON object in exactly this format:
{
  "priority": <integer 1-10>,
  "priorityReason": "<concise explanation of the overall priority>",
  "severityFactors": [
    {"factor": "<criterion name>", "impact": "<how this issue affects it>", "score": <integer 1-10>}
  ],
  "confidence": <number between 0.0 and 1.0>
}
Return only the JSON object. Do not include any other text, markdown, or commentary."#;

/// Render the scoring instruction for one issue.
pub fn build_prompt(title: &str, description: &str, category: &str, location: &Location) -> String {
    format!(
        "You are an expert municipal infrastructure analyst triaging citizen reports for a \
city works department.\n\n\
ISSUE DETAILS:\n\
- Title: {title}\n\
- Description: {description}\n\
- Category: {category}\n\
- Location: {area}, {city} ({address})\n\n\
{SCORING_RUBRIC}\n\n\
{PHOTO_GUIDANCE}\n\n\
{RESPONSE_CONTRACT}",
        area = location.area,
        city = location.metropolitan_city,
        address = location.exact_address,
    )
}
