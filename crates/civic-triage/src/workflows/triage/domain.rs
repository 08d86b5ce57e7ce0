use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for reported issues.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueId(pub String);

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Infrastructure categories a citizen can file a report under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCategory {
    StreetLights,
    Potholes,
    GarbageCollection,
    WaterLeakage,
    SewageOverflow,
    RoadMaintenance,
    TrafficSignals,
    PublicToilets,
    ParkMaintenance,
    NoisePollution,
    IllegalConstruction,
    Other,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 12] = [
        IssueCategory::StreetLights,
        IssueCategory::Potholes,
        IssueCategory::GarbageCollection,
        IssueCategory::WaterLeakage,
        IssueCategory::SewageOverflow,
        IssueCategory::RoadMaintenance,
        IssueCategory::TrafficSignals,
        IssueCategory::PublicToilets,
        IssueCategory::ParkMaintenance,
        IssueCategory::NoisePollution,
        IssueCategory::IllegalConstruction,
        IssueCategory::Other,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            IssueCategory::StreetLights => "street-lights",
            IssueCategory::Potholes => "potholes",
            IssueCategory::GarbageCollection => "garbage-collection",
            IssueCategory::WaterLeakage => "water-leakage",
            IssueCategory::SewageOverflow => "sewage-overflow",
            IssueCategory::RoadMaintenance => "road-maintenance",
            IssueCategory::TrafficSignals => "traffic-signals",
            IssueCategory::PublicToilets => "public-toilets",
            IssueCategory::ParkMaintenance => "park-maintenance",
            IssueCategory::NoisePollution => "noise-pollution",
            IssueCategory::IllegalConstruction => "illegal-construction",
            IssueCategory::Other => "other",
        }
    }

    /// Map a free-form category string onto the fixed set; anything unrecognised is `Other`.
    pub fn from_label(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.label() == normalized)
            .unwrap_or(IssueCategory::Other)
    }
}

/// Where the citizen observed the problem. No geocoding is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub metropolitan_city: String,
    pub area: String,
    pub exact_address: String,
}

/// A single uploaded image. The payload travels base64-encoded on the wire.
///
/// `size` always reflects the decoded payload; any size sent by the client is ignored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PhotoUpload")]
pub struct PhotoArtifact {
    pub mime_type: String,
    pub filename: String,
    pub size: usize,
    #[serde(serialize_with = "base64_payload::serialize")]
    pub data: Vec<u8>,
}

#[derive(Deserialize)]
struct PhotoUpload {
    mime_type: String,
    filename: String,
    #[serde(deserialize_with = "base64_payload::deserialize")]
    data: Vec<u8>,
}

impl From<PhotoUpload> for PhotoArtifact {
    fn from(upload: PhotoUpload) -> Self {
        PhotoArtifact::new(upload.mime_type, upload.filename, upload.data)
    }
}

impl PhotoArtifact {
    pub fn new(mime_type: impl Into<String>, filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            filename: filename.into(),
            size: data.len(),
            data,
        }
    }
}

impl fmt::Debug for PhotoArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhotoArtifact")
            .field("mime_type", &self.mime_type)
            .field("filename", &self.filename)
            .field("size", &self.size)
            .field("data_len", &self.data.len())
            .finish()
    }
}

mod base64_payload {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        STANDARD
            .decode(raw.trim())
            .map_err(serde::de::Error::custom)
    }
}

/// Raw intake payload as submitted by the citizen-facing form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSubmission {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: Location,
    #[serde(default)]
    pub photos: Vec<PhotoArtifact>,
}

/// One labelled contributor to a priority score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityFactor {
    pub factor: String,
    pub impact: String,
    pub score: u8,
}

/// Which scoring path produced an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentSource {
    Model,
    Rules,
}

/// Output of the triage core. Field names follow the model's JSON contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityAssessment {
    pub priority: u8,
    pub priority_reason: String,
    pub severity_factors: Vec<SeverityFactor>,
    pub confidence: f64,
    pub source: AssessmentSource,
}

/// Lifecycle states tracked for every issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueStatus {
    Reported,
    Acknowledged,
    Assigned,
    InProgress,
    #[serde(alias = "completed")]
    Resolved,
    Rejected,
    Closed,
}

impl IssueStatus {
    pub const fn label(self) -> &'static str {
        match self {
            IssueStatus::Reported => "reported",
            IssueStatus::Acknowledged => "acknowledged",
            IssueStatus::Assigned => "assigned",
            IssueStatus::InProgress => "in-progress",
            IssueStatus::Resolved => "resolved",
            IssueStatus::Rejected => "rejected",
            IssueStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Evidence a technician attaches once the work is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvidence {
    pub technician_id: String,
    pub notes: String,
    #[serde(default)]
    pub photos: Vec<PhotoArtifact>,
    pub submitted_at: DateTime<Utc>,
}

/// The tracked work item: intake facts, its assessment, and lifecycle metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueReport {
    pub id: IssueId,
    pub title: String,
    pub description: String,
    pub category: IssueCategory,
    pub location: Location,
    pub photos: Vec<PhotoArtifact>,
    pub assessment: Option<PriorityAssessment>,
    pub status: IssueStatus,
    pub assignee: Option<String>,
    pub completion: Option<CompletionEvidence>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IssueReport {
    pub fn new(id: IssueId, submission: IssueSubmission, photos: Vec<PhotoArtifact>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: submission.title.trim().to_string(),
            description: submission.description.trim().to_string(),
            category: IssueCategory::from_label(&submission.category),
            location: submission.location,
            photos,
            assessment: None,
            status: IssueStatus::Reported,
            assignee: None,
            completion: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn priority(&self) -> Option<u8> {
        self.assessment.as_ref().map(|assessment| assessment.priority)
    }

    pub fn view(&self) -> IssueView {
        IssueView {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.label(),
            location: self.location.clone(),
            status: self.status.label(),
            priority: self.priority(),
            assessment: self.assessment.clone(),
            assignee: self.assignee.clone(),
            photos: self.photos.iter().map(|photo| photo.filename.clone()).collect(),
            completed_by: self
                .completion
                .as_ref()
                .map(|evidence| evidence.technician_id.clone()),
            version: self.version,
            created_at: self.created_at,
        }
    }
}

/// API-facing representation that leaves photo payloads out.
#[derive(Debug, Clone, Serialize)]
pub struct IssueView {
    pub id: IssueId,
    pub title: String,
    pub description: String,
    pub category: &'static str,
    pub location: Location,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<PriorityAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub photos: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
}
