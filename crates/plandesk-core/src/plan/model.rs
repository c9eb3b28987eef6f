//! Plan records and the request shapes the store accepts.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// PlanType
// ---------------------------------------------------------------------------

/// Kind of plan document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Implementation,
    Research,
    Custom,
}

impl PlanType {
    /// Every accepted value, in display order.
    pub const ALL: [PlanType; 3] = [Self::Implementation, Self::Research, Self::Custom];
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Implementation => "implementation",
            Self::Research => "research",
            Self::Custom => "custom",
        };
        f.write_str(s)
    }
}

impl FromStr for PlanType {
    type Err = PlanTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "implementation" => Ok(Self::Implementation),
            "research" => Ok(Self::Research),
            "custom" => Ok(Self::Custom),
            other => Err(PlanTypeParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`PlanType`] string.
#[derive(Debug, Clone)]
pub struct PlanTypeParseError(pub String);

impl fmt::Display for PlanTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid plan type: {:?} (expected implementation, research, or custom)",
            self.0
        )
    }
}

impl std::error::Error for PlanTypeParseError {}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A persisted plan document with its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: Uuid,
    pub filename: String,
    pub title: String,
    #[serde(rename = "type")]
    pub plan_type: PlanType,
    pub session_id: Option<String>,
    pub tags: Vec<String>,
    pub content: String,
    pub working_dir: PathBuf,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A plan without its body, as returned by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub id: Uuid,
    pub filename: String,
    pub title: String,
    #[serde(rename = "type")]
    pub plan_type: PlanType,
    pub session_id: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Plan> for PlanSummary {
    fn from(p: Plan) -> Self {
        Self {
            id: p.id,
            filename: p.filename,
            title: p.title,
            plan_type: p.plan_type,
            session_id: p.session_id,
            tags: p.tags,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Input for creating a plan. Omitted title and type are derived from the
/// content.
#[derive(Debug, Clone, Default)]
pub struct NewPlan {
    pub content: String,
    pub title: Option<String>,
    pub plan_type: Option<PlanType>,
    pub session_id: Option<String>,
    pub tags: Vec<String>,
}

impl NewPlan {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Input for rewriting an existing plan. Type, session and tags are kept.
#[derive(Debug, Clone)]
pub struct PlanUpdate {
    pub content: String,
    /// Replacement title; the stored title is kept when `None`.
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_type_parse_rejects_unknown() {
        let err = "design".parse::<PlanType>().unwrap_err();
        assert!(err.to_string().contains("\"design\""));
    }

    #[test]
    fn plan_type_display_matches_parse() {
        for t in PlanType::ALL {
            assert_eq!(t.to_string().parse::<PlanType>().unwrap(), t);
        }
    }

    #[test]
    fn plan_serializes_camel_case_with_type_key() {
        let now = Utc::now();
        let plan = Plan {
            id: Uuid::nil(),
            filename: "x-00000000.md".into(),
            title: "X".into(),
            plan_type: PlanType::Research,
            session_id: Some("s1".into()),
            tags: vec!["a".into()],
            content: "# X".into(),
            working_dir: PathBuf::from("/tmp"),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["type"], "research");
        assert_eq!(json["sessionId"], "s1");
        assert_eq!(json["workingDir"], "/tmp");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("plan_type").is_none());
    }
}
