use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session lifecycle states. `Rejected` and `Live` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Submitted,
    Approved,
    Rejected,
    Building,
    Review,
    Live,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Submitted => "submitted",
            SessionStatus::Approved => "approved",
            SessionStatus::Rejected => "rejected",
            SessionStatus::Building => "building",
            SessionStatus::Review => "review",
            SessionStatus::Live => "live",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SessionStatus::Active),
            "submitted" => Some(SessionStatus::Submitted),
            "approved" => Some(SessionStatus::Approved),
            "rejected" => Some(SessionStatus::Rejected),
            "building" => Some(SessionStatus::Building),
            "review" => Some(SessionStatus::Review),
            "live" => Some(SessionStatus::Live),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Rejected | SessionStatus::Live)
    }

    /// Strict-mode edges of the state machine. Lenient mode only enforces
    /// the terminal guard.
    pub fn allows(&self, target: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, target),
            (Active, Submitted)
                | (Submitted, Approved)
                | (Submitted, Rejected)
                | (Approved, Building)
                | (Approved, Review)
                | (Approved, Live)
                | (Building, Review)
                | (Building, Live)
                | (Review, Live)
        )
    }

    /// Statuses the email dashboard scans. `Active` is excluded: a session
    /// has no email before submission.
    pub fn dashboard_scan() -> [SessionStatus; 6] {
        use SessionStatus::*;
        [Submitted, Approved, Rejected, Building, Review, Live]
    }
}

/// One intake conversation (business view).
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub status: SessionStatus,
    pub brief_data: Option<String>,
    pub email: Option<String>,
    pub user_id: Option<String>,
    pub rejection_reason: Option<String>,
    pub ticket_id: Option<Uuid>,
    pub repo_url: Option<String>,
    pub deploy_url: Option<String>,
    pub site_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Scope user row: keyed by email, carries at most one live magic-link grant.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeUser {
    pub id: Uuid,
    pub email: String,
    pub login_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

/// The brief payload is opaque structured text. We parse it only to derive
/// display strings; a failed parse substitutes placeholders and never aborts
/// the owning transition.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BriefFields {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBrief {
    pub project_name: String,
    pub summary: String,
}

pub const FALLBACK_PROJECT_NAME: &str = "New Project";
pub const FALLBACK_SUMMARY: &str = "Scoping brief pending details";

/// Fallible parse with a documented default. The fallback branch is the
/// explicit, testable replacement for swallowing a JSON error.
pub fn parse_brief(raw: Option<&str>) -> ParsedBrief {
    let fallback = |raw: Option<&str>| ParsedBrief {
        project_name: FALLBACK_PROJECT_NAME.to_string(),
        summary: raw
            .map(|r| r.chars().take(300).collect::<String>())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_SUMMARY.to_string()),
    };
    let Some(raw) = raw else {
        return fallback(None);
    };
    match serde_json::from_str::<BriefFields>(raw) {
        Ok(fields) => ParsedBrief {
            project_name: fields
                .project_name
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_PROJECT_NAME.to_string()),
            summary: fields
                .summary
                .or(fields.description)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_SUMMARY.to_string()),
        },
        Err(_) => fallback(Some(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for s in ["active", "submitted", "approved", "rejected", "building", "review", "live"] {
            assert_eq!(SessionStatus::parse(s).unwrap().as_str(), s);
        }
        assert!(SessionStatus::parse("bogus").is_none());
    }

    #[test]
    fn terminal_states_allow_nothing() {
        for target in [
            SessionStatus::Submitted,
            SessionStatus::Approved,
            SessionStatus::Live,
        ] {
            assert!(!SessionStatus::Rejected.allows(target));
            assert!(!SessionStatus::Live.allows(target));
        }
    }

    #[test]
    fn parse_brief_happy_path() {
        let parsed =
            parse_brief(Some(r#"{"project_name":"Acme Shop","summary":"storefront build"}"#));
        assert_eq!(parsed.project_name, "Acme Shop");
        assert_eq!(parsed.summary, "storefront build");
    }

    #[test]
    fn parse_brief_falls_back_on_garbage() {
        let parsed = parse_brief(Some("not json at all"));
        assert_eq!(parsed.project_name, FALLBACK_PROJECT_NAME);
        assert_eq!(parsed.summary, "not json at all");
    }

    #[test]
    fn parse_brief_falls_back_on_missing() {
        let parsed = parse_brief(None);
        assert_eq!(parsed.project_name, FALLBACK_PROJECT_NAME);
        assert_eq!(parsed.summary, FALLBACK_SUMMARY);
    }

    #[test]
    fn parse_brief_uses_description_when_summary_missing() {
        let parsed = parse_brief(Some(r#"{"project_name":"X","description":"longform"}"#));
        assert_eq!(parsed.summary, "longform");
    }
}
