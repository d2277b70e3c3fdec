use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full site record (business view). `token_hash` is the digest of the
/// current bearer secret; the raw secret never appears in this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteRecord {
    pub site_id: String,
    pub name: String,
    pub domain: String,
    pub repo: Option<String>,
    pub token_hash: String,
    pub client_name: String,
    pub client_email: Option<String>,
    pub active: bool,
    pub system_prompt: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Identity attached to a request after successful token verification.
#[derive(Debug, Clone, Serialize)]
pub struct AuthedSite {
    pub site_id: String,
    pub name: String,
    pub client_name: String,
    pub system_prompt: Option<String>,
    pub token_hash: String,
}

impl From<SiteRecord> for AuthedSite {
    fn from(s: SiteRecord) -> Self {
        Self {
            site_id: s.site_id,
            name: s.name,
            client_name: s.client_name,
            system_prompt: s.system_prompt,
            token_hash: s.token_hash,
        }
    }
}

/// Input for creating a site, by operator action or by session delivery.
#[derive(Debug, Clone)]
pub struct NewSite {
    pub site_id: String,
    pub name: String,
    pub domain: String,
    pub repo: Option<String>,
    pub token_hash: String,
    pub client_name: String,
    pub client_email: Option<String>,
}

/// Operator patch; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteUpdate {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub repo: Option<String>,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub active: Option<bool>,
    pub system_prompt: Option<String>,
}
