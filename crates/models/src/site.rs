use chrono::Utc;
use sea_orm::{entity::prelude::*, ColumnTrait, DatabaseConnection, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "site")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub site_id: String,
    pub name: String,
    pub domain: String,
    pub repo: Option<String>,
    pub token_hash: String,
    pub client_name: String,
    pub client_email: Option<String>,
    pub active: bool,
    pub system_prompt: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        panic!("no relations defined here")
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Fields accepted when creating a site. The raw bearer token never reaches
/// this layer; callers pass its digest.
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

/// Optional patch fields for operator updates. `None` leaves the column as is.
#[derive(Debug, Clone, Default)]
pub struct SiteUpdate {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub repo: Option<String>,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub active: Option<bool>,
    pub system_prompt: Option<String>,
}

pub fn validate_site_id(site_id: &str) -> Result<(), errors::ModelError> {
    if site_id.trim().is_empty() {
        return Err(errors::ModelError::Validation("site_id required".into()));
    }
    if !site_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(errors::ModelError::Validation(
            "site_id must be alphanumeric with - or _".into(),
        ));
    }
    Ok(())
}

pub fn validate_token_hash(token_hash: &str) -> Result<(), errors::ModelError> {
    if token_hash.len() != 64 || !token_hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(errors::ModelError::Validation("token_hash must be sha-256 hex".into()));
    }
    Ok(())
}

/// Build the active model for a new site without touching the database.
/// The deliver transaction inserts this inside its own transaction scope.
pub fn new_active_model(input: &NewSite) -> Result<ActiveModel, errors::ModelError> {
    validate_site_id(&input.site_id)?;
    validate_token_hash(&input.token_hash)?;
    if input.name.trim().is_empty() {
        return Err(errors::ModelError::Validation("name required".into()));
    }
    Ok(ActiveModel {
        id: Set(Uuid::new_v4()),
        site_id: Set(input.site_id.clone()),
        name: Set(input.name.clone()),
        domain: Set(input.domain.clone()),
        repo: Set(input.repo.clone()),
        token_hash: Set(input.token_hash.clone()),
        client_name: Set(input.client_name.clone()),
        client_email: Set(input.client_email.clone()),
        active: Set(true),
        system_prompt: Set(None),
        created_at: Set(Utc::now().into()),
    })
}

pub async fn create(db: &DatabaseConnection, input: &NewSite) -> Result<Model, errors::ModelError> {
    let am = new_active_model(input)?;
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn find_by_site_id(
    db: &DatabaseConnection,
    site_id: &str,
) -> Result<Option<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::SiteId.eq(site_id))
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn find_by_token_hash(
    db: &DatabaseConnection,
    token_hash: &str,
) -> Result<Option<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::TokenHash.eq(token_hash))
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn list(db: &DatabaseConnection) -> Result<Vec<Model>, errors::ModelError> {
    Entity::find().all(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

/// Apply an operator patch. Only provided fields are written.
pub async fn update_fields(
    db: &DatabaseConnection,
    site_id: &str,
    patch: SiteUpdate,
) -> Result<Model, errors::ModelError> {
    let found = find_by_site_id(db, site_id)
        .await?
        .ok_or_else(|| errors::ModelError::NotFound("site".into()))?;
    let mut am: ActiveModel = found.into();
    if let Some(v) = patch.name {
        am.name = Set(v);
    }
    if let Some(v) = patch.domain {
        am.domain = Set(v);
    }
    if let Some(v) = patch.repo {
        am.repo = Set(Some(v));
    }
    if let Some(v) = patch.client_name {
        am.client_name = Set(v);
    }
    if let Some(v) = patch.client_email {
        am.client_email = Set(Some(v));
    }
    if let Some(v) = patch.active {
        am.active = Set(v);
    }
    if let Some(v) = patch.system_prompt {
        am.system_prompt = Set(Some(v));
    }
    am.update(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}
