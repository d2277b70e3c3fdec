use chrono::Utc;
use sea_orm::{
    entity::prelude::*, ColumnTrait, DatabaseConnection, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors;

pub const MAX_CONTENT_LEN: usize = 2000;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "message")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub site_id: String,
    pub role: String,
    pub content: String,
    pub status: String,
    pub metadata: Option<String>,
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

pub async fn create(
    db: &DatabaseConnection,
    site_id: &str,
    role: &str,
    content: &str,
    status: &str,
    metadata: Option<String>,
) -> Result<Model, errors::ModelError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(errors::ModelError::Validation("content required".into()));
    }
    if trimmed.len() > MAX_CONTENT_LEN {
        return Err(errors::ModelError::Validation("content too long".into()));
    }
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        site_id: Set(site_id.to_string()),
        role: Set(role.to_string()),
        content: Set(trimmed.to_string()),
        status: Set(status.to_string()),
        metadata: Set(metadata),
        created_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn list(
    db: &DatabaseConnection,
    site_id: &str,
    limit: u64,
) -> Result<Vec<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::SiteId.eq(site_id))
        .order_by_desc(Column::CreatedAt)
        .limit(limit)
        .all(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

/// Messages the agent has not handled yet, optionally scoped to one site.
pub async fn pending(
    db: &DatabaseConnection,
    site_id: Option<&str>,
) -> Result<Vec<Model>, errors::ModelError> {
    let mut q = Entity::find().filter(Column::Status.eq("pending"));
    if let Some(sid) = site_id {
        q = q.filter(Column::SiteId.eq(sid));
    }
    q.order_by_asc(Column::CreatedAt)
        .all(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn update_status(
    db: &DatabaseConnection,
    id: Uuid,
    status: &str,
    metadata: Option<String>,
) -> Result<(), errors::ModelError> {
    let found = Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))?
        .ok_or_else(|| errors::ModelError::NotFound("message".into()))?;
    let mut am: ActiveModel = found.into();
    am.status = Set(status.to_string());
    if let Some(m) = metadata {
        am.metadata = Set(Some(m));
    }
    am.update(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))?;
    Ok(())
}
