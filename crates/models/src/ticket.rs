use chrono::Utc;
use sea_orm::{
    entity::prelude::*, ColumnTrait, DatabaseConnection, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ticket")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub site_id: String,
    pub title: String,
    pub description: String,
    pub kind: String,
    pub priority: String,
    pub status: String,
    pub page_url: Option<String>,
    pub screenshot: Option<String>,
    pub metadata: Option<String>,
    pub client_token: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        panic!("no relations defined here")
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub site_id: String,
    pub title: String,
    pub description: String,
    pub kind: String,
    pub priority: Option<String>,
    pub page_url: Option<String>,
    pub screenshot: Option<String>,
    pub metadata: Option<String>,
    /// Token hash of the creating site; empty for operator-created tickets.
    pub client_token: String,
}

#[derive(Debug, Clone, Default)]
pub struct TicketUpdate {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<String>,
}

pub async fn create(db: &DatabaseConnection, input: NewTicket) -> Result<Model, errors::ModelError> {
    if input.title.trim().is_empty() {
        return Err(errors::ModelError::Validation("title required".into()));
    }
    if input.description.trim().is_empty() {
        return Err(errors::ModelError::Validation("description required".into()));
    }
    if input.kind.trim().is_empty() {
        return Err(errors::ModelError::Validation("kind required".into()));
    }
    let now = Utc::now();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        site_id: Set(input.site_id),
        title: Set(input.title),
        description: Set(input.description),
        kind: Set(input.kind),
        priority: Set(input.priority.unwrap_or_else(|| "medium".into())),
        status: Set("open".into()),
        page_url: Set(input.page_url),
        screenshot: Set(input.screenshot),
        metadata: Set(input.metadata),
        client_token: Set(input.client_token),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn list(
    db: &DatabaseConnection,
    site_id: Option<&str>,
    status: Option<&str>,
    limit: u64,
) -> Result<Vec<Model>, errors::ModelError> {
    let mut q = Entity::find();
    if let Some(sid) = site_id {
        q = q.filter(Column::SiteId.eq(sid));
    }
    if let Some(st) = status {
        q = q.filter(Column::Status.eq(st));
    }
    q.order_by_desc(Column::CreatedAt)
        .limit(limit)
        .all(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn list_all(db: &DatabaseConnection) -> Result<Vec<Model>, errors::ModelError> {
    Entity::find()
        .order_by_desc(Column::CreatedAt)
        .all(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn find_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<Model>, errors::ModelError> {
    Entity::find_by_id(id).one(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn update_fields(
    db: &DatabaseConnection,
    id: Uuid,
    patch: TicketUpdate,
) -> Result<Model, errors::ModelError> {
    let found = find_by_id(db, id)
        .await?
        .ok_or_else(|| errors::ModelError::NotFound("ticket".into()))?;
    let mut am: ActiveModel = found.into();
    if let Some(v) = patch.status {
        am.status = Set(v);
    }
    if let Some(v) = patch.priority {
        am.priority = Set(v);
    }
    if let Some(v) = patch.title {
        am.title = Set(v);
    }
    if let Some(v) = patch.description {
        am.description = Set(v);
    }
    if let Some(v) = patch.metadata {
        am.metadata = Set(Some(v));
    }
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}
