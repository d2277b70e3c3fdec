use chrono::Utc;
use sea_orm::{entity::prelude::*, ColumnTrait, DatabaseConnection, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scoping_session")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub session_id: String,
    pub status: String,
    pub brief_data: Option<String>,
    pub email: Option<String>,
    pub user_id: Option<String>,
    pub rejection_reason: Option<String>,
    pub ticket_id: Option<Uuid>,
    pub repo_url: Option<String>,
    pub deploy_url: Option<String>,
    pub site_id: Option<String>,
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

pub async fn find_by_session_id(
    db: &DatabaseConnection,
    session_id: &str,
) -> Result<Option<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::SessionId.eq(session_id))
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

/// Idempotent create. A second call with a known session id returns the
/// existing record untouched; timestamps and status are not reset.
pub async fn create_if_missing(
    db: &DatabaseConnection,
    session_id: &str,
) -> Result<Model, errors::ModelError> {
    if session_id.trim().is_empty() {
        return Err(errors::ModelError::Validation("session_id required".into()));
    }
    if let Some(existing) = find_by_session_id(db, session_id).await? {
        return Ok(existing);
    }
    let now = Utc::now();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        session_id: Set(session_id.to_string()),
        status: Set("active".into()),
        brief_data: Set(None),
        email: Set(None),
        user_id: Set(None),
        rejection_reason: Set(None),
        ticket_id: Set(None),
        repo_url: Set(None),
        deploy_url: Set(None),
        site_id: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    match am.insert(db).await {
        Ok(created) => Ok(created),
        // A concurrent create may have won the unique race; re-read.
        Err(e) => match find_by_session_id(db, session_id).await? {
            Some(existing) => Ok(existing),
            None => Err(errors::ModelError::Db(e.to_string())),
        },
    }
}

pub async fn touch(db: &DatabaseConnection, model: Model) -> Result<Model, errors::ModelError> {
    let mut am: ActiveModel = model.into();
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn update_brief(
    db: &DatabaseConnection,
    model: Model,
    brief_data: &str,
) -> Result<Model, errors::ModelError> {
    let mut am: ActiveModel = model.into();
    am.brief_data = Set(Some(brief_data.to_string()));
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn list_by_status(
    db: &DatabaseConnection,
    status: &str,
) -> Result<Vec<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::Status.eq(status))
        .all(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn list_by_user(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::UserId.eq(user_id))
        .all(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}
