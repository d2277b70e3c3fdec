use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{entity::prelude::*, ColumnTrait, DatabaseConnection, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scope_user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub email: String,
    pub login_token: Option<String>,
    pub token_expires_at: Option<DateTimeWithTimeZone>,
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

fn normalize_email(email: &str) -> Result<String, errors::ModelError> {
    let email = email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(errors::ModelError::Validation("invalid email".into()));
    }
    Ok(email)
}

/// Find or create the user row for an email. No grant is touched.
pub async fn ensure(db: &DatabaseConnection, email: &str) -> Result<Model, errors::ModelError> {
    let email = normalize_email(email)?;
    if let Some(existing) = find_by_email(db, &email).await? {
        return Ok(existing);
    }
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        login_token: Set(None),
        token_expires_at: Set(None),
        created_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn find_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn find_by_login_token(
    db: &DatabaseConnection,
    token: &str,
) -> Result<Option<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::LoginToken.eq(token))
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

/// Overwrite the grant for an email, creating the user row if needed.
/// The previous token, if any, is invalidated by the overwrite.
pub async fn set_login_token(
    db: &DatabaseConnection,
    email: &str,
    token: &str,
    expires_at: DateTimeWithTimeZone,
) -> Result<Model, errors::ModelError> {
    let user = ensure(db, email).await?;
    let mut am: ActiveModel = user.into();
    am.login_token = Set(Some(token.to_string()));
    am.token_expires_at = Set(Some(expires_at));
    am.update(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

/// Consume the grant so a second redemption fails. Keyed on the token value
/// itself with a conditional update, so of two concurrent redemptions only
/// one observes `true`; the other finds the token already gone.
pub async fn consume_login_token(
    db: &DatabaseConnection,
    token: &str,
) -> Result<bool, errors::ModelError> {
    let res = Entity::update_many()
        .filter(Column::LoginToken.eq(token))
        .col_expr(Column::LoginToken, Expr::value(Option::<String>::None))
        .col_expr(Column::TokenExpiresAt, Expr::value(Option::<DateTimeWithTimeZone>::None))
        .exec(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))?;
    Ok(res.rows_affected > 0)
}
