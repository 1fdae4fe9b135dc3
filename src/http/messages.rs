//! Contact messages. Anyone may submit; only admins read them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::orders::CountResponse;
use super::{AppState, MessageResponse};
use crate::domain::policy::{authorize, Action, Identity, Resource};
use crate::{EcommerceError, Result};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitMessageRequest {
    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "email is invalid"))]
    pub email: String,
    #[validate(length(min = 1, max = 32, message = "phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, max = 5000, message = "message is required"))]
    pub message: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_messages).post(submit_message))
        .route("/count", get(unread_count))
        .route("/:id/read", put(mark_read))
        .route("/:id", delete(delete_message))
}

fn not_found() -> EcommerceError { EcommerceError::NotFound("Message not found".to_string()) }

async fn submit_message(State(s): State<AppState>, Json(r): Json<SubmitMessageRequest>) -> Result<(StatusCode, Json<ContactMessage>)> {
    authorize(None, Action::SubmitMessage, Resource::Unowned)?;
    r.validate()?;
    let m = sqlx::query_as::<_, ContactMessage>("INSERT INTO messages (id, name, email, phone, message, is_read, created_at) VALUES ($1, $2, $3, $4, $5, FALSE, NOW()) RETURNING *")
        .bind(Uuid::now_v7()).bind(r.name.trim()).bind(r.email.trim()).bind(r.phone.trim()).bind(r.message.trim())
        .fetch_one(&s.db).await?;
    Ok((StatusCode::CREATED, Json(m)))
}

async fn list_messages(State(s): State<AppState>, identity: Identity) -> Result<Json<Vec<ContactMessage>>> {
    authorize(Some(&identity), Action::ManageMessages, Resource::Unowned)?;
    let messages = sqlx::query_as::<_, ContactMessage>("SELECT * FROM messages ORDER BY created_at DESC").fetch_all(&s.db).await?;
    Ok(Json(messages))
}

async fn unread_count(State(s): State<AppState>, identity: Identity) -> Result<Json<CountResponse>> {
    authorize(Some(&identity), Action::ManageMessages, Resource::Unowned)?;
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE NOT is_read").fetch_one(&s.db).await?;
    Ok(Json(CountResponse { count }))
}

async fn mark_read(State(s): State<AppState>, identity: Identity, Path(id): Path<Uuid>) -> Result<Json<ContactMessage>> {
    authorize(Some(&identity), Action::ManageMessages, Resource::Unowned)?;
    sqlx::query_as::<_, ContactMessage>("UPDATE messages SET is_read = TRUE WHERE id = $1 RETURNING *")
        .bind(id).fetch_optional(&s.db).await?.map(Json).ok_or_else(not_found)
}

async fn delete_message(State(s): State<AppState>, identity: Identity, Path(id): Path<Uuid>) -> Result<Json<MessageResponse>> {
    authorize(Some(&identity), Action::ManageMessages, Resource::Unowned)?;
    let done = sqlx::query("DELETE FROM messages WHERE id = $1").bind(id).execute(&s.db).await?;
    if done.rows_affected() == 0 {
        return Err(not_found());
    }
    Ok(Json(MessageResponse { message: "Message deleted" }))
}
