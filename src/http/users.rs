//! Admin user management.

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::domain::policy::{authorize, Action, Identity, Resource};
use crate::domain::value_objects::Role;
use crate::store::UserSummary;
use crate::{EcommerceError, Result};

#[derive(Debug, Serialize)]
pub struct UserWithOrders {
    #[serde(flatten)]
    pub user: UserSummary,
    pub orders: i64,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct RoleChanged {
    pub message: &'static str,
    pub id: Uuid,
    pub role: Role,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id/role", put(change_role))
}

async fn list_users(State(s): State<AppState>, identity: Identity) -> Result<Json<Vec<UserWithOrders>>> {
    authorize(Some(&identity), Action::ListUsers, Resource::Unowned)?;
    let users = s.users.list().await?;
    let mut out = Vec::with_capacity(users.len());
    for user in users {
        let orders = s.orders.order_count_for(user.id).await?;
        out.push(UserWithOrders { user, orders });
    }
    Ok(Json(out))
}

async fn change_role(State(s): State<AppState>, identity: Identity, Path(id): Path<Uuid>, Json(r): Json<ChangeRoleRequest>) -> Result<Json<RoleChanged>> {
    authorize(Some(&identity), Action::ChangeUserRole, Resource::Unowned)?;
    let role: Role = r.role.parse().map_err(|_| EcommerceError::Validation("Invalid role".to_string()))?;
    if !s.users.set_role(id, role).await? {
        return Err(EcommerceError::NotFound("User not found".to_string()));
    }
    tracing::info!(user_id = %id, %role, changed_by = %identity.user_id, "user role changed");
    Ok(Json(RoleChanged { message: "Role updated", id, role }))
}
