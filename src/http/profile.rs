//! Profile of the signed-in user.
//!
//! Besides the combined `PUT /profile`, each contact field has its own route
//! taking a single-field body, e.g. `{"city": "Sylhet"}`.

use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use validator::Validate;

use super::AppState;
use crate::domain::policy::{authorize, Action, Identity, Resource};
use crate::store::{ProfileUpdate, UserSummary};
use crate::{EcommerceError, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/update-name", put(update_name))
        .route("/update-phone", put(update_phone))
        .route("/update-address", put(update_address))
        .route("/update-city", put(update_city))
}

fn not_found() -> EcommerceError { EcommerceError::NotFound("User not found".to_string()) }

async fn get_profile(State(s): State<AppState>, identity: Identity) -> Result<Json<UserSummary>> {
    authorize(Some(&identity), Action::UpdateProfile, Resource::OwnedBy(identity.user_id))?;
    s.users.find(identity.user_id).await?.map(Json).ok_or_else(not_found)
}

async fn update_profile(State(s): State<AppState>, identity: Identity, Json(update): Json<ProfileUpdate>) -> Result<Json<UserSummary>> {
    apply(&s, &identity, update).await
}

// Single-field routes ignore every other field in the body.
async fn update_name(State(s): State<AppState>, identity: Identity, Json(b): Json<ProfileUpdate>) -> Result<Json<UserSummary>> {
    apply(&s, &identity, ProfileUpdate { name: b.name, ..Default::default() }).await
}

async fn update_phone(State(s): State<AppState>, identity: Identity, Json(b): Json<ProfileUpdate>) -> Result<Json<UserSummary>> {
    apply(&s, &identity, ProfileUpdate { phone: b.phone, ..Default::default() }).await
}

async fn update_address(State(s): State<AppState>, identity: Identity, Json(b): Json<ProfileUpdate>) -> Result<Json<UserSummary>> {
    apply(&s, &identity, ProfileUpdate { address: b.address, ..Default::default() }).await
}

async fn update_city(State(s): State<AppState>, identity: Identity, Json(b): Json<ProfileUpdate>) -> Result<Json<UserSummary>> {
    apply(&s, &identity, ProfileUpdate { city: b.city, ..Default::default() }).await
}

async fn apply(s: &AppState, identity: &Identity, update: ProfileUpdate) -> Result<Json<UserSummary>> {
    authorize(Some(identity), Action::UpdateProfile, Resource::OwnedBy(identity.user_id))?;
    let update = update.normalized();
    update.validate()?;
    let user = s.users.update_profile(identity.user_id, &update).await?.ok_or_else(not_found)?;
    tracing::info!(user_id = %identity.user_id, "profile updated");
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use crate::domain::value_objects::Role;
    use crate::http::testing::Harness;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_update_fields_one_at_a_time() {
        let h = Harness::new();
        let (user_id, token) = h.login("Rahim", Role::User).await;

        let body = json!({"city": " Sylhet ", "name": "Ignored"});
        let (status, user) = h.call(Method::PUT, "/api/auth/update-city", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["city"], "Sylhet");
        assert_eq!(user["name"], "Rahim");

        let body = json!({"phone": "+8801900000000", "address": "House 7, Road 3"});
        assert_eq!(h.call(Method::PUT, "/api/auth/profile", Some(&token), Some(body)).await.0, StatusCode::OK);

        let (status, profile) = h.call(Method::GET, "/api/auth/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["id"], user_id.to_string());
        assert_eq!(profile["city"], "Sylhet");
        assert_eq!(profile["phone"], "+8801900000000");
        assert_eq!(profile["role"], "user");
    }

    #[tokio::test]
    async fn test_profile_validation_and_auth() {
        let h = Harness::new();
        let (_, token) = h.login("Rahim", Role::User).await;
        assert_eq!(h.call(Method::PUT, "/api/auth/update-name", None, Some(json!({"name": "X"}))).await.0, StatusCode::UNAUTHORIZED);
        let (status, _) = h.call(Method::PUT, "/api/auth/update-name", Some(&token), Some(json!({"name": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (_, profile) = h.call(Method::GET, "/api/auth/profile", Some(&token), None).await;
        assert_eq!(profile["name"], "Rahim");
    }
}
