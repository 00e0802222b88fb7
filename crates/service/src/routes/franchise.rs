//! Franchise and store route handlers.
//!
//! Listings are public; admins additionally see franchise admins and store
//! revenue. Store management is open to global admins and to the
//! franchise's own admins.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use jwt_pizza_core::{Email, FranchiseId, StoreId, UserId};

use super::auth::MessageResponse;
use super::user::ListQuery;
use crate::error::{ApiJson, ApiPath, ApiQuery, AppError, Result};
use crate::middleware::{AuthUser, OptionalAuthUser};
use crate::models::{Franchise, Store};
use crate::services::{Action, allow};
use crate::state::AppState;

/// One page of franchises.
#[derive(Debug, Serialize)]
pub struct FranchiseList {
    pub franchises: Vec<Franchise>,
    pub more: bool,
}

/// A franchise admin referenced by email.
#[derive(Debug, Deserialize)]
pub struct AdminRef {
    pub email: Email,
}

/// Franchise creation body.
#[derive(Debug, Deserialize)]
pub struct CreateFranchiseRequest {
    pub name: String,
    #[serde(default)]
    pub admins: Vec<AdminRef>,
}

/// Store creation body.
#[derive(Debug, Deserialize)]
pub struct CreateStoreRequest {
    pub name: String,
}

/// GET /api/franchise - List franchises.
pub async fn list(
    State(state): State<AppState>,
    OptionalAuthUser(caller): OptionalAuthUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<FranchiseList>> {
    let page = state
        .store()
        .list_franchises(query.page_request(), query.name_filter())
        .await?;

    let detailed = caller
        .as_ref()
        .is_some_and(|user| allow(user, Action::ViewFranchiseDetails));
    let franchises = if detailed {
        page.items
    } else {
        page.items.into_iter().map(Franchise::into_public).collect()
    };

    Ok(Json(FranchiseList {
        franchises,
        more: page.more,
    }))
}

/// GET /api/franchise/:userId - Franchises a user administers.
///
/// Anyone but the user themself or an admin gets an empty list.
#[instrument(skip_all, fields(user_id = %auth.user.id, target_id = %id))]
pub async fn user_franchises(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<Vec<Franchise>>> {
    if !allow(&auth.user, Action::ViewUserFranchises(id)) {
        return Ok(Json(Vec::new()));
    }

    Ok(Json(state.store().get_user_franchises(id).await?))
}

/// POST /api/franchise - Create a franchise (admin).
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CreateFranchiseRequest>,
) -> Result<Json<Franchise>> {
    if !allow(&auth.user, Action::CreateFranchise) {
        return Err(AppError::Forbidden(
            "unable to create a franchise".to_string(),
        ));
    }

    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("franchise name is required".to_string()));
    }

    let mut admins = Vec::with_capacity(body.admins.len());
    for admin in &body.admins {
        let user = state
            .store()
            .get_user_by_email(&admin.email)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "unknown user for franchise admin {} provided",
                    admin.email
                ))
            })?;
        admins.push(user.id);
    }

    let franchise = state.store().create_franchise(name, &admins).await?;
    tracing::info!(franchise_id = %franchise.id, "Franchise created");

    Ok(Json(franchise))
}

/// DELETE /api/franchise/:franchiseId - Delete a franchise (admin).
#[instrument(skip_all, fields(user_id = %auth.user.id, franchise_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<FranchiseId>,
) -> Result<Json<MessageResponse>> {
    if !allow(&auth.user, Action::DeleteFranchise) {
        return Err(AppError::Forbidden(
            "unable to delete a franchise".to_string(),
        ));
    }

    state.store().delete_franchise(id).await?;

    Ok(MessageResponse::new("franchise deleted"))
}

/// POST /api/franchise/:franchiseId/store - Open a store.
#[instrument(skip_all, fields(user_id = %auth.user.id, franchise_id = %id))]
pub async fn create_store(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<FranchiseId>,
    ApiJson(body): ApiJson<CreateStoreRequest>,
) -> Result<Json<Store>> {
    const DENIED: &str = "unable to create a store";

    let franchise = state
        .store()
        .get_franchise(id)
        .await?
        .ok_or_else(|| AppError::Forbidden(DENIED.to_string()))?;
    if !allow(&auth.user, Action::ManageStores(&franchise)) {
        return Err(AppError::Forbidden(DENIED.to_string()));
    }

    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("store name is required".to_string()));
    }

    let store = state.store().create_store(id, name).await?;
    tracing::info!(store_id = %store.id, "Store created");

    Ok(Json(store))
}

/// DELETE /api/franchise/:franchiseId/store/:storeId - Close a store.
#[instrument(skip_all, fields(user_id = %auth.user.id, franchise_id = %id, store_id = %store_id))]
pub async fn delete_store(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath((id, store_id)): ApiPath<(FranchiseId, StoreId)>,
) -> Result<Json<MessageResponse>> {
    const DENIED: &str = "unable to delete a store";

    let franchise = state
        .store()
        .get_franchise(id)
        .await?
        .ok_or_else(|| AppError::Forbidden(DENIED.to_string()))?;
    if !allow(&auth.user, Action::ManageStores(&franchise)) {
        return Err(AppError::Forbidden(DENIED.to_string()));
    }

    state.store().delete_store(id, store_id).await?;

    Ok(MessageResponse::new("store deleted"))
}
