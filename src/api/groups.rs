//! Group management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::user::{Group, GroupDetails, GroupForm},
};

use super::AuthenticatedUser;

#[utoipa::path(
    get,
    path = "/api/groups",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All groups by name", body = Vec<Group>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_groups(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Group>>> {
    let groups = state.services.users.list_groups().await?;
    Ok(Json(groups))
}

/// Group with its permission codenames
#[utoipa::path(
    get,
    path = "/api/groups/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Group ID")
    ),
    responses(
        (status = 200, description = "Group details", body = GroupDetails),
        (status = 404, description = "Group not found")
    )
)]
pub async fn get_group(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<GroupDetails>> {
    let group = state.services.users.get_group(id).await?;
    Ok(Json(group))
}

#[utoipa::path(
    post,
    path = "/api/groups",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = GroupForm,
    responses(
        (status = 201, description = "Group created", body = GroupDetails),
        (status = 403, description = "Superuser required"),
        (status = 409, description = "Group already exists")
    )
)]
pub async fn create_group(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(form): Json<GroupForm>,
) -> AppResult<(StatusCode, Json<GroupDetails>)> {
    claims.require_superuser()?;

    let group = state.services.users.create_group(&form).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// Rename a group and replace its permissions
#[utoipa::path(
    put,
    path = "/api/groups/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Group ID")
    ),
    request_body = GroupForm,
    responses(
        (status = 200, description = "Group updated", body = GroupDetails),
        (status = 403, description = "Superuser required"),
        (status = 404, description = "Group not found")
    )
)]
pub async fn update_group(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(form): Json<GroupForm>,
) -> AppResult<Json<GroupDetails>> {
    claims.require_superuser()?;

    let group = state.services.users.update_group(id, &form).await?;
    Ok(Json(group))
}

#[utoipa::path(
    delete,
    path = "/api/groups/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Group ID")
    ),
    responses(
        (status = 204, description = "Group deleted"),
        (status = 403, description = "Superuser required"),
        (status = 404, description = "Group not found")
    )
)]
pub async fn delete_group(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_superuser()?;

    state.services.users.delete_group(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
