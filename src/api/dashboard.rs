//! Home page endpoint

use axum::{extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

use crate::{error::AppResult, models::dashboard::Dashboard};

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "sessionid";

/// Catalog counters and the number of earlier visits in this session
#[utoipa::path(
    get,
    path = "/",
    tag = "catalog",
    responses(
        (status = 200, description = "Home page counters", body = Dashboard)
    )
)]
pub async fn index(
    State(state): State<crate::AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<Dashboard>)> {
    let session_id = match jar.get(SESSION_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => Uuid::new_v4().to_string(),
    };

    let dashboard = state.services.dashboard.visit(&session_id).await?;

    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    Ok((jar.add(cookie), Json(dashboard)))
}
