use actix_web::{HttpResponse, web};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// GET /api/v1/notifications - The caller's notifications, newest first
pub async fn list(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let notifications = state.notifications.list(user.id, query.limit).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

/// PATCH /api/v1/notifications/{id}/read
pub async fn mark_read(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let notification = state.notifications.mark_read(path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(notification))
}
