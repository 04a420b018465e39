use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::scheduling::{CreateMeetingRequest, UpdateMeetingRequest};
use crate::state::AppState;

/// POST /api/v1/meetings - Schedule a meeting organized by the caller
pub async fn create(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreateMeetingRequest>,
) -> Result<HttpResponse, AppError> {
    let meeting = state.scheduler.create(body.into_inner(), user.id).await?;
    Ok(HttpResponse::Created().json(meeting))
}

/// GET /api/v1/meetings
pub async fn list(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.scheduler.find_all().await?))
}

/// GET /api/v1/meetings/{id}
pub async fn read(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    let meeting = state.scheduler.find_one(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(meeting))
}

/// PATCH /api/v1/meetings/{id} - Partial update; moving the slot re-checks overlaps
pub async fn update(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateMeetingRequest>,
) -> Result<HttpResponse, AppError> {
    let meeting = state.scheduler.update(path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(meeting))
}

/// DELETE /api/v1/meetings/{id} - Deletes the video room, then the meeting
pub async fn delete(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    let removal = state.scheduler.remove(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(removal))
}
