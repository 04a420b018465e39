use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::participant::ParticipantChanges;
use crate::scheduling::roster::AddParticipantsRequest;
use crate::state::AppState;

/// POST /api/v1/meetings/{id}/participants - Invite users (all or nothing)
pub async fn add(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<AddParticipantsRequest>,
) -> Result<HttpResponse, AppError> {
    let added = state.roster.add_participants(path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(added))
}

/// GET /api/v1/meetings/{id}/participants
pub async fn list(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    let participants = state.roster.list_participants(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(participants))
}

/// PATCH /api/v1/meetings/{id}/participants/{user_id}
pub async fn update(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<ParticipantChanges>,
) -> Result<HttpResponse, AppError> {
    let (meeting_id, user_id) = path.into_inner();
    let participant = state
        .roster
        .update_participant(meeting_id, user_id, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(participant))
}

/// DELETE /api/v1/meetings/{id}/participants/{user_id}
pub async fn remove(state: web::Data<AppState>, path: web::Path<(Uuid, Uuid)>) -> Result<HttpResponse, AppError> {
    let (meeting_id, user_id) = path.into_inner();
    state.roster.remove_participant(meeting_id, user_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("User {user_id} removed from meeting {meeting_id}")
    })))
}
