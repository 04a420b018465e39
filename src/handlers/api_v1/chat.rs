use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::chat::{ConversationsQuery, CreateConversationRequest, MarkAsReadRequest, MessagesQuery, SendMessageRequest};
use crate::errors::AppError;
use crate::state::AppState;

/// POST /api/v1/chat/conversations - Open (or fetch) the conversation with a user
pub async fn create_conversation(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreateConversationRequest>,
) -> Result<HttpResponse, AppError> {
    let result = state.chat.create_or_get_conversation(body.into_inner(), user.id).await?;
    if result.is_new {
        Ok(HttpResponse::Created().json(result))
    } else {
        Ok(HttpResponse::Ok().json(result))
    }
}

/// GET /api/v1/chat/conversations?page=&limit=
pub async fn list_conversations(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<ConversationsQuery>,
) -> Result<HttpResponse, AppError> {
    let conversations = state.chat.get_user_conversations(user.id, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(conversations))
}

/// GET /api/v1/chat/conversations/{id}
pub async fn get_conversation(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let conversation = state.chat.get_conversation(path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(conversation))
}

/// GET /api/v1/chat/conversations/{id}/messages?limit=&cursor=
pub async fn get_messages(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    query: web::Query<MessagesQuery>,
) -> Result<HttpResponse, AppError> {
    let page = state
        .chat
        .get_messages(path.into_inner(), user.id, query.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// POST /api/v1/chat/messages
pub async fn send_message(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let result = state.chat.send_message(body.into_inner(), user.id).await?;
    Ok(HttpResponse::Created().json(result))
}

/// PATCH /api/v1/chat/messages/mark-read
pub async fn mark_read(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<MarkAsReadRequest>,
) -> Result<HttpResponse, AppError> {
    let count = state.chat.mark_messages_as_read(body.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": count > 0,
        "count": count,
    })))
}

/// GET /api/v1/chat/realtime-token
pub async fn realtime_token(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse, AppError> {
    let token = state.realtime.issue_token(user.id, user.email.as_deref())?;
    Ok(HttpResponse::Ok().json(token))
}

/// GET /api/v1/chat/realtime-config
pub async fn realtime_config(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse, AppError> {
    let config = state.realtime.client_config(user.id, user.email.as_deref())?;
    Ok(HttpResponse::Ok().json(config))
}
