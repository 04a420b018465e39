pub mod chat;
pub mod health;
pub mod meetings;
pub mod notifications;
pub mod participants;
pub mod webhooks;

use actix_web::{
    Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::{Method, header},
    middleware::{Next, from_fn},
    web,
};

use crate::auth::require_auth;
use crate::errors::AppError;

/// Rejects mutation requests carrying a body that is not `application/json`.
async fn require_json_content_type(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let method = req.method().clone();
    let headers = req.headers();
    let has_body = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map_or_else(|| headers.contains_key(header::TRANSFER_ENCODING), |len| len > 0);

    if has_body && (method == Method::POST || method == Method::PUT || method == Method::PATCH) {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !content_type.starts_with("application/json") {
            let body = serde_json::json!({
                "error": "Content-Type must be application/json for mutation requests"
            });
            let response = HttpResponse::UnsupportedMediaType().json(body);
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Configure API v1 routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| AppError::Validation(format!("Invalid JSON body: {err}")).into()),
    );
    cfg.app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| AppError::Validation(format!("Invalid query string: {err}")).into()),
    );
    cfg.app_data(
        web::PathConfig::default()
            .error_handler(|err, _| AppError::Validation(format!("Invalid path parameter: {err}")).into()),
    );

    cfg.route("/health", web::get().to(health::check));
    // Signed by the video provider, not bearer-authenticated.
    cfg.route("/meetings/webhook", web::post().to(webhooks::receive));

    cfg.service(
        web::scope("/meetings")
            .wrap(from_fn(require_json_content_type))
            .wrap(from_fn(require_auth))
            .route("", web::post().to(meetings::create))
            .route("", web::get().to(meetings::list))
            .route("/{id}", web::get().to(meetings::read))
            .route("/{id}", web::patch().to(meetings::update))
            .route("/{id}", web::delete().to(meetings::delete))
            .route("/{id}/participants", web::post().to(participants::add))
            .route("/{id}/participants", web::get().to(participants::list))
            .route("/{id}/participants/{user_id}", web::patch().to(participants::update))
            .route("/{id}/participants/{user_id}", web::delete().to(participants::remove)),
    );
    cfg.service(
        web::scope("/chat")
            .wrap(from_fn(require_json_content_type))
            .wrap(from_fn(require_auth))
            .route("/conversations", web::post().to(chat::create_conversation))
            .route("/conversations", web::get().to(chat::list_conversations))
            .route("/conversations/{id}", web::get().to(chat::get_conversation))
            .route("/conversations/{id}/messages", web::get().to(chat::get_messages))
            .route("/messages", web::post().to(chat::send_message))
            .route("/messages/mark-read", web::patch().to(chat::mark_read))
            .route("/realtime-token", web::get().to(chat::realtime_token))
            .route("/realtime-config", web::get().to(chat::realtime_config)),
    );
    cfg.service(
        web::scope("/notifications")
            .wrap(from_fn(require_json_content_type))
            .wrap(from_fn(require_auth))
            .route("", web::get().to(notifications::list))
            .route("/{id}/read", web::patch().to(notifications::mark_read)),
    );
}
