use actix_web::{HttpRequest, HttpResponse, web};

use crate::errors::AppError;
use crate::scheduling::webhooks::{SIGNATURE_HEADER, TIMESTAMP_HEADER, WebhookEvent};
use crate::state::AppState;

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

/// POST /api/v1/meetings/webhook - Video provider callbacks
///
/// The body is read raw so the signature covers exactly the bytes received.
pub async fn receive(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    state
        .webhooks
        .authenticate(header(&req, TIMESTAMP_HEADER), header(&req, SIGNATURE_HEADER), &body)?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Invalid webhook payload: {e}")))?;
    let outcome = state.webhooks.handle(event).await?;
    Ok(HttpResponse::Ok().json(outcome))
}
