use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest, HttpResponse, ResponseError,
    body::MessageBody,
    dev::{Payload, ServiceRequest, ServiceResponse},
    middleware::Next,
    web,
};
use std::future::{Ready, ready};
use uuid::Uuid;

use super::token::{Identity, TokenVerifier};
use crate::errors::AppError;

/// Middleware function that checks for a valid bearer token.
/// Responds 401 with a JSON body when it is missing or invalid.
pub async fn require_auth(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let identity = match authenticate(&req) {
        Ok(identity) => identity,
        Err(e) => {
            let response: HttpResponse = e.error_response();
            return Ok(req.into_response(response).map_into_right_body());
        }
    };
    req.extensions_mut().insert(identity);

    next.call(req).await.map(|res| res.map_into_left_body())
}

fn authenticate(req: &ServiceRequest) -> Result<Identity, AppError> {
    let verifier = req
        .app_data::<web::Data<TokenVerifier>>()
        .ok_or_else(|| AppError::Internal("Token verifier not configured".to_string()))?;
    let token = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)?;
    verifier.verify(token)
}

/// The authenticated caller, placed in request extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = req
            .extensions()
            .get::<Identity>()
            .map(|identity| AuthUser {
                id: identity.id,
                email: identity.email.clone(),
            })
            .ok_or(AppError::Unauthorized);
        ready(user)
    }
}
