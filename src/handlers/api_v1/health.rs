use actix_web::{HttpResponse, web};

use crate::db::{self, DbPool};

/// GET /api/v1/health - Liveness plus a database round-trip when a pool is configured
pub async fn check(pool: Option<web::Data<DbPool>>) -> HttpResponse {
    let Some(pool) = pool else {
        return HttpResponse::Ok().json(serde_json::json!({ "status": "ok", "database": "skipped" }));
    };
    match db::ping(pool.get_ref()).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "status": "ok", "database": "ok" })),
        Err(e) => {
            log::error!("Health check failed: {e}");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({ "status": "degraded", "database": "error" }))
        }
    }
}
