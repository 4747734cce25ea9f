//! Hit endpoint.

use actix_web::{HttpResponse, web};
use slide_core::WindowOptions;
use slide_shared::{ApiResponse, HitRequest, HitResponse};

use crate::config::RESERVED_BUCKET_PREFIX;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Record a hit for `(bucket, key)` and return the remaining quota.
///
/// POST /api/buckets/{bucket}/keys/{key}/hit
///
/// An empty body uses the server defaults; otherwise the body must carry
/// both `windowMs` and `maxLimit`. Reserved buckets are rejected so callers
/// cannot spend or refill the server's own per-address limits.
pub async fn hit(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let (bucket, key) = path.into_inner();
    if bucket.starts_with(RESERVED_BUCKET_PREFIX) {
        return Err(AppError::BadRequest(format!(
            "bucket names starting with '{}' are reserved",
            RESERVED_BUCKET_PREFIX
        )));
    }
    let options = parse_options(&body)?;

    let outcome = state.limiter.hit_outcome(&bucket, &key, options).await?;

    tracing::debug!(
        bucket = %bucket,
        key = %key,
        remaining = outcome.remaining,
        admitted = outcome.admitted,
        "Hit recorded"
    );

    Ok(HttpResponse::Ok().json(ApiResponse::ok(HitResponse {
        bucket,
        key,
        remaining: outcome.remaining,
        admitted: outcome.admitted,
    })))
}

fn parse_options(body: &[u8]) -> AppResult<Option<WindowOptions>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let request: HitRequest =
        serde_json::from_slice(body).map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Some(WindowOptions::new(request.window_ms, request.max_limit)?))
}
