//! Rate limiting middleware - limits API callers by client address.

use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{HeaderName, HeaderValue},
};
use slide_core::{SlideLimiter, WindowOptions};
use slide_shared::ErrorResponse;
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::rc::Rc;

use crate::config::HttpRateLimitConfig;

/// Header carrying the quota left after this request.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Rate limiting middleware factory.
pub struct RateLimitMiddleware {
    limiter: SlideLimiter,
    config: Rc<HttpRateLimitConfig>,
}

impl RateLimitMiddleware {
    pub fn new(limiter: SlideLimiter, config: HttpRateLimitConfig) -> Self {
        Self {
            limiter,
            config: Rc::new(config),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            config: self.config.clone(),
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    limiter: SlideLimiter,
    config: Rc<HttpRateLimitConfig>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let limiter = self.limiter.clone();
        let config = self.config.clone();

        // Client identifier
        let key = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        Box::pin(async move {
            let outcome = match limiter
                .hit_outcome(&config.bucket, &key, Some(config.options))
                .await
            {
                Ok(outcome) => Some(outcome),
                Err(e) if config.fail_open => {
                    tracing::error!(key = %key, error = %e, "Rate limiter error, failing open");
                    None
                }
                Err(e) => {
                    tracing::error!(key = %key, error = %e, "Rate limiter error, failing closed");
                    let response = HttpResponse::ServiceUnavailable().json(
                        ErrorResponse::service_unavailable("Rate limiter store unavailable"),
                    );
                    return Ok(req.into_response(response).map_into_right_body());
                }
            };

            if let Some(outcome) = outcome.filter(|outcome| !outcome.admitted) {
                tracing::warn!(key = %key, bucket = %config.bucket, "Rate limit exceeded");

                let retry_after = retry_after_secs(config.options);
                let response = HttpResponse::TooManyRequests()
                    .insert_header((REMAINING_HEADER, outcome.remaining.to_string()))
                    .insert_header(("Retry-After", retry_after.to_string()))
                    .json(ErrorResponse::too_many_requests(format!(
                        "Rate limit exceeded. Try again in at most {} seconds.",
                        retry_after
                    )));

                return Ok(req.into_response(response).map_into_right_body());
            }

            let mut res = service.call(req).await?;
            if let Some(outcome) = outcome {
                res.headers_mut().insert(
                    HeaderName::from_static(REMAINING_HEADER),
                    HeaderValue::from(outcome.remaining),
                );
            }
            Ok(res.map_into_left_body())
        })
    }
}

/// Whole seconds until the oldest hit leaves the window, rounded up.
fn retry_after_secs(options: WindowOptions) -> u64 {
    options.window_ms().div_ceil(1000).max(1)
}
