//! The middleware chain every request passes before reaching a handler.

use std::sync::Arc;

use axum::{middleware, Router};

use crate::security::headers::cors_middleware;
use crate::security::rate_limit::{rate_limit_middleware, AdmissionController};

/// Wrap `router` so requests are rate limited first, then get CORS handling.
///
/// Layers added later run earlier, hence rate limiting is added last.
pub fn gate<S>(router: Router<S>, controller: Arc<AdmissionController>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(middleware::from_fn(cors_middleware))
        .layer(middleware::from_fn_with_state(controller, rate_limit_middleware))
}
