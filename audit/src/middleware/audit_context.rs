use axum::{
    extract::{FromRequestParts, Request},
    http::{header::HeaderName, request::Parts},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;

use crate::context::AuditContext;
use crate::types::ActorId;

const REQUEST_ID_HEADER: &str = "x-request-id";
const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Inserted by the host's authentication layer for signed-in users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedActor(pub ActorId);

/// Binds the request's identity to an [`AuditContext`] extension so handlers
/// can pass it to audited writes. Requests without an
/// [`AuthenticatedActor`] get the anonymous context.
pub async fn bind_audit_context(mut req: Request, next: Next) -> Response {
    let ctx = context_from_parts(req.extensions(), req.headers());
    tracing::debug!(actor_id = ?ctx.actor, "Bound audit context");
    req.extensions_mut().insert(ctx);
    next.run(req).await
}

fn context_from_parts(
    extensions: &axum::http::Extensions,
    headers: &axum::http::HeaderMap,
) -> AuditContext {
    let ctx = extensions
        .get::<AuthenticatedActor>()
        .map(|actor| AuditContext::for_actor(actor.0))
        .unwrap_or_else(AuditContext::anonymous);

    let request_id = headers
        .get(HeaderName::from_static(REQUEST_ID_HEADER))
        .or_else(|| headers.get(HeaderName::from_static(CORRELATION_ID_HEADER)))
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty());

    match request_id {
        Some(id) => ctx.with_context(format!("request_id={}", id)),
        None => ctx,
    }
}

impl<S> FromRequestParts<S> for AuditContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<AuditContext>() {
            return Ok(ctx.clone());
        }
        Ok(context_from_parts(&parts.extensions, &parts.headers))
    }
}
