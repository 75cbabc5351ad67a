use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{Decision, Identity};
use crate::{AppState, session::SessionResolver};

/// access_gate
///
/// Outermost application middleware; every request passes through it. It resolves
/// the caller's identity, asks the `AccessPolicy` for a decision and either forwards
/// the request (with the `Identity` stored in its extensions for `AuthUser`) or
/// answers with a `302 Found` redirect.
pub async fn access_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    let identity = resolve_identity(
        state.sessions.as_ref(),
        &parts,
        state.config.session_lookup_timeout,
    )
    .await;

    let path = parts.uri.path().to_owned();
    match state.policy.decide(&path, &identity) {
        Decision::Allow => {
            tracing::debug!(path = %path, authenticated = identity.is_authenticated(), "access allowed");
            parts.extensions.insert(identity);
            next.run(Request::from_parts(parts, body)).await
        }
        Decision::RedirectTo(target) => {
            tracing::debug!(path = %path, target = %target, "access redirected");
            redirect(&target)
        }
    }
}

/// resolve_identity
///
/// Runs the session lookup under `limit`. Fails closed: a lookup error or timeout
/// yields `Identity::Anonymous`, never an authenticated identity and never an error
/// response.
pub async fn resolve_identity(
    resolver: &dyn SessionResolver,
    parts: &Parts,
    limit: Duration,
) -> Identity {
    match tokio::time::timeout(limit, resolver.resolve(parts)).await {
        Ok(Ok(identity)) => identity,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "session lookup failed, treating request as anonymous");
            Identity::Anonymous
        }
        Err(_) => {
            tracing::warn!(
                timeout_ms = limit.as_millis() as u64,
                "session lookup timed out, treating request as anonymous"
            );
            Identity::Anonymous
        }
    }
}

fn redirect(target: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, target)]).into_response()
}
