//! Authorization gate
//!
//! Every inbound call passes through [`AuthGate::authorize`]: the method is
//! looked up in the rule table, the bearer token is verified, and the
//! caller's role is compared against the method's minimum role. Admitted
//! calls carry a [`CallContext`] to the handler.

use super::rules::MethodRules;
use crate::domain::{Identity, Role};
use crate::jwt::JwtManager;
use crate::telemetry::metrics;
use std::future::Future;
use std::sync::Arc;
use tonic::metadata::MetadataMap;
use tonic::{Request, Status};

const AUTHORIZATION_HEADER: &str = "authorization";
const BEARER_PREFIX: &str = "Bearer ";

/// Verified caller for one inbound call; read-only for handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    method: String,
    identity: Identity,
}

impl CallContext {
    pub fn new(method: impl Into<String>, identity: Identity) -> Self {
        Self {
            method: method.into(),
            identity,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn subject_id(&self) -> &str {
        self.identity.subject_id()
    }

    pub fn role(&self) -> Role {
        self.identity.role()
    }
}

#[derive(Clone)]
pub struct AuthGate {
    rules: Arc<MethodRules>,
    jwt: Arc<JwtManager>,
}

impl AuthGate {
    pub fn new(rules: MethodRules, jwt: JwtManager) -> Self {
        Self {
            rules: Arc::new(rules),
            jwt: Arc::new(jwt),
        }
    }

    /// Decide whether a call to `method` with `metadata` may proceed.
    #[allow(clippy::result_large_err)]
    pub fn authorize(&self, method: &str, metadata: &MetadataMap) -> Result<CallContext, Status> {
        let result = self.decide(method, metadata);
        let label = match &result {
            Ok(_) => "allowed",
            Err(status) if status.code() == tonic::Code::Unauthenticated => "unauthenticated",
            Err(_) => "denied",
        };
        metrics::record_auth_decision(method, label);
        result
    }

    #[allow(clippy::result_large_err)]
    fn decide(&self, method: &str, metadata: &MetadataMap) -> Result<CallContext, Status> {
        let required = self.rules.required_role(method).ok_or_else(|| {
            tracing::warn!(method, "Call to unlisted method rejected");
            Status::permission_denied("method not allowed")
        })?;

        if required == Role::Anonymous {
            return Ok(CallContext::new(method, Identity::anonymous()));
        }

        let token = bearer_token(metadata)?;
        let identity = self.jwt.verify_identity(token).map_err(|e| {
            tracing::debug!(method, error = %e, "Credential rejected");
            Status::unauthenticated("invalid token")
        })?;

        if !identity.role().satisfies(required) {
            tracing::info!(
                method,
                subject = identity.subject_id(),
                role = %identity.role(),
                required = %required,
                "Insufficient role"
            );
            return Err(Status::permission_denied("insufficient role"));
        }

        Ok(CallContext::new(method, identity))
    }

    /// Authorize and, on success, forward to `next` with the caller's context.
    ///
    /// `next` is never invoked for a rejected call.
    pub async fn intercept<Req, Resp, F, Fut>(
        &self,
        method: &str,
        request: Request<Req>,
        next: F,
    ) -> Result<Resp, Status>
    where
        F: FnOnce(CallContext, Request<Req>) -> Fut,
        Fut: Future<Output = Result<Resp, Status>>,
    {
        let ctx = self.authorize(method, request.metadata())?;
        next(ctx, request).await
    }
}

#[allow(clippy::result_large_err)]
fn bearer_token(metadata: &MetadataMap) -> Result<&str, Status> {
    let value = metadata
        .get(AUTHORIZATION_HEADER)
        .ok_or_else(|| Status::unauthenticated("missing credentials"))?
        .to_str()
        .map_err(|_| Status::unauthenticated("malformed credentials"))?;

    let token = value
        .strip_prefix(BEARER_PREFIX)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Status::unauthenticated("malformed credentials"))?;

    Ok(token)
}
