//! Tower Layer wrapping a gRPC service with the authorization gate
//!
//! The method name is the HTTP/2 request path (`/package.Service/Method`).
//! Admitted requests get their [`CallContext`] in the request extensions;
//! rejected ones are answered directly with a trailers-only gRPC status.

use super::auth::{AuthGate, CallContext};
use http::{header, HeaderValue, Request, Response};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tonic::metadata::MetadataMap;
use tonic::Status;
use tower::{Layer, Service};

#[derive(Clone)]
pub struct AuthGateLayer {
    gate: AuthGate,
}

impl AuthGateLayer {
    pub fn new(gate: AuthGate) -> Self {
        Self { gate }
    }
}

impl<S> Layer<S> for AuthGateLayer {
    type Service = AuthGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthGateService {
            inner,
            gate: self.gate.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthGateService<S> {
    inner: S,
    gate: AuthGate,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for AuthGateService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        let method = request.uri().path().to_string();
        let metadata = MetadataMap::from_headers(request.headers().clone());

        match self.gate.authorize(&method, &metadata) {
            Ok(ctx) => {
                request.extensions_mut().insert::<CallContext>(ctx);
                // Keep the instance that was polled ready; leave a fresh clone behind.
                let clone = self.inner.clone();
                let mut inner = std::mem::replace(&mut self.inner, clone);
                Box::pin(async move { inner.call(request).await })
            }
            Err(status) => {
                let response = status_response(&status);
                Box::pin(async move { Ok(response) })
            }
        }
    }
}

/// Trailers-only gRPC response carrying `status`.
pub(crate) fn status_response<B: Default>(status: &Status) -> Response<B> {
    let mut response = Response::new(B::default());
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/grpc"),
    );
    if status.add_header(headers).is_err() {
        tracing::warn!(code = ?status.code(), "Failed to encode gRPC status headers");
    }
    response
}
