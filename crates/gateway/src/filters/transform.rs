use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderValue, Response, header};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tracing::warn;

use portico_core::JsonApiDocument;

use crate::authz_cache::AuthzCache;
use crate::error::GatewayError;
use crate::exchange::Exchange;
use crate::include::IncludeResolver;
use crate::metrics::GatewayMetrics;
use crate::pipeline::Filter;
use crate::transform::{apply_field_policies, splice_includes};

/// JSON:API response transformation: field-level authorization and include
/// resolution.
///
/// Activates only when the request asked for `?include=` or the target
/// collection carries field policies; everything else streams through
/// untouched. The upstream body is buffered up to `response_size_limit`;
/// larger responses pass through with a warning, as do bodies that fail to
/// parse as JSON:API.
pub struct TransformFilter {
    authz: Arc<AuthzCache>,
    resolver: IncludeResolver,
    metrics: Arc<GatewayMetrics>,
    response_size_limit: usize,
}

impl TransformFilter {
    #[must_use]
    pub fn new(
        authz: Arc<AuthzCache>,
        resolver: IncludeResolver,
        metrics: Arc<GatewayMetrics>,
        response_size_limit: usize,
    ) -> Self {
        Self {
            authz,
            resolver,
            metrics,
            response_size_limit,
        }
    }
}

/// Outcome of buffering a body under a size cap.
enum Buffered {
    Complete(Bytes),
    /// The cap was hit; the already-read prefix is rechained onto the rest
    /// of the stream so the response can still pass through.
    Oversized(Body),
}

async fn buffer_up_to(body: Body, limit: usize) -> Result<Buffered, GatewayError> {
    let mut stream = body.into_data_stream();
    let mut buf = BytesMut::new();

    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| GatewayError::Internal(format!("upstream body error: {e}")))?;
        if buf.len() + chunk.len() > limit {
            let prefix = futures::stream::iter([
                Ok::<_, axum::Error>(buf.freeze()),
                Ok::<_, axum::Error>(chunk),
            ]);
            return Ok(Buffered::Oversized(Body::from_stream(prefix.chain(stream))));
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(Buffered::Complete(buf.freeze()))
}

#[async_trait]
impl Filter for TransformFilter {
    fn name(&self) -> &'static str {
        "jsonapi-transform"
    }

    fn order(&self) -> i32 {
        super::ORDER_TRANSFORM
    }

    async fn post(
        &self,
        exchange: &mut Exchange,
        response: Response<Body>,
    ) -> Result<Response<Body>, GatewayError> {
        if !exchange.upstream_called {
            return Ok(response);
        }
        let Some(route) = exchange.route.clone() else {
            return Ok(response);
        };

        let includes = exchange.include_params();
        let authz = self.authz.get(&route.collection);
        let has_field_policies = authz.as_ref().is_some_and(|a| a.has_field_policies());

        if includes.is_empty() && !has_field_policies {
            return Ok(response);
        }

        let (mut parts, body) = response.into_parts();

        let bytes = match buffer_up_to(body, self.response_size_limit).await? {
            Buffered::Complete(bytes) => bytes,
            Buffered::Oversized(body) => {
                warn!(
                    route_id = %route.id,
                    limit = self.response_size_limit,
                    "response exceeds transform size limit, passing through"
                );
                self.metrics.increment_transform_degraded();
                return Ok(Response::from_parts(parts, body));
            }
        };

        let mut doc = match JsonApiDocument::parse(&bytes) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    route_id = %route.id,
                    error = %e,
                    "upstream body is not a JSON:API document, passing through"
                );
                self.metrics.increment_transform_degraded();
                return Ok(Response::from_parts(parts, Body::from(bytes)));
            }
        };

        if !includes.is_empty() {
            let degraded = splice_includes(&mut doc, &includes, &self.resolver).await;
            if degraded {
                self.metrics.increment_transform_degraded();
            } else if !doc.included.is_empty() {
                self.metrics.increment_includes_resolved();
            }
        }

        if let (Some(authz), Some(principal)) = (authz.as_deref(), exchange.principal.as_ref()) {
            apply_field_policies(&mut doc, authz, principal);
        }

        let out = doc
            .to_bytes()
            .map_err(|e| GatewayError::Internal(format!("failed to serialize document: {e}")))?;

        parts
            .headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(out.len()));

        Ok(Response::from_parts(parts, Body::from(out)))
    }
}
