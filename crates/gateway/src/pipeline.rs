use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Response;

use crate::error::GatewayError;
use crate::exchange::Exchange;

/// What a pre-filter decided.
pub enum FilterAction {
    /// Hand the exchange to the next filter.
    Continue,
    /// Stop here and answer the client with this response.
    ShortCircuit(Response<Body>),
}

/// One stage of the pipeline.
///
/// `pre` runs before the upstream call and may mutate the exchange or
/// short-circuit; `post` decorates the response on the way out. Filters are
/// executed in ascending [`order`](Self::order) in both phases. A filter's
/// step must not block: suspension happens only at `.await` points, which
/// are cancelled wholesale when the client disconnects and the exchange
/// future is dropped.
#[async_trait]
pub trait Filter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Precedence. Lower runs earlier.
    fn order(&self) -> i32;

    async fn pre(&self, exchange: &mut Exchange) -> Result<FilterAction, GatewayError> {
        let _ = exchange;
        Ok(FilterAction::Continue)
    }

    async fn post(
        &self,
        exchange: &mut Exchange,
        response: Response<Body>,
    ) -> Result<Response<Body>, GatewayError> {
        let _ = exchange;
        Ok(response)
    }
}

/// The ordered filter chain. Built once at startup; shared by all
/// exchanges. Filters belonging to different exchanges run in parallel
/// without coordination; within one exchange the order is total.
pub struct Pipeline {
    filters: Vec<Arc<dyn Filter>>,
}

impl Pipeline {
    /// Build a pipeline, sorting the filters by precedence.
    #[must_use]
    pub fn new(mut filters: Vec<Arc<dyn Filter>>) -> Self {
        filters.sort_by_key(|f| f.order());
        Self { filters }
    }

    /// Run the pre phase. Returns the short-circuit response, if any.
    pub async fn run_pre(
        &self,
        exchange: &mut Exchange,
    ) -> Result<Option<Response<Body>>, GatewayError> {
        for filter in &self.filters {
            if let FilterAction::ShortCircuit(response) = filter.pre(exchange).await? {
                tracing::debug!(
                    filter = filter.name(),
                    correlation_id = %exchange.correlation_id,
                    "filter short-circuited exchange"
                );
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    /// Run the post phase over a response (upstream or short-circuit).
    pub async fn run_post(
        &self,
        exchange: &mut Exchange,
        mut response: Response<Body>,
    ) -> Result<Response<Body>, GatewayError> {
        for filter in &self.filters {
            response = filter.post(exchange, response).await?;
        }
        Ok(response)
    }

    /// Filter names in execution order, for startup logging.
    #[must_use]
    pub fn filter_names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Request, StatusCode};

    use super::*;

    struct Recorder {
        name: &'static str,
        order: i32,
        log: Arc<parking_lot::Mutex<Vec<&'static str>>>,
        short_circuit: bool,
    }

    #[async_trait]
    impl Filter for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn order(&self) -> i32 {
            self.order
        }

        async fn pre(&self, _exchange: &mut Exchange) -> Result<FilterAction, GatewayError> {
            self.log.lock().push(self.name);
            if self.short_circuit {
                let response = Response::builder()
                    .status(StatusCode::IM_A_TEAPOT)
                    .body(Body::empty())
                    .unwrap();
                return Ok(FilterAction::ShortCircuit(response));
            }
            Ok(FilterAction::Continue)
        }
    }

    fn exchange() -> Exchange {
        let req = Request::builder().uri("/api/x").body(Body::empty()).unwrap();
        Exchange::from_request(req, None)
    }

    fn recorder(
        name: &'static str,
        order: i32,
        log: &Arc<parking_lot::Mutex<Vec<&'static str>>>,
        short_circuit: bool,
    ) -> Arc<dyn Filter> {
        Arc::new(Recorder {
            name,
            order,
            log: Arc::clone(log),
            short_circuit,
        })
    }

    #[tokio::test]
    async fn filters_run_in_precedence_order() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(vec![
            recorder("auth", -100, &log, false),
            recorder("slug", -300, &log, false),
            recorder("authz", 0, &log, false),
        ]);

        let mut ex = exchange();
        let result = pipeline.run_pre(&mut ex).await.unwrap();

        assert!(result.is_none());
        assert_eq!(*log.lock(), vec!["slug", "auth", "authz"]);
    }

    #[tokio::test]
    async fn short_circuit_stops_the_chain() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(vec![
            recorder("slug", -300, &log, false),
            recorder("auth", -100, &log, true),
            recorder("authz", 0, &log, false),
        ]);

        let mut ex = exchange();
        let response = pipeline.run_pre(&mut ex).await.unwrap().unwrap();

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(*log.lock(), vec!["slug", "auth"]);
    }
}
