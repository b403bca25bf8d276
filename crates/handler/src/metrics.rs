use std::time::Duration;

use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

#[derive(Clone)]
pub struct Metrics {
    requests: IntCounterVec,
    request_duration: Histogram,
    resolver_duration: HistogramVec,
}

impl Metrics {
    /// Create the collectors and register them with `registry`.
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let requests = IntCounterVec::new(
            Opts::new("graphql_requests_total", "Number of GraphQL requests by outcome."),
            &["outcome"],
        )?;
        let request_duration = Histogram::with_opts(HistogramOpts::new(
            "graphql_request_duration_seconds",
            "Time spent executing a GraphQL request.",
        ))?;
        let resolver_duration = HistogramVec::new(
            HistogramOpts::new(
                "graphql_resolver_duration_seconds",
                "Time spent in registered field resolvers.",
            ),
            &["parent_type", "field"],
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(resolver_duration.clone()))?;

        Ok(Self {
            requests,
            request_duration,
            resolver_duration,
        })
    }

    pub fn observe_request(&self, outcome: &str, elapsed: Duration) {
        self.requests.with_label_values(&[outcome]).inc();
        self.request_duration.observe(elapsed.as_secs_f64());
    }

    pub fn observe_resolver(&self, parent_type: &str, field: &str, elapsed: Duration) {
        self.resolver_duration
            .with_label_values(&[parent_type, field])
            .observe(elapsed.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collectors_show_up_in_registry() {
        let registry = Registry::new();
        let metrics = Metrics::new(&registry).unwrap();
        metrics.observe_request("ok", Duration::from_millis(3));
        metrics.observe_resolver("Query", "user", Duration::from_millis(1));

        let names = registry
            .gather()
            .into_iter()
            .map(|family| family.get_name().to_string())
            .collect::<Vec<_>>();
        assert!(names.contains(&"graphql_requests_total".to_string()));
        assert!(names.contains(&"graphql_resolver_duration_seconds".to_string()));
    }

    #[test]
    fn registering_twice_fails() {
        let registry = Registry::new();
        Metrics::new(&registry).unwrap();
        assert!(Metrics::new(&registry).is_err());
    }
}
