use std::{
    panic::Location,
    sync::Arc,
    time::{Duration, Instant},
};

use clap::Args;
use prometheus::Registry;
use rolegate_executor::{prepare, ExecutionRequest, ExecutionResult, Request, Response, ValidationLimits};
use rolegate_schema::{ExecutionContext, MetaType, ScalarCodec, Schema, SchemaBuilder, SchemaError};
use serde::Deserialize;
use thiserror::Error;
use value::ConstValue;

use crate::{
    error_record,
    formatter::fault_text,
    format_error,
    Authorization,
    Dispatcher,
    LogAction,
    LogSink,
    Metrics,
    RequestScope,
    TracingSink,
    TransportMeta,
};

/// Faults that abort a request before execution starts.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Schema is not set.")]
    SchemaNotSet,

    #[error("Query is missing.")]
    MissingQuery,

    #[error("Role checking is enabled, but the context cannot report user roles.")]
    RolesUnavailable,

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Failed to register metrics: {0}")]
    Metrics(#[from] prometheus::Error),
}

#[derive(Args, Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[clap(long, env = "MAX_QUERY_COMPLEXITY", default_value_t = default_max_query_complexity())]
    #[serde(default = "default_max_query_complexity")]
    pub max_query_complexity: usize,

    #[clap(long, env = "MAX_QUERY_DEPTH", default_value_t = default_max_query_depth())]
    #[serde(default = "default_max_query_depth")]
    pub max_query_depth: usize,

    /// Check every field against the caller's roles.
    #[clap(long, env = "ROLE_CHECKER")]
    #[serde(default)]
    pub role_checker: bool,

    /// Log every registered resolver call.
    #[clap(long, env = "LOG_ALL", default_value_t = true, action = clap::ArgAction::Set)]
    #[serde(default = "default_true")]
    pub log_all: bool,

    /// Add the underlying message of every error to its extensions.
    #[clap(long, env = "GRAPHQL_DEBUG")]
    #[serde(default)]
    pub debug: bool,

    #[clap(long, env = "LOG_CHANNEL", default_value = "graphql")]
    #[serde(default = "default_log_channel")]
    pub log_channel: String,

    /// Header naming the user a calling service acts on behalf of.
    #[clap(long, env = "FOREIGN_USER_HEADER", default_value = "x-foreign-service-user")]
    #[serde(default = "default_foreign_user_header")]
    pub foreign_user_header: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_query_complexity: default_max_query_complexity(),
            max_query_depth: default_max_query_depth(),
            role_checker: false,
            log_all: true,
            debug: false,
            log_channel: default_log_channel(),
            foreign_user_header: default_foreign_user_header(),
        }
    }
}

impl GatewayConfig {
    pub fn limits(&self) -> ValidationLimits {
        ValidationLimits {
            max_complexity: Some(self.max_query_complexity),
            max_depth: Some(self.max_query_depth),
        }
    }
}

fn default_max_query_complexity() -> usize {
    100
}

fn default_max_query_depth() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_log_channel() -> String {
    "graphql".to_string()
}

fn default_foreign_user_header() -> String {
    "x-foreign-service-user".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestState {
    Idle,
    QueryExtracted,
    Validated,
    Executing,
    Formatting,
    Done,
    Failed,
}

struct Lifecycle {
    state: RequestState,
    started: Instant,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            state: RequestState::Idle,
            started: Instant::now(),
        }
    }

    fn advance(&mut self, next: RequestState) {
        tracing::trace!(from = ?self.state, to = ?next, "Request state changed.");
        self.state = next;
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

pub struct GatewayBuilder {
    schema: SchemaBuilder,
    config: GatewayConfig,
    root_value: ConstValue,
    sink: Option<Arc<dyn LogSink>>,
    registry: Option<Registry>,
}

impl GatewayBuilder {
    #[must_use]
    pub fn query(mut self, ty: MetaType) -> Self {
        self.schema = self.schema.query(ty);
        self
    }

    #[must_use]
    pub fn mutation(mut self, ty: MetaType) -> Self {
        self.schema = self.schema.mutation(ty);
        self
    }

    #[must_use]
    pub fn subscription(mut self, ty: MetaType) -> Self {
        self.schema = self.schema.subscription(ty);
        self
    }

    /// Add a non-root object type.
    #[must_use]
    pub fn register(mut self, ty: MetaType) -> Self {
        self.schema = self.schema.register(ty);
        self
    }

    #[must_use]
    pub fn scalar(mut self, codec: impl ScalarCodec + 'static) -> Self {
        self.schema = self.schema.scalar(codec);
        self
    }

    #[must_use]
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn max_query_complexity(mut self, max_query_complexity: usize) -> Self {
        self.config.max_query_complexity = max_query_complexity;
        self
    }

    #[must_use]
    pub fn max_query_depth(mut self, max_query_depth: usize) -> Self {
        self.config.max_query_depth = max_query_depth;
        self
    }

    #[must_use]
    pub fn role_checker(mut self, enabled: bool) -> Self {
        self.config.role_checker = enabled;
        self
    }

    #[must_use]
    pub fn log_all(mut self, enabled: bool) -> Self {
        self.config.log_all = enabled;
        self
    }

    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.config.debug = enabled;
        self
    }

    #[must_use]
    pub fn log_channel(mut self, channel: impl Into<String>) -> Self {
        self.config.log_channel = channel.into();
        self
    }

    /// The value root fields are resolved against. Null by default.
    #[must_use]
    pub fn root_value(mut self, root_value: ConstValue) -> Self {
        self.root_value = root_value;
        self
    }

    /// Where request records go. A [`TracingSink`] on the configured channel
    /// by default.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn metrics_registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn finish(self) -> Result<Gateway, GatewayError> {
        let schema = if self.schema.has_root() {
            Some(self.schema.finish()?)
        } else {
            tracing::warn!("Gateway has no root type, every request will fail.");
            None
        };
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(TracingSink::new(self.config.log_channel.clone())));
        let metrics = Metrics::new(&self.registry.unwrap_or_default())?;

        Ok(Gateway {
            schema,
            config: self.config,
            root_value: self.root_value,
            sink,
            metrics,
        })
    }
}

/// The composition root: schema, limits, switches and the log sink. Shared
/// between requests; everything mutable lives in a per-request scope.
pub struct Gateway {
    schema: Option<Schema>,
    config: GatewayConfig,
    root_value: ConstValue,
    sink: Arc<dyn LogSink>,
    metrics: Metrics,
}

impl Gateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder {
            schema: Schema::build(),
            config: GatewayConfig::default(),
            root_value: ConstValue::Null,
            sink: None,
            registry: None,
        }
    }

    #[inline]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    #[inline]
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Run one request. Field faults end up in the response; only
    /// configuration faults are returned as `Err`.
    pub fn execute(
        &self,
        request: Request,
        context: &dyn ExecutionContext,
        meta: TransportMeta,
    ) -> Result<Response, GatewayError> {
        let mut lifecycle = Lifecycle::new();
        let res = self.run(&mut lifecycle, request, context, meta);
        if res.is_err() {
            lifecycle.advance(RequestState::Failed);
        }
        let outcome = match &res {
            Ok(response) if response.errors.is_empty() => "ok",
            Ok(_) => "error",
            Err(_) => "failed",
        };
        self.metrics.observe_request(outcome, lifecycle.elapsed());
        res
    }

    fn run(
        &self,
        lifecycle: &mut Lifecycle,
        request: Request,
        context: &dyn ExecutionContext,
        meta: TransportMeta,
    ) -> Result<Response, GatewayError> {
        let Some(schema) = &self.schema else {
            tracing::error!("Schema is not set.");
            return Err(GatewayError::SchemaNotSet);
        };

        let scope = RequestScope::new(meta, self.sink.clone());
        lifecycle.advance(RequestState::QueryExtracted);

        let mut start = scope.record(LogAction::Start);
        start.query = request.query.clone();
        scope.emit(start);

        let Some(query) = request.query.as_deref() else {
            return Err(self.fatal(&scope, GatewayError::MissingQuery));
        };
        let authorization = match Authorization::for_context(self.config.role_checker, context) {
            Ok(authorization) => authorization,
            Err(err) => return Err(self.fatal(&scope, err)),
        };

        let prepared = prepare(
            schema,
            ExecutionRequest {
                source: query,
                operation_name: request.operation_name.as_deref(),
                variables: &request.variables,
                root_value: &self.root_value,
            },
            self.config.limits(),
        );
        let result = match prepared {
            Ok(prepared) => {
                lifecycle.advance(RequestState::Validated);
                let mut dispatcher = Dispatcher::new(schema, &scope, authorization)
                    .log_all(self.config.log_all)
                    .metrics(&self.metrics);
                lifecycle.advance(RequestState::Executing);
                prepared.execute(context, &mut dispatcher)
            },
            Err(errors) => ExecutionResult::from_errors(errors),
        };

        lifecycle.advance(RequestState::Formatting);
        let debug = self.config.debug;
        let response = result
            .set_error_formatter(|err| {
                scope.emit(error_record(&scope, err));
                format_error(err, debug)
            })
            .into_response();

        let mut end = scope.record(LogAction::End);
        end.query = Some(query.to_string());
        end.variables = serde_json::to_value(&request.variables).ok();
        end.execute_time = Some(lifecycle.elapsed().as_secs_f64());
        end.result = serde_json::to_string(&response).ok();
        scope.emit(end);

        lifecycle.advance(RequestState::Done);
        Ok(response)
    }

    /// Log a configuration fault as an `error` record and hand it back.
    #[track_caller]
    fn fatal(&self, scope: &RequestScope, err: GatewayError) -> GatewayError {
        let origin = Location::caller();
        let mut record = scope.record(LogAction::Error);
        record.error = Some(fault_text(&err.to_string(), origin.file(), origin.line(), 0));
        scope.emit(record);
        err
    }
}
