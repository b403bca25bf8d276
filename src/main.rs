#![forbid(unsafe_code)]

mod config;
mod demo;

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use config::{Config, CorsConfig, LogFormat};
use futures_util::FutureExt;
use prometheus::{Encoder, Registry, TextEncoder};
use rolegate_handler::{
    auth::{Auth, AuthError},
    handler,
    handler::HandlerConfig,
    FormattedError,
    Gateway,
    Response,
};
use tokio::signal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use warp::{filters::BoxedFilter, http::Response as HttpResponse, hyper::StatusCode, Filter, Rejection, Reply};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (compact, json) = match format {
        LogFormat::Compact => (Some(fmt::layer().compact().with_target(false)), None),
        LogFormat::Json => (None, Some(fmt::layer().json().flatten_event(true))),
    };
    tracing_subscriber::registry().with(compact).with(json).with(filter).init();
}

pub fn metrics(registry: Registry) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("metrics").and(warp::get()).map({
        move || {
            let mut buffer = Vec::new();
            let encoder = TextEncoder::new();
            let metric_families = registry.gather();
            if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
                let mut response = HttpResponse::new(err.to_string().into_bytes());
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                return response;
            }
            HttpResponse::new(buffer)
        }
    })
}

async fn handle_rejection(err: Rejection) -> std::result::Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(e) = err.find::<AuthError>() {
        (StatusCode::UNAUTHORIZED, e.to_string())
    } else {
        tracing::error!("unhandled error: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
    };

    let res = warp::reply::json(&Response::from_errors(vec![FormattedError::new(message)]));
    Ok(warp::reply::with_status(res, code))
}

fn cors(config: CorsConfig) -> warp::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_methods(
            config
                .allow_methods
                .unwrap_or_default()
                .iter()
                .map(|s| s as &str)
                .collect::<Vec<&str>>(),
        )
        .allow_credentials(config.allow_credentials.unwrap_or(false))
        .allow_headers(config.allow_headers.unwrap_or_default())
        .allow_origins(
            config
                .allow_origins
                .unwrap_or_default()
                .iter()
                .map(|s| s as &str)
                .collect::<Vec<&str>>(),
        )
}

/// Match requests whose path is exactly `/{path}`.
fn mount(path: &str) -> BoxedFilter<()> {
    let expected = format!("/{}", path.trim_matches('/'));
    warp::path::full()
        .and_then(move |full: warp::path::FullPath| {
            let matches = full.as_str().trim_end_matches('/') == expected.trim_end_matches('/');
            async move {
                if matches {
                    Ok(())
                } else {
                    Err(warp::reject::not_found())
                }
            }
        })
        .untuple_one()
        .boxed()
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::try_parse()?;
    init_tracing(config.log_format);

    let registry = Registry::new();
    let gateway = demo::users(Gateway::builder())
        .config(config.gateway.clone())
        .metrics_registry(registry.clone())
        .finish()
        .context("Failed to build the gateway.")?;
    tracing::info!(
        role_checker = gateway.config().role_checker,
        log_all = gateway.config().log_all,
        max_query_depth = gateway.config().max_query_depth,
        max_query_complexity = gateway.config().max_query_complexity,
        "Gateway ready"
    );

    let handler_config = HandlerConfig {
        gateway: Arc::new(gateway),
    };

    let auth: Arc<Auth> = match config.authorization {
        Some(config) if config.enabled => Arc::new(Auth::try_new(config).await?),
        Some(config) => Arc::new(Auth {
            config,
            decoding_keys: Default::default(),
        }),
        None => Arc::new(Auth::default()),
    };

    let graphql = mount(&config.path).and(
        handler::graphql_request(auth.clone(), handler_config.clone())
            .or(handler::graphql_get(auth, handler_config))
            .or(handler::graphql_playground(config.path.trim_matches('/').to_string())),
    );
    let health = warp::path!("health").map(|| warp::reply::json(&"healthy"));

    let bind_addr: SocketAddr = config
        .bind
        .parse()
        .context(format!("Failed to parse bind addr '{}'", config.bind))?;
    if let Some(cors_config) = config.cors {
        let routes = health.or(metrics(registry)).or(graphql).with(cors(cors_config));
        let (addr, server) = warp::serve(routes.recover(handle_rejection))
            .bind_with_graceful_shutdown(bind_addr, signal::ctrl_c().map(|_| ()));
        tracing::info!(addr = %addr, "Listening");
        server.await;
        tracing::info!("Server shutdown");
    } else {
        let routes = health.or(metrics(registry)).or(graphql);
        let (addr, server) = warp::serve(routes.recover(handle_rejection))
            .bind_with_graceful_shutdown(bind_addr, signal::ctrl_c().map(|_| ()));
        tracing::info!(addr = %addr, "Listening");
        server.await;
        tracing::info!("Server shutdown");
    }

    Ok(())
}
