use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use async_graphql::http::GraphiQLSource;
use http::{HeaderMap, StatusCode};
use rolegate_executor::{FormattedError, Request, Response};
use serde::Deserialize;
use tracing::instrument;
use value::Variables;
use warp::{http::Response as HttpResponse, Filter, Rejection, Reply};

use crate::{
    auth::{with_auth, Auth, Identity},
    Gateway,
    TransportMeta,
    UserContext,
};

const CORRELATION_HEADER: &str = "r-uuid";

#[derive(Clone)]
pub struct HandlerConfig {
    pub gateway: Arc<Gateway>,
}

/// A request from a form body or a query string: variables arrive as JSON text.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRequest {
    pub query: Option<String>,
    pub variables: Option<String>,
    #[serde(alias = "operation")]
    pub operation_name: Option<String>,
}

impl RawRequest {
    pub fn into_request(self) -> Result<Request, serde_json::Error> {
        let variables = match self.variables.as_deref().map(str::trim) {
            None | Some("") => Variables::default(),
            Some(variables) => serde_json::from_str(variables)?,
        };
        Ok(Request {
            query: self.query,
            operation_name: self.operation_name,
            variables,
        })
    }
}

fn transport_meta(
    header_map: &HeaderMap,
    remote_addr: Option<SocketAddr>,
    identity: &Identity,
    foreign_user_header: &str,
) -> TransportMeta {
    let header = |name: &str| {
        header_map
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string)
    };
    TransportMeta {
        remote_addr: remote_addr.map(|addr| addr.to_string()),
        auth_user: identity.user.clone(),
        correlation_id: header(CORRELATION_HEADER),
        foreign_service_user: header(foreign_user_header),
    }
}

fn error_reply(status: StatusCode, message: &str) -> HttpResponse<String> {
    let body = serde_json::to_string(&Response::from_errors(vec![FormattedError::new(message)])).unwrap_or_default();
    HttpResponse::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(body)
        .unwrap_or_default()
}

/// Run the gateway off the async runtime; resolvers may block.
async fn execute(
    config: HandlerConfig,
    request: Request,
    identity: Identity,
    meta: TransportMeta,
) -> HttpResponse<String> {
    let gateway = config.gateway;
    let outcome = tokio::task::spawn_blocking(move || {
        let context = UserContext::from(identity);
        gateway.execute(request, &context, meta)
    })
    .await;

    match outcome {
        Ok(Ok(response)) => match serde_json::to_string(&response) {
            Ok(body) => HttpResponse::builder()
                .status(StatusCode::OK)
                .header("content-type", "application/json")
                .body(body)
                .unwrap_or_default(),
            Err(err) => {
                tracing::error!(error = %err, "Failed to serialize response.");
                error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            },
        },
        Ok(Err(err)) => {
            tracing::error!(error = %err, "Request aborted.");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        },
        Err(err) => {
            tracing::error!(error = %err, "Request task failed.");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        },
    }
}

fn request_body() -> impl Filter<Extract = (Result<Request, serde_json::Error>,), Error = Rejection> + Clone {
    let json = warp::body::json::<Request>().map(Ok::<Request, serde_json::Error>);
    let form = warp::body::form::<RawRequest>().map(RawRequest::into_request);
    json.or(form).unify()
}

pub fn graphql_request(
    auth: Arc<Auth>,
    config: HandlerConfig,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::post()
        .and(with_auth(auth))
        .and(request_body())
        .and(warp::header::headers_cloned())
        .and(warp::addr::remote())
        .and_then({
            move |identity: Identity,
                  request: Result<Request, serde_json::Error>,
                  header_map: HeaderMap,
                  remote_addr: Option<SocketAddr>| {
                let config = config.clone();
                async move {
                    let request = match request {
                        Ok(request) => request,
                        Err(err) => {
                            return Ok::<_, Infallible>(error_reply(
                                StatusCode::BAD_REQUEST,
                                &format!("Variables are invalid JSON: {err}"),
                            ))
                        },
                    };
                    let meta = transport_meta(
                        &header_map,
                        remote_addr,
                        &identity,
                        &config.gateway.config().foreign_user_header,
                    );
                    Ok(execute(config, request, identity, meta).await)
                }
            }
        })
}

/// `GET` with the request in the query string. Requests without a query fall
/// through to the playground.
pub fn graphql_get(
    auth: Arc<Auth>,
    config: HandlerConfig,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::get()
        .and(warp::query::<RawRequest>())
        .and_then(|raw: RawRequest| async move {
            if raw.query.is_some() {
                Ok(raw)
            } else {
                Err(warp::reject::not_found())
            }
        })
        .and(with_auth(auth))
        .and(warp::header::headers_cloned())
        .and(warp::addr::remote())
        .and_then({
            move |raw: RawRequest, identity: Identity, header_map: HeaderMap, remote_addr: Option<SocketAddr>| {
                let config = config.clone();
                async move {
                    let request = match raw.into_request() {
                        Ok(request) => request,
                        Err(err) => {
                            return Ok::<_, Infallible>(error_reply(
                                StatusCode::BAD_REQUEST,
                                &format!("Variables are invalid JSON: {err}"),
                            ))
                        },
                    };
                    let meta = transport_meta(
                        &header_map,
                        remote_addr,
                        &identity,
                        &config.gateway.config().foreign_user_header,
                    );
                    Ok(execute(config, request, identity, meta).await)
                }
            }
        })
}

#[instrument(level = "trace")]
pub fn graphql_playground(path: String) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let endpoint = format!("/{path}");
    warp::get().map(move || {
        HttpResponse::builder()
            .header("content-type", "text/html")
            .body(GraphiQLSource::build().endpoint(endpoint.as_str()).finish())
    })
}
