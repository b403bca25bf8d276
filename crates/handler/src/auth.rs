use std::{collections::HashMap, convert::Infallible, sync::Arc};

use anyhow::Context;
use clap::Args;
use http::{header::AUTHORIZATION, HeaderMap};
use jsonwebtoken::{jwk::JwkSet, DecodingKey};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use warp::{header::headers_cloned, Filter, Rejection};

use crate::UserContext;

#[derive(Default)]
pub struct Auth {
    pub config: AuthConfig,
    pub decoding_keys: HashMap<String, DecodingKey>,
}

#[derive(Args, Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[clap(long = "auth-enabled", env = "AUTH_ENABLED")]
    #[serde(default)]
    pub enabled: bool,

    #[clap(long = "auth-header-name", env = "AUTH_HEADER_NAME", default_value = "authorization")]
    #[serde(default = "default_header_name")]
    pub header_name: String,

    #[clap(long = "auth-header-prefix", env = "AUTH_HEADER_PREFIX", default_value = "")]
    #[serde(default)]
    pub header_prefix: String,

    /// Reject requests without a token.
    #[clap(long = "auth-required", env = "AUTH_REQUIRED")]
    #[serde(default)]
    pub required: bool,

    #[clap(long = "auth-jwks", env = "AUTH_JWKS", default_value = "")]
    #[serde(default)]
    pub jwks: String,

    /// Claim holding the caller's roles, either a list or a space separated string.
    #[clap(long = "auth-roles-claim", env = "AUTH_ROLES_CLAIM", default_value = "roles")]
    #[serde(default = "default_roles_claim")]
    pub roles_claim: String,

    /// Roles granted to callers without a token.
    #[clap(long = "auth-anonymous-roles", env = "AUTH_ANONYMOUS_ROLES", value_delimiter = ',')]
    #[serde(default)]
    pub anonymous_roles: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            header_name: default_header_name(),
            header_prefix: String::new(),
            required: false,
            jwks: String::new(),
            roles_claim: default_roles_claim(),
            anonymous_roles: Vec::new(),
        }
    }
}

impl Auth {
    pub async fn try_new(config: AuthConfig) -> anyhow::Result<Self> {
        let jwks = reqwest::get(&config.jwks)
            .await
            .context("failed to fetch jwks")?
            .json::<JwkSet>()
            .await
            .context("failed to decode jwks")?;

        let decoding_keys = jwks
            .keys
            .into_iter()
            .filter_map(|jwk| {
                let res = DecodingKey::from_jwk(&jwk).context("failed to create decoding key from jwk");
                jwk.common.key_id.map(|kid| res.map(|key| (kid, key)))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(Self {
            config,
            decoding_keys,
        })
    }

    fn anonymous(&self) -> Identity {
        Identity {
            user: None,
            roles: self.config.anonymous_roles.clone(),
        }
    }
}

/// Who is calling, as far as the token tells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// The `sub` claim.
    pub user: Option<String>,
    pub roles: Vec<String>,
}

impl Identity {
    pub fn from_claims(claims: &Value, roles_claim: &str) -> Self {
        let user = claims.get("sub").and_then(Value::as_str).map(ToString::to_string);
        let roles = match claims.get(roles_claim) {
            Some(Value::Array(roles)) => roles
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect(),
            Some(Value::String(roles)) => roles.split_whitespace().map(ToString::to_string).collect(),
            _ => Vec::new(),
        };
        Self { user, roles }
    }
}

impl From<Identity> for UserContext {
    fn from(identity: Identity) -> Self {
        UserContext::new(identity.user, identity.roles)
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingAuthorizationHeader,

    #[error("authorization prefix not found")]
    AuthorizationPrefixNotFound,

    #[error("jwt decoding error: {0}")]
    DecodingError(#[from] jsonwebtoken::errors::Error),

    #[error("missing kid in authorization header")]
    MissingKid,

    #[error("invalid kid in authorization header")]
    InvalidKid,
}

impl warp::reject::Reject for AuthError {}

pub fn with_auth_state(auth: Arc<Auth>) -> impl Filter<Extract = (Arc<Auth>,), Error = Infallible> + Clone {
    warp::any().map(move || auth.clone())
}

pub fn with_auth(auth: Arc<Auth>) -> impl Filter<Extract = (Identity,), Error = Rejection> + Clone {
    headers_cloned().and(with_auth_state(auth)).and_then(jwt_auth_validate)
}

async fn jwt_auth_validate(header_map: HeaderMap, auth: Arc<Auth>) -> Result<Identity, Rejection> {
    authenticate(&header_map, &auth).map_err(warp::reject::custom)
}

fn authenticate(header_map: &HeaderMap, auth: &Auth) -> Result<Identity, AuthError> {
    if !auth.config.enabled {
        return Ok(auth.anonymous());
    }

    let Some(header) = header_map.get(auth.config.header_name.as_str()) else {
        if auth.config.required {
            return Err(AuthError::MissingAuthorizationHeader);
        }
        return Ok(auth.anonymous());
    };

    let token = header
        .to_str()
        .unwrap_or_default()
        .strip_prefix(&auth.config.header_prefix)
        .ok_or(AuthError::AuthorizationPrefixNotFound)?
        .trim_start();

    let token_header = jsonwebtoken::decode_header(token)?;
    let kid = token_header.kid.ok_or(AuthError::MissingKid)?;
    let decoding_key = auth.decoding_keys.get(&kid).ok_or(AuthError::InvalidKid)?;

    let mut validation = jsonwebtoken::Validation::new(token_header.alg);
    validation.required_spec_claims.clear();
    let claims = jsonwebtoken::decode::<Value>(token, decoding_key, &validation)?.claims;

    Ok(Identity::from_claims(&claims, &auth.config.roles_claim))
}

fn default_header_name() -> String {
    AUTHORIZATION.to_string()
}

fn default_roles_claim() -> String {
    "roles".to_string()
}
