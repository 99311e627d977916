use crate::{distribution::*, error::*};
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

/// Authentication server of a registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEndpoint {
    /// Base URL, `/token` is appended to get the token
    pub url: String,
    /// `service` parameter of the token request
    pub service: String,
}

/// Registries whose authentication server differs from the registry itself
///
/// Registries not listed here are assumed to serve `/token` on the same base URL,
/// with the host of the registry as `service`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthVariations {
    endpoints: HashMap<String, AuthEndpoint>,
}

impl Default for AuthVariations {
    fn default() -> Self {
        let mut variations = AuthVariations::empty();
        variations.insert(
            "https://registry-1.docker.io",
            AuthEndpoint {
                url: "https://auth.docker.io".to_string(),
                service: "registry.docker.io".to_string(),
            },
        );
        variations
    }
}

impl AuthVariations {
    pub fn empty() -> Self {
        AuthVariations {
            endpoints: HashMap::new(),
        }
    }

    pub fn insert(&mut self, registry: &str, endpoint: AuthEndpoint) {
        self.endpoints.insert(registry.to_string(), endpoint);
    }

    /// Authentication endpoint for the registry base URL, e.g. `https://ghcr.io`
    pub fn lookup(&self, registry: &str) -> Result<AuthEndpoint> {
        if let Some(endpoint) = self.endpoints.get(registry) {
            return Ok(endpoint.clone());
        }
        let url = Url::parse(registry)?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidUrl(url::ParseError::EmptyHost))?;
        let service = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        Ok(AuthEndpoint {
            url: registry.to_string(),
            service,
        })
    }
}

/// Bearer token of a [Client]
///
/// ```text
/// Unauthenticated -> TokenRequested -> Authenticated
///                                   -> AuthFailed
/// ```
///
/// The token is requested at most once. Neither an expired token nor a failed
/// request is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    Unauthenticated,
    TokenRequested,
    Authenticated(String),
    AuthFailed,
}

impl TokenState {
    pub fn token(&self) -> Option<&str> {
        match self {
            TokenState::Authenticated(token) => Some(token.as_str()),
            _ => None,
        }
    }
}

/// Response of the token server
///
/// See [Docker token authentication](https://docs.docker.com/registry/spec/auth/token/),
/// `access_token` is the OAuth2 compatible alias of `token`.
#[derive(Deserialize)]
struct Token {
    token: Option<String>,
    access_token: Option<String>,
}

/// URL to request anonymous pull token for `name`
pub fn token_url(endpoint: &AuthEndpoint, name: &Name) -> Result<Url> {
    Ok(Url::parse_with_params(
        &format!("{}/token", endpoint.url.trim_end_matches('/')),
        &[
            ("service", endpoint.service.clone()),
            ("scope", format!("repository:{}:pull", name)),
        ],
    )?)
}

/// Extract token from the body of token server response
pub fn parse_token(body: &[u8]) -> Result<Option<String>> {
    let token: Token = serde_json::from_slice(body)?;
    let non_empty = |token: &String| !token.is_empty();
    Ok(token
        .token
        .filter(non_empty)
        .or_else(|| token.access_token.filter(non_empty)))
}
