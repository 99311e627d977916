use crate::{distribution::*, error::*, image::BlobSource, media_types, Digest, ImageName};
use oci_spec::distribution::ErrorResponse;
use url::Url;

/// A client for `/v2/<name>/` API endpoint
///
/// Holds the bearer token for pulling a single repository.
pub struct Client<T: Transport> {
    transport: T,
    /// URL to registry server
    url: Url,
    /// Where to get the token
    auth: AuthEndpoint,
    /// Name of repository
    name: Name,
    /// Tag or digest given by user
    reference: Reference,
    token: TokenState,
}

impl<T: Transport> Client<T> {
    /// Check `/v2/` endpoint of the registry and create a client for the image.
    ///
    /// `401 Unauthorized` is accepted, since registries requiring bearer token
    /// answer so for anonymous requests. Other non-2xx status is an error.
    pub fn connect(
        transport: T,
        image_name: &ImageName,
        variations: &AuthVariations,
    ) -> Result<Self> {
        let url = Url::parse(&image_name.registry).map_err(|e| {
            log::error!("Invalid registry URL {}: {}", image_name.registry, e);
            e
        })?;
        let api = url.join("/v2/")?;
        match transport.get(&api, &[]) {
            Ok(res) if res.is_success() || res.status == 401 => {
                log::debug!("API endpoint {} returns {}", api, res.status);
            }
            Ok(res) => {
                log::error!("API endpoint is not valid: {} (status {})", api, res.status);
                return Err(Error::RegistryUnreachable {
                    url: api,
                    status: Some(res.status),
                });
            }
            Err(e) => {
                log::error!("API endpoint is not reachable: {}: {}", api, e);
                return Err(Error::RegistryUnreachable {
                    url: api,
                    status: None,
                });
            }
        }
        let auth = variations.lookup(&image_name.registry).map_err(|e| {
            log::error!("No auth endpoint for {}: {}", image_name.registry, e);
            e
        })?;
        Ok(Client {
            transport,
            url,
            auth,
            name: image_name.name.clone(),
            reference: image_name.reference.clone(),
            token: TokenState::Unauthenticated,
        })
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    pub fn token_state(&self) -> &TokenState {
        &self.token
    }

    /// Get anonymous pull token from the authentication server.
    ///
    /// This never fails. Errors are logged, and the client becomes [TokenState::AuthFailed].
    /// Only the first call requests a token.
    pub fn refresh_token(&mut self) {
        if self.token != TokenState::Unauthenticated {
            log::debug!("Token has been already requested: {:?}", self.token);
            return;
        }
        self.token = TokenState::TokenRequested;
        self.token = match self.request_token() {
            Ok(Some(token)) => {
                log::debug!("Auth token refreshed for {}", self.name);
                TokenState::Authenticated(token)
            }
            Ok(None) => {
                log::error!("No token in response of {}", self.auth.url);
                TokenState::AuthFailed
            }
            Err(e) => {
                log::error!("Could not fetch auth token for {}: {}", self.name, e);
                TokenState::AuthFailed
            }
        };
    }

    fn request_token(&self) -> Result<Option<String>> {
        let url = token_url(&self.auth, &self.name)?;
        let res = self.transport.get(&url, &[("Accept", "application/json")])?;
        if !res.is_success() {
            return Err(Error::UnexpectedStatus {
                url,
                status: res.status,
            });
        }
        parse_token(&res.body)
    }

    /// Authenticated `GET /v2/<name>/<path>`
    pub fn get(&mut self, path: &str, accept: Option<&str>) -> Result<Vec<u8>> {
        let url = self.url.join(&format!("/v2/{}/{}", self.name, path))?;
        if self.token == TokenState::Unauthenticated {
            self.refresh_token();
        }
        let token = self
            .token
            .token()
            .ok_or_else(|| Error::AuthorizationFailed(url.clone()))?;
        let authorization = format!("Bearer {}", token);
        let mut headers = vec![("Authorization", authorization.as_str())];
        if let Some(accept) = accept {
            headers.push(("Accept", accept));
        }
        let res = self.transport.get(&url, &headers)?;
        if res.is_success() {
            Ok(res.body)
        } else {
            Err(match serde_json::from_slice::<ErrorResponse>(&res.body) {
                Ok(err) => Error::RegistryError(err),
                Err(_) => Error::UnexpectedStatus {
                    url,
                    status: res.status,
                },
            })
        }
    }

    /// Get manifest, or image index, as bytes
    ///
    /// ```text
    /// GET /v2/<name>/manifests/<reference>
    /// ```
    ///
    /// See [corresponding OCI distribution spec document](https://github.com/opencontainers/distribution-spec/blob/main/spec.md#pulling-manifests) for detail.
    pub fn get_manifest(&mut self, reference: &Reference) -> Result<Vec<u8>> {
        self.get(
            &format!("manifests/{}", reference),
            Some(&media_types::manifest_accept()),
        )
    }

    /// Get blob for given digest
    ///
    /// ```text
    /// GET /v2/<name>/blobs/<digest>
    /// ```
    ///
    /// See [corresponding OCI distribution spec document](https://github.com/opencontainers/distribution-spec/blob/main/spec.md#pulling-blobs) for detail.
    pub fn get_blob(&mut self, digest: &Digest) -> Result<Vec<u8>> {
        self.get(&format!("blobs/{}", digest), None)
    }
}

impl<T: Transport> BlobSource for Client<T> {
    fn fetch_blob(&mut self, digest: &Digest) -> Result<Vec<u8>> {
        self.get_blob(digest)
    }
}
