use crate::error::*;
use std::io::Read;
use url::Url;

/// Response of a HTTP request, regardless of its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking `GET` requests to registry and its authentication server
///
/// Non-2xx responses are returned as [Response], only failures of the transport
/// itself (DNS, TLS, connection) are errors.
pub trait Transport {
    fn get(&self, url: &Url, headers: &[(&str, &str)]) -> Result<Response>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &Url, headers: &[(&str, &str)]) -> Result<Response> {
        (**self).get(url, headers)
    }
}

/// [Transport] using [ureq::Agent]
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        UreqTransport {
            agent: ureq::AgentBuilder::new()
                .user_agent(concat!("ocipull/", env!("CARGO_PKG_VERSION")))
                .build(),
        }
    }
}

impl Transport for UreqTransport {
    fn get(&self, url: &Url, headers: &[(&str, &str)]) -> Result<Response> {
        log::info!("GET {}", url);
        let mut req = self.agent.get(url.as_str());
        for (key, value) in headers {
            req = req.set(key, value);
        }
        let res = match req.call() {
            Ok(res) => res,
            Err(ureq::Error::Status(_status, res)) => res,
            Err(ureq::Error::Transport(e)) => return Err(Error::NetworkError(e.into())),
        };
        let status = res.status();
        let mut body = Vec::new();
        res.into_reader().read_to_end(&mut body)?;
        log::debug!("{} returns {} ({} bytes)", url, status, body.len());
        Ok(Response { status, body })
    }
}
