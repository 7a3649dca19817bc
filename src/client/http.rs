use async_trait::async_trait;
use reqwest::Client as HttpClient;
use url::Url;
use log::debug;

use super::{ RelayTransport, TransportError };
use crate::models::api::{ GenerateRequest, GenerateResponse, GENERATE_ROUTE };
use crate::models::chat::Message;

/// Talks to a relay over HTTP. Any non-success status is an error; the
/// error body is not inspected.
pub struct HttpRelayTransport {
    http: HttpClient,
    endpoint: Url,
}

impl HttpRelayTransport {
    pub fn new(relay_url: &str) -> Result<Self, TransportError> {
        Ok(Self {
            http: HttpClient::new(),
            endpoint: generate_endpoint(relay_url)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn generate_endpoint(relay_url: &str) -> Result<Url, url::ParseError> {
    let mut base = Url::parse(relay_url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(GENERATE_ROUTE.trim_start_matches('/'))
}

#[async_trait]
impl RelayTransport for HttpRelayTransport {
    async fn generate(&self, conversation: &[Message]) -> Result<String, TransportError> {
        debug!("POST {} with {} turns", self.endpoint, conversation.len());
        let resp = self.http
            .post(self.endpoint.clone())
            .json(&GenerateRequest { conversation })
            .send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        let body = resp.json::<GenerateResponse>().await?;
        Ok(body.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_from_bare_host() {
        let url = generate_endpoint("http://127.0.0.1:3000").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:3000/api/generate");
    }

    #[test]
    fn test_endpoint_keeps_path_prefix() {
        let url = generate_endpoint("https://example.com/chat").unwrap();
        assert_eq!(url.as_str(), "https://example.com/chat/api/generate");

        let url = generate_endpoint("https://example.com/chat/").unwrap();
        assert_eq!(url.as_str(), "https://example.com/chat/api/generate");
    }

    #[test]
    fn test_invalid_relay_url_is_rejected() {
        assert!(matches!(HttpRelayTransport::new("not a url"), Err(TransportError::InvalidUrl(_))));
    }
}
