//! HTTP transport: one POST to `/write` per flush

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Url};

use super::error::SendError;
use crate::core::config::SenderConfig;

pub struct HttpSender {
    client: Client,
    url: Url,
    authorization: Option<String>,
}

impl HttpSender {
    pub fn new(config: &SenderConfig) -> Result<Self, SendError> {
        let url = write_url(config)?;
        let authorization = (!config.auth.is_empty())
            .then(|| format!("Basic {}", STANDARD.encode(config.auth.as_bytes())));

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .danger_accept_invalid_certs(config.trust_all_certs)
            .danger_accept_invalid_hostnames(config.trust_all_hostnames)
            .build()
            .map_err(|e| SendError::Config(format!("failed to build HTTP client: {}", e)))?;

        tracing::debug!(url = %url, basic_auth = authorization.is_some(), "HTTP sender ready");

        Ok(Self {
            client,
            url,
            authorization,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// POST the body; any non-2xx status is an error carrying the response text
    pub async fn send(&self, body: String) -> Result<u16, SendError> {
        let mut request = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body);
        if let Some(authorization) = &self.authorization {
            request = request.header(AUTHORIZATION, authorization);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Http {
                status: status.as_u16(),
                url: self.url.to_string(),
                body,
            });
        }
        Ok(status.as_u16())
    }
}

fn write_url(config: &SenderConfig) -> Result<Url, SendError> {
    let base = format!("{}://{}:{}/write", config.protocol, config.host, config.port);
    let mut url = Url::parse(&base)
        .map_err(|e| SendError::Config(format!("invalid InfluxDB URL '{}': {}", base, e)))?;
    url.query_pairs_mut()
        .append_pair("db", &config.database)
        .append_pair("precision", config.precision.precision());
    Ok(url)
}
