use std::collections::BTreeMap;

use api_client_framework::{Endpoint, HttpApiClient, HttpApiClientConfig};
use serde::Deserialize;
use url::Url;

/// `GET /v1/latest?access_key=<key>` on the upstream exchange-rate provider.
pub struct ExchangeRatesEndpoint {
    pub access_key: String,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeRatesResponse {
    pub success: bool,
    pub base: String,
    pub date: String,
    pub rates: BTreeMap<String, f64>,
}

impl Endpoint for ExchangeRatesEndpoint {
    type Response = ExchangeRatesResponse;

    fn method(&self) -> reqwest::Method {
        reqwest::Method::GET
    }

    fn path(&self) -> String {
        "/v1/latest".to_string()
    }

    fn query(&self) -> Option<String> {
        Some(format!("access_key={}", self.access_key))
    }
}

pub struct UpstreamClient {
    inner: HttpApiClient,
}

impl UpstreamClient {
    pub fn new(base_url: Url, timeout: std::time::Duration) -> anyhow::Result<Self> {
        let config = HttpApiClientConfig {
            http_timeout: timeout,
            max_retries: 1,
            default_headers: Default::default(),
        };
        Ok(Self {
            inner: HttpApiClient::new(base_url, config)?,
        })
    }

    pub async fn fetch_rates(
        &self,
        access_key: &str,
    ) -> Result<ExchangeRatesResponse, api_client_framework::Error> {
        self.inner
            .request(&ExchangeRatesEndpoint {
                access_key: access_key.to_string(),
            })
            .await
    }
}
