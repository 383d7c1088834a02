use anyhow::{anyhow, Result};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, Response};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub enum AcceptType {
    Json,
    Html,
}

/// Thin wrapper around [`reqwest::Client`] with a cookie store and a fixed
/// transport timeout. All Okta traffic goes through this.
pub struct ApiClient {
    http_client: Client,
}

impl ApiClient {
    pub fn new() -> Result<ApiClient> {
        Ok(ApiClient {
            http_client: Client::builder()
                .cookie_store(true)
                .timeout(REQUEST_TIMEOUT)
                .build()?,
        })
    }

    /// Builds a client whose cookie jar is pre-seeded with an Okta `sid`
    /// session cookie for the org host, making every request authenticated.
    pub fn with_session_cookie(org_url: &Url, session_id: &str) -> Result<ApiClient> {
        let host = org_url
            .host_str()
            .ok_or_else(|| anyhow!("could not get host from org url"))?;

        let jar = Jar::default();
        jar.add_cookie_str(
            &format!("sid={}; Domain={}; Path=/", session_id, host),
            org_url,
        );

        Ok(ApiClient {
            http_client: Client::builder()
                .cookie_provider(Arc::new(jar))
                .timeout(REQUEST_TIMEOUT)
                .build()?,
        })
    }

    pub async fn post_json(&self, uri: &str, json: &Value) -> Result<Response> {
        let res = self
            .http_client
            .post(uri)
            .json(json)
            .header(ACCEPT, ApiClient::accept_header(AcceptType::Json))
            .send()
            .await?;

        Ok(res)
    }

    pub async fn get(
        &self,
        url: String,
        params: Option<HashMap<String, String>>,
        accept_type: AcceptType,
    ) -> Result<Response> {
        let accept_header = ApiClient::accept_header(accept_type);
        let mut url = Url::parse(url.as_str())?;

        for (key, value) in &params.unwrap_or_default() {
            url.query_pairs_mut()
                .append_pair(key.as_str(), value.as_str());
        }

        let request = self.http_client.get(url).header(ACCEPT, accept_header);
        let response = request.send().await?;

        Ok(response)
    }

    fn accept_header(accept_type: AcceptType) -> HeaderValue {
        match accept_type {
            AcceptType::Html => {
                HeaderValue::from_static("text/html,application/xhtml+xml,application/xml")
            }
            AcceptType::Json => HeaderValue::from_static("application/json"),
        }
    }
}
