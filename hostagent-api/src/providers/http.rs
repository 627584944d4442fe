use crate::{
    client::{ApiClient, SearchFilter},
    errors::{ApiError, Result},
};

use async_trait::async_trait;
use hostagent_core::{Broker, CheckBundle};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "https://api.circonus.com/v2";
pub const DEFAULT_API_APP: &str = "hostagent";

const AUTH_TOKEN_HEADER: &str = "X-Circonus-Auth-Token";
const APP_NAME_HEADER: &str = "X-Circonus-App-Name";

/// Connection settings for the HTTP provider.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub url: String,
    pub token: String,
    pub app: String,
    pub timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        HttpOptions {
            url: DEFAULT_API_URL.to_string(),
            token: String::new(),
            app: DEFAULT_API_APP.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Talks to the monitoring backend over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(options: HttpOptions) -> Result<Self> {
        if options.token.is_empty() {
            return Err(ApiError::InvalidArguments("api token is required".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTH_TOKEN_HEADER,
            HeaderValue::from_str(&options.token)
                .map_err(|_| ApiError::InvalidArguments("api token is not a valid header".into()))?,
        );
        headers.insert(
            APP_NAME_HEADER,
            HeaderValue::from_str(&options.app)
                .map_err(|_| ApiError::InvalidArguments("api app is not a valid header".into()))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(options.timeout)
            .build()?;

        Ok(HttpApi {
            client,
            base_url: options.url.trim_end_matches('/').to_string(),
        })
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&CheckBundle>,
    ) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "api request");

        let mut request = self.client.request(method, &url).query(query);
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(serde_json::to_vec(body)?);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            warn!(path = %path, code = status.as_u16(), "api request failed");
            return Err(ApiError::Status {
                code: status.as_u16(),
                path: path.to_string(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ApiClient for HttpApi {
    async fn fetch_brokers(&self) -> Result<Vec<Broker>> {
        let bytes = self.request(Method::GET, "/broker", &[], None).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn fetch_check_bundle(&self, cid: &str) -> Result<CheckBundle> {
        let bytes = self.request(Method::GET, cid, &[], None).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn search_check_bundles(
        &self,
        criteria: &str,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<CheckBundle>> {
        let mut query = vec![("search".to_string(), criteria.to_string())];
        if let Some(filter) = filter {
            for (field, values) in filter {
                for value in values {
                    query.push((format!("f_{}", field), value.clone()));
                }
            }
        }

        let bytes = self
            .request(Method::GET, "/check_bundle", &query, None)
            .await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn create_check_bundle(&self, draft: &CheckBundle) -> Result<CheckBundle> {
        let bytes = self
            .request(Method::POST, "/check_bundle", &[], Some(draft))
            .await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn update_check_bundle(&self, bundle: &CheckBundle) -> Result<CheckBundle> {
        if bundle.cid.is_empty() {
            return Err(ApiError::InvalidArguments(
                "cannot update a check bundle without cid".to_string(),
            ));
        }
        let bytes = self
            .request(Method::PUT, &bundle.cid, &[], Some(bundle))
            .await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.request(Method::GET, path, &[], None).await
    }
}
