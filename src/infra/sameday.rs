//! Thin asynchronous client for the Sameday courier REST API.
//!
//! - Attaches the session token to every call.
//! - Maps non-success responses to [`SamedayError::Api`] with the server's message.

use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::infra::session::CredentialSource;
use crate::util::time_window::TimeWindow;
use crate::util::version::user_agent;

pub const DEFAULT_BASE_URL: &str = "https://sameday-api.demo.zitec.com/api/";
const AUTH_HEADER: &str = "X-Auth-Token";
const FALLBACK_ERROR_MESSAGE: &str = "Request failed";

#[derive(Debug, Error)]
pub enum SamedayError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        body: Option<Value>,
    },
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One page of a list endpoint.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Clone)]
pub struct SamedayClient {
    http: Client,
    base_url: Url,
    credentials: Arc<dyn CredentialSource>,
}

impl SamedayClient {
    pub fn new(credentials: Arc<dyn CredentialSource>) -> Result<Self, SamedayError> {
        Self::with_base_url(DEFAULT_BASE_URL, credentials)
    }

    pub fn with_base_url(
        base: &str,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Self, SamedayError> {
        let base_url = Url::parse(&ensure_trailing_slash(base))?;
        let http = Client::builder().user_agent(user_agent()).build()?;
        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    /// `GET /client-awb-list`, optionally bounded to one business day.
    #[instrument(skip(self))]
    pub async fn list_awbs(
        &self,
        page: u32,
        per_page: u32,
        window: Option<TimeWindow>,
    ) -> Result<Page<Value>, SamedayError> {
        let mut url = self.url("client-awb-list")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("page", &page.to_string())
                .append_pair("countPerPage", &per_page.to_string());
            if let Some(window) = window {
                query
                    .append_pair("startTimestamp", &window.start.to_string())
                    .append_pair("endTimestamp", &window.end.to_string());
            }
        }
        let json = self.send_json(self.request(Method::GET, url)).await?;
        Ok(serde_json::from_value(json)?)
    }

    /// `GET /client/pickup-points`.
    #[instrument(skip(self))]
    pub async fn list_pickup_points(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Value>, SamedayError> {
        let mut url = self.url("client/pickup-points")?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("countPerPage", &per_page.to_string());
        let json = self.send_json(self.request(Method::GET, url)).await?;
        Ok(serde_json::from_value(json)?)
    }

    /// `POST /client/pickup-points`.
    pub async fn create_pickup_point(&self, body: &Value) -> Result<Value, SamedayError> {
        let url = self.url("client/pickup-points")?;
        self.send_json(self.request(Method::POST, url).json(body))
            .await
    }

    /// `POST /awb`.
    pub async fn create_awb(&self, body: &Value) -> Result<Value, SamedayError> {
        let url = self.url("awb")?;
        self.send_json(self.request(Method::POST, url).json(body))
            .await
    }

    /// `GET /awb/download/{awbNumber}/A4/pdf/attachment`, returning the PDF bytes.
    #[instrument(skip(self))]
    pub async fn download_awb_pdf(&self, awb_number: &str) -> Result<Vec<u8>, SamedayError> {
        let mut url = self.url("awb/download")?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .extend([awb_number, "A4", "pdf", "attachment"]);

        let response = self.request(Method::GET, url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = if text.trim().is_empty() {
                format!("Download failed ({})", status.as_u16())
            } else {
                text
            };
            return Err(SamedayError::Api {
                status: status.as_u16(),
                message,
                body: None,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match self.credentials.token() {
            Some(token) => builder.header(AUTH_HEADER, token),
            None => {
                warn!("calling the courier API without a session token");
                builder
            }
        }
    }

    async fn send_json(&self, builder: RequestBuilder) -> Result<Value, SamedayError> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let json = if text.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str::<Value>(&text))
        };
        debug!(status = status.as_u16(), "courier API responded");

        if !status.is_success() {
            let body = json.and_then(Result::ok);
            let message = body
                .as_ref()
                .and_then(error_message)
                .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string());
            return Err(SamedayError::Api {
                status: status.as_u16(),
                message,
                body,
            });
        }

        match json {
            Some(parsed) => Ok(parsed?),
            None => Ok(Value::Null),
        }
    }

    fn url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }
}

/// Server-provided message: `message` or `error.message`.
fn error_message(body: &Value) -> Option<String> {
    body.get("message")
        .or_else(|| body.get("error").and_then(|e| e.get("message")))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn ensure_trailing_slash(base: &str) -> String {
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    }
}
