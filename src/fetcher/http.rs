use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, ORIGIN, REFERER};
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::app::{DynlensError, Result};
use crate::fetcher::{Credentials, FetchOptions, PageSource, RawPage};

/// The upstream rejects non-browser user agents.
const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Upstream code for a missing or expired session cookie.
const CODE_NOT_LOGGED_IN: i64 = -101;

/// Cookie-authenticated [`PageSource`] over the web dynamic-feed endpoint.
pub struct HttpPageSource {
    client: Client,
    endpoint: String,
    feed_type: String,
    features: String,
    web_location: String,
}

impl HttpPageSource {
    pub fn new(creds: &Credentials, opts: &FetchOptions) -> Result<Self> {
        if creds.is_empty() {
            return Err(DynlensError::Auth(crate::i18n::t("no_creds")));
        }

        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static("https://t.bilibili.com/"));
        headers.insert(
            ORIGIN,
            HeaderValue::from_static("https://www.bilibili.com"),
        );
        let cookie = HeaderValue::from_str(&creds.cookie_header())
            .map_err(|_| DynlensError::Auth("cookie contains invalid characters".to_string()))?;
        headers.insert(COOKIE, cookie);

        let client = Client::builder()
            .user_agent(BROWSER_UA)
            .default_headers(headers)
            .timeout(Duration::from_secs(opts.timeout_seconds))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            endpoint: opts.endpoint.clone(),
            feed_type: opts.feed_type.clone(),
            features: opts.features.clone(),
            web_location: opts.web_location.clone(),
        })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, offset: &str, update_baseline: &str) -> Result<RawPage> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("type", self.feed_type.as_str()),
                ("offset", offset),
                ("update_baseline", update_baseline),
                ("features", self.features.as_str()),
                ("web_location", self.web_location.as_str()),
            ])
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(DynlensError::Auth(format!(
                "upstream rejected the session (HTTP {})",
                response.status()
            )));
        }
        response.error_for_status_ref()?;

        let body = response.text().await?;
        let data: Value = serde_json::from_str(&body)
            .map_err(|e| DynlensError::Parse(format!("feed page is not JSON: {e}")))?;

        let code = data
            .get("code")
            .and_then(Value::as_i64)
            .ok_or_else(|| DynlensError::Parse("feed page has no status code".to_string()))?;
        if code == CODE_NOT_LOGGED_IN {
            return Err(DynlensError::Auth(
                "session cookie expired or not logged in".to_string(),
            ));
        }
        if code != 0 {
            let message = data
                .get("message")
                .or_else(|| data.get("msg"))
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(DynlensError::Api { code, message });
        }

        let payload = data.get("data").cloned().unwrap_or(Value::Null);
        let items = payload
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(RawPage {
            items,
            offset: payload
                .get("offset")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            update_baseline: payload
                .get("update_baseline")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            has_more: payload
                .get("has_more")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_credentials_rejected() {
        let result = HttpPageSource::new(&Credentials::default(), &FetchOptions::default());
        assert!(matches!(result, Err(DynlensError::Auth(_))));
    }

    #[test]
    fn test_credentials_accepted_with_sessdata_only() {
        let creds = Credentials {
            sessdata: "abc".into(),
            ..Default::default()
        };
        assert!(HttpPageSource::new(&creds, &FetchOptions::default()).is_ok());
    }
}
