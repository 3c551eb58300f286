//! REST client
//!
//! [`Http`] owns the connection pool, the token, and the rate limiter. All
//! endpoints funnel through [`Http::request`], which retries rate limited and
//! failed requests according to the configured limits.

use parley_common::HttpConfig;
use parley_core::percent_encode;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{HttpError, HttpResult};
use crate::ratelimit::{RateLimitHeaders, RateLimitedBody, Ratelimiter};
use crate::route::Route;

/// Extra parts of a request besides its route
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub body: Option<serde_json::Value>,
    pub query: Vec<(&'static str, String)>,
    /// Sent as `X-Audit-Log-Reason`
    pub reason: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a JSON body
    pub fn json<T: Serialize>(body: &T) -> HttpResult<Self> {
        Ok(Self {
            body: Some(serde_json::to_value(body)?),
            ..Self::default()
        })
    }

    #[must_use]
    pub fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    #[must_use]
    pub fn reason(mut self, reason: Option<&str>) -> Self {
        self.reason = reason.map(str::to_string);
        self
    }
}

/// REST client, cheap to clone
#[derive(Debug, Clone)]
pub struct Http {
    inner: Arc<HttpInner>,
}

#[derive(Debug)]
struct HttpInner {
    client: reqwest::Client,
    authorization: String,
    bot: bool,
    config: HttpConfig,
    super_properties: Option<String>,
    ratelimiter: Ratelimiter,
}

impl Http {
    /// Create a client for a token
    ///
    /// Bot tokens get the `Bot ` prefix. User tokens also send the client
    /// fingerprint in `X-Super-Properties`.
    pub fn new(token: &str, bot: bool, config: HttpConfig) -> HttpResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        let authorization = if bot {
            format!("Bot {token}")
        } else {
            token.to_string()
        };
        let super_properties = (!bot).then(|| config.properties.encode());

        Ok(Self {
            inner: Arc::new(HttpInner {
                client,
                authorization,
                bot,
                config,
                super_properties,
                ratelimiter: Ratelimiter::new(),
            }),
        })
    }

    #[inline]
    pub fn is_bot(&self) -> bool {
        self.inner.bot
    }

    #[inline]
    pub fn config(&self) -> &HttpConfig {
        &self.inner.config
    }

    #[inline]
    pub fn ratelimiter(&self) -> &Ratelimiter {
        &self.inner.ratelimiter
    }

    fn headers(&self, options: &RequestOptions) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.inner.authorization) {
            headers.insert(AUTHORIZATION, value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.inner.config.user_agent) {
            headers.insert(USER_AGENT, value);
        }
        if let Some(props) = &self.inner.super_properties {
            if let Ok(value) = HeaderValue::from_str(props) {
                headers.insert("x-super-properties", value);
            }
        }
        if options.body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        if let Some(reason) = &options.reason {
            // Header values must be visible ASCII
            if let Ok(value) = HeaderValue::from_str(&percent_encode(reason)) {
                headers.insert("x-audit-log-reason", value);
            }
        }
        headers
    }

    /// Perform a request and decode the JSON response
    pub async fn request<T: DeserializeOwned>(
        &self,
        route: Route,
        options: RequestOptions,
    ) -> HttpResult<T> {
        let body = self.execute(&route, &options).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Perform a request whose response body is ignored
    pub async fn request_empty(&self, route: Route, options: RequestOptions) -> HttpResult<()> {
        self.execute(&route, &options).await.map(|_| ())
    }

    #[instrument(level = "debug", skip(self, options), fields(route = %route))]
    async fn execute(&self, route: &Route, options: &RequestOptions) -> HttpResult<Vec<u8>> {
        let url = format!("{}{}", self.inner.config.api_base, route.path());
        let max_tries = self.inner.config.max_retries.max(1);
        let limiter = &self.inner.ratelimiter;

        for tries in 0..max_tries {
            let last_try = tries + 1 >= max_tries;
            let guard = limiter.acquire(route).await;

            let mut builder = self
                .inner
                .client
                .request(route.method().clone(), &url)
                .headers(self.headers(options));
            if !options.query.is_empty() {
                builder = builder.query(&options.query);
            }
            if let Some(body) = &options.body {
                builder = builder.body(serde_json::to_vec(body)?);
            }

            let response = match builder.send().await {
                Ok(response) => response,
                Err(err) if (err.is_connect() || err.is_timeout()) && !last_try => {
                    drop(guard);
                    let delay = retry_delay(tries);
                    warn!(error = %err, tries, delay_secs = delay.as_secs(), "request failed, retrying");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let status = response.status().as_u16();
            let headers = RateLimitHeaders::from_headers(response.headers());
            limiter.update(route, &headers);
            let body = response.bytes().await;
            limiter.release(guard, route, &headers);
            let body = body?.to_vec();

            debug!(status, remaining = ?headers.remaining, "response received");

            if (200..300).contains(&status) {
                return Ok(body);
            }

            match status {
                429 => {
                    let limited: RateLimitedBody = match serde_json::from_slice(&body) {
                        Ok(limited) => limited,
                        Err(_) => RateLimitedBody {
                            retry_after: headers.reset_after.map_or(1.0, |d| d.as_secs_f64()),
                            global: headers.global,
                            message: String::new(),
                        },
                    };
                    let retry_after = limited.retry_after();
                    let global = limited.global || headers.global;
                    warn!(
                        retry_after_ms = retry_after.as_millis() as u64,
                        global,
                        bucket = ?headers.bucket,
                        "rate limited"
                    );
                    if global {
                        limiter.set_global(retry_after);
                    }
                    if last_try {
                        return Err(HttpError::RateLimited { retry_after, global });
                    }
                    if !global {
                        tokio::time::sleep(retry_after).await;
                    }
                }
                500 | 502 | 503 | 504 if !last_try => {
                    let delay = retry_delay(tries);
                    warn!(status, tries, delay_secs = delay.as_secs(), "server error, retrying");
                    tokio::time::sleep(delay).await;
                }
                _ => return Err(HttpError::from_response(status, &body)),
            }
        }

        Err(HttpError::ServerError { status: 0 })
    }
}

/// Backoff between retries of failed requests
fn retry_delay(tries: u32) -> Duration {
    Duration::from_secs(1 + u64::from(tries) * 2)
}
