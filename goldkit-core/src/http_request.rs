use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::{Method, RequestBuilder, Response};

use crate::defaults::ApiConfig;
use crate::error::GoldKitError;

/// Which failures a request may be retried on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetryPolicy {
    /// Timeouts, connect errors, 429 and 5xx.
    Transient,
    /// Only failures where the request never reached the server. Used for
    /// PIN verification so a single keypad submission is never counted twice.
    ConnectOnly,
}

/// Thin wrapper over `reqwest::Client` that applies timeouts, a user-agent, a
/// request id and retry middleware.
pub(crate) struct Request {
    client: reqwest::Client,
    timeout: Duration,
    max_retries: u32,
}

impl Request {
    pub(crate) fn new(config: &ApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: config.timeout(),
            max_retries: config.max_retries,
        }
    }

    fn req(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .timeout(self.timeout)
            .header(
                "User-Agent",
                format!("goldkit-core/{}", env!("CARGO_PKG_VERSION")),
            )
            .header("x-request-id", uuid::Uuid::new_v4().to_string())
    }

    pub(crate) fn post(&self, url: &str) -> RequestBuilder {
        self.req(Method::POST, url)
    }

    /// Sends `request_builder`, retrying according to `policy`.
    pub(crate) async fn handle(
        &self,
        request_builder: RequestBuilder,
        policy: RetryPolicy,
    ) -> Result<Response, GoldKitError> {
        let Some(template) = request_builder.try_clone() else {
            return execute_request_builder(request_builder, policy)
                .await
                .map_err(Into::into);
        };

        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(self.max_retries as usize);

        (|| async {
            let request_builder = template.try_clone().ok_or_else(|| {
                RequestHandleError::permanent(
                    "<unknown>".to_string(),
                    None,
                    "request cannot be retried because it is not cloneable".to_string(),
                )
            })?;
            execute_request_builder(request_builder, policy).await
        })
        .retry(backoff)
        .when(|err: &RequestHandleError| err.retryable)
        .notify(|err: &RequestHandleError, after: Duration| {
            tracing::debug!(url = %err.url, ?after, "retrying request: {}", err.error);
        })
        .await
        .map_err(Into::into)
    }
}

#[derive(Debug)]
struct RequestHandleError {
    url: String,
    status: Option<u16>,
    error: String,
    retryable: bool,
}

impl RequestHandleError {
    const fn retryable(url: String, status: Option<u16>, error: String) -> Self {
        Self {
            url,
            status,
            error,
            retryable: true,
        }
    }

    const fn permanent(url: String, status: Option<u16>, error: String) -> Self {
        Self {
            url,
            status,
            error,
            retryable: false,
        }
    }
}

impl From<RequestHandleError> for GoldKitError {
    fn from(value: RequestHandleError) -> Self {
        Self::NetworkError {
            url: value.url,
            status: value.status,
            error: value.error,
        }
    }
}

async fn execute_request_builder(
    request_builder: RequestBuilder,
    policy: RetryPolicy,
) -> Result<Response, RequestHandleError> {
    let (client, request) = request_builder.build_split();
    let request = request.map_err(|err| {
        RequestHandleError::permanent(
            err.url()
                .map_or_else(|| "<unknown>".to_string(), ToString::to_string),
            None,
            format!("request build failed: {err}"),
        )
    })?;
    let url = request.url().to_string();

    match client.execute(request).await {
        Ok(resp) => {
            let status = resp.status().as_u16();
            let transient_status = status == 429 || (500..600).contains(&status);
            if transient_status && policy == RetryPolicy::Transient {
                return Err(RequestHandleError::retryable(
                    url,
                    Some(status),
                    format!("request error with bad status code {status}"),
                ));
            }
            Ok(resp)
        }
        Err(err) => {
            let retry = match policy {
                RetryPolicy::Transient => err.is_timeout() || err.is_connect(),
                RetryPolicy::ConnectOnly => err.is_connect(),
            };
            if retry {
                return Err(RequestHandleError::retryable(
                    url,
                    None,
                    format!("request timeout/connect error: {err}"),
                ));
            }

            Err(RequestHandleError::permanent(
                url,
                None,
                format!("request failed: {err}"),
            ))
        }
    }
}
