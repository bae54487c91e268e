use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::{Method, RequestBuilder, Response};

use crate::config::ClientConfig;
use crate::error::ExplorerError;

/// A simple wrapper on an HTTP client for making requests. Sets defaults such as timeouts and
/// user-agent, and re-sends requests that never reached the server.
///
/// Received responses are always handed back as-is, whatever their status: deciding what a 401
/// or a 500 means is the pipeline's and the caller's job.
#[derive(Debug)]
pub(crate) struct Request {
    client: reqwest::Client,
    timeout: Duration,
    max_retries: u32,
    user_agent: String,
}

impl Request {
    /// Initializes a new `Request` instance.
    pub(crate) fn new(config: &ClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: config.timeout(),
            max_retries: config.connect_retries(),
            user_agent: config.user_agent().to_string(),
        }
    }

    /// Creates a request builder with defaults applied.
    pub(crate) fn req(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .timeout(self.timeout)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
    }

    /// Sends the request produced by `build`, rebuilding it for every attempt.
    ///
    /// Bodies such as multipart forms cannot be cloned, so the caller supplies a builder
    /// function instead of a `RequestBuilder`.
    pub(crate) async fn handle<F>(&self, build: F) -> Result<Response, ExplorerError>
    where
        F: Fn() -> RequestBuilder,
    {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(self.max_retries as usize);

        (|| async { execute_request_builder(build()).await })
            .retry(backoff)
            .when(RequestHandleError::is_retryable)
            .notify(|err: &RequestHandleError, after: Duration| {
                log::debug!("retrying {} in {after:?}: {}", err.url, err.error);
            })
            .await
            .map_err(Into::into)
    }
}

#[derive(Debug)]
struct RequestHandleError {
    url: String,
    error: String,
    retryable: bool,
}

impl RequestHandleError {
    const fn retryable(url: String, error: String) -> Self {
        Self {
            url,
            error,
            retryable: true,
        }
    }

    const fn permanent(url: String, error: String) -> Self {
        Self {
            url,
            error,
            retryable: false,
        }
    }

    const fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl From<RequestHandleError> for ExplorerError {
    fn from(value: RequestHandleError) -> Self {
        Self::NetworkError {
            url: value.url,
            status: None,
            error: value.error,
        }
    }
}

async fn execute_request_builder(
    request_builder: RequestBuilder,
) -> Result<Response, RequestHandleError> {
    let (client, request) = request_builder.build_split();
    let request = request.map_err(|err| {
        RequestHandleError::permanent(
            err.url()
                .map_or_else(|| "<unknown>".to_string(), ToString::to_string),
            format!("request build failed: {err}"),
        )
    })?;
    let url = request.url().to_string();

    match client.execute(request).await {
        Ok(resp) => Ok(resp),
        // Only connection failures are safe to re-send: the server never saw the request. A
        // timeout may have hit after an upload was already accepted.
        Err(err) if err.is_connect() => Err(RequestHandleError::retryable(
            url,
            format!("connection error: {err}"),
        )),
        Err(err) if err.is_timeout() => Err(RequestHandleError::permanent(
            url,
            format!("request timed out: {err}"),
        )),
        Err(err) => Err(RequestHandleError::permanent(
            url,
            format!("request failed: {err}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn request() -> Request {
        Request::new(
            &ClientConfig::new("http://127.0.0.1:1")
                .unwrap()
                .with_connect_retries(1),
        )
    }

    #[tokio::test]
    async fn test_error_statuses_are_returned_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky/")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let request = request();
        let url = format!("{}/flaky/", server.url());
        let response = request.handle(|| request.req(Method::GET, &url)).await.unwrap();

        assert_eq!(response.status().as_u16(), 503);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_user_agent_is_set() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/ua/")
            .match_header(
                "user-agent",
                mockito::Matcher::Regex("^expense-core/".to_string()),
            )
            .with_status(200)
            .create_async()
            .await;

        let request = request();
        let url = format!("{}/ua/", server.url());
        request.handle(|| request.req(Method::GET, &url)).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        let request = request();
        // port 1 is never listening
        let result = request
            .handle(|| request.req(Method::GET, "http://127.0.0.1:1/x/"))
            .await;

        match result {
            Err(ExplorerError::NetworkError { status: None, url, .. }) => {
                assert_eq!(url, "http://127.0.0.1:1/x/");
            }
            other => panic!("expected network error, got {other:?}"),
        }
    }
}
