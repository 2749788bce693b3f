use std::time::Duration;

use serde_json::Value;
use tracing::warn;
use url::Url;

/// Timeout for a single upstream HTTP request.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Status used for responses synthesized from transport failures.
const STATUS_UNAVAILABLE: u16 = 503;

// ============================================================================
// API Response Envelope
// ============================================================================

/// Outcome of one upstream request, successful or not.
///
/// Transport failures (DNS, refused connection, timeout) are folded into the
/// same envelope as HTTP errors so that provider loops handle exactly one
/// shape: check [`ApiResponse::is_success`], then read the payload or log
/// [`ApiResponse::error_message`].
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    error: Option<String>,
    payload: Value,
}

impl ApiResponse {
    fn success(status: u16, payload: Value) -> Self {
        Self {
            status,
            error: None,
            payload,
        }
    }

    fn failure(status: u16, error: String) -> Self {
        Self {
            status,
            error: Some(error),
            payload: Value::Null,
        }
    }

    /// Envelope for a request that never produced an HTTP response.
    pub fn unavailable(error: String) -> Self {
        Self::failure(STATUS_UNAVAILABLE, error)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn failed(&self) -> bool {
        !self.is_success()
    }

    /// Decoded JSON body. `Null` for failures and unparseable bodies.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Human-readable failure description for logging.
    pub fn error_message(&self) -> String {
        match &self.error {
            Some(msg) if !msg.is_empty() => msg.clone(),
            _ => format!("HTTP {}", self.status),
        }
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Authenticated HTTP client for one provider API.
///
/// Every provider authenticates with a token passed as a query parameter,
/// but they disagree on the parameter name, so the connector pins both the
/// base URL and the auth parameter at construction and adapters only supply
/// endpoint paths and call-specific parameters.
pub struct Connector {
    client: reqwest::Client,
    base_url: Url,
    auth_param: &'static str,
    api_token: String,
}

impl Connector {
    pub fn new(
        client: reqwest::Client,
        base_url: Url,
        auth_param: &'static str,
        api_token: String,
    ) -> Self {
        Self {
            client,
            base_url,
            auth_param,
            api_token,
        }
    }

    /// Issues one GET against `endpoint`, resolved relative to the base URL,
    /// with the auth token appended to `params`.
    ///
    /// Never returns an error: failures of any kind come back as a failed
    /// [`ApiResponse`]. A 2xx body that is not valid JSON degrades to a
    /// `Null` payload with a warning, which mappers then treat as an empty
    /// result set.
    pub async fn fetch(&self, endpoint: &str, params: &[(&str, String)]) -> ApiResponse {
        let url = match self.base_url.join(endpoint) {
            Ok(url) => url,
            Err(e) => {
                return ApiResponse::unavailable(format!("invalid endpoint `{endpoint}`: {e}"))
            }
        };

        let request = self
            .client
            .get(url)
            .query(params)
            .query(&[(self.auth_param, self.api_token.as_str())]);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return ApiResponse::unavailable(e.to_string()),
        };

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return ApiResponse::failure(status, body);
        }

        match response.json::<Value>().await {
            Ok(payload) => ApiResponse::success(status, payload),
            Err(e) => {
                warn!(error = %e, status, "Response body is not valid JSON");
                ApiResponse::success(status, Value::Null)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn connector_for(server: &MockServer) -> Connector {
        let base = Url::parse(&format!("{}/", server.uri())).unwrap();
        Connector::new(reqwest::Client::new(), base, "apiKey", "secret".to_string())
    }

    #[tokio::test]
    async fn test_fetch_returns_decoded_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/headlines"))
            .and(query_param("language", "en"))
            .and(query_param("apiKey", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let response = connector_for(&server)
            .fetch("headlines", &[("language", "en".to_string())])
            .await;

        assert!(response.is_success());
        assert_eq!(response.payload()["status"], "ok");
    }

    #[tokio::test]
    async fn test_fetch_surfaces_http_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/headlines"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad api key"))
            .expect(1)
            .mount(&server)
            .await;

        let response = connector_for(&server).fetch("headlines", &[]).await;

        assert!(response.failed());
        assert_eq!(response.status, 401);
        assert_eq!(response.error_message(), "bad api key");
    }

    #[tokio::test]
    async fn test_fetch_folds_transport_failure_into_envelope() {
        // Port 1 is never listening; connect is refused immediately.
        let base = Url::parse("http://127.0.0.1:1/").unwrap();
        let connector = Connector::new(reqwest::Client::new(), base, "apiKey", "k".to_string());

        let response = connector.fetch("headlines", &[]).await;

        assert!(response.failed());
        assert_eq!(response.status, 503);
    }

    #[tokio::test]
    async fn test_fetch_tolerates_non_json_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let response = connector_for(&server).fetch("feed", &[]).await;

        assert!(response.is_success());
        assert_eq!(response.payload(), &Value::Null);
    }

    #[tokio::test]
    async fn test_error_message_falls_back_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let response = connector_for(&server).fetch("feed", &[]).await;

        assert_eq!(response.error_message(), "HTTP 500");
    }
}
