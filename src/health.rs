use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{info, warn};

fn models_url(base_url: &str) -> String {
    format!("{}/models", base_url.trim_end_matches('/'))
}

/// Check that the model backend answers `GET {base_url}/models` with 200.
/// Single attempt, bounded by `timeout`. Failures are logged and reported
/// as `false`, never returned as errors.
pub async fn is_available(http: &Client, base_url: &str, timeout: Duration) -> bool {
    let url = models_url(base_url);
    match http.get(&url).timeout(timeout).send().await {
        Ok(resp) if resp.status() == StatusCode::OK => {
            info!("Model backend is running at {base_url}");
            true
        }
        Ok(resp) => {
            warn!("Model backend responded with status code: {}", resp.status());
            false
        }
        Err(e) if e.is_timeout() => {
            warn!("Model backend at {base_url} did not answer within {timeout:?}");
            false
        }
        Err(e) => {
            warn!("Failed to connect to model backend at {base_url}: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, MockServer};

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[tokio::test(flavor = "current_thread")]
    async fn ok_status_means_available() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v1/models");
            then.status(200).json_body(serde_json::json!({ "data": [] }));
        });

        assert!(is_available(&Client::new(), &server.url("/v1"), TIMEOUT).await);
        mock.assert();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn other_success_codes_are_not_enough() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(GET).path("/models");
            then.status(204);
        });

        assert!(!is_available(&Client::new(), &server.base_url(), TIMEOUT).await);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn error_status_means_unavailable() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(GET).path("/models");
            then.status(503);
        });

        assert!(!is_available(&Client::new(), &server.base_url(), TIMEOUT).await);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn connection_refused_means_unavailable() {
        // Port 9 (discard) is essentially never served on test hosts.
        assert!(!is_available(&Client::new(), "http://127.0.0.1:9/v1", TIMEOUT).await);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn slow_backend_times_out() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(GET).path("/models");
            then.status(200).delay(Duration::from_millis(500));
        });

        let available =
            is_available(&Client::new(), &server.base_url(), Duration::from_millis(50)).await;
        assert!(!available);
    }
}
