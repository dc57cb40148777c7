use std::time::Duration;

use async_trait::async_trait;

use crate::error::{FetchError, SetupError};

/// Anything that can turn a URL into document text.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, SetupError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(HttpFetcher { client })
    }
}

/// One request to the archive root before any real work. A transport failure
/// is fatal; any HTTP answer, even an error status, means the host is up.
pub async fn check_reachable<F: Fetch + ?Sized>(
    fetcher: &F,
    archive_root: &str,
) -> Result<(), SetupError> {
    match fetcher.fetch(archive_root).await {
        Err(e) if e.is_transport() => Err(SetupError::ArchiveUnreachable {
            root: archive_root.to_string(),
            source: e,
        }),
        _ => Ok(()),
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: url.to_string(),
                source: Box::new(e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;

        // Older filings are not always valid UTF-8; replace bad sequences.
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new("edgar-test agent@example.test", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn fetch_returns_body_and_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/edgar/data/1/doc.txt"))
            .and(header("user-agent", "edgar-test agent@example.test"))
            .respond_with(ResponseTemplate::new(200).set_body_string("CENTRAL INDEX KEY: 1"))
            .mount(&server)
            .await;

        let body = fetcher()
            .fetch(&format!("{}/edgar/data/1/doc.txt", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "CENTRAL INDEX KEY: 1");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&format!("{}/missing.txt", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'a', 0xff, b'b']))
            .mount(&server)
            .await;

        let body = fetcher().fetch(&server.uri()).await.unwrap();
        assert_eq!(body, "a\u{fffd}b");
    }

    /// A local port nothing listens on.
    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let url = format!("http://127.0.0.1:{}/x", closed_port());
        let err = fetcher().fetch(&url).await.unwrap_err();
        assert!(err.is_transport(), "got {err}");
    }

    #[tokio::test]
    async fn error_status_at_root_still_counts_as_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        check_reachable(&fetcher(), &format!("{}/Archives/", server.uri()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn closed_root_is_a_setup_error() {
        let root = format!("http://127.0.0.1:{}/Archives/", closed_port());
        let err = check_reachable(&fetcher(), &root).await.unwrap_err();
        match err {
            SetupError::ArchiveUnreachable { root: r, source } => {
                assert_eq!(r, root);
                assert!(source.is_transport());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
