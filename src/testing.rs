use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::fetch::Fetch;

enum Canned {
    Body(String),
    Status(u16),
    Refused,
}

fn refused(url: &str) -> FetchError {
    FetchError::Request {
        url: url.to_string(),
        source: Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )),
    }
}

/// In-memory archive. Unknown URLs answer 404 unless `unreachable()` is set,
/// in which case every request fails at the transport level.
#[derive(Default)]
pub struct MockFetcher {
    responses: HashMap<String, Canned>,
    unreachable: bool,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn with_body(mut self, url: &str, body: &str) -> Self {
        self.responses
            .insert(url.to_string(), Canned::Body(body.to_string()));
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), Canned::Status(status));
        self
    }

    /// This URL alone fails at the transport level, like a timeout would.
    pub fn with_transport_failure(mut self, url: &str) -> Self {
        self.responses.insert(url.to_string(), Canned::Refused);
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetch for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(url.to_string());

        if self.unreachable {
            return Err(refused(url));
        }
        match self.responses.get(url) {
            Some(Canned::Body(body)) => Ok(body.clone()),
            Some(Canned::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status: *status,
            }),
            Some(Canned::Refused) => Err(refused(url)),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// Answers every URL after a short delay and records how many requests were
/// in flight at once.
#[derive(Default)]
pub struct SlowFetcher {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowFetcher {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetch for SlowFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(format!("central index key: {}", url))
    }
}
