use async_trait::async_trait;
use futures_util::StreamExt;

use crate::cache::CachedResponse;
use crate::error::{Result, TourError};

/// Retrieves binary assets (images, audio) by URL.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<CachedResponse>;
}

/// Fetches media over HTTP(S).
///
/// There is no CORS on a native client, so every successful response can
/// be stored; a non-success status is reported as an error for that URL.
#[derive(Clone, Default)]
pub struct HttpMediaFetcher {
    client: reqwest::Client,
}

impl HttpMediaFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<CachedResponse> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", "Cavetour-Offline")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TourError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut body = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
        }

        Ok(CachedResponse {
            url: url.to_string(),
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    /// Serves a fixed body for every URL except the ones marked failing.
    #[derive(Default)]
    pub struct FakeFetcher {
        pub failing: HashSet<String>,
        pub requested: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        pub fn failing(urls: &[&str]) -> Self {
            Self {
                failing: urls.iter().map(|u| u.to_string()).collect(),
                requested: Mutex::default(),
            }
        }

        pub fn requested(&self) -> Vec<String> {
            let mut urls = self.requested.lock().unwrap().clone();
            urls.sort();
            urls
        }
    }

    #[async_trait]
    impl MediaFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<CachedResponse> {
            self.requested.lock().unwrap().push(url.to_string());
            if self.failing.contains(url) {
                return Err(TourError::Http {
                    url: url.to_string(),
                    status: 503,
                });
            }
            Ok(CachedResponse {
                url: url.to_string(),
                status: 200,
                content_type: Some("image/jpeg".into()),
                body: format!("bytes of {url}").into_bytes(),
            })
        }
    }
}
