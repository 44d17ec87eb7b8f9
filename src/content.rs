use async_trait::async_trait;

use crate::error::{Result, TourError};
use crate::model::{Location, Spot};

/// The networked document store that owns locations and spots.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn fetch_location(&self, id: &str) -> Result<Option<Location>>;

    async fn fetch_spots(&self, location_id: &str) -> Result<Vec<Spot>>;

    async fn fetch_spot(&self, id: &str) -> Result<Option<Spot>>;
}

/// JSON-over-HTTP client for the content API.
pub struct HttpContentStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpContentStore {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET a JSON document; 404 means the record does not exist.
    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .header("User-Agent", "Cavetour")
            .header("Accept", "application/json")
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(TourError::Http {
                url,
                status: response.status().as_u16(),
            });
        }
        Ok(Some(response.json().await?))
    }
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn fetch_location(&self, id: &str) -> Result<Option<Location>> {
        self.get_json(&format!("locations/{id}")).await
    }

    async fn fetch_spots(&self, location_id: &str) -> Result<Vec<Spot>> {
        Ok(self
            .get_json(&format!("locations/{location_id}/spots"))
            .await?
            .unwrap_or_default())
    }

    async fn fetch_spot(&self, id: &str) -> Result<Option<Spot>> {
        self.get_json(&format!("spots/{id}")).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::*;

    /// In-memory content store; `offline` makes every call fail.
    #[derive(Default)]
    pub struct FakeContentStore {
        pub locations: HashMap<String, Location>,
        pub spots: Vec<Spot>,
        pub offline: bool,
    }

    impl FakeContentStore {
        fn check(&self) -> Result<()> {
            if self.offline {
                Err(TourError::Custom("content store unreachable".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl ContentStore for FakeContentStore {
        async fn fetch_location(&self, id: &str) -> Result<Option<Location>> {
            self.check()?;
            Ok(self.locations.get(id).cloned())
        }

        async fn fetch_spots(&self, location_id: &str) -> Result<Vec<Spot>> {
            self.check()?;
            Ok(self
                .spots
                .iter()
                .filter(|s| s.location_id == location_id)
                .cloned()
                .collect())
        }

        async fn fetch_spot(&self, id: &str) -> Result<Option<Spot>> {
            self.check()?;
            Ok(self.spots.iter().find(|s| s.id == id).cloned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_join_cleanly() {
        let store = HttpContentStore::new(reqwest::Client::new(), "https://api.example.com/v1/");
        assert_eq!(
            store.url("/locations/cave-1/spots"),
            "https://api.example.com/v1/locations/cave-1/spots"
        );
        assert_eq!(store.url("spots/s1"), "https://api.example.com/v1/spots/s1");
    }
}
