//! Supabase Storage backend.
//!
//! Talks to the Storage REST API of a Supabase project with the service
//! role key:
//!
//! - `POST   /storage/v1/object/{bucket}/{key}` - upload
//! - `DELETE /storage/v1/object/{bucket}` - remove (`{"prefixes": [...]}`)
//! - `POST   /storage/v1/object/list/{bucket}` - list a folder
//! - `GET    /storage/v1/object/public/{bucket}/{key}` - public locator

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use reve_essence_core::{ImageLocator, ObjectStore, ObjectStoreError, StorageKey};

/// Page size for folder listings.
const LIST_PAGE_SIZE: usize = 100;

/// Cache lifetime the CDN may apply to uploaded images, in seconds.
const CACHE_CONTROL: &str = "3600";

fn transport(err: reqwest::Error) -> ObjectStoreError {
    ObjectStoreError(err.to_string())
}

/// Object store backed by a Supabase Storage bucket.
pub struct SupabaseObjectStore {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    service_key: SecretString,
}

impl std::fmt::Debug for SupabaseObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseObjectStore")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .field("service_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct RemoveRequest<'a> {
    prefixes: [&'a str; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListRequest<'a> {
    prefix: &'a str,
    search: &'a str,
    limit: usize,
    offset: usize,
    sort_by: SortBy,
}

#[derive(Serialize)]
struct SortBy {
    column: &'static str,
    order: &'static str,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    name: String,
    /// `null` for folder placeholders.
    id: Option<String>,
}

impl SupabaseObjectStore {
    /// Create a client for `bucket` in the project at `base_url`
    /// (e.g. `https://abc.supabase.co`).
    #[must_use]
    pub fn new(base_url: &str, bucket: impl Into<String>, service_key: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            bucket: bucket.into(),
            service_key,
        }
    }

    fn object_url(&self, key: &StorageKey) -> String {
        format!("{}/storage/v1/object/{}/{key}", self.base_url, self.bucket)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = self.service_key.expose_secret();
        request.bearer_auth(key).header("apikey", key)
    }

    async fn list_page(
        &self,
        folder: &str,
        search: &str,
        offset: usize,
    ) -> Result<Vec<ListEntry>, ObjectStoreError> {
        let url = format!("{}/storage/v1/object/list/{}", self.base_url, self.bucket);
        let body = ListRequest {
            prefix: folder,
            search,
            limit: LIST_PAGE_SIZE,
            offset,
            sort_by: SortBy {
                column: "name",
                order: "asc",
            },
        };

        let response = self
            .authorized(self.client.post(url))
            .json(&body)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;

        response.json().await.map_err(transport)
    }
}

#[async_trait]
impl ObjectStore for SupabaseObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(
        &self,
        key: &StorageKey,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        self.authorized(self.client.post(self.object_url(key)))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::CACHE_CONTROL, format!("max-age={CACHE_CONTROL}"))
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        Ok(())
    }

    async fn delete(&self, key: &StorageKey) -> Result<(), ObjectStoreError> {
        let url = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);
        self.authorized(self.client.delete(url))
            .json(&RemoveRequest {
                prefixes: [key.as_str()],
            })
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        Ok(())
    }

    fn public_url(&self, key: &StorageKey) -> ImageLocator {
        ImageLocator::new(format!(
            "{}/storage/v1/object/public/{}/{key}",
            self.base_url, self.bucket
        ))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StorageKey>, ObjectStoreError> {
        let (folder, search) = prefix.rsplit_once('/').unwrap_or(("", prefix));

        let mut keys = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.list_page(folder, search, offset).await?;
            let fetched = page.len();

            keys.extend(
                page.into_iter()
                    .filter(|entry| entry.id.is_some() && entry.name.starts_with(search))
                    .map(|entry| {
                        if folder.is_empty() {
                            StorageKey::new(entry.name)
                        } else {
                            StorageKey::new(format!("{folder}/{}", entry.name))
                        }
                    }),
            );

            if fetched < LIST_PAGE_SIZE {
                break;
            }
            offset += fetched;
        }
        Ok(keys)
    }
}
