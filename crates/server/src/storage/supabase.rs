//! Supabase Storage REST client

use std::time::Duration;

use async_trait::async_trait;
use docpilot_core::{ClinicalError, PatientFolder};
use serde::{Deserialize, Serialize};

use super::{ObjectStore, patient_folder};

/// Page size used when listing the bucket root
const LIST_PAGE: u32 = 1000;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for one Supabase Storage bucket
#[derive(Clone)]
pub struct SupabaseStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    bucket: String,
    expires_in: u64,
    timeout: Duration,
}

#[derive(Serialize)]
struct SignRequest {
    #[serde(rename = "expiresIn")]
    expires_in: u64,
}

#[derive(Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    signed_url: String,
}

#[derive(Serialize)]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: u32,
    offset: u32,
    #[serde(rename = "sortBy")]
    sort_by: SortBy<'a>,
}

#[derive(Serialize)]
struct SortBy<'a> {
    column: &'a str,
    order: &'a str,
}

#[derive(Deserialize)]
struct ListedObject {
    name: String,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl SupabaseStore {
    pub fn new(base_url: &str, api_key: String, bucket: String, expires_in: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            bucket,
            expires_in: expires_in.as_secs(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn storage_url(&self, rest: &str) -> String {
        format!("{}/storage/v1{}", self.base_url, rest)
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .timeout(self.timeout)
    }

    /// One page of the bucket root listing.
    async fn list_page(&self, offset: u32) -> Result<Vec<ListedObject>, ClinicalError> {
        let url = self.storage_url(&format!("/object/list/{}", self.bucket));

        let response = self
            .post(&url)
            .json(&ListRequest {
                prefix: "",
                limit: LIST_PAGE,
                offset,
                sort_by: SortBy {
                    column: "name",
                    order: "asc",
                },
            })
            .send()
            .await
            .map_err(|e| transport_error("Error listing patient files", &e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClinicalError::Storage(format!(
                "Error listing patient files: {status} - {body}"
            )));
        }

        response
            .json::<Vec<ListedObject>>()
            .await
            .map_err(|e| ClinicalError::Storage(format!("Malformed listing response: {e}")))
    }

    /// Turn the relative `signedURL` the API returns into an absolute URL.
    fn absolute(&self, signed: &str) -> String {
        if signed.starts_with("http://") || signed.starts_with("https://") {
            signed.to_string()
        } else {
            self.storage_url(&format!("/{}", signed.trim_start_matches('/')))
        }
    }
}

fn transport_error(context: &str, err: &reqwest::Error) -> ClinicalError {
    if err.is_timeout() {
        ClinicalError::Storage(format!("{context}: storage request timed out"))
    } else {
        ClinicalError::Storage(format!("{context}: {err}"))
    }
}

#[async_trait]
impl ObjectStore for SupabaseStore {
    async fn signed_url(&self, path: &str) -> Result<String, ClinicalError> {
        let url = self.storage_url(&format!("/object/sign/{}/{}", self.bucket, path));

        let response = self
            .post(&url)
            .json(&SignRequest {
                expires_in: self.expires_in,
            })
            .send()
            .await
            .map_err(|e| transport_error("Error creating signed URL", &e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClinicalError::Storage(format!(
                "Error creating signed URL for {path}: {status} - {body}"
            )));
        }

        let signed = response
            .json::<SignResponse>()
            .await
            .map_err(|e| ClinicalError::Storage(format!("Malformed signed URL response: {e}")))?;

        Ok(self.absolute(&signed.signed_url))
    }

    async fn list_patient_folders(&self) -> Result<Vec<PatientFolder>, ClinicalError> {
        let mut folders = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.list_page(offset).await?;
            let full = page.len() >= LIST_PAGE as usize;
            folders.extend(
                page.into_iter()
                    .filter_map(|o| patient_folder(&o.name, o.created_at, o.updated_at)),
            );
            if !full {
                break;
            }
            offset += LIST_PAGE;
        }
        Ok(folders)
    }

    fn backend(&self) -> &'static str {
        "supabase"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SupabaseStore {
        SupabaseStore::new(
            "https://proj.supabase.co/",
            "key".into(),
            "clinical-data".into(),
            Duration::from_secs(3600),
        )
    }

    #[test]
    fn relative_signed_url_is_joined_onto_storage_root() {
        assert_eq!(
            store().absolute("/object/sign/clinical-data/p/merged_patient_data.csv?token=t"),
            "https://proj.supabase.co/storage/v1/object/sign/clinical-data/p/merged_patient_data.csv?token=t"
        );
    }

    #[test]
    fn absolute_signed_url_is_kept() {
        assert_eq!(store().absolute("https://cdn/x.csv"), "https://cdn/x.csv");
    }

    #[test]
    fn sign_request_uses_camel_case() {
        let json = serde_json::to_value(SignRequest { expires_in: 60 }).unwrap();
        assert_eq!(json, serde_json::json!({"expiresIn": 60}));
    }

    /// Accept connections and never answer them.
    async fn silent_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn stalled_storage_times_out() {
        let base = silent_server().await;
        let store = SupabaseStore::new(&base, "key".into(), "b".into(), Duration::from_secs(60))
            .with_timeout(Duration::from_millis(200));

        let err = tokio::time::timeout(Duration::from_secs(5), store.signed_url("p/x.csv"))
            .await
            .expect("signing should not hang")
            .unwrap_err();
        assert_eq!(
            err,
            ClinicalError::Storage("Error creating signed URL: storage request timed out".into())
        );

        let err = tokio::time::timeout(Duration::from_secs(5), store.list_patient_folders())
            .await
            .expect("listing should not hang")
            .unwrap_err();
        assert_eq!(
            err,
            ClinicalError::Storage("Error listing patient files: storage request timed out".into())
        );
    }

    #[tokio::test]
    async fn listing_follows_pages() {
        use axum::{Json, Router, routing::post};
        use serde_json::{Value as JsonValue, json};

        async fn list(Json(req): Json<JsonValue>) -> Json<JsonValue> {
            let offset = req["offset"].as_u64().unwrap_or(0);
            let count = if offset == 0 { u64::from(LIST_PAGE) } else { 3 };
            let names: Vec<JsonValue> = (offset..offset + count)
                .map(|i| json!({"name": format!("patient_{i:08x}")}))
                .collect();
            Json(JsonValue::Array(names))
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/storage/v1/object/list/{bucket}", post(list));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let store = SupabaseStore::new(
            &format!("http://{addr}"),
            "key".into(),
            "clinical-data".into(),
            Duration::from_secs(60),
        );
        let folders = store.list_patient_folders().await.unwrap();

        assert_eq!(folders.len(), LIST_PAGE as usize + 3);
        assert_eq!(folders.last().unwrap().folder, "patient_000003ea");
    }
}
