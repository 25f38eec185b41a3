//! HTTP client wrapper for interacting with OpenSearch.

use crate::config::get_config;
use crate::opensearch::{
    IndexStore,
    query::{build_document_body, build_index_body, build_search_body},
    types::{
        GetResponse, HitPage, HybridQuery, IndexSettings, NewDocument, OpenSearchError,
        SearchResponse, StoredDocument, StoredHit, WriteResponse,
    },
};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};

/// Basic-auth credentials presented on every request.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// User name.
    pub user: String,
    /// Optional password.
    pub password: Option<String>,
}

/// Lightweight HTTP client for OpenSearch operations.
pub struct OpenSearchService {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl OpenSearchService {
    /// Construct a client for the cluster at `base_url`.
    pub fn new(base_url: &str, credentials: Option<Credentials>) -> Result<Self, OpenSearchError> {
        let client = Client::builder().user_agent("docsearch/0.1").build()?;
        let base_url = normalize_base_url(base_url).map_err(OpenSearchError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            user = credentials.as_ref().map(|c| c.user.as_str()).unwrap_or(""),
            "Initialized OpenSearch HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    /// Construct a client using configuration derived from the environment.
    pub fn from_config() -> Result<Self, OpenSearchError> {
        let config = get_config();
        Self::new(
            &config.opensearch_url,
            Some(Credentials {
                user: config.opensearch_user.clone(),
                password: config.opensearch_password.clone(),
            }),
        )
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let req = self.client.request(method, url);
        match &self.credentials {
            Some(credentials) => req.basic_auth(&credentials.user, credentials.password.as_ref()),
            None => req,
        }
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), OpenSearchError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = OpenSearchError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "OpenSearch request failed");
            Err(error)
        }
    }
}

#[async_trait]
impl IndexStore for OpenSearchService {
    async fn ping(&self) -> Result<(), OpenSearchError> {
        let response = self.request(Method::GET, "/").send().await?;
        self.ensure_success(response, || tracing::trace!("OpenSearch ping succeeded"))
            .await
    }

    async fn index_exists(&self, index: &str) -> Result<bool, OpenSearchError> {
        let response = self.request(Method::HEAD, index).send().await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let error = OpenSearchError::UnexpectedStatus {
                    status,
                    body: String::new(),
                };
                tracing::error!(index, error = %error, "Index existence check failed");
                Err(error)
            }
        }
    }

    async fn create_index(
        &self,
        index: &str,
        settings: &IndexSettings,
    ) -> Result<(), OpenSearchError> {
        tracing::debug!(index, dimension = settings.dimension, "Creating index");
        let response = self
            .request(Method::PUT, index)
            .json(&build_index_body(settings))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::info!(index, "Index created");
        })
        .await
    }

    async fn write_document(
        &self,
        index: &str,
        document: NewDocument,
    ) -> Result<String, OpenSearchError> {
        let response = self
            .request(Method::POST, &format!("{index}/_doc"))
            .query(&[("refresh", "true")])
            .json(&build_document_body(&document))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = OpenSearchError::UnexpectedStatus { status, body };
            tracing::error!(index, error = %error, "Document write failed");
            return Err(error);
        }

        let WriteResponse { id } = response.json().await?;
        tracing::debug!(index, id = %id, "Document written");
        Ok(id)
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<StoredDocument, OpenSearchError> {
        let response = self
            .request(Method::GET, &format!("{index}/_doc/{id}"))
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            // A missing index also answers 404, but without `found: false`.
            let missing_document = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|value| value.get("found").and_then(|found| found.as_bool()))
                == Some(false);
            if missing_document {
                return Err(OpenSearchError::DocumentNotFound(id.to_string()));
            }
            return Err(OpenSearchError::UnexpectedStatus { status, body });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = OpenSearchError::UnexpectedStatus { status, body };
            tracing::error!(index, id, error = %error, "Document fetch failed");
            return Err(error);
        }

        let payload: GetResponse = response.json().await?;
        if !payload.found {
            return Err(OpenSearchError::DocumentNotFound(id.to_string()));
        }
        let source = payload.source.ok_or_else(|| {
            OpenSearchError::MalformedResponse(format!("document '{id}' has no _source"))
        })?;

        Ok(StoredDocument {
            id: payload.id,
            title: source.title,
            text: source.text,
        })
    }

    async fn query(
        &self,
        index: &str,
        query: &HybridQuery,
        offset: usize,
        limit: usize,
    ) -> Result<HitPage, OpenSearchError> {
        let response = self
            .request(Method::POST, &format!("{index}/_search"))
            .json(&build_search_body(query, offset, limit))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = OpenSearchError::UnexpectedStatus { status, body };
            tracing::error!(index, error = %error, "OpenSearch search failed");
            return Err(error);
        }

        let SearchResponse { hits } = response.json().await?;
        let total = hits.total.value();
        let hits = hits
            .hits
            .into_iter()
            .map(|hit| {
                let source = hit.source.unwrap_or_default();
                StoredHit {
                    id: hit.id,
                    score: hit.score.unwrap_or_default(),
                    title: source.title,
                    text: source.text,
                }
            })
            .collect();

        Ok(HitPage { hits, total })
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
