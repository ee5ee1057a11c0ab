//! Implements the `RemoteStore` trait using `reqwest` to talk to the statement server.

use crate::api::{RemoteStore, UploadSummary};
use crate::error::Res;
use crate::model::{TransactionId, TransactionRecord};
use crate::Config;
use anyhow::{anyhow, Context};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::trace;
use url::Url;

const TRANSACTIONS: &str = "transactions";
const CATEGORIES: &str = "categories";
const SET_CATEGORY: &str = "set-category";
const ADD_CATEGORY: &str = "add-category";
const UPLOAD_PDF: &str = "upload-pdf";

/// The body of a `set-category` request.
#[derive(Debug, Serialize)]
struct SetCategoryRequest<'a> {
    transaction_id: TransactionId,
    category: &'a str,
    subcategory: &'a str,
}

/// The body of an `add-category` request.
#[derive(Debug, Serialize)]
struct AddCategoryRequest<'a> {
    category: &'a str,
}

/// The body the server sends with a non-success status.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// The body the server sends after importing a statement. The transactions it echoes back are
/// only counted; the collection is fetched again afterwards.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    message: String,
    #[serde(default)]
    transactions: Vec<serde_json::Value>,
}

/// Talks to the statement server at the configured base URL.
pub(crate) struct HttpStore {
    client: Client,
    base: Url,
}

impl HttpStore {
    pub(crate) fn new(config: &Config) -> Res<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Unable to create the HTTP client")?;
        Ok(Self {
            client,
            base: config.remote_url().clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Res<Url> {
        self.base
            .join(path)
            .with_context(|| format!("Unable to build the URL for '{path}' from {}", self.base))
    }
}

#[async_trait::async_trait]
impl RemoteStore for HttpStore {
    async fn fetch_transactions(&self) -> Res<Vec<TransactionRecord>> {
        let url = self.endpoint(TRANSACTIONS)?;
        trace!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch transactions")?;
        check(response, "Fetching transactions")
            .await?
            .json()
            .await
            .context("Failed to parse the transactions response")
    }

    async fn set_category(
        &self,
        id: TransactionId,
        category: &str,
        subcategory: &str,
    ) -> Res<()> {
        let url = self.endpoint(SET_CATEGORY)?;
        trace!("POST {url} for transaction {id}");
        let body = SetCategoryRequest {
            transaction_id: id,
            category,
            subcategory,
        };
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to send the category of transaction {id}"))?;
        check(response, "Setting the category").await?;
        Ok(())
    }

    async fn fetch_categories(&self) -> Res<Vec<String>> {
        let url = self.endpoint(CATEGORIES)?;
        trace!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch categories")?;
        check(response, "Fetching categories")
            .await?
            .json()
            .await
            .context("Failed to parse the categories response")
    }

    async fn add_category(&self, name: &str) -> Res<()> {
        let url = self.endpoint(ADD_CATEGORY)?;
        trace!("POST {url} for category '{name}'");
        let response = self
            .client
            .post(url)
            .json(&AddCategoryRequest { category: name })
            .send()
            .await
            .with_context(|| format!("Failed to send the new category '{name}'"))?;
        check(response, "Adding the category").await?;
        Ok(())
    }

    async fn upload_statement(&self, file_name: &str, contents: Vec<u8>) -> Res<UploadSummary> {
        let url = self.endpoint(UPLOAD_PDF)?;
        trace!("POST {url} with {} bytes from {file_name}", contents.len());
        let part = Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .context("Invalid MIME type for the statement upload")?;
        let form = Form::new().part("file", part);
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Failed to upload {file_name}"))?;
        let parsed: UploadResponse = check(response, "Uploading the statement")
            .await?
            .json()
            .await
            .context("Failed to parse the upload response")?;
        Ok(UploadSummary {
            message: parsed.message,
            imported: parsed.transactions.len(),
        })
    }
}

/// Passes a successful response through. Otherwise returns an error whose root cause is the
/// reason the server gave, or the status line if the body has no reason.
async fn check(response: Response, what: &str) -> Res<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let reason = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => parsed.error,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status.to_string(),
    };
    Err(anyhow!(reason).context(format!("{what} failed with status {status}")))
}
