//! Backend API client — the engine's only window onto authoritative state.
//!
//! All durable state (documents, clients, flow instances) lives in the
//! remote KYC backend; this module defines the abstract operations the
//! engine consumes ([`BackendClient`]) and the production HTTP/JSON
//! implementation ([`HttpBackend`]). Everything behind this seam is an
//! external collaborator: file storage, OCR/extraction, and business
//! risk rules never run on this side.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Document, DocumentType, FlowInstance, RejectReason};

// ═══════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════

/// A genuine transport or backend failure — distinct from "the backend
/// has accepted the action but not finished processing it yet", which
/// is a poller timeout, not an error.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Cannot reach KYC backend at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Backend returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse backend response: {0}")]
    ResponseParsing(String),

    #[error("HTTP client error: {0}")]
    Http(String),
}

// ═══════════════════════════════════════════════════════════
// Wire types
// ═══════════════════════════════════════════════════════════

/// One outstanding "please provide this document" request for a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub id: String,
    pub doc_type: DocumentType,
    pub title: String,
    pub mandatory: bool,
    /// Id of the document satisfying this request, once one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satisfied_by: Option<String>,
}

/// Aggregate stats the backend reports alongside document requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentRequestStats {
    pub total: u32,
    pub satisfied: u32,
    pub mandatory_missing: u32,
}

/// Response payload of the document-requests endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRequests {
    pub requests: Vec<DocumentRequest>,
    pub stats: DocumentRequestStats,
}

/// An upload submission. `parent_document_id` present means "new
/// version of that document" rather than "new document".
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub client_id: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub title: String,
    pub doc_type: DocumentType,
    pub comment: Option<String>,
    pub parent_document_id: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// BackendClient trait
// ═══════════════════════════════════════════════════════════

/// Abstract backend operations the engine consumes.
///
/// Held as `Arc<dyn BackendClient>` so tests can substitute a mock
/// that records calls and scripts responses.
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn fetch_client_documents(&self, client_id: &str) -> Result<Vec<Document>, BackendError>;

    async fn fetch_flow_instance(&self, client_id: &str) -> Result<FlowInstance, BackendError>;

    async fn fetch_document_requests(
        &self,
        client_id: &str,
    ) -> Result<DocumentRequests, BackendError>;

    async fn submit_approval(&self, document_id: &str, comment: &str)
        -> Result<(), BackendError>;

    async fn submit_rejection(
        &self,
        document_id: &str,
        comment: &str,
        reason: RejectReason,
    ) -> Result<(), BackendError>;

    async fn submit_supervisor_escalation(
        &self,
        client_id: &str,
        comment: &str,
    ) -> Result<(), BackendError>;

    /// Returns the backend-assigned document id.
    async fn upload_document(&self, upload: DocumentUpload) -> Result<String, BackendError>;
}

// ═══════════════════════════════════════════════════════════
// HTTP implementation
// ═══════════════════════════════════════════════════════════

/// Request body for review submissions.
#[derive(Serialize)]
struct ReviewActionBody<'a> {
    comment: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<RejectReason>,
}

/// Response body of the upload endpoint.
#[derive(Deserialize)]
struct UploadResponse {
    document_id: String,
}

/// HTTP/JSON client for the KYC portal backend.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpBackend {
    /// Create a new client pointing at the given backend base URL.
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        }
    }

    /// Backend from environment configuration (see `config`).
    pub fn from_env() -> Self {
        Self::new(&crate::config::api_base_url(), crate::config::request_timeout_secs())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transport_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_connect() {
            BackendError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            BackendError::Timeout(self.timeout_secs)
        } else {
            BackendError::Http(e.to_string())
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, BackendError> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::ResponseParsing(e.to_string()))
    }

    async fn post_json<B: Serialize>(&self, url: String, body: &B) -> Result<(), BackendError> {
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        Self::check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl BackendClient for HttpBackend {
    async fn fetch_client_documents(&self, client_id: &str) -> Result<Vec<Document>, BackendError> {
        self.get_json(format!("{}/clients/{client_id}/documents", self.base_url))
            .await
    }

    async fn fetch_flow_instance(&self, client_id: &str) -> Result<FlowInstance, BackendError> {
        self.get_json(format!("{}/clients/{client_id}/flow", self.base_url))
            .await
    }

    async fn fetch_document_requests(
        &self,
        client_id: &str,
    ) -> Result<DocumentRequests, BackendError> {
        self.get_json(format!(
            "{}/clients/{client_id}/document-requests",
            self.base_url
        ))
        .await
    }

    async fn submit_approval(
        &self,
        document_id: &str,
        comment: &str,
    ) -> Result<(), BackendError> {
        let url = format!("{}/documents/{document_id}/approve", self.base_url);
        self.post_json(url, &ReviewActionBody { comment, reason: None })
            .await
    }

    async fn submit_rejection(
        &self,
        document_id: &str,
        comment: &str,
        reason: RejectReason,
    ) -> Result<(), BackendError> {
        let url = format!("{}/documents/{document_id}/reject", self.base_url);
        self.post_json(
            url,
            &ReviewActionBody {
                comment,
                reason: Some(reason),
            },
        )
        .await
    }

    async fn submit_supervisor_escalation(
        &self,
        client_id: &str,
        comment: &str,
    ) -> Result<(), BackendError> {
        let url = format!("{}/clients/{client_id}/escalate", self.base_url);
        self.post_json(url, &ReviewActionBody { comment, reason: None })
            .await
    }

    async fn upload_document(&self, upload: DocumentUpload) -> Result<String, BackendError> {
        let url = format!("{}/clients/{}/documents", self.base_url, upload.client_id);

        let file_part = reqwest::multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.mime_type)
            .map_err(|e| BackendError::Http(e.to_string()))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("title", upload.title)
            .text("doc_type", upload.doc_type.as_str());
        if let Some(comment) = upload.comment {
            form = form.text("comment", comment);
        }
        if let Some(parent) = upload.parent_document_id {
            form = form.text("parent_document_id", parent);
        }

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = Self::check_status(response).await?;
        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| BackendError::ResponseParsing(e.to_string()))?;

        Ok(parsed.document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_normalized() {
        let backend = HttpBackend::new("https://kyc.example.test/api/", 30);
        assert_eq!(backend.base_url(), "https://kyc.example.test/api");
    }

    #[test]
    fn review_action_body_omits_absent_reason() {
        let body = ReviewActionBody {
            comment: "Checked against registry",
            reason: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("reason"));
    }

    #[test]
    fn review_action_body_includes_reason() {
        let body = ReviewActionBody {
            comment: "Scan unreadable",
            reason: Some(RejectReason::InsufficientQuality),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"reason\":\"insufficient_quality\""));
    }

    #[test]
    fn upload_response_parses() {
        let parsed: UploadResponse =
            serde_json::from_str(r#"{"document_id":"doc-42"}"#).unwrap();
        assert_eq!(parsed.document_id, "doc-42");
    }

    #[test]
    fn api_error_carries_status_and_body() {
        let err = BackendError::Api {
            status: 422,
            body: "missing comment".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("422"));
        assert!(msg.contains("missing comment"));
    }
}
