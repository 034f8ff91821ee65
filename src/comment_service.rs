//! Interface to the external identity+document service the comment widget
//! writes through, plus the HTTP implementation for its REST surface.
//!
//! The service is a black box: it signs visitors in, assigns ids and
//! timestamps on write, orders reads newest-first and enforces per-record
//! ownership on its side. Everything here runs on the provider thread.

use serde::Deserialize;
use thiserror::Error;

use crate::comments::{Comment, UserProfile};
use crate::fetch::http_client;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Interactive sign-in/out rejected or unavailable.
    #[error("auth: {0}")]
    Auth(String),
    /// A post or delete was refused.
    #[error("write: {0}")]
    Write(String),
    /// The live list query failed.
    #[error("subscribe: {0}")]
    Subscribe(String),
    /// Plain transport failure underneath any of the above.
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
}

/// The external SDK surface the widget consumes. Implementations hold the
/// current session; `add_comment` and `delete_comment` require a signed-in
/// user and the store enforces that only the author may delete.
pub trait CommentService: Send {
    fn sign_in(&mut self) -> Result<UserProfile, ServiceError>;
    fn sign_out(&mut self) -> Result<(), ServiceError>;
    fn current_user(&self) -> Option<&UserProfile>;

    /// Newest-first snapshot of one page's comment sub-collection.
    fn list_comments(&self, page_key: &str) -> Result<Vec<Comment>, ServiceError>;

    /// Create a record with server-assigned id and timestamps.
    fn add_comment(&mut self, page_key: &str, text: &str) -> Result<Comment, ServiceError>;

    fn delete_comment(&mut self, page_key: &str, comment_id: &str) -> Result<(), ServiceError>;
}

/// REST client for the hosted document store:
/// `POST {base}/auth/session`, `GET/POST {base}/pages/{key}/comments`,
/// `DELETE {base}/pages/{key}/comments/{id}`.
pub struct HttpCommentService {
    base: String,
    token: Option<String>,
    user: Option<UserProfile>,
}

impl HttpCommentService {
    pub fn new(base: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            token,
            user: None,
        }
    }

    fn url(&self, rel: &str) -> String {
        format!("{}/{rel}", self.base)
    }

    fn bearer(&self) -> Result<&str, ServiceError> {
        self.token
            .as_deref()
            .ok_or_else(|| ServiceError::Auth("sin token de acceso".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    user: UserProfile,
}

impl CommentService for HttpCommentService {
    fn sign_in(&mut self) -> Result<UserProfile, ServiceError> {
        let token = self.bearer()?.to_string();
        let resp = http_client()
            .map_err(|e| ServiceError::Auth(e.to_string()))?
            .post(self.url("auth/session"))
            .bearer_auth(&token)
            .send()?;
        if !resp.status().is_success() {
            return Err(ServiceError::Auth(format!("http {}", resp.status())));
        }
        let session: SessionResponse = resp.json()?;
        self.user = Some(session.user.clone());
        Ok(session.user)
    }

    fn sign_out(&mut self) -> Result<(), ServiceError> {
        self.user = None;
        Ok(())
    }

    fn current_user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    fn list_comments(&self, page_key: &str) -> Result<Vec<Comment>, ServiceError> {
        let url = self.url(&format!("pages/{page_key}/comments?order=created_at.desc"));
        let resp = http_client()
            .map_err(|e| ServiceError::Subscribe(e.to_string()))?
            .get(url)
            .send()?;
        if !resp.status().is_success() {
            return Err(ServiceError::Subscribe(format!("http {}", resp.status())));
        }
        Ok(resp.json()?)
    }

    fn add_comment(&mut self, page_key: &str, text: &str) -> Result<Comment, ServiceError> {
        let token = self.bearer()?.to_string();
        if self.user.is_none() {
            return Err(ServiceError::Write("sin sesión".to_string()));
        }
        let url = self.url(&format!("pages/{page_key}/comments"));
        let resp = http_client()
            .map_err(|e| ServiceError::Write(e.to_string()))?
            .post(url)
            .bearer_auth(&token)
            .json(&serde_json::json!({ "text": text }))
            .send()?;
        if !resp.status().is_success() {
            return Err(ServiceError::Write(format!("http {}", resp.status())));
        }
        Ok(resp.json()?)
    }

    fn delete_comment(&mut self, page_key: &str, comment_id: &str) -> Result<(), ServiceError> {
        let token = self.bearer()?.to_string();
        let url = self.url(&format!("pages/{page_key}/comments/{comment_id}"));
        let resp = http_client()
            .map_err(|e| ServiceError::Write(e.to_string()))?
            .delete(url)
            .bearer_auth(&token)
            .send()?;
        if !resp.status().is_success() {
            return Err(ServiceError::Write(format!("http {}", resp.status())));
        }
        Ok(())
    }
}
