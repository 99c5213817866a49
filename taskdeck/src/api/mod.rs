//! REST client for the task backend.
//!
//! Thin request layer translating auth and task CRUD into backend calls.
//! Failures are normalized at this boundary into [`ApiError::RequestFailed`]
//! carrying the backend's own `message` when it sends one, else a generic
//! per-operation fallback. No retries: a single failed attempt surfaces
//! immediately to the caller.

use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use taskdeck_api::auth::{AuthResponse, LoginRequest, RegisterRequest};
use taskdeck_api::task::{CreateTask, Task, TaskId, UpdateTask};

use crate::config::ClientConfig;

/// Errors raised at the repository-client boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The underlying HTTP client could not be constructed.
    #[error("failed to initialize HTTP client: {0}")]
    Init(#[source] reqwest::Error),

    /// A request failed; the message is backend-provided when available,
    /// else a generic per-operation fallback.
    #[error("{message}")]
    RequestFailed {
        /// Human-readable description of the failure.
        message: String,
    },
}

impl ApiError {
    fn request_failed(message: Option<String>, fallback: &str) -> Self {
        Self::RequestFailed {
            message: message.unwrap_or_else(|| fallback.to_string()),
        }
    }
}

/// Error payload shape the backend uses for non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Client for the task backend's REST surface.
///
/// Carries the base URL, the per-request timeout (baked into the shared
/// [`reqwest::Client`]), and an optional bearer token attached to every
/// request when present.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl ApiClient {
    /// Creates a client from the resolved configuration.
    ///
    /// Every outbound request carries the configured timeout, so a hung
    /// backend cannot leave a store operation outstanding indefinitely.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Init`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(ApiError::Init)?;
        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: None,
            client,
        })
    }

    /// Returns this client with the given bearer token attached.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Replaces the bearer token (`None` clears it).
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Returns the base URL requests are issued against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -- Auth --------------------------------------------------------------

    /// `POST /auth/login`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::RequestFailed`] on transport failure or any
    /// non-2xx response.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let req = self.request(Method::POST, "/auth/login").json(credentials);
        self.send_json(req, "login failed").await
    }

    /// `POST /auth/register`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::RequestFailed`] on transport failure or any
    /// non-2xx response.
    pub async fn register(&self, credentials: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let req = self.request(Method::POST, "/auth/register").json(credentials);
        self.send_json(req, "registration failed").await
    }

    // -- Tasks -------------------------------------------------------------

    /// `GET /tasks`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::RequestFailed`] on transport failure or any
    /// non-2xx response.
    pub async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let req = self.request(Method::GET, "/tasks");
        self.send_json(req, "could not load tasks").await
    }

    /// `GET /tasks/:id`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::RequestFailed`] on transport failure or any
    /// non-2xx response.
    pub async fn get_task(&self, id: &TaskId) -> Result<Task, ApiError> {
        let req = self.request(Method::GET, &format!("/tasks/{id}"));
        self.send_json(req, "could not load task").await
    }

    /// `POST /tasks`. The backend assigns the id and defaults `done` to
    /// false.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::RequestFailed`] on transport failure or any
    /// non-2xx response.
    pub async fn create_task(&self, body: &CreateTask) -> Result<Task, ApiError> {
        let req = self.request(Method::POST, "/tasks").json(body);
        self.send_json(req, "could not create task").await
    }

    /// `PATCH /tasks/:id` with a partial body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::RequestFailed`] on transport failure or any
    /// non-2xx response.
    pub async fn update_task(&self, id: &TaskId, body: &UpdateTask) -> Result<Task, ApiError> {
        let req = self.request(Method::PATCH, &format!("/tasks/{id}")).json(body);
        self.send_json(req, "could not update task").await
    }

    /// `DELETE /tasks/:id` (204, no body).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::RequestFailed`] on transport failure or any
    /// non-2xx response.
    pub async fn delete_task(&self, id: &TaskId) -> Result<(), ApiError> {
        let req = self.request(Method::DELETE, &format!("/tasks/{id}"));
        self.send(req, "could not delete task").await.map(|_| ())
    }

    // -- Internals ---------------------------------------------------------

    /// Builds a request for `path`, attaching the bearer token if present.
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let req = self.client.request(method, url);
        match self.token {
            Some(ref token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Sends a request and normalizes transport errors and non-2xx
    /// statuses into [`ApiError::RequestFailed`].
    async fn send(
        &self,
        req: reqwest::RequestBuilder,
        fallback: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let response = req.send().await.map_err(|e| {
            tracing::warn!(err = %e, "request transport error");
            ApiError::request_failed(None, fallback)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Prefer the backend's own message when the payload carries one.
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message);
        tracing::warn!(%status, message = ?message, "backend returned error status");
        Err(ApiError::request_failed(message, fallback))
    }

    /// Sends a request and deserializes a JSON body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let response = self.send(req, fallback).await?;
        response.json::<T>().await.map_err(|e| {
            tracing::warn!(err = %e, "malformed response body");
            ApiError::request_failed(None, fallback)
        })
    }
}
