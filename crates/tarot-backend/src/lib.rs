use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tarot_api_types::{
    Card, ClarificationRequest, ClarificationResponse, CreateReadingRequest, ErrorResponse,
    IdentityProof, Reading, SignInRequest, TodaysReadingResponse, UserResponse, VerifyRequest,
    VerifyResponse, WalletAddress,
};
use thiserror::Error;
use tracing::debug;

pub const WALLET_HEADER: &str = "X-Wallet-Address";
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api/v1";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{}", status_message(.status, .detail))]
    Status { status: u16, detail: Option<String> },
    #[error("backend returned an unexpected body: {0}")]
    Decode(String),
    #[error("backend returned no content")]
    EmptyBody,
}

fn status_message(status: &u16, detail: &Option<String>) -> String {
    match detail {
        Some(detail) => detail.clone(),
        None => format!("HTTP error! status: {status}"),
    }
}

impl BackendError {
    /// Human-readable text supplied by the server, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            BackendError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn sign_in(&self, request: &SignInRequest) -> Result<UserResponse, BackendError>;
    async fn verify(
        &self,
        wallet_address: &WalletAddress,
        proof: &IdentityProof,
    ) -> Result<VerifyResponse, BackendError>;
    /// `Ok(None)` when no reading exists yet today.
    async fn todays_reading(
        &self,
        wallet_address: &WalletAddress,
    ) -> Result<Option<TodaysReadingResponse>, BackendError>;
    async fn create_reading(
        &self,
        wallet_address: &WalletAddress,
        cards: &[Card],
    ) -> Result<Reading, BackendError>;
    async fn create_guest_reading(&self, cards: &[Card]) -> Result<Reading, BackendError>;
    async fn clarification(
        &self,
        wallet_address: &WalletAddress,
        request: &ClarificationRequest,
    ) -> Result<String, BackendError>;
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    async fn sign_in(&self, request: &SignInRequest) -> Result<UserResponse, BackendError> {
        (**self).sign_in(request).await
    }

    async fn verify(
        &self,
        wallet_address: &WalletAddress,
        proof: &IdentityProof,
    ) -> Result<VerifyResponse, BackendError> {
        (**self).verify(wallet_address, proof).await
    }

    async fn todays_reading(
        &self,
        wallet_address: &WalletAddress,
    ) -> Result<Option<TodaysReadingResponse>, BackendError> {
        (**self).todays_reading(wallet_address).await
    }

    async fn create_reading(
        &self,
        wallet_address: &WalletAddress,
        cards: &[Card],
    ) -> Result<Reading, BackendError> {
        (**self).create_reading(wallet_address, cards).await
    }

    async fn create_guest_reading(&self, cards: &[Card]) -> Result<Reading, BackendError> {
        (**self).create_guest_reading(cards).await
    }

    async fn clarification(
        &self,
        wallet_address: &WalletAddress,
        request: &ClarificationRequest,
    ) -> Result<String, BackendError> {
        (**self).clarification(wallet_address, request).await
    }
}

/// JSON-over-HTTP client for the reading backend.
///
/// Reads `TAROT_API_URL` from environment at construction time
/// (default: `http://localhost:3000/api/v1`).
#[derive(Debug, Clone)]
pub struct HttpBackend {
    endpoint: String,
    http: reqwest::Client,
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new(None)
    }
}

impl HttpBackend {
    pub fn new(endpoint: Option<String>) -> Self {
        let endpoint = endpoint
            .or_else(|| std::env::var("TAROT_API_URL").ok())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn post_json<Req: Serialize + ?Sized, Res: DeserializeOwned>(
        &self,
        path: &str,
        wallet_address: Option<&WalletAddress>,
        body: &Req,
    ) -> Result<Option<Res>, BackendError> {
        let mut request = self.http.post(self.url(path)).json(body);
        if let Some(wallet_address) = wallet_address {
            request = request.header(WALLET_HEADER, wallet_address.as_str());
        }
        let response = request.send().await?;
        read_json(path, response).await
    }
}

async fn read_json<T: DeserializeOwned>(
    path: &str,
    response: reqwest::Response,
) -> Result<Option<T>, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorResponse>(&text)
            .ok()
            .and_then(|body| body.detail)
            .filter(|detail| !detail.trim().is_empty());
        debug!("{path} returned HTTP {status}");
        return Err(BackendError::Status {
            status: status.as_u16(),
            detail,
        });
    }

    if status == StatusCode::NO_CONTENT {
        return Ok(None);
    }

    let text = response.text().await?;
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|err| BackendError::Decode(format!("{path}: {err}")))
}

fn required<T>(body: Option<T>) -> Result<T, BackendError> {
    body.ok_or(BackendError::EmptyBody)
}

#[async_trait]
impl Backend for HttpBackend {
    async fn sign_in(&self, request: &SignInRequest) -> Result<UserResponse, BackendError> {
        required(self.post_json("/signin", None, request).await?)
    }

    async fn verify(
        &self,
        wallet_address: &WalletAddress,
        proof: &IdentityProof,
    ) -> Result<VerifyResponse, BackendError> {
        let body = VerifyRequest {
            proof: proof.clone(),
        };
        required(self.post_json("/verify", Some(wallet_address), &body).await?)
    }

    async fn todays_reading(
        &self,
        wallet_address: &WalletAddress,
    ) -> Result<Option<TodaysReadingResponse>, BackendError> {
        let path = "/readings/today";
        let response = self
            .http
            .get(self.url(path))
            .header(WALLET_HEADER, wallet_address.as_str())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        read_json(path, response).await
    }

    async fn create_reading(
        &self,
        wallet_address: &WalletAddress,
        cards: &[Card],
    ) -> Result<Reading, BackendError> {
        let body = CreateReadingRequest {
            cards: cards.to_vec(),
        };
        required(self.post_json("/readings", Some(wallet_address), &body).await?)
    }

    async fn create_guest_reading(&self, cards: &[Card]) -> Result<Reading, BackendError> {
        let body = CreateReadingRequest {
            cards: cards.to_vec(),
        };
        required(self.post_json("/readings/guest", None, &body).await?)
    }

    async fn clarification(
        &self,
        wallet_address: &WalletAddress,
        request: &ClarificationRequest,
    ) -> Result<String, BackendError> {
        let body: ClarificationResponse = required(
            self.post_json("/readings/clarification", Some(wallet_address), request)
                .await?,
        )?;
        Ok(body.clarification)
    }
}
