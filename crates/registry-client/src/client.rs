//! HTTP implementation of the call registry
//!
//! Every operation is a single authenticated `POST` with a JSON body. The
//! credential is read per request, so it can be replaced (after a fresh
//! sign-in) while machines are running.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

use callsync_call_core::{
    CallId, CallRegistry, CallSnapshot, CallType, LeaveOutcome, ParticipantStatus, RegistryError,
    RegistryResult, UserId,
};

use crate::config::RegistryConfig;
use crate::credential::Credential;
use crate::error::{ClientError, Result};
use crate::wire::{
    CallIdRequest, CallResponse, ErrorBody, StartCallRequest, UpdateStatusRequest, JOIN_PATH,
    LEAVE_PATH, START_PATH, UPDATE_STATUS_PATH,
};

/// Call registry reached over HTTP
#[derive(Clone)]
pub struct HttpCallRegistry {
    client: Client,
    base_url: Url,
    credential: Arc<RwLock<Option<Credential>>>,
}

impl HttpCallRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        config.validate()?;

        let mut base_url = config.url()?;
        // Resolve API paths below the configured prefix
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(ClientError::HttpClient)?;

        Ok(Self {
            client,
            base_url,
            credential: Arc::new(RwLock::new(config.token.map(Credential::new))),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Replace the credential used for subsequent requests
    pub async fn set_credential(&self, credential: Option<Credential>) {
        *self.credential.write().await = credential;
    }

    pub async fn credential(&self) -> Option<Credential> {
        self.credential.read().await.clone()
    }

    /// The user the current credential belongs to
    pub async fn local_user(&self) -> Result<UserId> {
        let credential = self
            .credential()
            .await
            .ok_or_else(|| ClientError::InvalidCredential("no credential configured".to_string()))?;
        credential.user_id()
    }

    fn endpoint(&self, path: &str) -> RegistryResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| RegistryError::invalid_response(format!("Bad endpoint {}: {}", path, e)))
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> RegistryResult<CallResponse> {
        let credential = self.credential().await.ok_or(RegistryError::MissingCredential)?;
        let url = self.endpoint(path)?;

        debug!(%url, "Registry request");
        let response = self
            .client
            .post(url)
            .bearer_auth(credential.token())
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection(status, response).await);
        }

        let body = response
            .json::<CallResponse>()
            .await
            .map_err(|e| RegistryError::invalid_response(e.to_string()))?;
        if !body.success {
            let message = body.error.unwrap_or_default();
            warn!(path, %message, "Registry reported failure with success status");
            return Err(RegistryError::rejected(status.as_u16(), message));
        }
        Ok(body)
    }
}

fn map_transport_error(error: reqwest::Error) -> RegistryError {
    if error.is_decode() {
        RegistryError::invalid_response(error.to_string())
    } else {
        RegistryError::transport(error.to_string())
    }
}

async fn rejection(status: StatusCode, response: reqwest::Response) -> RegistryError {
    let message = match response.json::<ErrorBody>().await {
        Ok(ErrorBody { error: Some(message) }) => message,
        _ => status.canonical_reason().unwrap_or_default().to_string(),
    };
    debug!(status = status.as_u16(), %message, "Registry rejected request");
    RegistryError::rejected(status.as_u16(), message)
}

fn require_call(response: CallResponse) -> RegistryResult<CallSnapshot> {
    response
        .call
        .ok_or_else(|| RegistryError::invalid_response("response carries no call"))
}

#[async_trait]
impl CallRegistry for HttpCallRegistry {
    async fn create_call(&self, receiver_ids: &[UserId], call_type: CallType) -> RegistryResult<CallSnapshot> {
        let response = self
            .post(
                START_PATH,
                &StartCallRequest {
                    receiver_ids,
                    call_type,
                },
            )
            .await?;
        require_call(response)
    }

    async fn join_call(&self, call_id: &CallId) -> RegistryResult<CallSnapshot> {
        let response = self.post(JOIN_PATH, &CallIdRequest { call_id }).await?;
        require_call(response)
    }

    async fn leave_call(&self, call_id: &CallId) -> RegistryResult<LeaveOutcome> {
        let response = self.post(LEAVE_PATH, &CallIdRequest { call_id }).await?;
        Ok(LeaveOutcome {
            call_ended: response.call_ended.unwrap_or(false),
            call: response.call,
        })
    }

    async fn update_participant_status(
        &self,
        call_id: &CallId,
        status: ParticipantStatus,
    ) -> RegistryResult<CallSnapshot> {
        let response = self
            .post(UPDATE_STATUS_PATH, &UpdateStatusRequest { call_id, status })
            .await?;
        require_call(response)
    }
}
