//! HTTP client for the poll service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use passvote_types::{
    ClientError, OptionId, PollDraft, PollFilter, PollId, PollOption, PollSnapshot, PollSummary,
    UserId, UserPoll,
};
use passvote_utils::http;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The poll service operations a [`PollView`](crate::PollView) needs.
#[async_trait]
pub trait PollService: Send + Sync {
    /// `GET /polls/:id`
    async fn get_poll(&self, poll_id: &PollId) -> Result<PollSnapshot, ClientError>;

    /// `POST /polls/:id/vote`
    async fn vote(&self, poll_id: &PollId, option_id: &OptionId) -> Result<(), ClientError>;
}

#[async_trait]
impl<T: PollService + ?Sized> PollService for Arc<T> {
    async fn get_poll(&self, poll_id: &PollId) -> Result<PollSnapshot, ClientError> {
        (**self).get_poll(poll_id).await
    }

    async fn vote(&self, poll_id: &PollId, option_id: &OptionId) -> Result<(), ClientError> {
        (**self).vote(poll_id, option_id).await
    }
}

#[derive(Debug, Serialize)]
struct VoteRequest<'a> {
    option_id: &'a OptionId,
}

#[derive(Debug, Deserialize)]
struct PollList {
    #[serde(default)]
    polls: Vec<PollSummary>,
}

#[derive(Debug, Deserialize)]
struct UserPollList {
    #[serde(default)]
    polls: Vec<UserPoll>,
}

/// The poll record returned by `POST /polls/new`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPoll {
    pub id: PollId,
    pub title: String,
    #[serde(default)]
    pub creator_id: Option<UserId>,
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePollResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub poll: CreatedPoll,
    #[serde(default)]
    pub options: Vec<PollOption>,
}

/// `reqwest`-backed poll service client.
///
/// The bearer token is optional for reads (it only adds the caller's own
/// vote to poll details) and required for writes.
#[derive(Clone)]
pub struct HttpPollClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpPollClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeouts(base_url, http::DEFAULT_TIMEOUT, http::DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn with_timeouts(
        base_url: impl Into<String>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            http: http::build_client(timeout, connect_timeout)?,
            base_url: base_url.into(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /polls`, filtered locally.
    pub async fn list_polls(&self, filter: PollFilter) -> Result<Vec<PollSummary>, ClientError> {
        let response = self.send(self.get("/polls"), "Failed to fetch polls").await?;
        let list: PollList = http::read_json(response).await?;
        Ok(list
            .polls
            .into_iter()
            .filter(|p| p.matches(filter))
            .collect())
    }

    /// `POST /polls/new`. The draft is validated before anything is sent.
    pub async fn create_poll(&self, draft: &PollDraft) -> Result<CreatePollResponse, ClientError> {
        draft.validate()?;
        let request = self
            .authorized_post("/polls/new", "You must be logged in to create a poll")?
            .json(draft);
        let response = self.send(request, "Failed to create poll").await?;
        http::read_json(response).await
    }

    /// `POST /polls/:id/close`
    pub async fn close_poll(&self, poll_id: &PollId) -> Result<(), ClientError> {
        let request = self.authorized_post(
            &format!("/polls/{poll_id}/close"),
            "You must be logged in to close a poll",
        )?;
        self.send(request, "Failed to close poll").await?;
        Ok(())
    }

    /// `GET /polls/user/:user_id`, filtered locally.
    pub async fn user_polls(
        &self,
        user_id: &UserId,
        filter: PollFilter,
    ) -> Result<Vec<UserPoll>, ClientError> {
        let request = self.get(&format!("/polls/user/{user_id}"));
        let response = self.send(request, "Failed to fetch user polls").await?;
        let list: UserPollList = http::read_json(response).await?;
        Ok(list
            .polls
            .into_iter()
            .filter(|p| p.matches(filter))
            .collect())
    }

    fn url(&self, path: &str) -> String {
        http::join_url(&self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.with_bearer(self.http.get(self.url(path)))
    }

    fn authorized_post(
        &self,
        path: &str,
        missing_token: &str,
    ) -> Result<RequestBuilder, ClientError> {
        if self.token.is_none() {
            return Err(ClientError::Validation(missing_token.to_string()));
        }
        Ok(self.with_bearer(self.http.post(self.url(path))))
    }

    fn with_bearer(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, fallback: &str) -> Result<Response, ClientError> {
        let response = http::send(request).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("poll service rejected the session token");
            return Err(ClientError::Unauthorized);
        }
        http::ensure_success(response, Some(fallback)).await
    }
}

#[async_trait]
impl PollService for HttpPollClient {
    async fn get_poll(&self, poll_id: &PollId) -> Result<PollSnapshot, ClientError> {
        let request = self.get(&format!("/polls/{poll_id}"));
        let response = self.send(request, "Failed to fetch poll").await?;
        http::read_json(response).await
    }

    async fn vote(&self, poll_id: &PollId, option_id: &OptionId) -> Result<(), ClientError> {
        let request = self
            .authorized_post(
                &format!("/polls/{poll_id}/vote"),
                "You must be logged in to vote",
            )?
            .json(&VoteRequest { option_id });
        self.send(request, "Failed to cast vote").await?;
        Ok(())
    }
}
