//! Nullable poll service.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use passvote_polls::PollService;
use passvote_types::{ClientError, OptionId, PollId, PollSnapshot};
use tokio::sync::Semaphore;

/// An in-memory poll service.
///
/// Successful votes are applied to the stored poll, so a later `get_poll`
/// reflects them the way the real service would.
#[derive(Default)]
pub struct NullPollService {
    polls: Mutex<HashMap<PollId, PollSnapshot>>,
    vote_results: Mutex<VecDeque<Result<(), ClientError>>>,
    get_failures: Mutex<VecDeque<ClientError>>,
    votes: Mutex<Vec<(PollId, OptionId)>>,
    gets: Mutex<usize>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl NullPollService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll(snapshot: PollSnapshot) -> Self {
        let service = Self::new();
        service.insert_poll(snapshot);
        service
    }

    pub fn insert_poll(&self, snapshot: PollSnapshot) {
        self.polls
            .lock()
            .unwrap()
            .insert(snapshot.poll_id.clone(), snapshot);
    }

    pub fn poll(&self, poll_id: &PollId) -> Option<PollSnapshot> {
        self.polls.lock().unwrap().get(poll_id).cloned()
    }

    /// Queue the outcome of the next vote.
    pub fn script_vote(&self, result: Result<(), ClientError>) {
        self.vote_results.lock().unwrap().push_back(result);
    }

    /// Make the next `get_poll` fail.
    pub fn fail_next_get(&self, error: ClientError) {
        self.get_failures.lock().unwrap().push_back(error);
    }

    /// Hold every vote submission until [`release_vote`](Self::release_vote).
    pub fn hold_votes(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let one held vote submission proceed.
    pub fn release_vote(&self) {
        if let Some(gate) = self.gate.lock().unwrap().as_ref() {
            gate.add_permits(1);
        }
    }

    /// Every vote submitted so far, settled or not.
    pub fn votes(&self) -> Vec<(PollId, OptionId)> {
        self.votes.lock().unwrap().clone()
    }

    pub fn get_count(&self) -> usize {
        *self.gets.lock().unwrap()
    }

    fn record_vote(&self, poll_id: &PollId, option_id: &OptionId) {
        let mut polls = self.polls.lock().unwrap();
        if let Some(poll) = polls.get_mut(poll_id) {
            if let Some(option) = poll.option_mut(option_id) {
                option.vote_count += 1;
                poll.total_votes += 1;
                poll.user_voted_option_id = Some(option_id.clone());
            }
        }
    }
}

#[async_trait]
impl PollService for NullPollService {
    async fn get_poll(&self, poll_id: &PollId) -> Result<PollSnapshot, ClientError> {
        *self.gets.lock().unwrap() += 1;
        if let Some(error) = self.get_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.poll(poll_id)
            .ok_or_else(|| ClientError::service(404, "Poll not found"))
    }

    async fn vote(&self, poll_id: &PollId, option_id: &OptionId) -> Result<(), ClientError> {
        self.votes
            .lock()
            .unwrap()
            .push((poll_id.clone(), option_id.clone()));

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let result = self
            .vote_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));
        if result.is_ok() {
            self.record_vote(poll_id, option_id);
        }
        result
    }
}
