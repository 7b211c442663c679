//! Scripted oracle for tests and offline runs.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;

use crate::error::{OracleError, OracleResult};
use crate::oracle::{GenerationOracle, OracleEvent, OracleStream};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    /// Fail the query with a request error
    Fail(String),
}

/// Oracle that replays queued responses.
///
/// Responses are returned in order; the last one repeats once the queue
/// runs dry. Every prompt is recorded. Clones share state.
#[derive(Clone)]
pub struct ScriptedOracle {
    available: Arc<RwLock<bool>>,
    replies: Arc<RwLock<VecDeque<ScriptedReply>>>,
    last: Arc<RwLock<Option<ScriptedReply>>>,
    delay: Arc<RwLock<Option<Duration>>>,
    prompts: Arc<RwLock<Vec<String>>>,
    /// Replies keyed by a substring of the prompt, checked before the queue
    routes: Arc<RwLock<Vec<(String, ScriptedReply)>>>,
}

impl Default for ScriptedOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self {
            available: Arc::new(RwLock::new(true)),
            replies: Arc::new(RwLock::new(VecDeque::new())),
            last: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(None)),
            prompts: Arc::new(RwLock::new(Vec::new())),
            routes: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Queue a text reply.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.replies.write().push_back(ScriptedReply::Text(text.into()));
        self
    }

    /// Queue a failing reply.
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.replies.write().push_back(ScriptedReply::Fail(message.into()));
        self
    }

    /// Answer any prompt containing `needle` with `text`, bypassing the queue.
    pub fn route(self, needle: impl Into<String>, text: impl Into<String>) -> Self {
        self.routes
            .write()
            .push((needle.into(), ScriptedReply::Text(text.into())));
        self
    }

    /// Fail any prompt containing `needle`, bypassing the queue.
    pub fn route_failure(self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.routes
            .write()
            .push((needle.into(), ScriptedReply::Fail(message.into())));
        self
    }

    /// Sleep this long before each reply.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.write() = Some(delay);
        self
    }

    pub fn set_available(self, available: bool) -> Self {
        *self.available.write() = available;
        self
    }

    /// Every prompt received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.read().len()
    }

    /// Number of prompts containing `needle`.
    pub fn prompts_containing(&self, needle: &str) -> usize {
        self.prompts.read().iter().filter(|p| p.contains(needle)).count()
    }

    fn next_reply(&self, prompt: &str) -> ScriptedReply {
        if let Some((_, reply)) = self
            .routes
            .read()
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
        {
            return reply.clone();
        }

        match self.replies.write().pop_front() {
            Some(reply) => {
                *self.last.write() = Some(reply.clone());
                reply
            }
            None => self
                .last
                .read()
                .clone()
                .unwrap_or_else(|| ScriptedReply::Text(String::new())),
        }
    }
}

#[async_trait]
impl GenerationOracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn is_available(&self) -> bool {
        *self.available.read()
    }

    async fn query(&self, prompt: &str, turn_budget: u32) -> OracleResult<OracleStream> {
        if turn_budget == 0 {
            return Err(OracleError::InvalidTurnBudget);
        }

        self.prompts.write().push(prompt.to_string());
        let reply = self.next_reply(prompt);
        let delay = *self.delay.read();

        let events = stream::once(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match reply {
                ScriptedReply::Text(text) => Ok(vec![
                    Ok(OracleEvent::Text(text)),
                    Ok(OracleEvent::Completed { turns_used: 1 }),
                ]),
                ScriptedReply::Fail(message) => Err(OracleError::Request(message)),
            }
        })
        .flat_map(|batch| match batch {
            Ok(events) => stream::iter(events),
            Err(e) => stream::iter(vec![Err(e)]),
        });

        Ok(events.boxed())
    }
}
