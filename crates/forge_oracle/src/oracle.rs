//! Oracle capability trait and event stream.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{OracleError, OracleResult};

/// One event emitted while the oracle works on a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleEvent {
    /// A chunk of response text
    Text(String),
    /// The oracle finished after using this many turns
    Completed { turns_used: u32 },
}

/// Stream of oracle events for one query.
pub type OracleStream = BoxStream<'static, OracleResult<OracleEvent>>;

/// Collected text of a finished query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleReply {
    pub text: String,
    pub turns_used: u32,
}

/// A code-generation capability.
///
/// Given a prompt and a turn budget the oracle streams text and then a
/// completion event. Whatever files it produces are the caller's concern;
/// see [`crate::extract_file_blocks`].
#[async_trait]
pub trait GenerationOracle: Send + Sync {
    /// Oracle name used in logs.
    fn name(&self) -> &str;

    /// Whether the oracle can currently accept queries.
    async fn is_available(&self) -> bool;

    /// Start a query. Errors here mean the query could not be started at all.
    async fn query(&self, prompt: &str, turn_budget: u32) -> OracleResult<OracleStream>;
}

/// Drain a stream, concatenating text until the completion event.
///
/// A stream that ends without a completion event is treated as complete.
pub async fn collect_text(mut stream: OracleStream) -> OracleResult<OracleReply> {
    let mut reply = OracleReply::default();

    while let Some(event) = stream.next().await {
        match event? {
            OracleEvent::Text(chunk) => reply.text.push_str(&chunk),
            OracleEvent::Completed { turns_used } => {
                reply.turns_used = turns_used;
                break;
            }
        }
    }

    Ok(reply)
}

/// Query an oracle and collect the reply, abandoning it after `limit`.
pub async fn ask(
    oracle: &dyn GenerationOracle,
    prompt: &str,
    turn_budget: u32,
    limit: Duration,
) -> OracleResult<OracleReply> {
    if turn_budget == 0 {
        return Err(OracleError::InvalidTurnBudget);
    }

    let work = async {
        let stream = oracle.query(prompt, turn_budget).await?;
        collect_text(stream).await
    };

    match tokio::time::timeout(limit, work).await {
        Ok(result) => result,
        Err(_) => Err(OracleError::Timeout(limit.as_secs())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn test_collect_text_concatenates() {
        let events = vec![
            Ok(OracleEvent::Text("hello ".to_string())),
            Ok(OracleEvent::Text("world".to_string())),
            Ok(OracleEvent::Completed { turns_used: 2 }),
            Ok(OracleEvent::Text("ignored".to_string())),
        ];
        let reply = collect_text(stream::iter(events).boxed()).await.unwrap();

        assert_eq!(reply.text, "hello world");
        assert_eq!(reply.turns_used, 2);
    }

    #[tokio::test]
    async fn test_collect_text_propagates_error() {
        let events = vec![
            Ok(OracleEvent::Text("partial".to_string())),
            Err(OracleError::Request("connection reset".to_string())),
        ];
        let result = collect_text(stream::iter(events).boxed()).await;
        assert!(matches!(result, Err(OracleError::Request(_))));
    }

    #[tokio::test]
    async fn test_collect_text_without_completion() {
        let events = vec![Ok(OracleEvent::Text("abc".to_string()))];
        let reply = collect_text(stream::iter(events).boxed()).await.unwrap();
        assert_eq!(reply.text, "abc");
        assert_eq!(reply.turns_used, 0);
    }
}
