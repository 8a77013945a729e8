//! The level worker.
//!
//! Level state used by the scene lives in a separate context that the
//! kernel talks to only by message passing. Requests that expect an answer
//! carry a `messageId`; the client keeps a oneshot per outstanding id and
//! the worker echoes the id back.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::error::TermError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key", rename_all = "kebab-case")]
pub enum MessageToWorker {
    PingLevelWorker {
        #[serde(rename = "messageId")]
        message_id: u64,
    },
    RequestNewLevel {
        #[serde(rename = "levelUid")]
        level_uid: String,
        #[serde(rename = "messageId")]
        message_id: u64,
    },
    RequestDestroyLevel {
        #[serde(rename = "levelUid")]
        level_uid: String,
    },
    RequestLevels {
        #[serde(rename = "messageId")]
        message_id: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key", rename_all = "kebab-case")]
pub enum MessageFromWorker {
    PongFromLevelWorker {
        #[serde(rename = "messageId")]
        message_id: u64,
    },
    WorkerCreatedLevel {
        #[serde(rename = "levelUid")]
        level_uid: String,
        #[serde(rename = "messageId")]
        message_id: u64,
    },
    SendLevels {
        #[serde(rename = "levelUids")]
        level_uids: Vec<String>,
        #[serde(rename = "messageId")]
        message_id: u64,
    },
}

impl MessageFromWorker {
    pub fn message_id(&self) -> u64 {
        match self {
            MessageFromWorker::PongFromLevelWorker { message_id }
            | MessageFromWorker::WorkerCreatedLevel { message_id, .. }
            | MessageFromWorker::SendLevels { message_id, .. } => *message_id,
        }
    }
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<MessageFromWorker>>>>;

/// Handle on a running level worker.
///
/// Dropping the client closes the request channel, which stops the worker.
#[derive(Debug)]
pub struct WorkerClient {
    requests: mpsc::UnboundedSender<MessageToWorker>,
    pending: Pending,
    next_id: Mutex<u64>,
}

impl WorkerClient {
    /// Start a worker task and the task routing its replies.
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn() -> Self {
        let (requests, inbox) = mpsc::unbounded_channel();
        let (outbox, mut replies) = mpsc::unbounded_channel();
        tokio::spawn(serve(inbox, outbox));

        let pending: Pending = Arc::default();
        let router = Arc::clone(&pending);
        tokio::spawn(async move {
            while let Some(reply) = replies.recv().await {
                let waiter = router
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .remove(&reply.message_id());
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(reply);
                    }
                    None => tracing::warn!(?reply, "level worker reply with no waiter"),
                }
            }
        });

        Self {
            requests,
            pending,
            next_id: Mutex::new(0),
        }
    }

    fn next_id(&self) -> u64 {
        let mut next = self.next_id.lock().unwrap_or_else(|e| e.into_inner());
        *next += 1;
        *next
    }

    fn send(&self, message: MessageToWorker) -> Result<(), TermError> {
        self.requests
            .send(message)
            .map_err(|_| TermError::Worker("worker has stopped".into()))
    }

    async fn request(&self, build: impl FnOnce(u64) -> MessageToWorker) -> Result<MessageFromWorker, TermError> {
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, tx);
        if let Err(err) = self.send(build(id)) {
            self.pending
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&id);
            return Err(err);
        }
        rx.await
            .map_err(|_| TermError::Worker(format!("no reply to message {id}")))
    }

    pub async fn ping(&self) -> Result<(), TermError> {
        match self
            .request(|message_id| MessageToWorker::PingLevelWorker { message_id })
            .await?
        {
            MessageFromWorker::PongFromLevelWorker { .. } => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Ask the worker to create a level; resolves once it has.
    pub async fn ensure_level(&self, level_uid: &str) -> Result<(), TermError> {
        let level_uid = level_uid.to_string();
        match self
            .request(|message_id| MessageToWorker::RequestNewLevel { level_uid, message_id })
            .await?
        {
            MessageFromWorker::WorkerCreatedLevel { .. } => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Fire and forget.
    pub fn destroy_level(&self, level_uid: &str) -> Result<(), TermError> {
        self.send(MessageToWorker::RequestDestroyLevel {
            level_uid: level_uid.to_string(),
        })
    }

    pub async fn levels(&self) -> Result<Vec<String>, TermError> {
        match self
            .request(|message_id| MessageToWorker::RequestLevels { message_id })
            .await?
        {
            MessageFromWorker::SendLevels { level_uids, .. } => Ok(level_uids),
            other => Err(unexpected(&other)),
        }
    }
}

fn unexpected(reply: &MessageFromWorker) -> TermError {
    TermError::Worker(format!("unexpected reply {reply:?}"))
}

/// The worker side: a registry of level uids.
async fn serve(
    mut inbox: mpsc::UnboundedReceiver<MessageToWorker>,
    outbox: mpsc::UnboundedSender<MessageFromWorker>,
) {
    let mut levels: BTreeSet<String> = BTreeSet::new();
    while let Some(message) = inbox.recv().await {
        tracing::trace!(?message, "level worker received");
        let reply = match message {
            MessageToWorker::PingLevelWorker { message_id } => {
                Some(MessageFromWorker::PongFromLevelWorker { message_id })
            }
            MessageToWorker::RequestNewLevel { level_uid, message_id } => {
                levels.insert(level_uid.clone());
                Some(MessageFromWorker::WorkerCreatedLevel { level_uid, message_id })
            }
            MessageToWorker::RequestDestroyLevel { level_uid } => {
                levels.remove(&level_uid);
                None
            }
            MessageToWorker::RequestLevels { message_id } => Some(MessageFromWorker::SendLevels {
                level_uids: levels.iter().cloned().collect(),
                message_id,
            }),
        };
        if let Some(reply) = reply {
            if outbox.send(reply).is_err() {
                break;
            }
        }
    }
    tracing::debug!("level worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_use_key_tag_and_camel_case_ids() {
        let json = serde_json::to_value(MessageToWorker::RequestNewLevel {
            level_uid: "l1".into(),
            message_id: 7,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"key": "request-new-level", "levelUid": "l1", "messageId": 7})
        );

        let reply: MessageFromWorker =
            serde_json::from_str(r#"{"key":"pong-from-level-worker","messageId":3}"#).unwrap();
        assert_eq!(reply.message_id(), 3);
    }

    #[tokio::test]
    async fn create_list_destroy() {
        let worker = WorkerClient::spawn();
        worker.ping().await.unwrap();
        worker.ensure_level("b").await.unwrap();
        worker.ensure_level("a").await.unwrap();
        assert_eq!(worker.levels().await.unwrap(), vec!["a", "b"]);

        worker.destroy_level("a").unwrap();
        assert_eq!(worker.levels().await.unwrap(), vec!["b"]);
    }

    #[tokio::test]
    async fn concurrent_requests_get_their_own_replies() {
        let worker = WorkerClient::spawn();
        let (a, b, c) = tokio::join!(
            worker.ensure_level("x"),
            worker.ping(),
            worker.ensure_level("y")
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();
        assert_eq!(worker.levels().await.unwrap().len(), 2);
    }
}
