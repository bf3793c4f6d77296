//! Channel-backed approvals for callers that answer from another task.
//!
//! The pipeline side holds a [`QueuedApproval`]. Whoever answers (a UI, a
//! webhook handler, a test) pulls [`PendingApproval`]s off the
//! [`ApprovalQueue`] and responds to each one.

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc, oneshot};

use crate::approval::{ApprovalChannel, ApprovalRequest, log_request};
use crate::error::ApprovalError;

/// A request waiting for an answer.
#[derive(Debug)]
pub struct PendingApproval {
    pub request: ApprovalRequest,
    responder: oneshot::Sender<bool>,
}

impl PendingApproval {
    pub fn approve(self) {
        self.respond(true);
    }

    pub fn reject(self) {
        self.respond(false);
    }

    pub fn respond(self, approved: bool) {
        if self.responder.send(approved).is_err() {
            tracing::debug!(
                request_id = %self.request.id,
                "Approval answered after the requester stopped waiting"
            );
        }
    }
}

/// The pipeline side of an approval queue.
#[derive(Clone)]
pub struct QueuedApproval {
    tx: mpsc::Sender<PendingApproval>,
}

/// The answering side of an approval queue.
pub struct ApprovalQueue {
    rx: Mutex<mpsc::Receiver<PendingApproval>>,
}

/// Create a connected pair. `capacity` bounds how many requests can wait
/// unanswered.
pub fn approval_queue(capacity: usize) -> (QueuedApproval, ApprovalQueue) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        QueuedApproval { tx },
        ApprovalQueue {
            rx: Mutex::new(rx),
        },
    )
}

impl ApprovalQueue {
    /// Wait for the next request. `None` once every sender is gone.
    pub async fn next(&self) -> Option<PendingApproval> {
        self.rx.lock().await.recv().await
    }
}

#[async_trait]
impl ApprovalChannel for QueuedApproval {
    async fn request_approval(&self, request: &ApprovalRequest) -> Result<bool, ApprovalError> {
        log_request(request);

        let (responder, answer) = oneshot::channel();
        self.tx
            .send(PendingApproval {
                request: request.clone(),
                responder,
            })
            .await
            .map_err(|_| ApprovalError::ChannelClosed)?;

        answer.await.map_err(|_| ApprovalError::ChannelClosed)
    }
}
