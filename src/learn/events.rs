//! Asynchronous intake of learner interactions and fan-out logging of
//! progress events.
//!
//! Interactions are queued on a bounded mpsc channel and applied by a single
//! consumer, so signals for the same learner are processed in the order they
//! were received.

use log::{debug, info, warn};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::engine::{LearnEngine, LearnerContext};
use super::error::LearnError;
use super::store::ProgressEvent;
use super::types::InteractionSignal;

#[derive(Debug, Clone)]
pub struct LearnerEvent {
    pub ctx: LearnerContext,
    pub course_id: Uuid,
    pub lesson_id: Uuid,
    pub signal: InteractionSignal,
}

#[derive(Debug, Deserialize)]
pub struct InteractionRequest {
    pub signal: InteractionSignal,
}

#[derive(Clone)]
pub struct EventQueue {
    tx: mpsc::Sender<LearnerEvent>,
}

impl EventQueue {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<LearnerEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueues without waiting; a full queue is reported to the caller.
    pub fn publish(&self, event: LearnerEvent) -> Result<(), LearnError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                LearnError::QueueUnavailable("event queue is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                LearnError::QueueUnavailable("event consumer has stopped".to_string())
            }
        })
    }
}

pub fn spawn_event_consumer(
    engine: Arc<LearnEngine>,
    mut rx: mpsc::Receiver<LearnerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match engine
                .record_interaction(
                    &event.ctx,
                    event.course_id,
                    event.lesson_id,
                    event.signal.into(),
                )
                .await
            {
                Ok(outcome) => debug!(
                    "Interaction {:?} on lesson {} for {}: {:?}",
                    event.signal, event.lesson_id, event.ctx.user_id, outcome
                ),
                Err(e) => warn!(
                    "Interaction on lesson {} for {} failed: {}",
                    event.lesson_id, event.ctx.user_id, e
                ),
            }
        }
        info!("Learner event queue closed");
    })
}

pub fn spawn_event_logger(mut rx: broadcast::Receiver<ProgressEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => info!("progress event: {}", json),
                    Err(e) => warn!("Failed to serialize progress event: {}", e),
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Progress event logger lagged behind by {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Progress event channel closed");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> LearnerEvent {
        LearnerEvent {
            ctx: LearnerContext::new(Uuid::new_v4()),
            course_id: Uuid::new_v4(),
            lesson_id: Uuid::new_v4(),
            signal: InteractionSignal::Viewed,
        }
    }

    #[tokio::test]
    async fn test_publish_preserves_order() {
        let (queue, mut rx) = EventQueue::channel(4);
        let first = event();
        let second = event();
        queue.publish(first.clone()).unwrap();
        queue.publish(second.clone()).unwrap();
        assert_eq!(rx.recv().await.unwrap().lesson_id, first.lesson_id);
        assert_eq!(rx.recv().await.unwrap().lesson_id, second.lesson_id);
    }

    #[tokio::test]
    async fn test_full_queue_is_reported() {
        let (queue, _rx) = EventQueue::channel(1);
        queue.publish(event()).unwrap();
        let err = queue.publish(event()).unwrap_err();
        assert!(matches!(err, LearnError::QueueUnavailable(_)));
    }

    #[tokio::test]
    async fn test_closed_queue_is_reported() {
        let (queue, rx) = EventQueue::channel(1);
        drop(rx);
        assert!(queue.publish(event()).is_err());
    }

    #[test]
    fn test_interaction_request_parses_signal() {
        let req: InteractionRequest =
            serde_json::from_str(r#"{"signal":"text_scrolled_into_view"}"#).unwrap();
        assert_eq!(req.signal, InteractionSignal::TextScrolledIntoView);
    }
}
