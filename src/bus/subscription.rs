//! Subscription loop
//!
//! Pulls batches from an [`EventSubscriber`] and fans each message out to its
//! own task, bounded by a semaphore. The loop acks or releases every message
//! according to the handler's outcome and stops on [`SubscriptionHandle::shutdown`].

use super::{EventSubscriber, HandlerOutcome, MessageHandler};
use crate::config::BusConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct SubscriptionOptions {
    pub topic: String,
    /// Maximum number of handlers running at once
    pub concurrency: usize,
    /// Pause after a failed fetch
    pub error_backoff: Duration,
}

impl From<&BusConfig> for SubscriptionOptions {
    fn from(config: &BusConfig) -> Self {
        Self {
            topic: config.order_topic.clone(),
            concurrency: config.concurrency.max(1),
            error_backoff: Duration::from_secs(1),
        }
    }
}

/// Running subscription; dropping it detaches the loop, which keeps running.
pub struct SubscriptionHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    /// Stop fetching and wait for in-flight handlers to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Subscription task panicked");
        }
    }
}

/// Start delivering messages from `options.topic` to `handler`.
pub fn subscribe<S, H>(
    subscriber: Arc<S>,
    handler: Arc<H>,
    options: SubscriptionOptions,
) -> SubscriptionHandle
where
    S: EventSubscriber + 'static,
    H: MessageHandler,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run(subscriber, handler, options, shutdown_rx));
    SubscriptionHandle { shutdown_tx, task }
}

/// Resolves once shutdown is signalled. A dropped handle never signals.
async fn stop_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    if shutdown_rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn run<S, H>(
    subscriber: Arc<S>,
    handler: Arc<H>,
    options: SubscriptionOptions,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    S: EventSubscriber + 'static,
    H: MessageHandler,
{
    let concurrency = options.concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    tracing::info!(topic = %options.topic, concurrency, "Subscription started");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // Hold one slot before fetching so a batch never outruns the pool.
        let first = tokio::select! {
            _ = stop_requested(&mut shutdown_rx) => break,
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(p) => p,
                Err(_) => break,
            },
        };
        let room = 1 + semaphore.available_permits();

        let fetched = tokio::select! {
            _ = stop_requested(&mut shutdown_rx) => break,
            fetched = subscriber.fetch(&options.topic, room) => fetched,
        };

        let batch = match fetched {
            Ok(batch) => batch,
            Err(e) => {
                drop(first);
                tracing::warn!(topic = %options.topic, error = %e, "Failed to fetch messages");
                tokio::select! {
                    _ = stop_requested(&mut shutdown_rx) => break,
                    _ = tokio::time::sleep(options.error_backoff) => continue,
                }
            }
        };

        let mut reserved = Some(first);
        for message in batch {
            let permit = match reserved.take() {
                Some(p) => p,
                None => match semaphore.clone().acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => break,
                },
            };

            let subscriber = subscriber.clone();
            let handler = handler.clone();
            tokio::spawn(async move {
                let _permit = permit;
                let settled = match handler.handle(&message).await {
                    HandlerOutcome::Ack => subscriber.ack(&message).await,
                    HandlerOutcome::Retry => subscriber.release(&message).await,
                };
                if let Err(e) = settled {
                    tracing::warn!(
                        topic = %message.topic,
                        id = %message.id,
                        error = %e,
                        "Failed to settle message"
                    );
                }
            });
        }
    }

    // Every permit back in the pool means every spawned handler has returned.
    let _ = semaphore.acquire_many(concurrency as u32).await;
    tracing::info!(topic = %options.topic, "Subscription stopped");
}
