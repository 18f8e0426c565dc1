//! Background worker hosting the router
//!
//! One task owns the router. It races engine initialization against the
//! request queue: requests that arrive before the engine is ready are
//! answered with `EngineUnavailable` right away, never buffered. Readiness
//! is announced once, unsolicited, when initialization settles.

use std::future::Future;
use std::sync::Arc;

use tabstage_core::{Connection, EngineError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::protocol::{Envelope, Outbound};
use crate::router::MessageRouter;

/// Channels to a running worker.
///
/// Dropping `requests` stops the worker after it drains the queue.
pub struct WorkerHandle {
    pub requests: mpsc::Sender<Envelope>,
    pub events: mpsc::Receiver<Outbound>,
    pub task: JoinHandle<()>,
}

/// Start a worker whose engine handle comes from `init`
pub fn spawn<F>(config: EngineConfig, init: F) -> WorkerHandle
where
    F: Future<Output = Result<Arc<dyn Connection>, EngineError>> + Send + 'static,
{
    let capacity = config.queue_capacity.max(1);
    let (request_tx, request_rx) = mpsc::channel(capacity);
    let (event_tx, event_rx) = mpsc::channel(capacity);

    let router = MessageRouter::new(config);
    let task = tokio::spawn(run(router, init, request_rx, event_tx));

    WorkerHandle {
        requests: request_tx,
        events: event_rx,
        task,
    }
}

async fn run<F>(
    mut router: MessageRouter,
    init: F,
    mut requests: mpsc::Receiver<Envelope>,
    events: mpsc::Sender<Outbound>,
) where
    F: Future<Output = Result<Arc<dyn Connection>, EngineError>> + Send,
{
    tokio::pin!(init);
    let mut initializing = true;

    loop {
        tokio::select! {
            biased;

            result = &mut init, if initializing => {
                initializing = false;
                match result {
                    Ok(connection) => router.mark_ready(connection),
                    Err(e) => router.mark_failed(e.to_string()),
                }
                if events.send(Outbound::unsolicited(router.readiness())).await.is_err() {
                    break;
                }
            }

            envelope = requests.recv() => {
                let Some(Envelope { correlation_id, request }) = envelope else {
                    break;
                };
                let responses = router.dispatch(request).await;
                for (position, response) in responses.into_iter().enumerate() {
                    // Only the first response answers the request.
                    let outbound = if position == 0 {
                        Outbound::reply(correlation_id, response)
                    } else {
                        Outbound::unsolicited(response)
                    };
                    if events.send(outbound).await.is_err() {
                        tracing::debug!("event receiver dropped, stopping worker");
                        return;
                    }
                }
            }
        }
    }

    tracing::info!("worker stopped");
}
