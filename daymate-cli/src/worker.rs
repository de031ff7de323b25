use anyhow::{Context, Result};
use daymate_core::{Clock, DayService, EngineError, Event, Reply, SessionStore};
use tokio::sync::{mpsc, oneshot};

#[derive(Debug)]
pub struct EventRequest {
    pub event: Event,
    pub reply: oneshot::Sender<Result<Reply, EngineError>>,
}

/// Owns the service; events are applied strictly in arrival order.
pub async fn run_worker<S, C>(
    mut service: DayService<S, C>,
    mut rx: mpsc::UnboundedReceiver<EventRequest>,
) where
    S: SessionStore,
    C: Clock,
{
    while let Some(req) = rx.recv().await {
        let res = service.handle(req.event);
        // Requester may have gone away; the event is applied either way.
        let _ = req.reply.send(res);
    }
}

#[derive(Debug, Clone)]
pub struct WorkerHandle {
    tx: mpsc::UnboundedSender<EventRequest>,
}

impl WorkerHandle {
    pub fn spawn<S, C>(service: DayService<S, C>) -> (Self, tokio::task::JoinHandle<()>)
    where
        S: SessionStore + 'static,
        C: Clock + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let join = tokio::spawn(run_worker(service, rx));
        (Self { tx }, join)
    }

    pub async fn send(&self, event: Event) -> Result<Reply> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EventRequest { event, reply })
            .map_err(|_| anyhow::anyhow!("event worker stopped"))?;
        let res = rx.await.context("event worker dropped the request")?;
        Ok(res?)
    }
}
