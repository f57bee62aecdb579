use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use stocklink_events::{Event, EventBus, Subscription};
use stocklink_inventory::ChannelEvent;

const TICK: Duration = Duration::from_millis(250);

/// Handle to stop and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    name: &'static str,
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Request shutdown and wait for the worker thread to exit.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                warn!(worker = self.name, "worker thread panicked");
            }
        }
    }
}

/// Subscribes to a bus and hands every event to a handler on its own thread.
///
/// The subscription is taken before `spawn` returns, so nothing published
/// afterwards is missed. Handler errors are logged and the loop keeps going.
#[derive(Debug)]
pub struct EventWorker;

impl EventWorker {
    pub fn spawn<M, B, H, E>(name: &'static str, bus: &B, mut handler: H) -> io::Result<WorkerHandle>
    where
        M: Event,
        B: EventBus<M>,
        H: FnMut(M) -> Result<(), E> + Send + 'static,
        E: core::fmt::Display,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub: Subscription<M> = bus.subscribe();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run(name, sub, shutdown_rx, &mut handler))?;

        Ok(WorkerHandle {
            name,
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn run<M, H, E>(name: &'static str, sub: Subscription<M>, shutdown_rx: mpsc::Receiver<()>, handler: &mut H)
where
    M: Event,
    H: FnMut(M) -> Result<(), E>,
    E: core::fmt::Display,
{
    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(TICK) {
            Ok(event) => {
                let event_type = event.event_type();
                if let Err(err) = handler(event) {
                    warn!(worker = name, event_type, error = %err, "event handler failed");
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Default consumer: one structured log line per channel event.
pub fn log_channel_event(event: ChannelEvent) -> Result<(), core::convert::Infallible> {
    match &event {
        ChannelEvent::WebhookReceived(e) => info!(
            event_type = event.event_type(),
            channel = %e.channel,
            audit_log_id = %e.audit_log_id,
            payload_keys = e.payload.len(),
            "webhook received"
        ),
        ChannelEvent::InventoryUpdated(e) => info!(
            event_type = event.event_type(),
            channel = %e.channel,
            remote_id = %e.product.remote_id,
            previous_quantity = e.previous_quantity,
            new_quantity = e.new_quantity,
            delta = e.delta(),
            "inventory updated"
        ),
    }
    Ok(())
}
