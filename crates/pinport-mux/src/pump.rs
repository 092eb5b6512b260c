//! Event pump
//!
//! Bridges the transport's decoder to the dispatcher: one plain thread
//! drains a channel of decoded events and feeds them to
//! [`Dispatcher::process_event`] in order. The pump is the "single
//! producer" the dispatcher's callback ordering relies on.
//!
//! If the sender side goes away without a connection-lost frame (the
//! decoder thread died, the transport was dropped), the pump synthesizes
//! the link loss so blocked waiters and queued claims are still released.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use pinport_protocol::DeviceEvent;
use tracing::{error, info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;

/// Drain `events` into `dispatcher` until the channel closes or the
/// session dies.
///
/// Desync stops the pump (the dispatcher has already closed the link);
/// unsupported events are logged and skipped.
pub fn run_event_pump(dispatcher: &Dispatcher, events: Receiver<DeviceEvent>) {
    info!("event pump started");

    for event in events.iter() {
        match dispatcher.process_event(event) {
            Ok(()) => {}
            Err(DispatchError::Unsupported(kind)) => {
                warn!(kind, "skipping event with no host-side handling");
            }
            Err(err) if err.is_fatal() => {
                error!("{err}; stopping event pump");
                return;
            }
            Err(err) => {
                // Registration errors cannot come out of process_event;
                // log rather than crash the pump if that ever changes.
                warn!("{err}");
            }
        }
    }

    if !dispatcher.is_closed() {
        info!("event channel closed without a connection-lost frame; closing link");
        let _ = dispatcher.process_event(DeviceEvent::ConnectionLost);
    }

    info!("event pump stopped");
}

/// Spawn [`run_event_pump`] on a named thread
pub fn spawn_event_pump(
    dispatcher: Arc<Dispatcher>,
    events: Receiver<DeviceEvent>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("pinport-dispatch".into())
        .spawn(move || run_event_pump(&dispatcher, events))
}
