//! Pinport Replay - event log diagnostics
//!
//! Replays a captured event log through the dispatch core, with observer
//! claims attached to every pin and UART module, and traces every callback.
//! Useful for reproducing a field-reported desync from a transport capture
//! without hardware on the bench.
//!
//! # Log format
//!
//! One JSON-encoded `DeviceEvent` per line (NDJSON), in arrival order.
//! Blank lines and `#` comment lines are skipped.
//!
//! # Usage
//!
//! ```text
//! pinport-replay <log.ndjson> [claim-depth]
//! ```
//!
//! `claim-depth` (default 4) is how many observer claims queue on each
//! resource; a capture that reopens one pin more often than that will run
//! the queue dry and report desync, which is usually the point.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use pinport_mux::{DispatchError, Dispatcher, PinClaim, UartClaim};
use pinport_protocol::{DeviceEvent, PinMode, PIN_COUNT, UART_MODULE_COUNT};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Observer claim that traces every pin callback it receives
struct ObserverPin {
    pin: usize,
}

impl PinClaim for ObserverPin {
    fn opened(&self, mode: PinMode) {
        info!(pin = self.pin, %mode, "opened");
    }
    fn closed(&self) {
        info!(pin = self.pin, "closed");
    }
    fn lost(&self) {
        info!(pin = self.pin, "lost");
    }
    fn set_value(&self, value: u16) {
        info!(pin = self.pin, value, "sample");
    }
}

/// Observer claim that traces every UART callback it receives
struct ObserverUart {
    uart: usize,
}

impl UartClaim for ObserverUart {
    fn data_received(&self, data: &[u8]) {
        info!(uart = self.uart, len = data.len(), "data received");
    }
    fn buffer_remaining(&self, bytes: usize) {
        info!(uart = self.uart, bytes, "tx buffer space");
    }
    fn lost(&self) {
        info!(uart = self.uart, "lost");
    }
}

fn observer_dispatcher(claim_depth: usize) -> Result<Dispatcher> {
    let dispatcher = Dispatcher::new();
    for pin in 0..PIN_COUNT {
        for _ in 0..claim_depth {
            dispatcher
                .register_pin_claim(pin, Arc::new(ObserverPin { pin }))
                .context("registering pin observer")?;
        }
    }
    for uart in 0..UART_MODULE_COUNT {
        for _ in 0..claim_depth {
            dispatcher
                .register_uart_claim(uart, Arc::new(ObserverUart { uart }))
                .context("registering uart observer")?;
        }
    }
    Ok(dispatcher)
}

fn replay(reader: impl BufRead, dispatcher: &Dispatcher) -> Result<usize> {
    let mut dispatched = 0usize;

    for (number, line) in reader.lines().enumerate() {
        let line = line.context("reading event log")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let event: DeviceEvent = serde_json::from_str(line)
            .with_context(|| format!("line {}: not a decoded event", number + 1))?;

        match dispatcher.process_event(event) {
            Ok(()) => dispatched += 1,
            Err(DispatchError::Unsupported(kind)) => {
                warn!(kind, line = number + 1, "event has no host-side handling");
            }
            Err(err) => {
                bail!("line {}: {err}", number + 1);
            }
        }
    }

    Ok(dispatched)
}

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: pinport-replay <log.ndjson> [claim-depth]");
    };
    let claim_depth = match args.next() {
        Some(raw) => raw
            .parse::<usize>()
            .context("claim-depth must be a number")?,
        None => 4,
    };

    let dispatcher = observer_dispatcher(claim_depth)?;

    let dispatched = if path == "-" {
        let stdin = io::stdin();
        replay(stdin.lock(), &dispatcher)?
    } else {
        let file = File::open(&path).with_context(|| format!("opening {path}"))?;
        replay(BufReader::new(file), &dispatcher)?
    };

    info!(
        dispatched,
        link = dispatcher.link_state().name(),
        "replay complete"
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("pinport-replay: {err:#}");
            ExitCode::FAILURE
        }
    }
}
