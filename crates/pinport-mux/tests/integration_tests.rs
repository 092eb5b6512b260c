//! Integration tests for the pinport dispatch core
//!
//! These tests verify end-to-end behavior of the dispatcher including:
//! - Queue-based ownership arbitration (one owner per resource, FIFO order)
//! - Connection lifecycle and the blocking waits
//! - Desync handling (fatal error, link closed, claims swept)
//! - UART activation, delivery and flow reporting
//! - The event pump over a channel

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pinport_mux::{
    ConnectionFailed, DispatchError, Dispatcher, LinkState, PinClaim, UartClaim,
};
use pinport_protocol::{DeviceEvent, PinMode, Pull, PIN_COUNT, UART_MODULE_COUNT};
use pinport_sim::VirtualDevice;

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;
    use parking_lot::Mutex;

    /// Everything a pin claim can observe
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PinCallback {
        Opened(PinMode),
        Closed,
        Lost,
        Value(u16),
    }

    /// Everything a UART claim can observe
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum UartCallback {
        Data(Vec<u8>),
        Flow(usize),
        Lost,
    }

    /// Pin claim that records every callback in order
    #[derive(Debug, Default)]
    pub struct RecordingPin {
        log: Mutex<Vec<PinCallback>>,
    }

    impl RecordingPin {
        pub fn take(&self) -> Vec<PinCallback> {
            std::mem::take(&mut self.log.lock())
        }

        pub fn snapshot(&self) -> Vec<PinCallback> {
            self.log.lock().clone()
        }
    }

    impl PinClaim for RecordingPin {
        fn opened(&self, mode: PinMode) {
            self.log.lock().push(PinCallback::Opened(mode));
        }
        fn closed(&self) {
            self.log.lock().push(PinCallback::Closed);
        }
        fn lost(&self) {
            self.log.lock().push(PinCallback::Lost);
        }
        fn set_value(&self, value: u16) {
            self.log.lock().push(PinCallback::Value(value));
        }
    }

    /// UART claim that records every callback in order
    #[derive(Debug, Default)]
    pub struct RecordingUart {
        log: Mutex<Vec<UartCallback>>,
    }

    impl RecordingUart {
        pub fn take(&self) -> Vec<UartCallback> {
            std::mem::take(&mut self.log.lock())
        }
    }

    impl UartClaim for RecordingUart {
        fn data_received(&self, data: &[u8]) {
            self.log.lock().push(UartCallback::Data(data.to_vec()));
        }
        fn buffer_remaining(&self, bytes: usize) {
            self.log.lock().push(UartCallback::Flow(bytes));
        }
        fn lost(&self) {
            self.log.lock().push(UartCallback::Lost);
        }
    }

    /// Dispatcher that has already completed the handshake
    pub fn connected_dispatcher() -> Dispatcher {
        let dispatcher = Dispatcher::new();
        let mut device = VirtualDevice::new();
        device.establish();
        for event in device.drain() {
            dispatcher.process_event(event).unwrap();
        }
        dispatcher
    }
}

use helpers::{connected_dispatcher, PinCallback, RecordingPin, RecordingUart, UartCallback};

// ============================================================================
// Ownership Arbitration
// ============================================================================

#[test]
fn one_owner_at_a_time_in_fifo_order() {
    let dispatcher = connected_dispatcher();
    let a = Arc::new(RecordingPin::default());
    let b = Arc::new(RecordingPin::default());
    dispatcher.register_pin_claim(2, a.clone()).unwrap();
    dispatcher.register_pin_claim(2, b.clone()).unwrap();

    // First activation opens A, never B
    dispatcher
        .process_event(DeviceEvent::SetPinDigitalOut {
            pin: 2,
            value: false,
            open_drain: false,
        })
        .unwrap();
    assert_eq!(a.snapshot(), [PinCallback::Opened(PinMode::DigitalOut)]);
    assert!(b.snapshot().is_empty());

    // Release pops A; B is eligible but not yet open
    dispatcher
        .process_event(DeviceEvent::SetPinDigitalIn {
            pin: 2,
            pull: Pull::Floating,
        })
        .unwrap();
    assert!(b.snapshot().is_empty());

    // Second activation opens B
    dispatcher
        .process_event(DeviceEvent::SetPinDigitalOut {
            pin: 2,
            value: true,
            open_drain: true,
        })
        .unwrap();

    assert_eq!(
        a.take(),
        [PinCallback::Opened(PinMode::DigitalOut), PinCallback::Closed]
    );
    assert_eq!(b.take(), [PinCallback::Opened(PinMode::DigitalOut)]);
}

#[test]
fn analog_session_scenario() {
    // register claim on pin 3 -> analog in -> sample -> mode change back
    let dispatcher = connected_dispatcher();
    let claim = Arc::new(RecordingPin::default());
    dispatcher.register_pin_claim(3, claim.clone()).unwrap();

    let mut device = VirtualDevice::new();
    device.open_analog_in(3);
    device.report_analog(&[(3, 512)]);
    device.close_pin(3);
    for event in device.drain() {
        dispatcher.process_event(event).unwrap();
    }

    assert_eq!(
        claim.take(),
        [
            PinCallback::Opened(PinMode::AnalogIn),
            PinCallback::Value(512),
            PinCallback::Closed,
        ]
    );
}

#[test]
fn batched_analog_report_delivers_per_index() {
    let dispatcher = connected_dispatcher();
    let a = Arc::new(RecordingPin::default());
    let b = Arc::new(RecordingPin::default());
    dispatcher.register_pin_claim(10, a.clone()).unwrap();
    dispatcher.register_pin_claim(11, b.clone()).unwrap();
    dispatcher
        .process_event(DeviceEvent::SetPinAnalogIn { pin: 10 })
        .unwrap();
    dispatcher
        .process_event(DeviceEvent::SetPinAnalogIn { pin: 11 })
        .unwrap();

    dispatcher
        .process_event(DeviceEvent::AnalogInStatus {
            pins: vec![10, 11],
            values: vec![17, 1023],
        })
        .unwrap();

    assert_eq!(
        a.take(),
        [PinCallback::Opened(PinMode::AnalogIn), PinCallback::Value(17)]
    );
    assert_eq!(
        b.take(),
        [
            PinCallback::Opened(PinMode::AnalogIn),
            PinCallback::Value(1023)
        ]
    );
}

#[test]
fn sweep_notifies_in_fifo_order_and_is_idempotent() {
    // Shared order log across all three claims
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    struct OrderedClaim {
        name: &'static str,
        order: Arc<parking_lot::Mutex<Vec<&'static str>>>,
    }
    impl PinClaim for OrderedClaim {
        fn opened(&self, _mode: PinMode) {}
        fn closed(&self) {}
        fn lost(&self) {
            self.order.lock().push(self.name);
        }
        fn set_value(&self, _value: u16) {}
    }

    let dispatcher = connected_dispatcher();
    for name in ["a", "b", "c"] {
        dispatcher
            .register_pin_claim(
                4,
                Arc::new(OrderedClaim {
                    name,
                    order: order.clone(),
                }),
            )
            .unwrap();
    }
    dispatcher
        .process_event(DeviceEvent::SetPinDigitalOut {
            pin: 4,
            value: false,
            open_drain: false,
        })
        .unwrap();

    dispatcher.process_event(DeviceEvent::ConnectionLost).unwrap();
    assert_eq!(*order.lock(), ["a", "b", "c"]);
    assert_eq!(dispatcher.pin_claims_waiting(4), Some(0));

    // Second loss is a no-op
    dispatcher.process_event(DeviceEvent::ConnectionLost).unwrap();
    assert_eq!(*order.lock(), ["a", "b", "c"]);
}

#[test]
fn soft_reset_closes_open_heads_but_keeps_queues() {
    let dispatcher = connected_dispatcher();
    let a = Arc::new(RecordingPin::default());
    let b = Arc::new(RecordingPin::default());
    let c = Arc::new(RecordingPin::default());
    dispatcher.register_pin_claim(4, a.clone()).unwrap();
    dispatcher.register_pin_claim(4, b.clone()).unwrap();
    dispatcher.register_pin_claim(6, c.clone()).unwrap();
    dispatcher
        .process_event(DeviceEvent::SetPinDigitalOut {
            pin: 4,
            value: true,
            open_drain: false,
        })
        .unwrap();

    dispatcher.process_event(DeviceEvent::SoftReset).unwrap();

    // Only the open head closed; queued claims survive the reset
    assert_eq!(
        a.take(),
        [PinCallback::Opened(PinMode::DigitalOut), PinCallback::Closed]
    );
    assert!(b.snapshot().is_empty());
    assert!(c.snapshot().is_empty());
    assert_eq!(dispatcher.pin_claims_waiting(4), Some(1));
    assert_eq!(dispatcher.pin_claims_waiting(6), Some(1));

    // The survivor opens on the next activation
    dispatcher
        .process_event(DeviceEvent::SetPinAnalogIn { pin: 4 })
        .unwrap();
    assert_eq!(b.take(), [PinCallback::Opened(PinMode::AnalogIn)]);
}

// ============================================================================
// UART Arbitration
// ============================================================================

#[test]
fn uart_configure_data_and_flow() {
    let dispatcher = connected_dispatcher();
    let claim = Arc::new(RecordingUart::default());
    dispatcher.register_uart_claim(1, claim.clone()).unwrap();

    let mut device = VirtualDevice::new();
    device.configure_uart(1, 38_400);
    device.uart_rx(1, b"ok\r\n");
    device.uart_tx_space(1, 64);
    for event in device.drain() {
        dispatcher.process_event(event).unwrap();
    }

    assert_eq!(
        claim.take(),
        [
            UartCallback::Data(b"ok\r\n".to_vec()),
            UartCallback::Flow(64)
        ]
    );
}

#[test]
fn uart_zero_rate_pops_silently_and_advances() {
    let dispatcher = connected_dispatcher();
    let first = Arc::new(RecordingUart::default());
    let second = Arc::new(RecordingUart::default());
    dispatcher.register_uart_claim(0, first.clone()).unwrap();
    dispatcher.register_uart_claim(0, second.clone()).unwrap();

    let mut device = VirtualDevice::new();
    device.configure_uart(0, 115_200);
    device.configure_uart(0, 0);
    device.configure_uart(0, 9_600);
    device.uart_rx(0, &[0x55]);
    for event in device.drain() {
        dispatcher.process_event(event).unwrap();
    }

    // The first claim was shut down without any callback; the second owns
    // the module now
    assert!(first.take().is_empty());
    assert_eq!(second.take(), [UartCallback::Data(vec![0x55])]);
}

#[test]
fn uart_claims_observe_link_loss() {
    let dispatcher = connected_dispatcher();
    let open = Arc::new(RecordingUart::default());
    let queued = Arc::new(RecordingUart::default());
    dispatcher.register_uart_claim(2, open.clone()).unwrap();
    dispatcher.register_uart_claim(3, queued.clone()).unwrap();
    dispatcher
        .process_event(DeviceEvent::UartConfigure {
            uart: 2,
            rate: 19_200,
            speed_4x: false,
            two_stop_bits: false,
            parity: pinport_protocol::Parity::None,
        })
        .unwrap();

    dispatcher.process_event(DeviceEvent::ConnectionLost).unwrap();

    assert_eq!(open.take(), [UartCallback::Lost]);
    assert_eq!(queued.take(), [UartCallback::Lost]);
}

#[test]
fn uart_data_without_owner_is_fatal() {
    let dispatcher = connected_dispatcher();
    let err = dispatcher
        .process_event(DeviceEvent::UartData {
            uart: 0,
            data: vec![1],
        })
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(dispatcher.is_closed());
}

// ============================================================================
// Connection Lifecycle
// ============================================================================

#[test]
fn lost_before_connect_fails_waiters() {
    let dispatcher = Arc::new(Dispatcher::new());

    let waiter = {
        let dispatcher = dispatcher.clone();
        thread::spawn(move || dispatcher.await_connected())
    };
    // Give the waiter time to block
    thread::sleep(Duration::from_millis(20));

    dispatcher.process_event(DeviceEvent::ConnectionLost).unwrap();
    assert_eq!(waiter.join().unwrap(), Err(ConnectionFailed));
    assert_eq!(dispatcher.link_state(), LinkState::Closed);
}

#[test]
fn connect_then_lost_waiters_see_both_transitions() {
    let dispatcher = Arc::new(Dispatcher::new());

    let mut device = VirtualDevice::new();
    device.establish();
    for event in device.drain() {
        dispatcher.process_event(event).unwrap();
    }

    // Already connected: returns without blocking, and keeps succeeding
    // even after the link later closes
    dispatcher.await_connected().unwrap();

    let waiter = {
        let dispatcher = dispatcher.clone();
        thread::spawn(move || dispatcher.await_disconnected())
    };
    thread::sleep(Duration::from_millis(20));
    assert!(!waiter.is_finished());

    dispatcher.process_event(DeviceEvent::ConnectionLost).unwrap();
    waiter.join().unwrap();

    // A handshake happened, so late connect-waiters still see success
    dispatcher.await_connected().unwrap();
}

#[test]
fn device_ids_captured_on_handshake() {
    let dispatcher = Dispatcher::new();
    assert_eq!(dispatcher.device_ids(), None);

    dispatcher
        .process_event(DeviceEvent::ConnectionEstablished {
            hardware_id: 0x10,
            bootloader_id: 0x0102,
            firmware_id: 0x0311,
        })
        .unwrap();

    let ids = dispatcher.device_ids().unwrap();
    assert_eq!(ids.hardware_id, 0x10);
    assert_eq!(ids.firmware_id, 0x0311);
}

#[test]
fn desync_wakes_disconnect_waiters() {
    let dispatcher = Arc::new(connected_dispatcher());

    let waiter = {
        let dispatcher = dispatcher.clone();
        thread::spawn(move || dispatcher.await_disconnected())
    };
    thread::sleep(Duration::from_millis(20));

    // Sample for a pin nobody owns: fatal, closes the link
    let err = dispatcher
        .process_event(DeviceEvent::DigitalInStatus {
            pin: 9,
            level: true,
        })
        .unwrap_err();
    assert!(err.is_fatal());
    waiter.join().unwrap();
}

// ============================================================================
// Error Surface
// ============================================================================

#[test]
fn registration_out_of_range_is_rejected() {
    let dispatcher = Dispatcher::new();
    assert_eq!(
        dispatcher
            .register_pin_claim(PIN_COUNT, Arc::new(RecordingPin::default()))
            .unwrap_err(),
        DispatchError::PinOutOfRange {
            pin: PIN_COUNT,
            limit: PIN_COUNT
        }
    );
    assert_eq!(
        dispatcher
            .register_uart_claim(UART_MODULE_COUNT, Arc::new(RecordingUart::default()))
            .unwrap_err(),
        DispatchError::UartOutOfRange {
            uart: UART_MODULE_COUNT,
            limit: UART_MODULE_COUNT
        }
    );
}

#[test]
fn delivery_to_closed_queue_invokes_no_callback() {
    let dispatcher = connected_dispatcher();
    let claim = Arc::new(RecordingPin::default());
    dispatcher.register_pin_claim(5, claim.clone()).unwrap();

    // Claim queued but never activated: delivery is desync
    let err = dispatcher
        .process_event(DeviceEvent::DigitalInStatus {
            pin: 5,
            level: true,
        })
        .unwrap_err();
    assert!(err.is_fatal());

    // No sample was delivered; the claim only saw the sweep
    assert_eq!(claim.take(), [PinCallback::Lost]);
}

#[test]
fn unsupported_events_touch_nothing() {
    let dispatcher = connected_dispatcher();
    let claim = Arc::new(RecordingPin::default());
    dispatcher.register_pin_claim(0, claim.clone()).unwrap();

    for event in [
        DeviceEvent::SpiConfigureMaster {
            spi: 0,
            scale: 1,
            div: 2,
            sample_at_end: false,
            clk_edge: false,
            clk_pol: false,
        },
        DeviceEvent::SpiData {
            spi: 0,
            ss_pin: 3,
            data: vec![0xAA],
        },
        DeviceEvent::I2cConfigureMaster {
            i2c: 0,
            rate: 1,
            smbus_levels: false,
        },
        DeviceEvent::RegisterPeriodicDigitalSampling {
            pin: 0,
            freq_scale: 10,
        },
    ] {
        let err = dispatcher.process_event(event).unwrap_err();
        assert!(matches!(err, DispatchError::Unsupported(_)));
    }

    assert_eq!(dispatcher.link_state(), LinkState::Connected);
    assert!(claim.take().is_empty());
    assert_eq!(dispatcher.pin_claims_waiting(0), Some(1));
}

// ============================================================================
// Event Pump
// ============================================================================

#[test]
fn pump_runs_a_full_session() {
    let dispatcher = Arc::new(Dispatcher::new());
    let claim = Arc::new(RecordingPin::default());
    dispatcher.register_pin_claim(3, claim.clone()).unwrap();

    let (tx, rx) = crossbeam_channel::bounded(32);
    let pump = pinport_mux::spawn_event_pump(dispatcher.clone(), rx).unwrap();

    let mut device = VirtualDevice::new();
    device.establish();
    device.open_analog_in(3);
    device.report_analog(&[(3, 700)]);
    device.drop_link();
    for event in device.drain() {
        tx.send(event).unwrap();
    }
    drop(tx);

    dispatcher.await_connected().unwrap();
    dispatcher.await_disconnected();
    pump.join().unwrap();

    assert_eq!(
        claim.take(),
        [
            PinCallback::Opened(PinMode::AnalogIn),
            PinCallback::Value(700),
            PinCallback::Lost,
        ]
    );
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    /// One scripted action against a single pin
    #[derive(Debug, Clone, Copy)]
    enum Op {
        Register,
        Activate,
        Deactivate,
        Report(u16),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Register),
            Just(Op::Activate),
            Just(Op::Deactivate),
            (0u16..1024).prop_map(Op::Report),
        ]
    }

    /// Reference model of one pin's queue plus the link
    #[derive(Default)]
    struct Model {
        /// Claim indices still queued, head first
        queue: Vec<usize>,
        open: bool,
        link_closed: bool,
        /// Expected callback log per claim index
        expected: Vec<Vec<PinCallback>>,
    }

    impl Model {
        fn fatal(&mut self) {
            if self.link_closed {
                return;
            }
            for &id in &self.queue {
                self.expected[id].push(PinCallback::Lost);
            }
            self.queue.clear();
            self.open = false;
            self.link_closed = true;
        }

        fn apply(&mut self, op: Op) -> bool {
            match op {
                Op::Register => {
                    self.queue.push(self.expected.len());
                    self.expected.push(Vec::new());
                    true
                }
                Op::Activate => {
                    if self.queue.is_empty() {
                        self.fatal();
                        return false;
                    }
                    if !self.open {
                        self.open = true;
                        self.expected[self.queue[0]].push(PinCallback::Opened(PinMode::AnalogIn));
                    }
                    true
                }
                Op::Deactivate => {
                    if self.queue.is_empty() {
                        self.fatal();
                        return false;
                    }
                    if self.open {
                        self.open = false;
                        let id = self.queue.remove(0);
                        self.expected[id].push(PinCallback::Closed);
                    }
                    true
                }
                Op::Report(value) => {
                    if self.queue.is_empty() || !self.open {
                        self.fatal();
                        return false;
                    }
                    self.expected[self.queue[0]].push(PinCallback::Value(value));
                    true
                }
            }
        }
    }

    proptest! {
        /// The dispatcher's callback stream matches a straightforward
        /// reference model for any op sequence against one pin.
        #[test]
        fn matches_reference_model(ops in prop::collection::vec(op(), 0..40)) {
            const PIN: usize = 7;
            let dispatcher = helpers::connected_dispatcher();
            let mut claims: Vec<Arc<RecordingPin>> = Vec::new();
            let mut model = Model::default();

            for op in ops {
                let expect_ok = model.apply(op);
                let result = match op {
                    Op::Register => {
                        let claim = Arc::new(RecordingPin::default());
                        claims.push(claim.clone());
                        dispatcher.register_pin_claim(PIN, claim)
                    }
                    Op::Activate => {
                        dispatcher.process_event(DeviceEvent::SetPinAnalogIn { pin: PIN })
                    }
                    Op::Deactivate => dispatcher.process_event(DeviceEvent::SetPinDigitalIn {
                        pin: PIN,
                        pull: Pull::Floating,
                    }),
                    Op::Report(value) => {
                        dispatcher.process_event(DeviceEvent::AnalogInStatus {
                            pins: vec![PIN],
                            values: vec![value],
                        })
                    }
                };
                prop_assert_eq!(result.is_ok(), expect_ok);
            }

            prop_assert_eq!(model.link_closed, dispatcher.is_closed());
            for (claim, expected) in claims.iter().zip(&model.expected) {
                prop_assert_eq!(&claim.snapshot(), expected);
            }

            // At most one claim is ever open: the logs contain no second
            // Opened without an intervening Closed/Lost.
            for claim in &claims {
                let log = claim.snapshot();
                let mut open = false;
                for callback in log {
                    match callback {
                        PinCallback::Opened(_) => {
                            prop_assert!(!open);
                            open = true;
                        }
                        PinCallback::Closed | PinCallback::Lost => open = false,
                        PinCallback::Value(_) => prop_assert!(open),
                    }
                }
            }
        }
    }
}
