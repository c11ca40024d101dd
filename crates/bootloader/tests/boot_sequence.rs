//! End-to-end boot sequence on host mocks.
//!
//! The diverging mock launcher unwinds with the requested stack/entry pair
//! instead of jumping; everything the loader left behind (simulated RAM,
//! register logs) is inspected afterwards.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    missing_docs
)]

use std::mem::size_of;
use std::panic::{catch_unwind, AssertUnwindSafe};

use bootloader::boot::{run, Board};
use bootloader::error::BootError;
use bootloader::receiver::ReceiveError;
use bootloader::{HostApi, API_VERSION};
use platform::clock_config::SysclkSource;
use platform::config::{LOAD_REGION, TRANSFER_LEN};
use platform::gpio::{OutputType, PinMode, Port};
use platform::memory::{MemoryBus, SimulatedRam};
use platform::mocks::{
    Launch, MockClockController, MockGpioBank, MockLauncher, MockTickTimer, MockTransport,
    TickEvent, TransportEvent,
};
use platform::peripheral::SerialError;
use platform::systick::{Calibration, TickClock};
use platform::wait::Bounded;

/// STM32F0 CALIB: reference present, inexact, TENMS = 6000.
const F0_CALIB: u32 = 0x4000_1770;

/// Where the test image asks for the table, well clear of the payload.
const TABLE_AT: u32 = 0x2000_1F00;

unsafe extern "C" fn send(_: *const u8, _: usize) -> i32 {
    0
}
unsafe extern "C" fn recv(_: *mut u8, _: usize) -> i32 {
    0
}
extern "C" fn done() -> bool {
    true
}
extern "C" fn led(_: bool) {}

fn host_api() -> HostApi {
    HostApi {
        version: API_VERSION,
        uart_send: send,
        uart_recv: recv,
        uart_send_complete: done,
        uart_recv_complete: done,
        status_led: led,
    }
}

/// Slot word, then a recognisable body, zero-padded to the transfer length.
fn image() -> Vec<u8> {
    let mut image = TABLE_AT.to_le_bytes().to_vec();
    image.extend((0..0x100_u32).map(|i| (i % 253) as u8 | 1));
    image.resize(TRANSFER_LEN, 0);
    image
}

/// `RUST_LOG=debug cargo test -p bootloader --features trace` prints the
/// loader's own log lines next to the test output.
fn init_logging() {
    #[cfg(feature = "trace")]
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Rig {
    rcc: MockClockController,
    systick: MockTickTimer,
    leds: MockGpioBank,
    uart: MockTransport,
    ram: SimulatedRam,
}

impl Rig {
    fn new() -> Self {
        init_logging();
        let mut uart = MockTransport::new().with_chunk(64);
        uart.push_incoming(&image());
        Self {
            rcc: MockClockController::new().with_hse_delay(5).with_pll_delay(10),
            systick: MockTickTimer::new(Calibration::from_bits(F0_CALIB)),
            leds: MockGpioBank::new(Port::C),
            uart,
            ram: SimulatedRam::for_region(&LOAD_REGION),
        }
    }

    fn board(
        &mut self,
    ) -> Board<
        &mut MockClockController,
        &mut MockTickTimer,
        MockGpioBank,
        &mut MockTransport,
        &mut SimulatedRam,
    > {
        Board {
            rcc: &mut self.rcc,
            systick: &mut self.systick,
            leds: self.leds.clone(),
            uart: &mut self.uart,
            mem: &mut self.ram,
        }
    }
}

#[test]
fn reference_scenario_hands_over_at_0x20000402() {
    let mut rig = Rig::new();
    let mut launcher = MockLauncher::diverging();
    let mut wait = Bounded::new(10_000);

    let unwound = catch_unwind(AssertUnwindSafe(|| {
        let board = rig.board();
        run(board, &mut wait, host_api(), &mut launcher)
    }));

    let launch = *unwound.unwrap_err().downcast::<Launch>().unwrap();
    assert_eq!(
        launch,
        Launch {
            stack_top: 0x2000_2000,
            entry: 0x2000_0402,
        }
    );
    assert_eq!(launcher.launches(), [launch]);

    // Clock tree ended on the PLL with no protocol violations.
    assert_eq!(rig.rcc.active_source(), SysclkSource::Pll);
    assert!(rig.rcc.violations().is_empty());
    assert_eq!(rig.rcc.flash_latency(), Some(1));

    // SKEW set, so CALIB is not trusted: 48 MHz / 8 = 6 MHz, 60 counts per 10 us.
    assert_eq!(rig.systick.reload(), Some(59));
    assert_eq!(rig.systick.calibration_reads(), 1);
    assert_eq!(
        rig.systick.events().last(),
        Some(&TickEvent::EnableCounter)
    );
    assert!(rig
        .systick
        .events()
        .contains(&TickEvent::SetClockSource(TickClock::Reference)));

    // Both LEDs are push-pull outputs on a clocked port.
    assert!(rig.leds.clock_enabled());
    for pin in [8, 9] {
        assert_eq!(rig.leds.mode(pin), Some(PinMode::Output));
        assert_eq!(rig.leds.output_type(pin), Some(OutputType::PushPull));
    }

    // Receiver on, transmitter left off, the whole image consumed.
    assert!(rig.uart.rx_enabled());
    assert!(!rig.uart.tx_enabled());
    assert_eq!(rig.uart.received(), TRANSFER_LEN);
    assert_eq!(rig.uart.pending_incoming(), 0);
    assert!(rig
        .uart
        .events()
        .contains(&TransportEvent::StartReceive(TRANSFER_LEN)));

    // Image landed at 0x2000_0400, table copied where the slot pointed.
    let table_offset = (TABLE_AT - LOAD_REGION.image_base()) as usize;
    let landed = rig.ram.slice(LOAD_REGION.image_base(), TRANSFER_LEN).unwrap();
    assert_eq!(&landed[..table_offset], &image()[..table_offset]);
    assert_eq!(rig.ram.read_u32(LOAD_REGION.api_slot()), Some(TABLE_AT));
    assert_eq!(rig.ram.read_u32(TABLE_AT), Some(API_VERSION as u32));
    assert!(TABLE_AT as usize + size_of::<HostApi>() <= 0x2000_2000);

    // The loader's own kilobyte is never written.
    assert!(rig
        .ram
        .slice(LOAD_REGION.base(), 0x400)
        .unwrap()
        .iter()
        .all(|&b| b == 0));
}

#[test]
fn transport_rejection_aborts_before_receive() {
    let mut rig = Rig::new();
    rig.uart = MockTransport::new().with_setup_error(SerialError::InvalidInstance(2));
    let mut launcher = MockLauncher::new();

    let result = run(rig.board(), &mut Bounded::new(1_000), host_api(), &mut launcher);

    let err = result.unwrap_err();
    assert_eq!(err, BootError::Transport(SerialError::InvalidInstance(2)));
    assert_eq!(err.code(), SerialError::InvalidInstance(2).code());
    assert!(err.code() < 0);
    assert!(launcher.launches().is_empty());
    assert!(!rig
        .uart
        .events()
        .iter()
        .any(|e| matches!(e, TransportEvent::StartReceive(_))));
    // The tick source was already armed when the transport failed.
    assert_eq!(rig.systick.events().last(), Some(&TickEvent::EnableCounter));
}

#[test]
fn dead_crystal_aborts_before_anything_else() {
    let mut rig = Rig::new();
    rig.rcc = MockClockController::new().with_failed_hse();
    let mut launcher = MockLauncher::new();

    let err = run(rig.board(), &mut Bounded::new(100), host_api(), &mut launcher).unwrap_err();

    assert!(matches!(err, BootError::Clock(_)));
    assert_eq!(err.code(), -10);
    assert_eq!(rig.rcc.active_source(), SysclkSource::Hsi);
    assert!(rig.systick.events().is_empty());
    assert!(!rig.leds.clock_enabled());
    assert!(rig.uart.events().is_empty());
    assert!(launcher.launches().is_empty());
}

#[test]
fn short_transfer_never_hands_over() {
    let mut rig = Rig::new();
    let mut uart = MockTransport::new().with_chunk(64);
    uart.push_incoming(&image()[..TRANSFER_LEN - 1]);
    rig.uart = uart;
    let mut launcher = MockLauncher::new();

    let err = run(rig.board(), &mut Bounded::new(1_000), host_api(), &mut launcher).unwrap_err();

    assert!(matches!(err, BootError::Receive(ReceiveError::Incomplete(_))));
    assert_eq!(err.code(), -30);
    assert_eq!(rig.uart.received(), TRANSFER_LEN - 1);
    assert!(!rig.uart.rx_enabled());
    assert!(launcher.launches().is_empty());
    // No table was installed.
    assert_eq!(rig.ram.read_u32(TABLE_AT), Some(0));
}
