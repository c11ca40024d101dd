//! Mock implementations for testing
//!
//! Host-side stand-ins for every platform trait. Each mock records what was
//! done to it and, where the hardware has ordering rules, collects rule
//! breaks in `violations()` instead of panicking so tests can assert on
//! them.

#![cfg(any(test, feature = "std"))]
#![allow(clippy::arithmetic_side_effects)]

use core::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use crate::clock_config::{PllSource, SysclkSource};
use crate::gpio::{GpioBank, OutputType, PinMode, Port, PINS_PER_PORT};
use crate::launch::Launcher;
use crate::peripheral::{SerialError, Transport, TransportConfig};
use crate::rcc::{AhbPrescaler, ApbPrescaler, ClockController};
use crate::systick::{Calibration, TickClock, TickTimer};

// ─── Clock controller ────────────────────────────────────────────────────────

/// Observable clock controller event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// HSEON written
    EnableHse,
    /// First poll that saw HSERDY set
    HseReady,
    /// PREDIV written
    SetPrediv(u8),
    /// PLLSRC written
    SetPllSource(PllSource),
    /// PLLMUL written
    SetPllMul(u8),
    /// PLLON written
    EnablePll,
    /// First poll that saw PLLRDY set
    PllLocked,
    /// HPRE/PPRE written
    SetPrescalers(AhbPrescaler, ApbPrescaler),
    /// FLASH_ACR LATENCY written
    SetFlashLatency(u8),
    /// SW written
    SelectSysclk(SysclkSource),
    /// First poll that saw SWS report the requested source
    SwitchConfirmed(SysclkSource),
}

/// Mock RCC with configurable settle times.
#[derive(Debug)]
pub struct MockClockController {
    events: Vec<ClockEvent>,
    violations: Vec<&'static str>,
    hse_on: bool,
    hse_failed: bool,
    hse_delay: u32,
    hse_stable: bool,
    pll_on: bool,
    pll_delay: u32,
    pll_locked: bool,
    pll_source: PllSource,
    prediv: u8,
    pll_mul: u8,
    prescalers: (AhbPrescaler, ApbPrescaler),
    flash_latency: Option<u8>,
    requested: SysclkSource,
    active: SysclkSource,
    switch_delay: u32,
}

impl MockClockController {
    /// Controller in reset state whose flags assert on the first poll.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            violations: Vec::new(),
            hse_on: false,
            hse_failed: false,
            hse_delay: 0,
            hse_stable: false,
            pll_on: false,
            pll_delay: 0,
            pll_locked: false,
            pll_source: PllSource::HsiDiv2,
            prediv: 1,
            pll_mul: 2,
            prescalers: (AhbPrescaler::Div1, ApbPrescaler::Div1),
            flash_latency: None,
            requested: SysclkSource::Hsi,
            active: SysclkSource::Hsi,
            switch_delay: 0,
        }
    }

    /// HSERDY asserts after `polls` negative polls.
    pub fn with_hse_delay(mut self, polls: u32) -> Self {
        self.hse_delay = polls;
        self
    }

    /// PLLRDY asserts after `polls` negative polls.
    pub fn with_pll_delay(mut self, polls: u32) -> Self {
        self.pll_delay = polls;
        self
    }

    /// SWS follows SW after `polls` polls.
    pub fn with_switch_delay(mut self, polls: u32) -> Self {
        self.switch_delay = polls;
        self
    }

    /// The crystal never starts.
    pub fn with_failed_hse(mut self) -> Self {
        self.hse_failed = true;
        self
    }

    /// Event log in write order.
    pub fn events(&self) -> &[ClockEvent] {
        &self.events
    }

    /// Sequencing rules broken so far.
    pub fn violations(&self) -> &[&'static str] {
        &self.violations
    }

    /// Source currently driving SYSCLK.
    pub fn active_source(&self) -> SysclkSource {
        self.active
    }

    /// Programmed PREDIV.
    pub fn prediv(&self) -> u8 {
        self.prediv
    }

    /// Programmed PLLMUL.
    pub fn pll_mul(&self) -> u8 {
        self.pll_mul
    }

    /// Programmed bus prescalers.
    pub fn prescalers(&self) -> (AhbPrescaler, ApbPrescaler) {
        self.prescalers
    }

    /// Programmed flash wait states, if any.
    pub fn flash_latency(&self) -> Option<u8> {
        self.flash_latency
    }

    fn pll_config_write(&mut self, event: ClockEvent) {
        if self.pll_on {
            self.violations.push("PLL reconfigured while enabled");
        }
        self.events.push(event);
    }
}

impl Default for MockClockController {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockController for MockClockController {
    fn enable_hse(&mut self) {
        self.hse_on = true;
        self.events.push(ClockEvent::EnableHse);
    }

    fn hse_ready(&mut self) -> bool {
        if !self.hse_on || self.hse_failed {
            return false;
        }
        if self.hse_delay > 0 {
            self.hse_delay -= 1;
            return false;
        }
        if !self.hse_stable {
            self.hse_stable = true;
            self.events.push(ClockEvent::HseReady);
        }
        true
    }

    fn set_pll_prediv(&mut self, div: u8) {
        self.prediv = div;
        self.pll_config_write(ClockEvent::SetPrediv(div));
    }

    fn set_pll_source(&mut self, source: PllSource) {
        self.pll_source = source;
        self.pll_config_write(ClockEvent::SetPllSource(source));
    }

    fn set_pll_mul(&mut self, mul: u8) {
        self.pll_mul = mul;
        self.pll_config_write(ClockEvent::SetPllMul(mul));
    }

    fn enable_pll(&mut self) {
        if self.pll_source == PllSource::HsePrediv && !self.hse_stable {
            self.violations.push("PLL enabled before HSE was stable");
        }
        self.pll_on = true;
        self.events.push(ClockEvent::EnablePll);
    }

    fn pll_ready(&mut self) -> bool {
        if !self.pll_on {
            return false;
        }
        if self.pll_source == PllSource::HsePrediv && !self.hse_stable {
            return false;
        }
        if self.pll_delay > 0 {
            self.pll_delay -= 1;
            return false;
        }
        if !self.pll_locked {
            self.pll_locked = true;
            self.events.push(ClockEvent::PllLocked);
        }
        true
    }

    fn set_bus_prescalers(&mut self, ahb: AhbPrescaler, apb: ApbPrescaler) {
        self.prescalers = (ahb, apb);
        self.events.push(ClockEvent::SetPrescalers(ahb, apb));
    }

    fn set_flash_latency(&mut self, wait_states: u8) {
        self.flash_latency = Some(wait_states);
        self.events.push(ClockEvent::SetFlashLatency(wait_states));
    }

    fn select_sysclk(&mut self, source: SysclkSource) {
        if source == SysclkSource::Pll && !self.pll_locked {
            self.violations.push("PLL selected before lock");
        }
        if source == SysclkSource::Pll && self.flash_latency.is_none() {
            self.violations.push("PLL selected before flash latency was set");
        }
        self.requested = source;
        self.events.push(ClockEvent::SelectSysclk(source));
    }

    fn sysclk_status(&mut self) -> SysclkSource {
        if self.active == self.requested {
            return self.active;
        }
        let source_ready = match self.requested {
            SysclkSource::Hsi => true,
            SysclkSource::Hse => self.hse_stable,
            SysclkSource::Pll => self.pll_locked,
        };
        if !source_ready {
            return self.active;
        }
        if self.switch_delay > 0 {
            self.switch_delay -= 1;
            return self.active;
        }
        self.active = self.requested;
        self.events.push(ClockEvent::SwitchConfirmed(self.active));
        self.active
    }
}

// ─── System timer ────────────────────────────────────────────────────────────

/// Observable SysTick write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickEvent {
    /// RVR written
    SetReload(u32),
    /// CVR cleared
    ClearCurrent,
    /// CLKSOURCE written
    SetClockSource(TickClock),
    /// TICKINT set
    EnableInterrupt,
    /// ENABLE set
    EnableCounter,
}

/// Mock SysTick with a fixed CALIB word.
#[derive(Debug)]
pub struct MockTickTimer {
    calibration: Calibration,
    calibration_reads: u32,
    events: Vec<TickEvent>,
}

impl MockTickTimer {
    /// Timer whose CALIB register reads back `calibration`.
    pub fn new(calibration: Calibration) -> Self {
        Self {
            calibration,
            calibration_reads: 0,
            events: Vec::new(),
        }
    }

    /// Write log in order.
    pub fn events(&self) -> &[TickEvent] {
        &self.events
    }

    /// How many times CALIB was read.
    pub fn calibration_reads(&self) -> u32 {
        self.calibration_reads
    }

    /// Last value written to RVR.
    pub fn reload(&self) -> Option<u32> {
        self.events.iter().rev().find_map(|e| match e {
            TickEvent::SetReload(r) => Some(*r),
            _ => None,
        })
    }
}

impl TickTimer for MockTickTimer {
    fn calibration(&mut self) -> Calibration {
        self.calibration_reads += 1;
        self.calibration
    }

    fn set_reload(&mut self, reload: u32) {
        self.events.push(TickEvent::SetReload(reload));
    }

    fn clear_current(&mut self) {
        self.events.push(TickEvent::ClearCurrent);
    }

    fn set_clock_source(&mut self, clock: TickClock) {
        self.events.push(TickEvent::SetClockSource(clock));
    }

    fn enable_interrupt(&mut self) {
        self.events.push(TickEvent::EnableInterrupt);
    }

    fn enable_counter(&mut self) {
        self.events.push(TickEvent::EnableCounter);
    }
}

// ─── GPIO ────────────────────────────────────────────────────────────────────

/// Observable GPIO bank write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioEvent {
    /// IOPxEN set
    EnableClock,
    /// MODER written
    SetMode(u8, PinMode),
    /// OTYPER written
    SetOutputType(u8, OutputType),
    /// BSRR set half
    Set(u8),
    /// BSRR reset half
    Reset(u8),
}

#[derive(Debug)]
struct GpioState {
    clock_enabled: bool,
    modes: [PinMode; PINS_PER_PORT as usize],
    output_types: [OutputType; PINS_PER_PORT as usize],
    odr: u16,
    events: Vec<GpioEvent>,
    violations: Vec<&'static str>,
}

/// Mock GPIO port.
///
/// Cloning yields another handle onto the same port, so a test can keep one
/// handle while pins built from another are moved into the code under test.
#[derive(Debug, Clone)]
pub struct MockGpioBank {
    port: Port,
    state: Rc<RefCell<GpioState>>,
}

impl MockGpioBank {
    /// Port in reset state: clock gated, every pin an input.
    pub fn new(port: Port) -> Self {
        Self {
            port,
            state: Rc::new(RefCell::new(GpioState {
                clock_enabled: false,
                modes: [PinMode::Input; PINS_PER_PORT as usize],
                output_types: [OutputType::PushPull; PINS_PER_PORT as usize],
                odr: 0,
                events: Vec::new(),
                violations: Vec::new(),
            })),
        }
    }

    /// Whether the port clock is on.
    pub fn clock_enabled(&self) -> bool {
        self.state.borrow().clock_enabled
    }

    /// Current mode of `pin`.
    pub fn mode(&self, pin: u8) -> Option<PinMode> {
        self.state.borrow().modes.get(usize::from(pin)).copied()
    }

    /// Current output type of `pin`.
    pub fn output_type(&self, pin: u8) -> Option<OutputType> {
        self.state
            .borrow()
            .output_types
            .get(usize::from(pin))
            .copied()
    }

    /// Output data bit of `pin`.
    pub fn is_high(&self, pin: u8) -> bool {
        u32::from(self.state.borrow().odr)
            .checked_shr(u32::from(pin))
            .is_some_and(|bits| bits & 1 == 1)
    }

    /// Write log in order.
    pub fn events(&self) -> Vec<GpioEvent> {
        self.state.borrow().events.clone()
    }

    /// Rules broken so far.
    pub fn violations(&self) -> Vec<&'static str> {
        self.state.borrow().violations.clone()
    }

    fn record(&self, pin: Option<u8>, event: GpioEvent) -> core::cell::RefMut<'_, GpioState> {
        let mut state = self.state.borrow_mut();
        if !state.clock_enabled {
            state.violations.push("GPIO access before port clock enable");
        }
        if pin.is_some_and(|p| p >= PINS_PER_PORT) {
            state.violations.push("pin number out of range");
        }
        state.events.push(event);
        state
    }
}

impl GpioBank for MockGpioBank {
    fn port(&self) -> Port {
        self.port
    }

    fn enable_clock(&mut self) {
        let mut state = self.state.borrow_mut();
        state.clock_enabled = true;
        state.events.push(GpioEvent::EnableClock);
    }

    fn set_mode(&mut self, pin: u8, mode: PinMode) {
        let mut state = self.record(Some(pin), GpioEvent::SetMode(pin, mode));
        if let Some(slot) = state.modes.get_mut(usize::from(pin)) {
            *slot = mode;
        }
    }

    fn set_output_type(&mut self, pin: u8, output: OutputType) {
        let mut state = self.record(Some(pin), GpioEvent::SetOutputType(pin, output));
        if let Some(slot) = state.output_types.get_mut(usize::from(pin)) {
            *slot = output;
        }
    }

    fn set_pin(&mut self, pin: u8) {
        let mut state = self.record(Some(pin), GpioEvent::Set(pin));
        if let Some(bit) = 1u16.checked_shl(u32::from(pin)) {
            state.odr |= bit;
        }
    }

    fn reset_pin(&mut self, pin: u8) {
        let mut state = self.record(Some(pin), GpioEvent::Reset(pin));
        if let Some(bit) = 1u16.checked_shl(u32::from(pin)) {
            state.odr &= !bit;
        }
    }
}

// ─── Serial transport ────────────────────────────────────────────────────────

/// Observable transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// `setup` accepted
    Setup,
    /// Receiver enabled
    EnableReceive,
    /// Receiver disabled
    DisableReceive,
    /// Transmitter enabled
    EnableTransmit,
    /// Transmitter disabled
    DisableTransmit,
    /// Receive armed for this many bytes
    StartReceive(usize),
    /// Send armed for this many bytes
    StartSend(usize),
}

#[derive(Debug)]
struct Armed<P> {
    buffer: P,
    len: usize,
    done: usize,
}

/// Mock serial link fed from an in-memory byte queue.
///
/// Each completion query moves at most `chunk` bytes, so a test sees the
/// transfer progress over many polls like a real UART.
#[derive(Debug)]
pub struct MockTransport {
    config: Option<TransportConfig>,
    setup_error: Option<SerialError>,
    rx_enabled: bool,
    tx_enabled: bool,
    rx: Option<Armed<*mut u8>>,
    tx: Option<Armed<*const u8>>,
    rx_delivered: usize,
    incoming: VecDeque<u8>,
    sent: Vec<u8>,
    chunk: usize,
    receive_polls: u32,
    events: Vec<TransportEvent>,
}

impl MockTransport {
    /// Unconfigured link delivering one byte per poll.
    pub fn new() -> Self {
        Self {
            config: None,
            setup_error: None,
            rx_enabled: false,
            tx_enabled: false,
            rx: None,
            tx: None,
            rx_delivered: 0,
            incoming: VecDeque::new(),
            sent: Vec::new(),
            chunk: 1,
            receive_polls: 0,
            events: Vec::new(),
        }
    }

    /// Move up to `bytes` per completion query (at least one).
    pub fn with_chunk(mut self, bytes: usize) -> Self {
        self.chunk = bytes.max(1);
        self
    }

    /// Make `setup` fail with `error` regardless of configuration.
    pub fn with_setup_error(mut self, error: SerialError) -> Self {
        self.setup_error = Some(error);
        self
    }

    /// Queue bytes "on the wire" for the receiver.
    pub fn push_incoming(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes.iter().copied());
    }

    /// Bytes still waiting on the wire.
    pub fn pending_incoming(&self) -> usize {
        self.incoming.len()
    }

    /// Bytes delivered into the last armed receive buffer. Survives
    /// `disable_receive`, so an aborted transfer can still be measured.
    pub fn received(&self) -> usize {
        self.rx_delivered
    }

    /// Bytes the transmitter has shifted out.
    pub fn sent(&self) -> &[u8] {
        &self.sent
    }

    /// Number of `is_receive_complete` queries.
    pub fn receive_polls(&self) -> u32 {
        self.receive_polls
    }

    /// Accepted configuration.
    pub fn config(&self) -> Option<&TransportConfig> {
        self.config.as_ref()
    }

    /// Receiver state.
    pub fn rx_enabled(&self) -> bool {
        self.rx_enabled
    }

    /// Transmitter state.
    pub fn tx_enabled(&self) -> bool {
        self.tx_enabled
    }

    /// Call log in order.
    pub fn events(&self) -> &[TransportEvent] {
        &self.events
    }

    fn configured(&self) -> Result<(), SerialError> {
        if self.config.is_some() {
            Ok(())
        } else {
            Err(SerialError::NotConfigured)
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn setup(&mut self, config: &TransportConfig) -> Result<(), SerialError> {
        if let Some(error) = self.setup_error {
            return Err(error);
        }
        config.validate()?;
        self.config = Some(*config);
        self.rx_enabled = false;
        self.tx_enabled = false;
        self.events.push(TransportEvent::Setup);
        Ok(())
    }

    fn enable_receive(&mut self) -> Result<(), SerialError> {
        self.configured()?;
        self.rx_enabled = true;
        self.events.push(TransportEvent::EnableReceive);
        Ok(())
    }

    fn disable_receive(&mut self) -> Result<(), SerialError> {
        self.configured()?;
        self.rx_enabled = false;
        self.rx = None;
        self.events.push(TransportEvent::DisableReceive);
        Ok(())
    }

    fn enable_transmit(&mut self) -> Result<(), SerialError> {
        self.configured()?;
        self.tx_enabled = true;
        self.events.push(TransportEvent::EnableTransmit);
        Ok(())
    }

    fn disable_transmit(&mut self) -> Result<(), SerialError> {
        self.configured()?;
        self.tx_enabled = false;
        self.tx = None;
        self.events.push(TransportEvent::DisableTransmit);
        Ok(())
    }

    unsafe fn start_receive(&mut self, buffer: *mut u8, len: usize) -> Result<(), SerialError> {
        self.configured()?;
        if !self.rx_enabled {
            return Err(SerialError::DirectionDisabled);
        }
        if len == 0 {
            return Err(SerialError::ZeroLength);
        }
        if self.rx.as_ref().is_some_and(|rx| rx.done < rx.len) {
            return Err(SerialError::Busy);
        }
        self.rx = Some(Armed {
            buffer,
            len,
            done: 0,
        });
        self.rx_delivered = 0;
        self.events.push(TransportEvent::StartReceive(len));
        Ok(())
    }

    unsafe fn start_send(&mut self, buffer: *const u8, len: usize) -> Result<(), SerialError> {
        self.configured()?;
        if !self.tx_enabled {
            return Err(SerialError::DirectionDisabled);
        }
        if len == 0 {
            return Err(SerialError::ZeroLength);
        }
        if self.tx.as_ref().is_some_and(|tx| tx.done < tx.len) {
            return Err(SerialError::Busy);
        }
        self.tx = Some(Armed {
            buffer,
            len,
            done: 0,
        });
        self.events.push(TransportEvent::StartSend(len));
        Ok(())
    }

    fn is_receive_complete(&mut self) -> bool {
        self.receive_polls += 1;
        let Some(rx) = self.rx.as_mut() else {
            return true;
        };
        let mut moved = 0;
        while moved < self.chunk && rx.done < rx.len {
            let Some(byte) = self.incoming.pop_front() else {
                break;
            };
            // SAFETY: `start_receive`'s contract keeps `buffer` valid for
            // `len` writes until completion, and `done < len`.
            unsafe { rx.buffer.add(rx.done).write(byte) };
            rx.done += 1;
            moved += 1;
        }
        self.rx_delivered = rx.done;
        rx.done == rx.len
    }

    fn is_send_complete(&mut self) -> bool {
        let Some(tx) = self.tx.as_mut() else {
            return true;
        };
        let mut moved = 0;
        while moved < self.chunk && tx.done < tx.len {
            // SAFETY: `start_send`'s contract keeps `buffer` valid for `len`
            // reads until completion, and `done < len`.
            let byte = unsafe { tx.buffer.add(tx.done).read() };
            self.sent.push(byte);
            tx.done += 1;
            moved += 1;
        }
        tx.done == tx.len
    }
}

// ─── Launcher ────────────────────────────────────────────────────────────────

/// A recorded control transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Launch {
    /// Requested main stack pointer
    pub stack_top: u32,
    /// Requested branch target
    pub entry: u32,
}

/// Mock launcher.
///
/// By default it records and returns. A diverging launcher unwinds with the
/// [`Launch`] as panic payload, standing in for "control never comes back";
/// catch it with `std::panic::catch_unwind` and downcast.
#[derive(Debug, Default)]
pub struct MockLauncher {
    launches: Vec<Launch>,
    diverge: bool,
}

impl MockLauncher {
    /// Launcher that records and returns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Launcher that records and unwinds.
    pub fn diverging() -> Self {
        Self {
            launches: Vec::new(),
            diverge: true,
        }
    }

    /// Every launch performed.
    pub fn launches(&self) -> &[Launch] {
        &self.launches
    }
}

impl Launcher for MockLauncher {
    unsafe fn launch(&mut self, stack_top: u32, entry: u32) {
        let launch = Launch { stack_top, entry };
        self.launches.push(launch);
        if self.diverge {
            std::panic::panic_any(launch);
        }
    }
}
