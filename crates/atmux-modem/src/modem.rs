//! The modem driver: bring-up, network attach, and socket operations.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use atmux_core::config::Config;
use atmux_core::constants::SEND_CHUNK_SIZE;
use atmux_core::error::{ErrorKind, Result};
use atmux_core::time::Clock;
use atmux_core::transport::{PowerPins, SerialPort};
use atmux_engine::{CommandEngine, ModemEvent};
use atmux_protocol::{command, pattern, Capture, NetworkTime, Protocol, StackState};
use crossbeam_channel::Receiver;

use crate::link_state::LinkState;
use crate::session::{self, SessionTable, SocketSession};

/// Battery charge report from the modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryStatus {
    /// Charging state code: 0 not charging, 1 charging, 2 charge done.
    pub status: u8,
    /// Remaining capacity in percent.
    pub level: u8,
    /// Battery voltage in millivolts.
    pub voltage_mv: u32,
}

/// Driver for a multiplexing cellular modem on a serial command channel.
///
/// Operations are synchronous: each one transmits commands and blocks for
/// the matching responses under the budgets in [`Config`]. Asynchronous
/// activity observed meanwhile is surfaced through [`events`](Self::events)
/// and the packet queue rather than being lost.
pub struct Modem<T: SerialPort, P: PowerPins> {
    engine: CommandEngine<T>,
    power: P,
    clock: Arc<dyn Clock>,
    config: Config,
    link: LinkState,
    sessions: SessionTable,
}

impl<T: SerialPort, P: PowerPins> Modem<T, P> {
    /// Creates a driver over the given transport and control pins.
    pub fn new(port: T, power: P, config: Config, clock: Arc<dyn Clock>) -> Self {
        let engine = CommandEngine::new(port, config.clone(), Arc::clone(&clock));
        Self {
            engine,
            power,
            clock,
            config,
            link: LinkState::Unpowered,
            sessions: SessionTable::new(),
        }
    }

    /// Returns the current link bring-up state.
    pub fn link_state(&self) -> LinkState {
        self.link
    }

    /// Returns the receive side of the asynchronous event channel.
    pub fn events(&self) -> &Receiver<ModemEvent> {
        self.engine.events()
    }

    /// Returns the session open on `id`, if any.
    pub fn session(&self, id: u8) -> Option<&SocketSession> {
        self.sessions.get(id)
    }

    /// Raises the power key and brings the modem to a configured state.
    pub fn power_up(&mut self) -> Result<()> {
        self.power.set_power(true);
        self.reset()?;
        self.engine.transmit(command::multiplex())?;
        self.engine.expect("OK", self.config.line_timeout)?;
        Ok(())
    }

    /// Pulses the reset line and confirms liveness with probes, then turns
    /// echo off and enables notices and verbose errors.
    ///
    /// Probing accepts either the echoed probe or its affirmative reply,
    /// since echo is still on right after a reset.
    pub fn reset(&mut self) -> Result<()> {
        self.link = LinkState::Resetting;
        let mut alive = false;
        for attempt in 0..self.config.reset_attempts {
            self.pulse_reset();
            for _ in 0..self.config.probe_attempts {
                if self.probe() {
                    alive = true;
                    break;
                }
            }
            if alive {
                break;
            }
            debug!("reset attempt {} got no answer", attempt);
        }
        if !alive {
            self.link = LinkState::Failed;
            return Err(ErrorKind::Timeout);
        }
        self.link = LinkState::ModemAlive;
        self.configure()?;
        self.link = LinkState::Configured;
        Ok(())
    }

    /// Registers, attaches GPRS, and activates a context on `apn`.
    ///
    /// The whole sequence is retried as a unit; partial progress from a
    /// failed round is discarded.
    pub fn connect(&mut self, apn: &str, user: &str, password: &str) -> Result<()> {
        let mut last = ErrorKind::Timeout;
        for round in 0..self.config.connect_attempts {
            match self.try_connect(apn, user, password) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!("connect round {} failed: {}", round, err);
                    last = err;
                }
            }
        }
        self.link = LinkState::Failed;
        Err(last)
    }

    /// Deactivates the data context, dropping back to the configured state.
    pub fn disconnect(&mut self) -> Result<()> {
        self.engine.transmit(command::deactivate_pdp())?;
        self.engine.expect("DEACT OK", self.config.misc_timeout)?;
        if self.link.is_attached() {
            self.link = LinkState::Configured;
        }
        Ok(())
    }

    /// Returns true when the modem answers a probe.
    pub fn is_alive(&mut self) -> bool {
        self.engine
            .transmit(command::probe())
            .and_then(|()| self.engine.expect("OK", self.config.line_timeout))
            .is_ok()
    }

    /// Queries GPRS attach state.
    pub fn check_gprs(&mut self) -> Result<bool> {
        self.engine.transmit(command::gprs_query())?;
        let fields = self.engine.scan("+CGATT: %d", self.config.line_timeout)?;
        self.engine.expect("OK", self.config.line_timeout)?;
        match fields.first().and_then(Capture::as_int) {
            Some(state) => Ok(state == 1),
            None => Err(ErrorKind::Mismatch {
                expected: "+CGATT: <state>".to_owned(),
                received: String::new(),
            }),
        }
    }

    /// Queries the local IP address assigned to the context.
    ///
    /// The address line is the entire response; no `OK` follows.
    pub fn ip_address(&mut self) -> Result<String> {
        self.engine.transmit(command::local_ip())?;
        let fields = self.engine.scan("%s", self.config.line_timeout)?;
        match fields.into_iter().next() {
            Some(Capture::Text(addr)) if addr.contains('.') => Ok(addr),
            Some(Capture::Text(other)) => Err(ErrorKind::Mismatch {
                expected: "dotted address".to_owned(),
                received: other,
            }),
            _ => Err(ErrorKind::Timeout),
        }
    }

    /// Returns true when the context is up and holds an address.
    pub fn is_connected(&mut self) -> bool {
        self.ip_address().is_ok()
    }

    /// Queries the device IMEI.
    pub fn imei(&mut self) -> Result<String> {
        self.engine.transmit(command::imei())?;
        let fields = self.engine.scan("%s", self.config.line_timeout)?;
        self.engine.expect("OK", self.config.line_timeout)?;
        match fields.into_iter().next() {
            Some(Capture::Text(imei)) => Ok(imei),
            _ => Err(ErrorKind::Mismatch {
                expected: "imei digits".to_owned(),
                received: String::new(),
            }),
        }
    }

    /// Queries battery charge status.
    pub fn battery(&mut self) -> Result<BatteryStatus> {
        self.engine.transmit(command::battery())?;
        let fields = self
            .engine
            .expect_scan("+CBC: %d,%d,%d", self.config.line_timeout)?;
        self.engine.expect("OK", self.config.line_timeout)?;
        let status = fields.first().and_then(Capture::as_int);
        let level = fields.get(1).and_then(Capture::as_int);
        let voltage = fields.get(2).and_then(Capture::as_int);
        match (status, level, voltage) {
            (Some(status), Some(level), Some(voltage)) => Ok(BatteryStatus {
                status: u8::try_from(status).unwrap_or(0),
                level: u8::try_from(level).unwrap_or(0),
                voltage_mv: u32::try_from(voltage).unwrap_or(0),
            }),
            _ => Err(ErrorKind::Mismatch {
                expected: "+CBC: <status>,<level>,<voltage>".to_owned(),
                received: String::new(),
            }),
        }
    }

    /// Enables network time banners and requests an NTP synchronization.
    pub fn request_time_sync(&mut self) -> Result<()> {
        self.engine.transmit(command::network_time_reporting())?;
        self.engine.expect("OK", self.config.line_timeout)?;
        self.engine.transmit(command::timezone_update())?;
        self.engine.expect("OK", self.config.line_timeout)?;
        self.register_network()?;
        let request = command::ntp_sync(&self.config.ntp_server);
        self.engine.transmit(&request)?;
        self.engine.expect("OK", self.config.command_timeout)?;
        Ok(())
    }

    /// Requests an orderly power down, then drops the power key.
    ///
    /// The shutdown banner doubles as an unsolicited notice, so the filter
    /// consumes it during the wait; completion is observed on the event
    /// channel rather than as a response line. The wait reads through the
    /// line framer, so a banner trickling in across poll windows still
    /// counts.
    pub fn power_down(&mut self) -> Result<()> {
        self.engine.transmit(command::power_down())?;
        self.await_event(self.config.command_timeout, |event| {
            matches!(event, ModemEvent::PowerDown).then_some(())
        })?;
        self.power.set_power(false);
        self.link = LinkState::Unpowered;
        Ok(())
    }

    /// Waits for a network time banner and decodes it.
    ///
    /// The banner is pushed by the network after
    /// [`request_time_sync`](Self::request_time_sync); an undecodable banner
    /// is skipped and the wait continues.
    pub fn network_time(&mut self, timeout: Duration) -> Result<NetworkTime> {
        self.await_event(timeout, |event| match event {
            ModemEvent::NetworkTime(line) => NetworkTime::parse(line),
            _ => None,
        })
    }

    /// Blocks until `accept` maps an observed event to a value.
    ///
    /// Keeps reading through the response path so banners are assembled as
    /// whole lines and routed through the notice filter; stray response
    /// lines seen on the way are discarded.
    fn await_event<R>(
        &mut self,
        timeout: Duration,
        accept: impl Fn(&ModemEvent) -> Option<R>,
    ) -> Result<R> {
        let deadline = self.clock.now() + timeout;
        loop {
            while let Ok(event) = self.engine.events().try_recv() {
                if let Some(value) = accept(&event) {
                    return Ok(value);
                }
                debug!("event during wait: {:?}", event);
            }
            let Some(remaining) = deadline.checked_duration_since(self.clock.now()) else {
                return Err(ErrorKind::Timeout);
            };
            if remaining.is_zero() {
                return Err(ErrorKind::Timeout);
            }
            match self
                .engine
                .read_response(remaining.min(self.config.line_timeout))
            {
                Ok(line) => debug!("line during wait: '{}'", line),
                Err(ErrorKind::Timeout) => {}
                Err(err) => return Err(err),
            }
        }
    }

    /// Queries the TCP/IP stack state.
    pub fn stack_state(&mut self) -> Result<StackState> {
        self.engine.transmit(command::stack_state())?;
        self.engine.expect("OK", self.config.line_timeout)?;
        let line = self.engine.read_response(self.config.line_timeout)?;
        line.strip_prefix("STATE: ")
            .and_then(StackState::parse)
            .ok_or(ErrorKind::Mismatch {
                expected: "STATE: <state>".to_owned(),
                received: line,
            })
    }

    /// Reserves and returns the lowest free connection identifier.
    ///
    /// The reservation holds until the id is opened or released, so two
    /// consecutive calls hand out distinct ids.
    pub fn open_session(&mut self) -> Result<u8> {
        self.sessions.allocate()
    }

    /// Releases `id`, whether reserved or open, without touching the wire.
    pub fn release_session(&mut self, id: u8) -> Result<()> {
        session::validate_id(id)?;
        self.sessions.release(id);
        Ok(())
    }

    /// Opens a session on `id` to `addr:port`.
    ///
    /// The open command is only transmitted when the stack reports a state
    /// safe to open from; an in-flight or closing previous session blocks
    /// the attempt and the query is retried on the next round.
    pub fn open(&mut self, id: u8, protocol: Protocol, addr: &str, port: u16) -> Result<()> {
        session::validate_id(id)?;
        let mut last = ErrorKind::Timeout;
        for attempt in 0..self.config.open_attempts {
            match self.try_open(id, protocol, addr, port) {
                Ok(()) => {
                    self.sessions.open(id, protocol, addr, port);
                    self.link = LinkState::SessionActive;
                    return Ok(());
                }
                Err(err) => {
                    debug!("open attempt {} on id {} failed: {}", attempt, id, err);
                    last = err;
                }
            }
        }
        Err(last)
    }

    /// Sends `data` on `id`, chunked to the per-transmission limit.
    ///
    /// Each chunk runs the full handshake: announce the length, wait for
    /// the `>` cursor, write the raw bytes, and wait for `SEND OK`.
    pub fn send(&mut self, id: u8, data: &[u8]) -> Result<()> {
        session::validate_id(id)?;
        self.engine.transmit(command::service_mode())?;
        if let Err(err) = self.engine.expect("OK", self.config.command_timeout) {
            // Some firmware revisions stay silent here; the send handshake
            // itself decides success.
            debug!("service mode ack missing: {}", err);
        }
        for chunk in data.chunks(SEND_CHUNK_SIZE) {
            self.send_chunk(id, chunk)?;
        }
        Ok(())
    }

    /// Receives up to `buffer.len()` bytes queued for `id`.
    ///
    /// Queued payloads are served first. Only when nothing is queued for
    /// `id` does the call wait for more input, consuming notices and
    /// watching for a peer-close announcement. Returns the byte count
    /// copied into `buffer`; an empty buffer reads nothing and returns
    /// zero at once.
    pub fn recv(&mut self, id: u8, buffer: &mut [u8], timeout: Duration) -> Result<usize> {
        session::validate_id(id)?;
        if buffer.is_empty() {
            return Ok(0);
        }
        let deadline = self.clock.now() + timeout;
        loop {
            if let Some(data) = self.engine.take_packet(id, buffer.len()) {
                buffer[..data.len()].copy_from_slice(&data);
                return Ok(data.len());
            }
            if self.sessions.is_peer_closed(id) {
                return Err(ErrorKind::Closed(id));
            }
            let Some(remaining) = deadline.checked_duration_since(self.clock.now()) else {
                return Err(ErrorKind::Timeout);
            };
            if remaining.is_zero() {
                return Err(ErrorKind::Timeout);
            }
            let wait = remaining.min(self.config.line_timeout);
            match self.engine.wait_for_packet(id, wait) {
                Ok(None) => {}
                Ok(Some(line)) => self.note_peer_close(id, &line),
                Err(ErrorKind::Timeout) => {}
                Err(err) => return Err(err),
            }
        }
    }

    /// Receives with the default budget from the configuration.
    pub fn recv_default(&mut self, id: u8, buffer: &mut [u8]) -> Result<usize> {
        self.recv(id, buffer, self.config.recv_timeout)
    }

    /// Closes the session on `id`.
    ///
    /// Closing an id that is not open is a defined failure: the close
    /// command goes unanswered and the attempt budget runs out.
    pub fn close(&mut self, id: u8) -> Result<()> {
        session::validate_id(id)?;
        let mut last = ErrorKind::Timeout;
        for _ in 0..self.config.close_attempts {
            self.engine.transmit(&command::close(id))?;
            match self
                .engine
                .expect_scan("%d, CLOSE OK", self.config.command_timeout)
            {
                Ok(fields) if capture_id(&fields) == Some(id) => {
                    self.sessions.release(id);
                    if self.link == LinkState::SessionActive && !self.sessions.any_open() {
                        self.link = LinkState::Attached;
                    }
                    return Ok(());
                }
                Ok(fields) => {
                    last = ErrorKind::Mismatch {
                        expected: format!("{}, CLOSE OK", id),
                        received: format!("{:?}", fields),
                    };
                }
                Err(err) => last = err,
            }
        }
        Err(last)
    }

    fn try_connect(&mut self, apn: &str, user: &str, password: &str) -> Result<()> {
        self.register_network()?;
        self.attach()?;
        self.configure_apn(apn, user, password)?;
        self.link = LinkState::Attached;
        Ok(())
    }

    /// Polls registration status until the network accepts us.
    ///
    /// The poll succeeds immediately when the first answer is positive; the
    /// inter-poll delay only runs between attempts.
    fn register_network(&mut self) -> Result<()> {
        for attempt in 0..self.config.registration_attempts {
            if attempt > 0 {
                self.clock.sleep(self.config.registration_interval);
            }
            match self.poll_registration() {
                Ok(true) => {
                    self.link = LinkState::NetworkRegistered;
                    return Ok(());
                }
                Ok(false) => {}
                Err(err) => debug!("registration poll failed: {}", err),
            }
        }
        Err(ErrorKind::Timeout)
    }

    fn poll_registration(&mut self) -> Result<bool> {
        self.engine.transmit(command::registration_query())?;
        let fields = self
            .engine
            .scan("+CREG: %d,%d", self.config.line_timeout)?;
        self.engine.expect("OK", self.config.connect_timeout)?;
        let registered = fields
            .get(1)
            .and_then(Capture::as_int)
            .and_then(atmux_protocol::RegistrationStatus::from_code)
            .is_some_and(|status| status.is_registered());
        Ok(registered)
    }

    /// Clears any stale context, then attaches GPRS.
    fn attach(&mut self) -> Result<()> {
        self.engine.transmit(command::deactivate_pdp())?;
        self.engine.expect("DEACT OK", self.config.line_timeout)?;
        for attempt in 0..self.config.attach_attempts {
            if attempt > 0 {
                self.clock.sleep(self.config.attach_interval);
            }
            self.engine.transmit(command::attach_gprs())?;
            match self.engine.expect("OK", self.config.command_timeout) {
                Ok(()) => return Ok(()),
                Err(err) => debug!("attach attempt {} failed: {}", attempt, err),
            }
        }
        Err(ErrorKind::Timeout)
    }

    /// Configures credentials and activates the context. Any failure aborts
    /// the chain immediately.
    fn configure_apn(&mut self, apn: &str, user: &str, password: &str) -> Result<()> {
        self.engine.transmit(command::foreground_context())?;
        self.engine.expect("OK", self.config.line_timeout)?;
        let credentials = command::apn_credentials(apn, user, password);
        self.engine.transmit(&credentials)?;
        self.engine.expect("OK", self.config.line_timeout)?;
        self.engine.transmit(command::register_tcpip())?;
        self.engine.expect("OK", self.config.line_timeout)?;
        self.engine.transmit(command::activate_context())?;
        self.engine.expect("OK", self.config.command_timeout)?;
        Ok(())
    }

    fn try_open(&mut self, id: u8, protocol: Protocol, addr: &str, port: u16) -> Result<()> {
        let state = self.stack_state()?;
        if !state.is_safe_to_open() {
            return Err(ErrorKind::Mismatch {
                expected: "idle TCP/IP stack".to_owned(),
                received: format!("{:?}", state),
            });
        }
        self.engine.transmit(command::dns_mode())?;
        self.engine.expect("OK", self.config.line_timeout)?;
        let open = command::open(id, protocol, addr, port);
        self.engine.transmit(&open)?;
        self.engine.expect("OK", self.config.command_timeout)?;
        let fields = self
            .engine
            .expect_scan("%d, CONNECT OK", self.config.connect_timeout)?;
        if capture_id(&fields) == Some(id) {
            Ok(())
        } else {
            Err(ErrorKind::Mismatch {
                expected: format!("{}, CONNECT OK", id),
                received: format!("{:?}", fields),
            })
        }
    }

    fn send_chunk(&mut self, id: u8, chunk: &[u8]) -> Result<()> {
        let mut last = ErrorKind::Timeout;
        for _ in 0..self.config.send_attempts {
            match self.try_send_chunk(id, chunk) {
                Ok(()) => return Ok(()),
                Err(err) => last = err,
            }
        }
        Err(last)
    }

    fn try_send_chunk(&mut self, id: u8, chunk: &[u8]) -> Result<()> {
        let announce = command::begin_send(id, chunk.len());
        self.engine.transmit(&announce)?;
        self.engine.expect_prompt(self.config.command_timeout)?;
        self.engine.write_raw(chunk)?;
        self.engine.expect("SEND OK", self.config.send_timeout)?;
        Ok(())
    }

    /// Interprets a stray line seen while waiting for data. A close
    /// announcement for our id marks the session; everything else is noise.
    fn note_peer_close(&mut self, id: u8, line: &str) {
        if let Some(fields) = pattern::scan_all(line, "%d, CLOSED") {
            if capture_id(&fields) == Some(id) {
                debug!("peer closed connection {}", id);
                self.sessions.mark_peer_closed(id);
            }
        }
    }

    fn pulse_reset(&mut self) {
        self.power.set_reset(true);
        self.clock.sleep(self.config.reset_pulse);
        self.power.set_reset(false);
        self.clock.sleep(self.config.reset_pulse);
        self.power.set_reset(true);
        self.clock.sleep(self.config.reset_settle);
    }

    fn probe(&mut self) -> bool {
        if self.engine.transmit(command::probe()).is_err() {
            return false;
        }
        match self.engine.scan("%2s", self.config.line_timeout) {
            Ok(fields) => matches!(
                fields.first(),
                Some(Capture::Text(word)) if word == "AT" || word == "OK"
            ),
            Err(_) => false,
        }
    }

    /// Turns echo off and enables notices. The first echo-off answer still
    /// carries the echoed command, so it is sent twice.
    fn configure(&mut self) -> Result<()> {
        self.engine.transmit(command::echo_off())?;
        self.engine.expect("ATE0", self.config.line_timeout)?;
        self.engine.expect("OK", self.config.line_timeout)?;
        self.engine.transmit(command::echo_off())?;
        self.engine.expect("OK", self.config.line_timeout)?;
        self.engine.transmit(command::enable_receive_notices())?;
        self.engine.expect("OK", self.config.line_timeout)?;
        self.engine.transmit(command::verbose_errors())?;
        self.engine.expect("OK", self.config.line_timeout)?;
        Ok(())
    }
}

fn capture_id(fields: &[Capture]) -> Option<u8> {
    fields
        .first()
        .and_then(Capture::as_int)
        .and_then(|value| u8::try_from(value).ok())
}
