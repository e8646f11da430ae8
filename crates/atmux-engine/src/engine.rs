//! Command transmission and response matching.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, warn};

use atmux_core::config::Config;
use atmux_core::constants::MAX_LINE_LENGTH;
use atmux_core::error::{ErrorKind, Result};
use atmux_core::time::Clock;
use atmux_core::transport::SerialPort;
use atmux_protocol::{pattern, urc, Capture, Packet, PacketQueue, Urc};

use crate::events::ModemEvent;
use crate::reader::LineReader;

/// Request/response engine multiplexing one serial link.
///
/// Every line read while waiting for a response is first offered to the
/// unsolicited-notice filter; recognized notices are consumed (payloads
/// reassembled into the packet queue, everything else surfaced as a
/// [`ModemEvent`]) and the wait continues. Callers therefore only ever see
/// genuine response lines.
pub struct CommandEngine<T: SerialPort> {
    reader: LineReader<T>,
    clock: Arc<dyn Clock>,
    config: Config,
    queue: PacketQueue,
    event_tx: Sender<ModemEvent>,
    event_rx: Receiver<ModemEvent>,
}

impl<T: SerialPort> CommandEngine<T> {
    /// Creates an engine over the given transport.
    pub fn new(port: T, config: Config, clock: Arc<dyn Clock>) -> Self {
        let reader = LineReader::new(port, Arc::clone(&clock), config.poll_interval);
        let (event_tx, event_rx) = unbounded();
        Self {
            reader,
            clock,
            config,
            queue: PacketQueue::new(),
            event_tx,
            event_rx,
        }
    }

    /// Returns the receive side of the event channel.
    pub fn events(&self) -> &Receiver<ModemEvent> {
        &self.event_rx
    }

    /// Transmits a command line, terminator appended.
    ///
    /// Stale chatter is drained and classified first so that the next
    /// response wait starts on a clean stream.
    pub fn transmit(&mut self, command: &str) -> Result<()> {
        self.flush();
        self.reader.write(command.as_bytes())?;
        self.reader.write(b"\r\n")?;
        debug!("gsm ({:02}) <- '{}'", command.len(), command);
        Ok(())
    }

    /// Writes raw payload bytes without line framing or flushing.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<usize> {
        let written = self.reader.write(bytes)?;
        debug!("gsm ({:02}) <- {} raw bytes", written, bytes.len());
        Ok(written)
    }

    /// Drains buffered input, classifying every complete line.
    ///
    /// Notices found in the backlog are consumed as usual; anything else is
    /// discarded as stale. Returns the number of lines drained.
    pub fn flush(&mut self) -> usize {
        let lines = self.reader.drain(MAX_LINE_LENGTH, self.config.flush_timeout);
        let count = lines.len();
        for line in lines {
            if !self.handle_urc(&line) {
                debug!("gsm ({:02}) xx '{}'", line.len(), line);
            }
        }
        count
    }

    /// Reads the next genuine response line, consuming notices on the way.
    pub fn read_response(&mut self, timeout: Duration) -> Result<String> {
        let deadline = self.clock.now() + timeout;
        loop {
            let line = self.next_line(deadline)?;
            if !self.handle_urc(&line) {
                return Ok(line);
            }
        }
    }

    /// Waits for a response line starting with `expected`.
    ///
    /// Leading whitespace is ignored; the send cursor leaves a stray space
    /// ahead of the next line. The comparison covers the shorter of the two
    /// strings, which tolerates truncated-but-unambiguous replies. A line
    /// that diverges is an error; it is not retried.
    pub fn expect(&mut self, expected: &str, timeout: Duration) -> Result<()> {
        let line = self.read_response(timeout)?;
        let received = line.trim_start();
        let n = expected.len().min(received.len());
        if n > 0 && received.as_bytes()[..n] == expected.as_bytes()[..n] {
            Ok(())
        } else {
            Err(ErrorKind::Mismatch {
                expected: expected.to_owned(),
                received: line,
            })
        }
    }

    /// Reads a response line and scans it, returning the captured fields.
    ///
    /// Like `sscanf`, fields preceding the first mismatch are still
    /// returned; callers inspect the captures to judge success.
    pub fn scan(&mut self, format: &str, timeout: Duration) -> Result<Vec<Capture>> {
        let line = self.read_response(timeout)?;
        Ok(pattern::scan(&line, format))
    }

    /// Reads a response line and requires it to match `format` entirely.
    pub fn expect_scan(&mut self, format: &str, timeout: Duration) -> Result<Vec<Capture>> {
        let line = self.read_response(timeout)?;
        pattern::scan_all(&line, format).ok_or(ErrorKind::Mismatch {
            expected: format.to_owned(),
            received: line,
        })
    }

    /// Waits for the `>` send cursor.
    ///
    /// The cursor arrives without a line terminator, so this works at the
    /// byte level: completed lines seen on the way are classified as usual,
    /// and a `>` at the start of a line completes the wait.
    pub fn expect_prompt(&mut self, timeout: Duration) -> Result<()> {
        let deadline = self.clock.now() + timeout;
        let mut line = String::new();
        loop {
            match self.reader_byte(deadline) {
                None => return Err(ErrorKind::Timeout),
                Some(b'\r') => {}
                Some(b'\n') => {
                    if !line.is_empty() {
                        debug!("gsm ({:02}) -> '{}'", line.len(), line);
                        let completed = std::mem::take(&mut line);
                        self.handle_urc(&completed);
                    }
                }
                Some(b'>') if line.is_empty() => return Ok(()),
                Some(byte) if byte.is_ascii_graphic() || byte == b' ' => {
                    line.push(byte as char);
                }
                Some(_) => {}
            }
        }
    }

    /// Waits until either a packet for `id` is queued or a genuine response
    /// line arrives.
    ///
    /// Returns `Ok(None)` when a payload for `id` became available, and
    /// `Ok(Some(line))` for a non-notice line the caller must interpret,
    /// such as a peer-close announcement.
    pub fn wait_for_packet(&mut self, id: u8, timeout: Duration) -> Result<Option<String>> {
        let deadline = self.clock.now() + timeout;
        loop {
            let line = self.next_line(deadline)?;
            if self.handle_urc(&line) {
                if self.queue.has_packet(id) {
                    return Ok(None);
                }
            } else {
                return Ok(Some(line));
            }
        }
    }

    /// Dequeues up to `max` bytes queued for `id`, if any.
    pub fn take_packet(&mut self, id: u8, max: usize) -> Option<Vec<u8>> {
        self.queue.take(id, max)
    }

    /// Returns true when a payload for `id` is queued.
    pub fn has_packet(&self, id: u8) -> bool {
        self.queue.has_packet(id)
    }

    fn next_line(&mut self, deadline: Instant) -> Result<String> {
        let remaining = deadline
            .checked_duration_since(self.clock.now())
            .filter(|r| !r.is_zero())
            .ok_or(ErrorKind::Timeout)?;
        match self.reader.read_line(MAX_LINE_LENGTH, remaining) {
            Some(line) => {
                debug!("gsm ({:02}) -> '{}'", line.len(), line);
                Ok(line)
            }
            None => Err(ErrorKind::Timeout),
        }
    }

    fn reader_byte(&mut self, deadline: Instant) -> Option<u8> {
        let remaining = deadline
            .checked_duration_since(self.clock.now())
            .filter(|r| !r.is_zero())?;
        // read_exact polls single bytes under the same deadline rules
        self.reader.read_exact(1, remaining).first().copied()
    }

    /// Classifies a line, consuming it when it is an unsolicited notice.
    ///
    /// Returns true when the line was consumed. Data-available notices
    /// trigger an immediate raw read of the declared length; short or
    /// zero-length payloads are dropped, never queued.
    fn handle_urc(&mut self, line: &str) -> bool {
        let Some(notice) = urc::classify(line) else {
            return false;
        };
        match notice {
            Urc::Receive { id, len } => self.reassemble(id, len),
            Urc::MalformedReceive => {
                warn!("malformed data notice dropped: '{}'", line);
            }
            other => {
                if let Some(event) = ModemEvent::from_urc(other) {
                    self.emit(event);
                }
            }
        }
        true
    }

    fn reassemble(&mut self, id: u8, len: usize) {
        if len == 0 {
            debug!("zero-length data notice for id {} dropped", id);
            return;
        }
        let payload = self.reader.read_exact(len, self.config.raw_read_timeout);
        if payload.len() != len {
            warn!(
                "short read for id {}: {} of {} bytes, payload dropped",
                id,
                payload.len(),
                len
            );
            return;
        }
        debug!("gsm ({:02}) -> {} payload bytes for id {}", len, len, id);
        self.queue.push(Packet::new(id, payload));
        self.emit(ModemEvent::PacketQueued { id, len });
    }

    fn emit(&self, event: ModemEvent) {
        self.event_tx
            .send(event)
            .expect("Receiver must exist");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::Mutex;

    struct MockPort {
        rx: VecDeque<u8>,
        tx: Arc<Mutex<Vec<u8>>>,
    }

    impl MockPort {
        fn preloaded(bytes: &[u8]) -> Self {
            Self {
                rx: bytes.iter().copied().collect(),
                tx: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl SerialPort for MockPort {
        fn readable(&self) -> bool {
            !self.rx.is_empty()
        }

        fn read_byte(&mut self) -> Option<u8> {
            self.rx.pop_front()
        }

        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.tx.lock().unwrap().extend_from_slice(bytes);
            Ok(bytes.len())
        }
    }

    struct MockClock {
        now: Mutex<Instant>,
    }

    impl MockClock {
        fn new() -> Self {
            Self {
                now: Mutex::new(Instant::now()),
            }
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }

        fn sleep(&self, duration: Duration) {
            *self.now.lock().unwrap() += duration;
        }
    }

    fn engine(bytes: &[u8]) -> CommandEngine<MockPort> {
        CommandEngine::new(
            MockPort::preloaded(bytes),
            Config::default(),
            Arc::new(MockClock::new()),
        )
    }

    #[test]
    fn test_expect_tolerates_truncated_reply() {
        let mut engine = engine(b"O\r\n");
        assert!(engine.expect("OK", Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_expect_rejects_divergent_reply() {
        let mut engine = engine(b"ERROR\r\n");
        let err = engine.expect("OK", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ErrorKind::Mismatch { .. }));
    }

    #[test]
    fn test_notices_are_invisible_to_response_waits() {
        let mut engine = engine(b"+CPIN: READY\r\nSMS Ready\r\nOK\r\n");
        assert!(engine.expect("OK", Duration::from_secs(1)).is_ok());
        assert_eq!(engine.events().try_recv(), Ok(ModemEvent::PinReady));
        assert_eq!(engine.events().try_recv(), Ok(ModemEvent::SimReady));
        assert!(engine.events().try_recv().is_err());
    }

    #[test]
    fn test_data_notice_reassembles_and_queues() {
        let mut engine = engine(b"+RECEIVE: 2, 5\r\nhelloOK\r\n");
        assert!(engine.expect("OK", Duration::from_secs(1)).is_ok());
        assert_eq!(
            engine.events().try_recv(),
            Ok(ModemEvent::PacketQueued { id: 2, len: 5 })
        );
        assert_eq!(engine.take_packet(2, 64), Some(b"hello".to_vec()));
    }

    #[test]
    fn test_short_raw_read_drops_payload() {
        let mut engine = engine(b"+RECEIVE: 2, 5\r\nhi");
        // No complete payload and no response line arrives.
        let err = engine
            .read_response(Duration::from_millis(50))
            .unwrap_err();
        assert!(matches!(err, ErrorKind::Timeout));
        assert!(!engine.has_packet(2));
        assert!(engine.events().try_recv().is_err());
    }

    #[test]
    fn test_zero_length_notice_queues_nothing() {
        let mut engine = engine(b"+RECEIVE: 1, 0\r\nOK\r\n");
        assert!(engine.expect("OK", Duration::from_secs(1)).is_ok());
        assert!(!engine.has_packet(1));
        assert!(engine.events().try_recv().is_err());
    }

    #[test]
    fn test_flush_classifies_backlog() {
        let mut engine = engine(b"Call Ready\r\nstale noise\r\n");
        assert_eq!(engine.flush(), 2);
        assert_eq!(engine.events().try_recv(), Ok(ModemEvent::CallReady));
        assert!(engine.events().try_recv().is_err());
    }

    #[test]
    fn test_prompt_found_after_notice_line() {
        let mut engine = engine(b"SMS Ready\r\n\r\n> ");
        assert!(engine.expect_prompt(Duration::from_secs(1)).is_ok());
        assert_eq!(engine.events().try_recv(), Ok(ModemEvent::SimReady));
    }

    #[test]
    fn test_prompt_times_out_without_cursor() {
        let mut engine = engine(b"OK\r\n");
        let err = engine.expect_prompt(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, ErrorKind::Timeout));
    }

    #[test]
    fn test_wait_for_packet_hands_back_foreign_lines() {
        let mut engine = engine(b"0, CLOSED\r\n");
        let line = engine
            .wait_for_packet(0, Duration::from_secs(1))
            .unwrap();
        assert_eq!(line, Some("0, CLOSED".to_owned()));
    }

    #[test]
    fn test_wait_for_packet_returns_on_matching_payload() {
        let mut engine = engine(b"+RECEIVE: 3, 2\r\nab");
        let line = engine
            .wait_for_packet(3, Duration::from_secs(1))
            .unwrap();
        assert_eq!(line, None);
        assert_eq!(engine.take_packet(3, 2), Some(b"ab".to_vec()));
    }

    #[test]
    fn test_transmit_appends_terminator() {
        let port = MockPort::preloaded(b"");
        let sent = Arc::clone(&port.tx);
        let mut engine =
            CommandEngine::new(port, Config::default(), Arc::new(MockClock::new()));
        engine.transmit("AT+CREG?").unwrap();
        assert_eq!(sent.lock().unwrap().as_slice(), b"AT+CREG?\r\n");
    }
}
