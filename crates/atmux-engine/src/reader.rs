//! Line assembly over a polled byte stream.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use atmux_core::time::Clock;
use atmux_core::transport::SerialPort;

/// Assembles response lines and raw payload reads from a serial transport.
///
/// The reader polls the transport byte by byte and yields to the clock when
/// nothing is buffered. Line assembly drops carriage returns, skips empty
/// lines, and keeps only printable characters, so callers always see clean
/// single-line responses.
pub struct LineReader<T: SerialPort> {
    port: T,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
}

impl<T: SerialPort> LineReader<T> {
    /// Creates a reader over the given transport.
    pub fn new(port: T, clock: Arc<dyn Clock>, poll_interval: Duration) -> Self {
        Self {
            port,
            clock,
            poll_interval,
        }
    }

    /// Returns true when the transport has at least one byte buffered.
    pub fn readable(&self) -> bool {
        self.port.readable()
    }

    /// Writes bytes straight to the transport.
    pub fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.port.write(bytes)
    }

    /// Reads one response line of at most `max` characters.
    ///
    /// Carriage returns are dropped, empty lines are skipped, and only
    /// printable characters are kept. A line that reaches `max` characters is
    /// returned without waiting for its terminator. Returns `None` when no
    /// complete line arrived before the deadline; any partial accumulation is
    /// discarded with it.
    pub fn read_line(&mut self, max: usize, timeout: Duration) -> Option<String> {
        let deadline = self.clock.now() + timeout;
        let mut line = String::new();
        loop {
            match self.read_byte_until(deadline) {
                None => return None,
                Some(b'\r') => {}
                Some(b'\n') => {
                    if !line.is_empty() {
                        return Some(line);
                    }
                }
                Some(byte) if is_printable(byte) => {
                    line.push(byte as char);
                    if line.len() >= max {
                        return Some(line);
                    }
                }
                Some(_) => {}
            }
        }
    }

    /// Reads up to `len` raw bytes, unfiltered, within the deadline.
    ///
    /// Used for the payload that follows a data-available notice. The result
    /// may be shorter than `len` when the transport stalls; the caller
    /// decides what a short read means.
    pub fn read_exact(&mut self, len: usize, timeout: Duration) -> Vec<u8> {
        let deadline = self.clock.now() + timeout;
        let mut buffer = Vec::with_capacity(len);
        while buffer.len() < len {
            match self.read_byte_until(deadline) {
                Some(byte) => buffer.push(byte),
                None => break,
            }
        }
        buffer
    }

    /// Drains whatever is currently buffered, split into lines.
    ///
    /// Unlike [`read_line`](Self::read_line) this never waits for more input:
    /// it stops as soon as the transport runs dry, the deadline passes, or
    /// `max` characters have been consumed. An unterminated tail is returned
    /// as a final line so nothing buffered escapes classification.
    pub fn drain(&mut self, max: usize, timeout: Duration) -> Vec<String> {
        let deadline = self.clock.now() + timeout;
        let mut lines = Vec::new();
        let mut current = String::new();
        let mut consumed = 0;
        while consumed < max && self.port.readable() && self.clock.now() < deadline {
            match self.port.read_byte() {
                None => break,
                Some(b'\r') => {}
                Some(b'\n') => {
                    if !current.is_empty() {
                        lines.push(std::mem::take(&mut current));
                    }
                }
                Some(byte) if is_printable(byte) => {
                    current.push(byte as char);
                    consumed += 1;
                }
                Some(_) => {}
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }

    /// Reads one byte, polling until the deadline.
    fn read_byte_until(&mut self, deadline: Instant) -> Option<u8> {
        loop {
            if let Some(byte) = self.port.read_byte() {
                return Some(byte);
            }
            if self.clock.now() >= deadline {
                return None;
            }
            self.clock.sleep(self.poll_interval);
        }
    }
}

/// Printable subset kept during line assembly: graphic ASCII plus space.
fn is_printable(byte: u8) -> bool {
    byte.is_ascii_graphic() || byte == b' '
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct MockPort {
        rx: VecDeque<u8>,
    }

    impl MockPort {
        fn preloaded(bytes: &[u8]) -> Self {
            Self {
                rx: bytes.iter().copied().collect(),
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

    fn reader(bytes: &[u8]) -> LineReader<MockPort> {
        LineReader::new(
            MockPort::preloaded(bytes),
            Arc::new(MockClock::new()),
            Duration::from_millis(1),
        )
    }

    #[test]
    fn test_read_line_strips_cr_and_skips_empty_lines() {
        let mut reader = reader(b"\r\n\r\nOK\r\n");
        assert_eq!(
            reader.read_line(511, Duration::from_secs(1)),
            Some("OK".to_owned())
        );
    }

    #[test]
    fn test_read_line_drops_nonprintable_bytes() {
        let mut reader = reader(b"O\x01K\x7f\r\n");
        assert_eq!(
            reader.read_line(511, Duration::from_secs(1)),
            Some("OK".to_owned())
        );
    }

    #[test]
    fn test_read_line_times_out_discarding_partial() {
        let mut reader = reader(b"PART");
        assert_eq!(reader.read_line(511, Duration::from_millis(5)), None);
    }

    #[test]
    fn test_read_line_caps_at_max() {
        let mut reader = reader(b"ABCDEFGH\r\n");
        assert_eq!(
            reader.read_line(4, Duration::from_secs(1)),
            Some("ABCD".to_owned())
        );
        assert_eq!(
            reader.read_line(511, Duration::from_secs(1)),
            Some("EFGH".to_owned())
        );
    }

    #[test]
    fn test_read_exact_may_return_short() {
        let mut reader = reader(b"abc");
        assert_eq!(reader.read_exact(3, Duration::from_secs(1)), b"abc");
        assert_eq!(reader.read_exact(2, Duration::from_millis(5)), b"");
    }

    #[test]
    fn test_drain_returns_unterminated_tail() {
        let mut reader = reader(b"SMS Ready\r\nOK\r\ntail");
        let lines = reader.drain(511, Duration::from_secs(1));
        assert_eq!(lines, vec!["SMS Ready", "OK", "tail"]);
    }

    #[test]
    fn test_drain_never_waits_on_empty_port() {
        let mut reader = reader(b"");
        assert!(reader.drain(511, Duration::from_secs(5)).is_empty());
    }
}
