use std::{default::Default, time::Duration};

#[derive(Clone, Debug)]
/// Configuration options to tune engine and driver behavior.
///
/// Every blocking primitive takes its deadline from here (or from an explicit
/// parameter); there is no process-wide mutable timeout set by side effect.
pub struct Config {
    /// Budget for the network bring-up sequence (registration/attach acks).
    pub connect_timeout: Duration,
    /// Budget for a send handshake completion (`SEND OK`).
    pub send_timeout: Duration,
    /// Default budget for a receive call when none is passed explicitly.
    pub recv_timeout: Duration,
    /// Budget for miscellaneous commands (close, power down, queries).
    pub misc_timeout: Duration,
    /// Deadline for assembling a single response line.
    pub line_timeout: Duration,
    /// Deadline for acknowledgments that follow a command (`OK`, `>`).
    pub command_timeout: Duration,
    /// Deadline for the raw byte read that follows a data-available notice.
    pub raw_read_timeout: Duration,
    /// Upper bound on time spent draining stale chatter before a transmit.
    pub flush_timeout: Duration,
    /// Sleep step while polling the transport for data.
    pub poll_interval: Duration,

    /// Outer reset-pulse attempts before giving up on the modem.
    pub reset_attempts: usize,
    /// Liveness probes per reset pulse.
    pub probe_attempts: usize,
    /// Registration status polls per connect round.
    pub registration_attempts: usize,
    /// Delay between registration polls.
    pub registration_interval: Duration,
    /// GPRS attach attempts per connect round.
    pub attach_attempts: usize,
    /// Delay between attach attempts.
    pub attach_interval: Duration,
    /// Rounds of the full {register, attach, configure} sequence.
    pub connect_attempts: usize,
    /// Rounds of the open-if-safe sequence per socket open.
    pub open_attempts: usize,
    /// Close attempts per socket close.
    pub close_attempts: usize,
    /// Tries per payload chunk during a send.
    pub send_attempts: usize,

    /// Width of the low pulse on the reset line.
    pub reset_pulse: Duration,
    /// Settle time after releasing the reset line.
    pub reset_settle: Duration,

    /// NTP server requested during time synchronization.
    pub ntp_server: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            send_timeout: Duration::from_secs(15),
            recv_timeout: Duration::from_secs(40),
            misc_timeout: Duration::from_secs(40),
            line_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(10),
            raw_read_timeout: Duration::from_secs(10),
            flush_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(1),
            reset_attempts: 3,
            probe_attempts: 2,
            registration_attempts: 20,
            registration_interval: Duration::from_secs(1),
            attach_attempts: 20,
            attach_interval: Duration::from_secs(2),
            connect_attempts: 3,
            open_attempts: 3,
            close_attempts: 2,
            send_attempts: 2,
            reset_pulse: Duration::from_millis(200),
            reset_settle: Duration::from_millis(1000),
            ntp_server: "pool.ntp.org".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout_classes() {
        let config = Config::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(15));
        assert_eq!(config.send_timeout, Duration::from_secs(15));
        assert_eq!(config.recv_timeout, Duration::from_secs(40));
        assert_eq!(config.misc_timeout, Duration::from_secs(40));
    }

    #[test]
    fn test_default_retry_budget() {
        let config = Config::default();
        assert_eq!(config.reset_attempts, 3);
        assert_eq!(config.registration_attempts, 20);
        assert_eq!(config.attach_attempts, 20);
        assert_eq!(config.connect_attempts, 3);
    }
}
