//! AT command line builders.
//!
//! One function per command keeps every wire literal in a single place.
//! Commands are returned without the `\r\n` terminator; the engine appends
//! it on transmit.

use std::fmt;

/// Transport protocol of a logical session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Stream session.
    Tcp,
    /// Datagram session.
    Udp,
}

impl Protocol {
    /// Wire spelling used in the open command.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Liveness probe.
pub fn probe() -> &'static str {
    "AT"
}

/// Disables command echo.
pub fn echo_off() -> &'static str {
    "ATE0"
}

/// Enables unsolicited inbound-data notices.
pub fn enable_receive_notices() -> &'static str {
    "AT+QIURC=1"
}

/// Enables verbose error result codes.
pub fn verbose_errors() -> &'static str {
    "AT+CMEE=2"
}

/// Enables session multiplexing over the command channel.
pub fn multiplex() -> &'static str {
    "AT+QIMUX=1"
}

/// Queries network registration status.
pub fn registration_query() -> &'static str {
    "AT+CREG?"
}

/// Deactivates any current PDP context.
pub fn deactivate_pdp() -> &'static str {
    "AT+QIDEACT"
}

/// Attaches to GPRS.
pub fn attach_gprs() -> &'static str {
    "AT+CGATT=1"
}

/// Queries GPRS attach state.
pub fn gprs_query() -> &'static str {
    "AT+CGATT?"
}

/// Selects the foreground context.
pub fn foreground_context() -> &'static str {
    "AT+QIFGCNT=0"
}

/// Configures APN credentials for the GPRS context.
pub fn apn_credentials(apn: &str, user: &str, password: &str) -> String {
    format!("AT+QICSGP=1,\"{}\",\"{}\",\"{}\"", apn, user, password)
}

/// Registers the TCP/IP task with the network.
pub fn register_tcpip() -> &'static str {
    "AT+QIREGAPP"
}

/// Activates the configured context.
pub fn activate_context() -> &'static str {
    "AT+QIACT"
}

/// Queries the local IP address.
pub fn local_ip() -> &'static str {
    "AT+QILOCIP"
}

/// Queries the device IMEI.
pub fn imei() -> &'static str {
    "AT+GSN"
}

/// Selects numeric-address DNS mode for session opens.
pub fn dns_mode() -> &'static str {
    "AT+QIDNSIP=0"
}

/// Opens a session on `id` to `addr:port`.
pub fn open(id: u8, protocol: Protocol, addr: &str, port: u16) -> String {
    format!("AT+QIOPEN={},\"{}\",\"{}\",\"{}\"", id, protocol, addr, port)
}

/// Selects the transparent-transfer service mode used for sends.
pub fn service_mode() -> &'static str {
    "AT+QISRVC=1"
}

/// Begins a send of `len` bytes on `id`; the modem answers with a `>` cursor.
pub fn begin_send(id: u8, len: usize) -> String {
    format!("AT+QISEND={},{}", id, len)
}

/// Closes the session on `id`.
pub fn close(id: u8) -> String {
    format!("AT+QICLOSE={}", id)
}

/// Queries the TCP/IP stack state.
pub fn stack_state() -> &'static str {
    "AT+QISTAT"
}

/// Requests an orderly power down.
pub fn power_down() -> &'static str {
    "AT+QPOWD=1"
}

/// Queries battery charge status.
pub fn battery() -> &'static str {
    "AT+CBC"
}

/// Enables network time reporting.
pub fn network_time_reporting() -> &'static str {
    "AT+QNITZ=1"
}

/// Enables automatic time zone update.
pub fn timezone_update() -> &'static str {
    "AT+CTZU=1"
}

/// Requests clock synchronization against an NTP server.
pub fn ntp_sync(server: &str) -> String {
    format!("AT+QNTP=\"{}\"", server)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_literal() {
        assert_eq!(
            open(2, Protocol::Tcp, "46.23.86.61", 8080),
            "AT+QIOPEN=2,\"TCP\",\"46.23.86.61\",\"8080\""
        );
        assert_eq!(
            open(0, Protocol::Udp, "10.0.0.1", 53),
            "AT+QIOPEN=0,\"UDP\",\"10.0.0.1\",\"53\""
        );
    }

    #[test]
    fn test_send_and_close_literals() {
        assert_eq!(begin_send(1, 512), "AT+QISEND=1,512");
        assert_eq!(close(4), "AT+QICLOSE=4");
    }

    #[test]
    fn test_apn_literal() {
        assert_eq!(
            apn_credentials("internet", "user", "pass"),
            "AT+QICSGP=1,\"internet\",\"user\",\"pass\""
        );
    }

    #[test]
    fn test_fixed_literals() {
        assert_eq!(probe(), "AT");
        assert_eq!(echo_off(), "ATE0");
        assert_eq!(registration_query(), "AT+CREG?");
        assert_eq!(deactivate_pdp(), "AT+QIDEACT");
        assert_eq!(ntp_sync("pool.ntp.org"), "AT+QNTP=\"pool.ntp.org\"");
    }
}
