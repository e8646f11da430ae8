//! Fetches a web page through a modem reachable over a serial-to-TCP bridge.
//!
//! Point the bridge (ser2net or similar) at the modem's UART, then:
//! - cargo run -p atmux --example http_get -- 127.0.0.1:4000 internet
//!
//! Args: <bridge_addr> [apn] [server_ip] [host] [path]
//!
//! Sessions are opened in numeric-address mode, so the server is given as
//! an IP; the Host header carries the name.

use std::{
    env,
    io::{self, Read, Write},
    net::TcpStream,
    sync::Arc,
    time::Duration,
};

use atmux::prelude::*;

/// Serial link tunneled over a TCP bridge.
struct BridgePort {
    stream: TcpStream,
}

impl BridgePort {
    fn connect(addr: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nonblocking(true)?;
        Ok(Self { stream })
    }
}

impl SerialPort for BridgePort {
    fn readable(&self) -> bool {
        let mut probe = [0u8; 1];
        matches!(self.stream.peek(&mut probe), Ok(n) if n > 0)
    }

    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.stream.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.stream.write_all(bytes)?;
        Ok(bytes.len())
    }
}

/// The bridge exposes no control lines; bring-up relies on probing alone.
struct NoPins;

impl PowerPins for NoPins {
    fn set_reset(&mut self, _level: bool) {}

    fn set_power(&mut self, _level: bool) {}
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let bridge = args.next().unwrap_or_else(|| "127.0.0.1:4000".to_string());
    let apn = args.next().unwrap_or_else(|| "internet".to_string());
    let server = args.next().unwrap_or_else(|| "93.184.216.34".to_string());
    let host = args.next().unwrap_or_else(|| "example.com".to_string());
    let path = args.next().unwrap_or_else(|| "/".to_string());

    let port = BridgePort::connect(&bridge)?;
    let mut modem = Modem::new(port, NoPins, Config::default(), Arc::new(SystemClock));

    println!("bringing up modem via {}", bridge);
    modem.power_up()?;
    println!("imei: {}", modem.imei()?);

    modem.connect(&apn, "", "")?;
    println!("attached, local address {}", modem.ip_address()?);

    let id = modem.open_session()?;
    modem.open(id, Protocol::Tcp, &server, 80)?;
    println!("connection {} open to {}:80", id, server);

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, host
    );
    modem.send(id, request.as_bytes())?;

    let mut buffer = [0u8; 1024];
    loop {
        match modem.recv(id, &mut buffer, Duration::from_secs(10)) {
            Ok(n) => print!("{}", String::from_utf8_lossy(&buffer[..n])),
            Err(ErrorKind::Closed(_)) | Err(ErrorKind::Timeout) => break,
            Err(err) => return Err(err.into()),
        }
    }
    println!();

    let _ = modem.close(id);
    modem.disconnect()?;
    Ok(())
}
