//! Telnet transport for the controller shell.
//!
//! Only the subset of telnet needed to talk to a simple shell is handled:
//! option negotiation is refused and stripped from the data stream.

use log::debug;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use super::{Connector, Transport};
use crate::error::ChannelFailure;

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const MIN_POLL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum FilterState {
    #[default]
    Data,
    Command,
    Negotiate(u8),
    Subnegotiation,
    SubnegotiationCommand,
}

/// Strips telnet commands from incoming bytes and produces the refusals to
/// send back.
#[derive(Debug, Default)]
pub struct OptionFilter {
    state: FilterState,
}

impl OptionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends plain data to `data` and returns any negotiation replies
    pub fn feed(&mut self, input: &[u8], data: &mut Vec<u8>) -> Vec<u8> {
        let mut replies = Vec::new();

        for &byte in input {
            self.state = match (self.state, byte) {
                (FilterState::Data, IAC) => FilterState::Command,
                (FilterState::Data, b) => {
                    data.push(b);
                    FilterState::Data
                }
                (FilterState::Command, IAC) => {
                    data.push(IAC);
                    FilterState::Data
                }
                (FilterState::Command, cmd @ (DO | DONT | WILL | WONT)) => FilterState::Negotiate(cmd),
                (FilterState::Command, SB) => FilterState::Subnegotiation,
                (FilterState::Command, _) => FilterState::Data,
                (FilterState::Negotiate(cmd), option) => {
                    match cmd {
                        DO => replies.extend_from_slice(&[IAC, WONT, option]),
                        WILL => replies.extend_from_slice(&[IAC, DONT, option]),
                        _ => {}
                    }
                    FilterState::Data
                }
                (FilterState::Subnegotiation, IAC) => FilterState::SubnegotiationCommand,
                (FilterState::Subnegotiation, _) => FilterState::Subnegotiation,
                (FilterState::SubnegotiationCommand, SE) => FilterState::Data,
                (FilterState::SubnegotiationCommand, _) => FilterState::Subnegotiation,
            };
        }

        replies
    }
}

/// Opens telnet sessions to a fixed `host:port`
#[derive(Debug, Clone)]
pub struct TelnetConnector {
    address: String,
}

impl TelnetConnector {
    pub fn new<S: Into<String>>(address: S) -> Self {
        Self {
            address: address.into(),
        }
    }
}

impl Connector for TelnetConnector {
    type Transport = TelnetTransport;

    fn open(&mut self, timeout: Duration) -> Result<TelnetTransport, ChannelFailure> {
        let mut last_error = io::Error::new(
            io::ErrorKind::NotFound,
            format!("no address resolved for {}", self.address),
        );

        for addr in self.address.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    debug!("Connected to {}", addr);
                    return Ok(TelnetTransport::new(stream));
                }
                Err(e) => last_error = e,
            }
        }

        Err(ChannelFailure::Io(last_error))
    }
}

pub struct TelnetTransport {
    stream: TcpStream,
    filter: OptionFilter,
    pending: Vec<u8>,
}

impl TelnetTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            filter: OptionFilter::new(),
            pending: Vec::new(),
        }
    }

    fn take_through(&mut self, marker: &[u8]) -> Option<String> {
        let pos = find(&self.pending, marker)?;
        let text = String::from_utf8_lossy(&self.pending[..pos]).into_owned();
        self.pending.drain(..pos + marker.len());
        Some(text)
    }
}

impl Transport for TelnetTransport {
    fn send(&mut self, text: &str) -> Result<(), ChannelFailure> {
        self.stream.write_all(text.as_bytes())?;
        self.stream.flush()?;
        Ok(())
    }

    fn read_until(&mut self, marker: &str, timeout: Duration) -> Result<String, ChannelFailure> {
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; 512];

        loop {
            if let Some(text) = self.take_through(marker.as_bytes()) {
                return Ok(text);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ChannelFailure::Timeout {
                    waiting_for: marker.to_string(),
                    timeout,
                });
            }

            self.stream.set_read_timeout(Some(remaining.max(MIN_POLL)))?;
            match self.stream.read(&mut buf) {
                Ok(0) => {
                    return Err(ChannelFailure::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed by controller",
                    )))
                }
                Ok(n) => {
                    let replies = self.filter.feed(&buf[..n], &mut self.pending);
                    if !replies.is_empty() {
                        self.stream.write_all(&replies)?;
                    }
                }
                Err(e)
                    if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn close(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
