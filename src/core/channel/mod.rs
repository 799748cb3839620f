//! Device channel: the single session to the remote GPIO controller.
//!
//! The channel logs in over a line oriented shell, issues `adc read N` /
//! `gpio read N` commands and parses the integer reply. Any failed exchange
//! closes the session; the caller either gets a valid [`RawSample`] or, once
//! the reconnect budget is spent, a fatal [`ReefError::ReconnectExhausted`].

pub mod telnet;

use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use telnet::{TelnetConnector, TelnetTransport};

use crate::core::config::Config;
use crate::core::sensor::RawSample;
use crate::error::{ChannelFailure, ReefError, Result};

pub const LOGIN_PROMPT: &str = "User Name: ";
pub const PASSWORD_PROMPT: &str = "Password: ";
pub const READY_PROMPT: &str = ">>";
pub const RESPONSE_PROMPT: &str = ">";

const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Controller resource family named in read commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResourceKind {
    Adc,
    Gpio,
}

impl ResourceKind {
    pub fn command(self) -> &'static str {
        match self {
            ResourceKind::Adc => "adc",
            ResourceKind::Gpio => "gpio",
        }
    }

    /// Largest reading the controller can legitimately return
    pub fn max_sample(self) -> RawSample {
        match self {
            ResourceKind::Adc => 1023,
            ResourceKind::Gpio => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Reconnecting,
}

/// A line oriented session with the controller
pub trait Transport {
    fn send(&mut self, text: &str) -> std::result::Result<(), ChannelFailure>;

    /// Read until `marker` has been seen, returning everything before it.
    /// Not seeing the marker within `timeout` is a failure.
    fn read_until(
        &mut self,
        marker: &str,
        timeout: Duration,
    ) -> std::result::Result<String, ChannelFailure>;

    fn close(&mut self);
}

/// Opens fresh transports; called once per (re)connect
pub trait Connector {
    type Transport: Transport;

    fn open(&mut self, timeout: Duration) -> std::result::Result<Self::Transport, ChannelFailure>;
}

#[derive(Debug, Clone)]
pub struct ChannelSettings {
    pub username: String,
    pub password: String,
    pub timeout: Duration,
    pub reconnect_delay: Duration,
    pub reconnect_attempts: u32,
}

impl ChannelSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            username: config.username.clone(),
            password: config.password.clone(),
            timeout: config.connect_timeout,
            reconnect_delay: config.reconnect_delay,
            reconnect_attempts: config.reconnect_attempts,
        }
    }
}

pub struct DeviceChannel<C: Connector> {
    connector: C,
    settings: ChannelSettings,
    session: Option<C::Transport>,
    state: ConnectionState,
    shutdown: Arc<AtomicBool>,
}

impl<C: Connector> DeviceChannel<C> {
    pub fn new(connector: C, settings: ChannelSettings) -> Self {
        Self {
            connector,
            settings,
            session: None,
            state: ConnectionState::Disconnected,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked during reconnect backoff; once set, reconnecting stops
    /// with [`ReefError::Interrupted`].
    pub fn set_shutdown(&mut self, flag: Arc<AtomicBool>) {
        self.shutdown = flag;
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Open a session and log in.
    ///
    /// A missing prompt is an authentication failure; failing to open the
    /// transport at all is a channel failure.
    pub fn connect(&mut self) -> Result<()> {
        self.close_session();
        let mut session = self.connector.open(self.settings.timeout)?;

        if let Err(e) = self.login(&mut session) {
            session.close();
            return Err(ReefError::authentication(e.to_string()));
        }

        info!("Logged in to GPIO controller as {}", self.settings.username);
        self.session = Some(session);
        self.state = ConnectionState::Connected;
        Ok(())
    }

    fn login(&self, session: &mut C::Transport) -> std::result::Result<(), ChannelFailure> {
        let timeout = self.settings.timeout;
        session.read_until(LOGIN_PROMPT, timeout)?;
        session.send(&format!("{}\n", self.settings.username))?;
        session.read_until(PASSWORD_PROMPT, timeout)?;
        session.send(&format!("{}\n", self.settings.password))?;
        let banner = session.read_until(READY_PROMPT, timeout)?;
        debug!("Controller banner: {}", banner.trim());
        Ok(())
    }

    /// One read attempt. On failure the session is closed and the state
    /// drops to `Disconnected`; recovery is left to the caller.
    pub fn try_read(
        &mut self,
        kind: ResourceKind,
        index: u32,
    ) -> std::result::Result<RawSample, ChannelFailure> {
        let timeout = self.settings.timeout;
        let outcome = match self.session.as_mut() {
            Some(session) => exchange(session, kind, index, timeout),
            None => Err(ChannelFailure::NotConnected),
        };

        if outcome.is_err() {
            self.close_session();
            self.state = ConnectionState::Disconnected;
        }
        outcome
    }

    /// Read a sample, reconnecting and retrying the same read after any
    /// channel failure.
    pub fn read_raw(&mut self, kind: ResourceKind, index: u32) -> Result<RawSample> {
        loop {
            match self.try_read(kind, index) {
                Ok(sample) => return Ok(sample),
                Err(failure) => {
                    warn!(
                        "Lost connection reading {} {}: {}",
                        kind.command(),
                        index,
                        failure
                    );
                    self.reconnect()?;
                }
            }
        }
    }

    /// Up to `reconnect_attempts` connects, each after `reconnect_delay`.
    /// Running out of attempts is fatal; a shutdown request during the wait
    /// ends with `Interrupted`.
    pub fn reconnect(&mut self) -> Result<()> {
        self.state = ConnectionState::Reconnecting;
        let budget = self.settings.reconnect_attempts;

        for attempt in 1..=budget {
            info!(
                "Attempt reconnect in {} seconds...",
                self.settings.reconnect_delay.as_secs()
            );
            sleep_unless(self.settings.reconnect_delay, &self.shutdown);
            if self.shutdown.load(Ordering::Relaxed) {
                self.state = ConnectionState::Disconnected;
                info!("Reconnect abandoned on shutdown request");
                return Err(ReefError::Interrupted);
            }

            match self.connect() {
                Ok(()) => {
                    info!("Successfully reconnected after {} attempts", attempt);
                    return Ok(());
                }
                Err(e) => {
                    warn!("Reconnect attempt {} failed: {}", attempt, e);
                    self.state = ConnectionState::Reconnecting;
                }
            }
        }

        self.state = ConnectionState::Disconnected;
        error!("Could not reconnect after {} attempts", budget);
        Err(ReefError::ReconnectExhausted { attempts: budget })
    }

    /// Politely end the session. Errors are ignored.
    pub fn disconnect(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if let Err(e) = session.send("exit\n") {
                debug!("Ignored error while disconnecting: {}", e);
            }
        }
        self.close_session();
        self.state = ConnectionState::Disconnected;
    }

    fn close_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
    }
}

/// Sleep for `duration`, waking early once `shutdown` is set
pub fn sleep_unless(duration: Duration, shutdown: &AtomicBool) {
    let deadline = Instant::now() + duration;
    while !shutdown.load(Ordering::Relaxed) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        std::thread::sleep(remaining.min(SLEEP_SLICE));
    }
}

fn exchange<T: Transport>(
    session: &mut T,
    kind: ResourceKind,
    index: u32,
    timeout: Duration,
) -> std::result::Result<RawSample, ChannelFailure> {
    session.send(&format!("{} read {}\n", kind.command(), index))?;
    let response = session.read_until(RESPONSE_PROMPT, timeout)?;
    let sample = parse_sample(&response)?;
    if sample > kind.max_sample() {
        return Err(ChannelFailure::Parse { response });
    }
    Ok(sample)
}

/// First whitespace delimited token of a reply, as an integer
pub fn parse_sample(response: &str) -> std::result::Result<RawSample, ChannelFailure> {
    response
        .split_whitespace()
        .next()
        .and_then(|token| token.parse().ok())
        .ok_or_else(|| ChannelFailure::Parse {
            response: response.to_string(),
        })
}
