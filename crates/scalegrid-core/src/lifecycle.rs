//! Connection lifecycle shared by all scalers.
//!
//! ```text
//! Uninitialized ──connect()──► Connecting ──ready()──► Ready ──close()──► Closed
//! ```
//!
//! Queries are only permitted in `Ready`.

use tracing::debug;

use crate::error::{ScalerError, ScalerResult};

/// State of a scaler's backend connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Connecting,
    Ready,
    Closed,
}

/// Tracks and enforces the connection state machine for one scaler.
#[derive(Debug)]
pub struct Lifecycle {
    kind: &'static str,
    state: ConnectionState,
}

impl Lifecycle {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            state: ConnectionState::Uninitialized,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Enter `Connecting`. Only valid from `Uninitialized`.
    pub fn connect(&mut self) -> ScalerResult<()> {
        self.transition(ConnectionState::Uninitialized, ConnectionState::Connecting)
    }

    /// Enter `Ready` after a successful handshake.
    pub fn ready(&mut self) -> ScalerResult<()> {
        self.transition(ConnectionState::Connecting, ConnectionState::Ready)
    }

    /// Fail unless queries are currently permitted.
    pub fn ensure_ready(&self) -> ScalerResult<()> {
        match self.state {
            ConnectionState::Ready => Ok(()),
            ConnectionState::Closed => Err(ScalerError::Closed),
            other => Err(ScalerError::Connection(format!(
                "{} scaler is not ready ({other:?})",
                self.kind
            ))),
        }
    }

    /// Enter `Closed`. Only valid from `Ready`.
    pub fn close(&mut self) -> ScalerResult<()> {
        self.transition(ConnectionState::Ready, ConnectionState::Closed)
    }

    fn transition(&mut self, from: ConnectionState, to: ConnectionState) -> ScalerResult<()> {
        if self.state == ConnectionState::Closed {
            return Err(ScalerError::Closed);
        }
        if self.state != from {
            return Err(ScalerError::Connection(format!(
                "{} scaler cannot move from {:?} to {to:?}",
                self.kind, self.state
            )));
        }
        debug!(kind = self.kind, from = ?self.state, to = ?to, "connection state changed");
        self.state = to;
        Ok(())
    }
}
