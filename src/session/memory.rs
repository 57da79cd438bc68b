//! In-memory session collaborator.
//!
//! Serves [`DeviceRecord`]s keyed by address and records every connection
//! attempt, so callers can check how often and how a device was contacted.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{Credential, DeviceRecord, Protocol, RecordSession, SessionConnector, SessionError, TransportOptions};

/// One call to [`SessionConnector::connect`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectAttempt {
    pub address: String,
    pub username: String,
    pub protocol: Protocol,
}

#[derive(Debug, Default)]
pub struct MemoryConnector {
    devices: HashMap<String, DeviceRecord>,
    attempts: Mutex<Vec<ConnectAttempt>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device reachable at `address`
    pub fn with_device(mut self, address: impl Into<String>, record: DeviceRecord) -> Self {
        self.devices.insert(address.into(), record);
        self
    }

    pub fn insert(&mut self, address: impl Into<String>, record: DeviceRecord) {
        self.devices.insert(address.into(), record);
    }

    /// All attempts so far, in call order
    pub fn attempts(&self) -> Vec<ConnectAttempt> {
        self.attempts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Number of attempts made against one address
    pub fn attempts_for(&self, address: &str) -> usize {
        self.attempts().iter().filter(|a| a.address == address).count()
    }
}

impl SessionConnector for MemoryConnector {
    type Session = RecordSession;

    fn connect(
        &self,
        address: &str,
        credential: &Credential,
        transport: &TransportOptions,
    ) -> Result<RecordSession, SessionError> {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(ConnectAttempt {
                address: address.to_string(),
                username: credential.username.clone(),
                protocol: transport.protocol,
            });
        }

        let record = self.devices.get(address).ok_or_else(|| SessionError::Connection {
            address: address.to_string(),
            reason: "host unreachable".to_string(),
        })?;
        record.admit(address, credential, transport)?;
        Ok(RecordSession::new(record.clone()))
    }
}
