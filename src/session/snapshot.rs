//! File-backed session collaborator.
//!
//! Each device is a YAML file named after the address used to reach it,
//! `<dir>/<address>.yaml`, holding a [`DeviceRecord`]. A device whose file
//! is missing is treated as unreachable.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::debug;

use super::{Credential, DeviceRecord, RecordSession, SessionConnector, SessionError, TransportOptions};

/// Connector serving saved device snapshots
#[derive(Debug, Clone)]
pub struct SnapshotConnector {
    dir: PathBuf,
}

impl SnapshotConnector {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn snapshot_path(&self, address: &str) -> PathBuf {
        self.dir.join(format!("{}.yaml", address))
    }

    /// Load the snapshot of one device
    pub fn load(&self, address: &str) -> Result<DeviceRecord, SessionError> {
        let path = self.snapshot_path(address);
        let connection_error = |reason: String| SessionError::Connection {
            address: address.to_string(),
            reason,
        };

        let file = File::open(&path).map_err(|e| connection_error(format!("{}: {}", path.display(), e)))?;
        serde_yaml::from_reader(file).map_err(|e| connection_error(format!("invalid snapshot {}: {}", path.display(), e)))
    }
}

impl SessionConnector for SnapshotConnector {
    type Session = RecordSession;

    fn connect(
        &self,
        address: &str,
        credential: &Credential,
        transport: &TransportOptions,
    ) -> Result<RecordSession, SessionError> {
        debug!(
            "Opening snapshot of {} as {} over {:?}",
            address, credential.username, transport.protocol
        );
        let record = self.load(address)?;
        record.admit(address, credential, transport)?;
        Ok(RecordSession::new(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DeviceSession;
    use std::io::Write;

    #[test]
    fn test_connect_reads_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = File::create(dir.path().join("10.0.0.1.yaml")).unwrap();
        writeln!(file, "facts:\n  hostname: core1\nrunning_config: \"interface Vlan1\\n\"").unwrap();

        let connector = SnapshotConnector::new(dir.path());
        let mut session = connector
            .connect("10.0.0.1", &Credential::new("admin", "pw"), &TransportOptions::default())
            .unwrap();

        assert_eq!(session.facts().unwrap().hostname, "core1");
        assert_eq!(session.running_config().unwrap(), "interface Vlan1\n");
        assert!(session.cdp_neighbors().unwrap().is_empty());
    }

    #[test]
    fn test_missing_snapshot_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let connector = SnapshotConnector::new(dir.path());

        let err = connector
            .connect("10.9.9.9", &Credential::new("admin", "pw"), &TransportOptions::default())
            .unwrap_err();
        assert!(matches!(err, SessionError::Connection { .. }));
        assert!(err.is_login_failure());
    }

    #[test]
    fn test_wrong_credentials_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("sw1.yaml"),
            "username: netops\npassword: hunter2\nfacts:\n  hostname: sw1\n",
        )
        .unwrap();

        let connector = SnapshotConnector::new(dir.path());
        let err = connector
            .connect("sw1", &Credential::new("admin", "admin"), &TransportOptions::default())
            .unwrap_err();
        assert!(matches!(err, SessionError::Authentication { .. }));

        assert!(connector
            .connect("sw1", &Credential::new("netops", "hunter2"), &TransportOptions::default())
            .is_ok());
    }
}
