//! Replication section of `INFO`.
//!
//! The server always reports itself as a master with no replicas. Only the
//! replication id varies: it is drawn from the OS random source at startup.

use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

/// Number of random bytes in a replication id (rendered as 40 hex digits).
pub const REPLID_BYTES: usize = 20;

/// Errors raised while building the replication info.
#[derive(Debug, Error)]
pub enum InfoError {
    #[error("could not generate replication id: {0}")]
    Randomness(#[from] rand::Error),
}

/// Fixed replication fields in the order they are reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationInfo {
    fields: Vec<(&'static str, String)>,
}

impl ReplicationInfo {
    /// Builds the info block with a fresh random replication id.
    pub fn generate() -> Result<Self, InfoError> {
        let mut bytes = [0u8; REPLID_BYTES];
        OsRng.try_fill_bytes(&mut bytes)?;
        let replid: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        Ok(Self::with_replid(replid))
    }

    /// Builds the info block with the given replication id.
    pub fn with_replid(replid: impl Into<String>) -> Self {
        let fields = vec![
            ("role", "master".to_string()),
            ("connected_slaves", "0".to_string()),
            ("master_replid", replid.into()),
            ("master_repl_offset", "0".to_string()),
            ("second_repl_offset", "-1".to_string()),
            ("repl_backlog_active", "0".to_string()),
            ("repl_backlog_size", "1048576".to_string()),
            ("repl_backlog_first_byte_offset", "0".to_string()),
            ("repl_backlog_histlen", String::new()),
        ];
        Self { fields }
    }

    /// Looks up a single field.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value.as_str())
    }

    pub fn replid(&self) -> &str {
        self.get("master_replid").unwrap_or_default()
    }

    /// Renders the section as `# Replication` followed by `field:value` lines.
    pub fn render(&self) -> String {
        let mut out = String::from("# Replication\r\n");
        for (name, value) in &self.fields {
            out.push_str(name);
            out.push(':');
            out.push_str(value);
            out.push_str("\r\n");
        }
        out
    }
}
