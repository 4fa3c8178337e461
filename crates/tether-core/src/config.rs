//! Engine configuration

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Transfer engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Outbound requests one send loop pass may have outstanding
    ///
    /// 1 sends files strictly one after another.
    pub max_in_flight: usize,

    /// Drop terminal records from the outbound queue after each pass
    pub prune_terminal: bool,

    /// First session id issued by the default id source
    pub first_session_id: i32,

    /// Largest file enqueue accepts, in bytes
    pub max_file_size: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 1,
            prune_terminal: true,
            first_session_id: 1,
            // fileSize is a 32-bit envelope field
            max_file_size: u64::from(u32::MAX),
        }
    }
}

impl TransferConfig {
    /// Check the configuration for values the engine cannot honor
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `max_in_flight` is zero or
    /// `max_file_size` does not fit the envelope's 32-bit size field.
    pub fn validate(&self) -> Result<()> {
        if self.max_in_flight == 0 {
            return Err(Error::InvalidConfig(
                "max_in_flight must be at least 1".to_string(),
            ));
        }
        if self.max_file_size > u64::from(u32::MAX) {
            return Err(Error::InvalidConfig(format!(
                "max_file_size {} exceeds the 32-bit envelope limit",
                self.max_file_size
            )));
        }
        Ok(())
    }
}
