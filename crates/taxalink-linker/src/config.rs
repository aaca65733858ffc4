use crate::LinkError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkerConfig {
    /// Records handed to the matcher per call.
    pub batch_size: usize,
}

impl LinkerConfig {
    pub fn new(batch_size: usize) -> Result<Self, LinkError> {
        let config = Self { batch_size };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        if self.batch_size == 0 {
            return Err(LinkError::InvalidBatchSize);
        }
        Ok(())
    }
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}
