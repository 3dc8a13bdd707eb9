//! Table configuration.

use serde::{Deserialize, Serialize};

use crate::game::entities::{BettingType, Blinds};
use crate::game::variant::Variant;

/// Everything needed to open a table. System tables come from the
/// lobby's stake sheet; user tables arrive over the wire and are
/// validated before a single chip moves.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TableConfig {
    pub variant: Variant,
    pub betting: BettingType,
    pub blinds: Blinds,
    pub stake_label: String,
    pub system: bool,
}

impl TableConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.blinds.small == 0 {
            return Err("small blind must be positive".to_string());
        }
        if self.blinds.big <= self.blinds.small {
            return Err("big blind must be greater than small blind".to_string());
        }
        if self.stake_label.is_empty() || self.stake_label.len() > 16 {
            return Err("stake label must be 1-16 characters".to_string());
        }
        Ok(())
    }
}
