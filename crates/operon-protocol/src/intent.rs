//! Intents — lifecycle phase tags carried on every log record.
//!
//! Each value type has its own intent enum; [`Intent`] is the tagged union
//! carried in the record envelope. Command intents (`Delete`, `Acknowledge`)
//! mark work to be done; event intents mark work that has happened and are
//! authoritative for replay.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record::ValueType;

/// Lifecycle intents for the resource-deletion command and its bracketing
/// events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceDeletionIntent {
    /// Command: delete the resource at `resourceKey`.
    Delete,
    Deleting,
    Deleted,
}

/// Lifecycle intents for deployed process definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessIntent {
    Created,
    Deleting,
    Deleted,
}

/// Lifecycle intents for deployed decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionIntent {
    Created,
    Deleted,
}

/// Lifecycle intents for deployed decision requirements graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionRequirementsIntent {
    Created,
    Deleted,
}

/// Intents for cross-partition command distribution bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandDistributionIntent {
    /// Event: a copy of the command was scheduled for one peer partition.
    Distributing,
    /// Command: a peer reports that it applied the distributed command.
    Acknowledge,
    /// Event: the originator recorded the peer's acknowledgement.
    Acknowledged,
}

/// The intent tag carried in a record envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    ResourceDeletion(ResourceDeletionIntent),
    Process(ProcessIntent),
    Decision(DecisionIntent),
    DecisionRequirements(DecisionRequirementsIntent),
    CommandDistribution(CommandDistributionIntent),
}

impl Intent {
    /// The value type this intent belongs to.
    pub fn value_type(&self) -> ValueType {
        match self {
            Intent::ResourceDeletion(_) => ValueType::ResourceDeletion,
            Intent::Process(_) => ValueType::Process,
            Intent::Decision(_) => ValueType::Decision,
            Intent::DecisionRequirements(_) => ValueType::DecisionRequirements,
            Intent::CommandDistribution(_) => ValueType::CommandDistribution,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::ResourceDeletion(i) => write!(f, "ResourceDeletion:{i:?}"),
            Intent::Process(i) => write!(f, "Process:{i:?}"),
            Intent::Decision(i) => write!(f, "Decision:{i:?}"),
            Intent::DecisionRequirements(i) => write!(f, "DecisionRequirements:{i:?}"),
            Intent::CommandDistribution(i) => write!(f, "CommandDistribution:{i:?}"),
        }
    }
}
