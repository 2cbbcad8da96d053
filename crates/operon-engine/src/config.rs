//! Partition configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use operon_protocol::PartitionId;

/// Configuration of one partition runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// This partition's id (1-based).
    pub partition_id: PartitionId,
    /// Total number of partitions in the cluster; determines the
    /// distribution fan-out.
    pub partition_count: u32,
    /// Directory for the embedded store. When absent the store is
    /// in-memory (tests, tooling).
    pub data_dir: Option<PathBuf>,
    /// Capacity of each read-through cache.
    pub cache_capacity: usize,
    /// Run foreign-key and presence checks on writes.
    pub consistency_checks: bool,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            partition_id: 1,
            partition_count: 1,
            data_dir: None,
            cache_capacity: operon_state::DEFAULT_CACHE_CAPACITY,
            consistency_checks: true,
        }
    }
}

impl PartitionConfig {
    /// Load the configuration from a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PartitionConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// The store file for this partition, if it runs on disk.
    pub fn db_path(&self) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(format!("partition-{}.redb", self.partition_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_a_standalone_partition() {
        let config = PartitionConfig::default();
        assert_eq!(config.partition_id, 1);
        assert_eq!(config.partition_count, 1);
        assert!(config.data_dir.is_none());
        assert_eq!(config.cache_capacity, 10_000);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: PartitionConfig =
            toml::from_str("partition_id = 3\npartition_count = 4\n").unwrap();
        assert_eq!(config.partition_id, 3);
        assert_eq!(config.partition_count, 4);
        assert_eq!(config.cache_capacity, 10_000);
        assert!(config.consistency_checks);
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partition.toml");
        std::fs::write(&path, "partition_id = 2\ndata_dir = \"/var/lib/operon\"\n").unwrap();

        let config = PartitionConfig::from_file(&path).unwrap();
        assert_eq!(config.partition_id, 2);
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/operon")));
    }

    #[test]
    fn db_path_is_partition_scoped() {
        let config = PartitionConfig {
            data_dir: Some(PathBuf::from("/var/lib/operon")),
            partition_id: 2,
            ..PartitionConfig::default()
        };
        assert_eq!(
            config.db_path().unwrap(),
            PathBuf::from("/var/lib/operon/partition-2.redb")
        );
    }
}
