//! Named disk lookup

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::errors::DomainError;
use crate::ports::DiskPort;

/// Disks available to exports, by name
#[derive(Clone, Default)]
pub struct DiskRegistry {
    disks: BTreeMap<String, Arc<dyn DiskPort>>,
}

impl fmt::Debug for DiskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskRegistry")
            .field("disks", &self.disks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DiskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a disk under its own name, replacing any previous one
    pub fn register(&mut self, disk: Arc<dyn DiskPort>) -> &mut Self {
        self.disks.insert(disk.name().to_string(), disk);
        self
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn DiskPort>, DomainError> {
        self.disks
            .get(name)
            .cloned()
            .ok_or_else(|| DomainError::DiskNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.disks.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.disks.keys().map(String::as_str).collect()
    }
}
