//! Table of started-but-not-ended operations

use std::collections::HashMap;

use crate::types::PendingOperation;

/// Pending operations keyed by `(module_id, operation_id)`
#[derive(Debug, Default)]
pub struct PendingOperations {
    operations: HashMap<(String, String), PendingOperation>,
}

impl PendingOperations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an operation, returning the one it replaced under the same key
    pub fn insert(&mut self, operation: PendingOperation) -> Option<PendingOperation> {
        let key = (operation.module_id.clone(), operation.operation_id.clone());
        self.operations.insert(key, operation)
    }

    pub fn take(&mut self, module_id: &str, operation_id: &str) -> Option<PendingOperation> {
        self.operations
            .remove(&(module_id.to_string(), operation_id.to_string()))
    }

    pub fn contains(&self, module_id: &str, operation_id: &str) -> bool {
        self.operations
            .contains_key(&(module_id.to_string(), operation_id.to_string()))
    }

    /// Remove and return every pending operation of a module, oldest first
    pub fn drain_module(&mut self, module_id: &str) -> Vec<PendingOperation> {
        let keys: Vec<_> = self
            .operations
            .keys()
            .filter(|(module, _)| module == module_id)
            .cloned()
            .collect();

        let mut drained: Vec<_> = keys
            .into_iter()
            .filter_map(|key| self.operations.remove(&key))
            .collect();
        drained.sort_by_key(|op| op.start_time);
        drained
    }

    /// Snapshot of all pending operations, oldest first
    pub fn snapshot(&self) -> Vec<PendingOperation> {
        let mut ops: Vec<_> = self.operations.values().cloned().collect();
        ops.sort_by_key(|op| op.start_time);
        ops
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
