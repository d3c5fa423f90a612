//! Input and output connection registries

use std::collections::HashMap;

use super::error::{ModuleError, ModuleResult};
use crate::types::{Connection, ConnectionDirection};

/// Two independent id-keyed registries, one per direction
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    inputs: HashMap<String, Connection>,
    outputs: HashMap<String, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_direction(connection: &Connection, expected: ConnectionDirection) -> ModuleResult<()> {
        if connection.direction != expected {
            return Err(ModuleError::ConnectionDirection {
                connection_id: connection.id.clone(),
                expected,
                actual: connection.direction,
            });
        }
        Ok(())
    }

    /// Insert an input connection, replacing one with the same id
    pub fn add_input(&mut self, connection: Connection) -> ModuleResult<()> {
        Self::check_direction(&connection, ConnectionDirection::Input)?;
        self.inputs.insert(connection.id.clone(), connection);
        Ok(())
    }

    /// Insert an output connection, replacing one with the same id
    pub fn add_output(&mut self, connection: Connection) -> ModuleResult<()> {
        Self::check_direction(&connection, ConnectionDirection::Output)?;
        self.outputs.insert(connection.id.clone(), connection);
        Ok(())
    }

    pub fn remove_input(&mut self, id: &str) -> Option<Connection> {
        self.inputs.remove(id)
    }

    pub fn remove_output(&mut self, id: &str) -> Option<Connection> {
        self.outputs.remove(id)
    }

    /// Input connections sorted by id
    pub fn inputs(&self) -> Vec<&Connection> {
        let mut list: Vec<_> = self.inputs.values().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    /// Output connections sorted by id
    pub fn outputs(&self) -> Vec<&Connection> {
        let mut list: Vec<_> = self.outputs.values().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn clear(&mut self) {
        self.inputs.clear();
        self.outputs.clear();
    }
}
