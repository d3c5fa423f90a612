//! Component lifecycle state machine
//!
//! ```text
//! Created ──configure──► Configured ──┐
//!    │                     ▲  │        │
//!    │                     └──┘        │
//!    └──────────initialize─────────────┴──► Initialized ──destroy──► Destroyed
//! ```

use serde::Serialize;

use super::error::{ModuleError, ModuleResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    #[default]
    Created,
    Configured,
    Initialized,
    Destroyed,
}

/// Lifecycle of one component
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: LifecycleState,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Fail unless configuration may still change
    pub fn ensure_configurable(&self, module_id: &str) -> ModuleResult<()> {
        match self.state {
            LifecycleState::Created | LifecycleState::Configured => Ok(()),
            LifecycleState::Initialized => Err(ModuleError::ConfigurationLocked {
                module_id: module_id.to_string(),
            }),
            LifecycleState::Destroyed => Err(ModuleError::Destroyed {
                module_id: module_id.to_string(),
            }),
        }
    }

    pub fn ensure_not_destroyed(&self, module_id: &str) -> ModuleResult<()> {
        if self.state == LifecycleState::Destroyed {
            return Err(ModuleError::Destroyed {
                module_id: module_id.to_string(),
            });
        }
        Ok(())
    }

    pub fn mark_configured(&mut self) {
        if self.state == LifecycleState::Created {
            self.state = LifecycleState::Configured;
        }
    }

    /// Move to Initialized, returning false if already there
    pub fn mark_initialized(&mut self, module_id: &str) -> ModuleResult<bool> {
        self.ensure_not_destroyed(module_id)?;
        if self.state == LifecycleState::Initialized {
            return Ok(false);
        }
        self.state = LifecycleState::Initialized;
        Ok(true)
    }

    /// Move to Destroyed, returning false if already there
    pub fn mark_destroyed(&mut self) -> bool {
        if self.state == LifecycleState::Destroyed {
            return false;
        }
        self.state = LifecycleState::Destroyed;
        true
    }
}
