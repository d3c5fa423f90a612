//! Composition of a [`ModuleCore`] with component-specific behavior

use serde_json::{json, Value};

use super::error::ModuleResult;
use super::module_core::ModuleCore;
use crate::types::{Message, MessageResponse};

/// Overridable behavior of a pipeline component
///
/// Every hook has a default, so a component only implements what it needs.
/// Hooks receive the core for logging and I/O tracking.
pub trait ModuleHandler: Send {
    fn on_initialize(&mut self, _core: &ModuleCore) -> ModuleResult<()> {
        Ok(())
    }

    fn on_destroy(&mut self, _core: &ModuleCore) {}

    /// Process incoming data; the default passes it through unchanged
    fn receive_data(&mut self, _core: &ModuleCore, data: Value) -> ModuleResult<Value> {
        Ok(data)
    }

    /// Handle a message the core does not answer itself
    fn handle_message(&mut self, _core: &ModuleCore, message: &Message) -> MessageResponse {
        MessageResponse::unsupported(&message.message_type)
    }
}

/// Handler with every default
#[derive(Debug, Default, Clone, Copy)]
pub struct BaseHandler;

impl ModuleHandler for BaseHandler {}

/// A pipeline component: shared core plus its handler
pub struct Component<H: ModuleHandler = BaseHandler> {
    core: ModuleCore,
    handler: H,
}

impl Component<BaseHandler> {
    pub fn base(core: ModuleCore) -> Self {
        Self::new(core, BaseHandler)
    }
}

impl<H: ModuleHandler> Component<H> {
    pub fn new(core: ModuleCore, handler: H) -> Self {
        Self { core, handler }
    }

    pub fn core(&self) -> &ModuleCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn configure(&mut self, options: Value) -> ModuleResult<()> {
        self.core.configure(options)
    }

    /// Run the handler's init hook once, then lock configuration
    pub fn initialize(&mut self) -> ModuleResult<()> {
        self.core.ensure_active()?;
        if self.core.is_initialized() {
            return Ok(());
        }
        self.handler.on_initialize(&self.core)?;
        self.core.initialize()?;
        Ok(())
    }

    /// Returns false if the component was already destroyed
    pub fn destroy(&mut self) -> bool {
        if self.core.is_destroyed() {
            return false;
        }
        self.handler.on_destroy(&self.core);
        self.core.destroy()
    }

    pub fn handle_message(&mut self, message: &Message) -> MessageResponse {
        self.core.debug(
            "Handling message",
            Some(json!({
                "messageId": message.id,
                "type": message.message_type,
                "source": message.source,
            })),
        );
        if let Some(response) = self.core.handle_builtin_message(message) {
            return response;
        }
        self.handler.handle_message(&self.core, message)
    }

    /// Hand `data` to the handler
    ///
    /// With `autoRecord` on, the call is tracked as one I/O operation whose
    /// outcome follows the handler's result.
    pub fn receive_data(&mut self, data: Value) -> ModuleResult<Value> {
        self.core
            .trace_data_flow("Received data", json!({ "data": data }));

        if !self.core.debug_config().io_tracking.auto_record {
            return self.handler.receive_data(&self.core, data);
        }

        let operation_id = format!("receive_{}", uuid::Uuid::new_v4().simple());
        self.core
            .start_io_tracking(&operation_id, data.clone(), Some("receiveData"));

        let result = self.handler.receive_data(&self.core, data);
        match &result {
            Ok(output) => {
                self.core
                    .end_io_tracking(&operation_id, output.clone(), true, None);
            }
            Err(e) => {
                self.core
                    .end_io_tracking(&operation_id, Value::Null, false, Some(e.to_string()));
            }
        }
        result
    }
}
