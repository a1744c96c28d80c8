use std::sync::Arc;

use mavbridge_link::{Link, Packet};
use tracing::{debug, error, info};

use crate::error::{Result, RouterError};
use crate::router::{Router, MESSAGE_ID_SLOTS};
use crate::subscriber::{Subscriber, SubscriberError};

/// What a module gets to work with during [`Module::initialize`].
#[derive(Clone)]
pub struct ModuleContext {
    /// Router the module is registered on.
    pub router: Arc<Router>,
    /// System id this bridge speaks as.
    pub system_id: u8,
    /// Component id this bridge speaks as.
    pub component_id: u8,
    /// Link towards the vehicle, if any.
    pub uplink: Option<Arc<dyn Link>>,
}

impl ModuleContext {
    pub fn new(router: Arc<Router>, system_id: u8, component_id: u8) -> Self {
        Self {
            router,
            system_id,
            component_id,
            uplink: None,
        }
    }

    pub fn with_uplink(mut self, uplink: Arc<dyn Link>) -> Self {
        self.uplink = Some(uplink);
        self
    }

    /// Build a packet stamped with this bridge's ids.
    pub fn packet(&self, message_id: u8, payload: Vec<u8>) -> Packet {
        Packet::new(message_id, self.system_id, self.component_id, 0, payload)
    }

    /// Send a packet on the uplink.
    pub fn send(&self, packet: &Packet) -> Result<()> {
        let uplink = self.uplink.as_ref().ok_or(RouterError::NoUplink)?;
        uplink.send(packet)?;
        Ok(())
    }
}

impl std::fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleContext")
            .field("system_id", &self.system_id)
            .field("component_id", &self.component_id)
            .field("uplink", &self.uplink.as_ref().map(|link| link.name().to_string()))
            .finish_non_exhaustive()
    }
}

/// A unit of message handling loaded at startup.
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    /// Called once before the module is registered. An error skips the
    /// module.
    fn initialize(&self, context: &ModuleContext) -> std::result::Result<(), SubscriberError>;

    /// Message ids the module wants delivered.
    fn supported_ids(&self) -> Vec<u32>;

    fn receive(
        &self,
        packet: &Packet,
        system_id: u8,
        component_id: u8,
    ) -> std::result::Result<(), SubscriberError>;
}

struct ModuleSubscriber(Arc<dyn Module>);

impl Subscriber for ModuleSubscriber {
    fn receive(
        &self,
        packet: &Packet,
        system_id: u8,
        component_id: u8,
    ) -> std::result::Result<(), SubscriberError> {
        self.0.receive(packet, system_id, component_id)
    }

    fn name(&self) -> &str {
        self.0.name()
    }
}

struct Loaded {
    module: Arc<dyn Module>,
    subscriber: Arc<dyn Subscriber>,
    ids: Vec<u32>,
}

/// Explicit list of modules registered on one router.
///
/// Modules are loaded in order. Dropping the registry unregisters all of
/// them.
pub struct Registry {
    context: ModuleContext,
    loaded: Vec<Loaded>,
}

impl Registry {
    pub fn new(context: ModuleContext) -> Self {
        Self {
            context,
            loaded: Vec::new(),
        }
    }

    pub fn context(&self) -> &ModuleContext {
        &self.context
    }

    /// Initialize `module` and register it for its supported ids.
    ///
    /// On failure nothing stays registered for the module and the error is
    /// returned so the caller can carry on with the remaining modules.
    pub fn load(&mut self, module: Arc<dyn Module>) -> Result<()> {
        let name = module.name().to_string();
        if let Err(err) = module.initialize(&self.context) {
            error!(module = %name, error = %err, "module initialization failed");
            return Err(RouterError::ModuleInit {
                module: name,
                reason: err.to_string(),
            });
        }

        let ids = module.supported_ids();
        if let Some(&bad) = ids.iter().find(|&&id| id as usize >= MESSAGE_ID_SLOTS) {
            error!(module = %name, message_id = bad, "module requested invalid message id");
            return Err(RouterError::InvalidId(bad));
        }

        let subscriber: Arc<dyn Subscriber> = Arc::new(ModuleSubscriber(Arc::clone(&module)));
        for &id in &ids {
            self.context.router.register(id, Arc::clone(&subscriber))?;
        }
        info!(module = %name, ids = ids.len(), "module loaded");

        self.loaded.push(Loaded {
            module,
            subscriber,
            ids,
        });
        Ok(())
    }

    /// Names of the loaded modules, in load order.
    pub fn modules(&self) -> Vec<&str> {
        self.loaded.iter().map(|loaded| loaded.module.name()).collect()
    }

    /// Unregister every loaded module.
    pub fn unload_all(&mut self) {
        for loaded in self.loaded.drain(..) {
            for &id in &loaded.ids {
                // ids were validated at load time
                let _ = self.context.router.unregister(id, &loaded.subscriber);
            }
            debug!(module = loaded.module.name(), "module unloaded");
        }
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.unload_all();
    }
}
