use mavbridge_link::Packet;
use mavbridge_router::{Module, ModuleContext, SubscriberError};
use tracing::info;

use crate::output::{print_packet, OutputFormat};

/// Module that prints every packet of its message ids to stdout.
pub struct PacketPrinter {
    ids: Vec<u32>,
    format: OutputFormat,
}

impl PacketPrinter {
    pub fn new(ids: Vec<u32>, format: OutputFormat) -> Self {
        Self { ids, format }
    }
}

impl Module for PacketPrinter {
    fn name(&self) -> &str {
        "packet-printer"
    }

    fn initialize(&self, context: &ModuleContext) -> Result<(), SubscriberError> {
        if self.ids.is_empty() {
            return Err("no message ids selected".into());
        }
        info!(
            ids = ?self.ids,
            system_id = context.system_id,
            "printing flight controller packets"
        );
        Ok(())
    }

    fn supported_ids(&self) -> Vec<u32> {
        self.ids.clone()
    }

    fn receive(
        &self,
        packet: &Packet,
        _system_id: u8,
        _component_id: u8,
    ) -> Result<(), SubscriberError> {
        print_packet(packet, "fcu", self.format);
        Ok(())
    }
}
