use std::path::{Path, PathBuf};
use std::sync::Arc;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::info;

use crate::error::{Result, TransportError};
use crate::stream::StreamLink;
use crate::traits::{LinkConfig, PacketHandler};

/// Configuration for a serial link.
#[derive(Debug, Clone)]
pub struct SerialLinkConfig {
    /// Device path, e.g. `/dev/ttyACM0`.
    pub device: PathBuf,
    /// Line speed in baud.
    pub baud: u32,
    /// Shared link settings.
    pub link: LinkConfig,
}

impl SerialLinkConfig {
    pub fn new(device: impl Into<PathBuf>, baud: u32) -> Self {
        Self {
            device: device.into(),
            baud,
            link: LinkConfig::default(),
        }
    }
}

/// Serial device link: a raw 8N1 port driven by a [`StreamLink`].
///
/// A quiet line is not a hangup. Reads that see no byte within
/// `read_timeout` come back as `TimedOut` and the link keeps waiting.
pub struct SerialLink;

impl SerialLink {
    /// Open and configure the device, then start the link threads.
    ///
    /// Failure here is a startup failure: the device is missing, busy, or
    /// does not accept the requested speed.
    pub fn open(
        name: impl Into<String>,
        config: SerialLinkConfig,
        handler: PacketHandler,
    ) -> Result<Arc<StreamLink>> {
        let path = config.device.to_string_lossy();
        let port = serialport::new(path, config.baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.link.read_timeout)
            .open()
            .map_err(|err| open_error(&config.device, err))?;

        info!(device = ?config.device, baud = config.baud, "serial device configured");
        Self::from_port(name, port, &config.device, &config.link, handler)
    }

    /// Run a link over a port that is already open.
    pub fn from_port(
        name: impl Into<String>,
        mut port: Box<dyn SerialPort>,
        device: &Path,
        config: &LinkConfig,
        handler: PacketHandler,
    ) -> Result<Arc<StreamLink>> {
        port.set_timeout(config.read_timeout)
            .map_err(|err| open_error(device, err))?;
        let reader = port.try_clone().map_err(|err| open_error(device, err))?;
        StreamLink::spawn(name, reader, port, config, handler)
    }
}

fn open_error(path: &Path, err: serialport::Error) -> TransportError {
    TransportError::Open {
        path: path.to_path_buf(),
        source: err.into(),
    }
}
