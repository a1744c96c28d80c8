use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use mavbridge_ftf::StaticTf;
use mavbridge_link::LinkUrl;

use crate::exit::{CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod bridge;
pub mod listen;
pub mod printer;
pub mod send;
pub mod transform;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bridge a flight controller link to a ground station link.
    Bridge(BridgeArgs),
    /// Listen on a UDP port and print received packets.
    Listen(ListenArgs),
    /// Send packets to a UDP endpoint.
    Send(SendArgs),
    /// Convert values between NED/ENU or aircraft/base_link frames.
    Transform(TransformArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Bridge(args) => bridge::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Transform(args) => transform::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct BridgeArgs {
    /// Flight controller link.
    #[arg(
        long,
        env = "MAVBRIDGE_FCU_URL",
        default_value = "serial:///dev/ttyACM0:57600"
    )]
    pub fcu_url: LinkUrl,
    /// Ground station link.
    #[arg(long, env = "MAVBRIDGE_GCS_URL", default_value = "udp://0.0.0.0:14555@")]
    pub gcs_url: LinkUrl,
    /// System id used for packets this bridge originates.
    #[arg(long, default_value = "1")]
    pub system_id: u8,
    /// Component id used for packets this bridge originates.
    #[arg(long, default_value = "240")]
    pub component_id: u8,
    /// Print flight controller packets with these message ids (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub print_ids: Option<Vec<u32>>,
    /// How often link diagnostics are logged (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub status_interval: String,
    /// Stop after this long instead of waiting for Ctrl-C.
    #[arg(long)]
    pub run_for: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Local address to bind.
    pub bind: SocketAddr,
    /// Filter to specific message ids (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub msg_ids: Option<Vec<u8>>,
    /// Exit after receiving N packets.
    #[arg(long)]
    pub count: Option<usize>,
    /// Give up if nothing arrives for this long (e.g. 5s, 500ms).
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Remote address to send to.
    pub remote: SocketAddr,
    /// Local address to bind.
    #[arg(long, default_value = "0.0.0.0:0")]
    pub bind: SocketAddr,
    /// Message id.
    #[arg(long, default_value = "0")]
    pub msg_id: u8,
    /// Source system id.
    #[arg(long, default_value = "255")]
    pub system_id: u8,
    /// Source component id.
    #[arg(long, default_value = "190")]
    pub component_id: u8,
    /// Raw string payload.
    #[arg(long, conflicts_with = "hex")]
    pub data: Option<String>,
    /// Hex payload (e.g. 0a1bff).
    #[arg(long, conflicts_with = "data")]
    pub hex: Option<String>,
    /// Number of packets to send.
    #[arg(long, default_value = "1")]
    pub count: usize,
    /// Delay between packets (e.g. 100ms).
    #[arg(long, default_value = "10ms")]
    pub interval: String,
}

#[derive(Args, Debug)]
pub struct TransformArgs {
    #[command(subcommand)]
    pub kind: TransformKind,
}

#[derive(Subcommand, Debug)]
pub enum TransformKind {
    /// Rotate a 3-vector (x,y,z).
    Vector(TransformValues),
    /// Convert an orientation given as roll,pitch,yaw or w,x,y,z.
    Orientation(TransformValues),
    /// Rotate a 3x3 covariance (6 packed or 9 row-major values).
    Cov3(TransformValues),
    /// Rotate a 6x6 covariance (21 packed or 36 row-major values).
    Cov6(TransformValues),
}

#[derive(Args, Debug)]
pub struct TransformValues {
    /// Input values, comma or space separated.
    #[arg(value_delimiter = ',', allow_negative_numbers = true, required = true)]
    pub values: Vec<f64>,
    #[command(flatten)]
    pub target: TransformTarget,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct TransformTarget {
    /// Fixed conversion: ned-to-enu, enu-to-ned, aircraft-to-baselink or
    /// baselink-to-aircraft.
    #[arg(long)]
    pub direction: Option<StaticTf>,
    /// Arbitrary rotation as w,x,y,z (normalized before use).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub quaternion: Option<Vec<f64>>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

pub(crate) fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
