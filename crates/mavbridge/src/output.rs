use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use mavbridge_link::{LinkHealth, Packet};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PacketOutput<'a> {
    link: &'a str,
    message_id: u8,
    system_id: u8,
    component_id: u8,
    sequence: u8,
    payload_size: usize,
    payload: String,
    timestamp: String,
}

impl<'a> PacketOutput<'a> {
    fn new(packet: &Packet, link: &'a str) -> Self {
        Self {
            link,
            message_id: packet.message_id(),
            system_id: packet.system_id(),
            component_id: packet.component_id(),
            sequence: packet.sequence(),
            payload_size: packet.payload().len(),
            payload: hex::encode(packet.payload()),
            timestamp: now_unix_seconds(),
        }
    }
}

pub fn print_packet(packet: &Packet, link: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&PacketOutput::new(packet, link)),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["LINK", "MSGID", "SOURCE", "SEQ", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    link.to_string(),
                    packet.message_id().to_string(),
                    format!("{}/{}", packet.system_id(), packet.component_id()),
                    packet.sequence().to_string(),
                    packet.payload().len().to_string(),
                    hex::encode(packet.payload()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "link={} msgid={} source={}/{} seq={} size={} payload={}",
                link,
                packet.message_id(),
                packet.system_id(),
                packet.component_id(),
                packet.sequence(),
                packet.payload().len(),
                hex::encode(packet.payload())
            );
        }
        OutputFormat::Raw => {
            print_raw(packet.payload());
        }
    }
}

#[derive(Serialize)]
struct HealthOutput<'a> {
    link: &'a str,
    summary: String,
    #[serde(flatten)]
    health: &'a LinkHealth,
}

/// One row per monitored link.
pub fn print_link_health(reports: &[(String, LinkHealth)], format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            for (link, health) in reports {
                print_json(&HealthOutput {
                    link,
                    summary: health.summary(),
                    health,
                });
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "LINK", "STATE", "RX OK", "DROPPED", "PARSE ERR", "OVERRUN", "TX SEQ",
                ]);
            for (link, health) in reports {
                let counters = match health {
                    LinkHealth::Connected { status } | LinkHealth::Dropping { status, .. } => vec![
                        status.rx_success.to_string(),
                        status.rx_drop.to_string(),
                        status.parse_error.to_string(),
                        status.buffer_overrun.to_string(),
                        status.current_tx_seq.to_string(),
                    ],
                    LinkHealth::Disconnected => vec!["-".to_string(); 5],
                };
                let mut row = vec![link.clone(), health.summary()];
                row.extend(counters);
                table.add_row(row);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (link, health) in reports {
                println!("{link}: {}", health.summary());
            }
        }
    }
}

/// Any serializable result. Table and pretty fall back to indented JSON.
pub fn print_value<T: Serialize>(value: &T, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(value),
        OutputFormat::Table | OutputFormat::Pretty => println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
        ),
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
    let _ = std::io::stdout().flush();
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
