use std::sync::Arc;
use std::thread;

use mavbridge_link::{Link, Packet, PacketHandler, UdpLink, UdpLinkConfig, MAX_PAYLOAD};
use serde::Serialize;

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{transport_error, CliError, CliResult, SUCCESS};
use crate::output::{print_value, OutputFormat};

#[derive(Serialize)]
struct SendSummary {
    remote: String,
    message_id: u8,
    system_id: u8,
    component_id: u8,
    payload_size: usize,
    sent: usize,
}

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let payload = resolve_payload(&args)?;
    if payload.len() > MAX_PAYLOAD {
        return Err(CliError::usage(format!(
            "payload is {} bytes, max {MAX_PAYLOAD}",
            payload.len()
        )));
    }

    let ignore: PacketHandler = Arc::new(|_: &Packet| {});
    let config = UdpLinkConfig::new(args.bind).with_remote(args.remote);
    let link = UdpLink::open("send", config, ignore)
        .map_err(|err| transport_error("bind failed", err))?;

    let packet = Packet::new(
        args.msg_id,
        args.system_id,
        args.component_id,
        0,
        payload.clone(),
    );
    for index in 0..args.count {
        if index > 0 {
            thread::sleep(interval);
        }
        link.send(&packet)
            .map_err(|err| transport_error("send failed", err))?;
    }
    link.close();

    print_value(
        &SendSummary {
            remote: args.remote.to_string(),
            message_id: args.msg_id,
            system_id: args.system_id,
            component_id: args.component_id,
            payload_size: payload.len(),
            sent: args.count,
        },
        format,
    );
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }
    Ok(Vec::new())
}

fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input.split_whitespace().collect();
    hex::decode(&digits).map_err(|err| CliError::usage(format!("--hex: {err}")))
}
