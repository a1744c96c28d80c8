use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use mavbridge_link::{Link, Packet, UdpLink, UdpLinkConfig};
use mavbridge_router::{from_fn, LinkStream};
use tracing::info;

use crate::cmd::{install_ctrlc_handler, parse_duration, ListenArgs};
use crate::exit::{transport_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_packet, OutputFormat};

const POLL_STEP: Duration = Duration::from_millis(100);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = args.timeout.as_deref().map(parse_duration).transpose()?;

    let (tx, rx) = mpsc::channel::<Packet>();
    let tx = Mutex::new(tx);
    let stream = LinkStream::new("listen");
    stream.connect(from_fn("stdout", move |packet, _, _| {
        tx.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send(packet.clone())?;
        Ok(())
    }));

    let link = UdpLink::open("listen", UdpLinkConfig::new(args.bind), stream.handler())
        .map_err(|err| transport_error("bind failed", err))?;
    info!(bind = %link.local_addr(), "listening");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    let mut last_activity = Instant::now();

    while running.load(Ordering::SeqCst) {
        let packet = match rx.recv_timeout(POLL_STEP) {
            Ok(packet) => packet,
            Err(RecvTimeoutError::Timeout) => {
                if let Some(limit) = timeout {
                    if last_activity.elapsed() >= limit {
                        link.close();
                        return Err(CliError::new(
                            TIMEOUT,
                            format!("no packets received within {limit:?}"),
                        ));
                    }
                }
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };
        last_activity = Instant::now();

        if let Some(ids) = &args.msg_ids {
            if !ids.contains(&packet.message_id()) {
                continue;
            }
        }

        print_packet(&packet, link.name(), format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    link.close();
    Ok(SUCCESS)
}
