use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use mavbridge_link::{open_link, LinkConfig, LinkHealth, LinkMonitor};
use mavbridge_router::{LinkForwarder, LinkStream, ModuleContext, Registry, Router};
use tracing::{info, warn};

use crate::cmd::printer::PacketPrinter;
use crate::cmd::{install_ctrlc_handler, parse_duration, BridgeArgs};
use crate::exit::{router_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_link_health, OutputFormat};

const POLL_STEP: Duration = Duration::from_millis(50);

pub fn run(args: BridgeArgs, format: OutputFormat) -> CliResult<i32> {
    let status_interval = parse_duration(&args.status_interval)?;
    let run_for = args.run_for.as_deref().map(parse_duration).transpose()?;
    let config = LinkConfig::default();

    // Subscribers go on the streams before the links start receiving.
    // Forwarders drop until their target is bound just below.
    let router = Arc::new(Router::new());
    let to_gcs = LinkForwarder::unbound("gcs");
    let to_fcu = LinkForwarder::unbound("fcu");
    let fcu_stream = LinkStream::new("fcu");
    let gcs_stream = LinkStream::new("gcs");
    fcu_stream.connect(to_gcs.clone());
    fcu_stream.connect(router.clone());
    gcs_stream.connect(to_fcu.clone());

    let fcu = open_link(&args.fcu_url, "fcu", &config, fcu_stream.handler())
        .map_err(|err| transport_error("failed to open fcu link", err))?;
    let gcs = open_link(&args.gcs_url, "gcs", &config, gcs_stream.handler())
        .map_err(|err| transport_error("failed to open gcs link", err))?;
    to_gcs.bind(&gcs);
    to_fcu.bind(&fcu);
    info!(fcu = %args.fcu_url, gcs = %args.gcs_url, "bridge started");

    let context = ModuleContext::new(Arc::clone(&router), args.system_id, args.component_id)
        .with_uplink(Arc::clone(&fcu));
    let mut registry = Registry::new(context);
    if let Some(ids) = args.print_ids {
        registry
            .load(Arc::new(PacketPrinter::new(ids, format)))
            .map_err(|err| router_error("--print-ids", err))?;
    }

    let mut monitors = [LinkMonitor::new("FCU connection"), LinkMonitor::new("GCS bridge")];
    monitors[0].attach(&fcu);
    monitors[1].attach(&gcs);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let started = Instant::now();
    let mut next_report = started + status_interval;
    while running.load(Ordering::SeqCst) {
        if run_for.is_some_and(|limit| started.elapsed() >= limit) {
            break;
        }
        thread::sleep(POLL_STEP);

        if Instant::now() >= next_report {
            next_report += status_interval;
            for monitor in &mut monitors {
                let health = monitor.check();
                log_health(monitor.name(), &health);
            }
        }
    }

    info!(stats = ?router.stats(), "bridge stopping");
    let reports: Vec<(String, LinkHealth)> = monitors
        .iter_mut()
        .map(|monitor| (monitor.name().to_string(), monitor.check()))
        .collect();
    registry.unload_all();
    fcu.close();
    gcs.close();

    print_link_health(&reports, format);

    Ok(SUCCESS)
}

fn log_health(name: &str, health: &LinkHealth) {
    match health {
        LinkHealth::Connected { status } => info!(
            link = name,
            rx = status.rx_success,
            parse_errors = status.parse_error,
            "{}",
            health.summary()
        ),
        LinkHealth::Dropping { new_drops, .. } => {
            warn!(link = name, new_drops, "{}", health.summary())
        }
        LinkHealth::Disconnected => warn!(link = name, "{}", health.summary()),
    }
}
