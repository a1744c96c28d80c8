mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "mavbridge", version, about = "MAVLink telemetry bridge")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use mavbridge_ftf::StaticTf;
    use mavbridge_link::LinkUrl;

    use super::*;
    use crate::cmd::TransformKind;

    #[test]
    fn bridge_defaults() {
        let cli = Cli::try_parse_from(["mavbridge", "bridge"]).expect("bridge args should parse");
        let Command::Bridge(args) = cli.command else {
            panic!("expected bridge");
        };
        if std::env::var_os("MAVBRIDGE_FCU_URL").is_none() {
            assert_eq!(args.fcu_url.to_string(), "serial:///dev/ttyACM0:57600");
        }
        if std::env::var_os("MAVBRIDGE_GCS_URL").is_none() {
            assert!(matches!(args.gcs_url, LinkUrl::Udp { remote: None, .. }));
        }
        assert_eq!(args.system_id, 1);
        assert_eq!(args.component_id, 240);
    }

    #[test]
    fn rejects_bad_link_url() {
        let err = Cli::try_parse_from(["mavbridge", "bridge", "--fcu-url", "tcp://localhost:5760"])
            .expect_err("unknown scheme should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "mavbridge",
            "send",
            "127.0.0.1:14550",
            "--data",
            "hello",
            "--hex",
            "00",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_transform_with_negative_values() {
        let cli = Cli::try_parse_from([
            "mavbridge",
            "transform",
            "vector",
            "-1",
            "2",
            "-3",
            "--direction",
            "ned-to-enu",
        ])
        .expect("transform args should parse");

        let Command::Transform(args) = cli.command else {
            panic!("expected transform");
        };
        let TransformKind::Vector(values) = args.kind else {
            panic!("expected vector");
        };
        assert_eq!(values.values, vec![-1.0, 2.0, -3.0]);
        assert_eq!(values.target.direction, Some(StaticTf::NedToEnu));
    }

    #[test]
    fn transform_needs_exactly_one_target() {
        let missing = Cli::try_parse_from(["mavbridge", "transform", "vector", "1,2,3"]);
        assert!(missing.is_err());

        let both = Cli::try_parse_from([
            "mavbridge",
            "transform",
            "vector",
            "1,2,3",
            "--direction",
            "ned-to-enu",
            "--quaternion",
            "1,0,0,0",
        ]);
        assert!(both.is_err());
    }
}
