#![cfg(all(unix, feature = "cli"))]

use std::net::{SocketAddr, UdpSocket};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use mavbridge::link::{decode_packet, encode_packet, Packet};

fn mavbridge() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_mavbridge"));
    command.arg("--log-level").arg("error");
    command
}

fn free_udp_addr() -> SocketAddr {
    UdpSocket::bind("127.0.0.1:0")
        .and_then(|socket| socket.local_addr())
        .expect("ephemeral port should be available")
}

fn frame(packet: &Packet) -> Vec<u8> {
    let mut buf = BytesMut::new();
    encode_packet(packet, &mut buf).expect("packet should encode");
    buf.to_vec()
}

/// Keep sending `datagram` to `target` until `child` exits.
fn send_until_exit(child: &mut Child, socket: &UdpSocket, target: SocketAddr, datagram: &[u8]) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while child.try_wait().expect("child status").is_none() {
        if Instant::now() >= deadline {
            let _ = child.kill();
            panic!("child did not exit");
        }
        let _ = socket.send_to(datagram, target);
        thread::sleep(Duration::from_millis(50));
    }
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("stdout line should be JSON"))
        .collect()
}

#[test]
fn version_prints_package_version() {
    let output = mavbridge().arg("version").output().expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("mavbridge {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn transform_vector_outputs_json() {
    let output = mavbridge()
        .args(["--format", "json", "transform", "vector", "1,2,3"])
        .args(["--direction", "ned-to-enu"])
        .output()
        .expect("transform should run");

    assert!(output.status.success());
    let lines = json_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["kind"], "vector");
    assert_eq!(lines[0]["transform"], "ned-to-enu");
    let values: Vec<f64> = lines[0]["output"]
        .as_array()
        .expect("output array")
        .iter()
        .map(|v| v.as_f64().expect("number"))
        .collect();
    for (actual, expected) in values.iter().zip([2.0, 1.0, -3.0]) {
        assert!((actual - expected).abs() < 1e-9);
    }
}

#[test]
fn transform_rejects_degenerate_quaternion_with_60() {
    let output = mavbridge()
        .args(["transform", "vector", "1,0,0", "--quaternion", "0,0,0,0"])
        .output()
        .expect("transform should run");
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn listen_timeout_returns_124() {
    let addr = free_udp_addr();
    let output = mavbridge()
        .args(["listen", &addr.to_string(), "--timeout", "300ms"])
        .output()
        .expect("listen should run");
    assert_eq!(output.status.code(), Some(124));
}

#[test]
fn send_emits_framed_packets() {
    let receiver = UdpSocket::bind("127.0.0.1:0").expect("receiver should bind");
    receiver
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("timeout should set");
    let remote = receiver.local_addr().expect("local addr").to_string();

    let output = mavbridge()
        .args(["--format", "json", "send", &remote, "--bind", "127.0.0.1:0"])
        .args(["--msg-id", "76", "--hex", "0a0b", "--count", "2"])
        .output()
        .expect("send should run");
    assert!(output.status.success());
    assert_eq!(json_lines(&output)[0]["sent"], 2);

    let mut buf = [0u8; 512];
    for expected_seq in 0..2u8 {
        let (len, _) = receiver.recv_from(&mut buf).expect("datagram expected");
        let mut wire = BytesMut::from(&buf[..len]);
        let packet = decode_packet(&mut wire)
            .expect("valid frame")
            .expect("complete frame");
        assert_eq!(packet.message_id(), 76);
        assert_eq!(packet.system_id(), 255);
        assert_eq!(packet.component_id(), 190);
        assert_eq!(packet.sequence(), expected_seq);
        assert_eq!(&packet.payload()[..], &[0x0a, 0x0b]);
    }
}

#[test]
fn listen_prints_matching_packets() {
    let addr = free_udp_addr();
    let mut child = mavbridge()
        .args(["--format", "json", "listen", &addr.to_string()])
        .args(["--msg-ids", "33", "--count", "1", "--timeout", "10s"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("listen should start");

    let sender = UdpSocket::bind("127.0.0.1:0").expect("sender should bind");
    let mut datagram = frame(&Packet::new(0, 1, 1, 0, Vec::<u8>::new()));
    datagram.extend(frame(&Packet::new(33, 1, 1, 1, vec![0xde, 0xad])));
    send_until_exit(&mut child, &sender, addr, &datagram);

    let output = child.wait_with_output().expect("listen output");
    assert!(output.status.success());
    let lines = json_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["message_id"], 33);
    assert_eq!(lines[0]["payload"], "dead");
}

#[test]
fn bridge_forwards_vehicle_traffic_to_ground() {
    let vehicle = UdpSocket::bind("127.0.0.1:0").expect("vehicle should bind");
    let ground = UdpSocket::bind("127.0.0.1:0").expect("ground should bind");
    ground
        .set_read_timeout(Some(Duration::from_millis(100)))
        .expect("timeout should set");
    let fcu_bind = free_udp_addr();
    let gcs_bind = free_udp_addr();

    let fcu_url = format!("udp://{fcu_bind}@{}", vehicle.local_addr().expect("addr"));
    let gcs_url = format!("udp://{gcs_bind}@{}", ground.local_addr().expect("addr"));
    let child = mavbridge()
        .args(["--format", "json", "bridge"])
        .args(["--fcu-url", &fcu_url, "--gcs-url", &gcs_url])
        .args(["--status-interval", "200ms", "--run-for", "3s"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("bridge should start");

    let heartbeat = frame(&Packet::new(0, 1, 1, 5, vec![1, 2, 3]));
    let deadline = Instant::now() + Duration::from_secs(3);
    let mut buf = [0u8; 512];
    let forwarded = loop {
        assert!(Instant::now() < deadline, "nothing forwarded to ground");
        let _ = vehicle.send_to(&heartbeat, fcu_bind);
        if let Ok((len, _)) = ground.recv_from(&mut buf) {
            let mut wire = BytesMut::from(&buf[..len]);
            if let Ok(Some(packet)) = decode_packet(&mut wire) {
                break packet;
            }
        }
    };
    assert_eq!(forwarded.message_id(), 0);
    assert_eq!(forwarded.system_id(), 1);
    assert_eq!(&forwarded.payload()[..], &[1, 2, 3]);

    let output = child.wait_with_output().expect("bridge output");
    assert!(output.status.success());
    let links: Vec<String> = json_lines(&output)
        .iter()
        .filter_map(|line| line["link"].as_str().map(str::to_string))
        .collect();
    assert_eq!(links, vec!["FCU connection", "GCS bridge"]);
}
