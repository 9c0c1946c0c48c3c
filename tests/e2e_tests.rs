//! End-to-end scenarios against an in-process TCP bridge that speaks the
//! meter side of both wire protocols.

use mercury_rs::protocol::frame::crc16;
use mercury_rs::{poll, ErrorKind, MetricValue, PollConfig, ProtocolFamily};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn with_crc(mut frame: Vec<u8>) -> Vec<u8> {
    let crc = crc16(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

/// Serves Mercury 206 requests: echoes the addressing header and answers
/// with fixed readings.
async fn serve_m206(listener: TcpListener) {
    while let Ok((mut sock, _)) = listener.accept().await {
        tokio::spawn(async move {
            let mut buf = [0u8; 256];
            loop {
                let Ok(n) = sock.read(&mut buf).await else { return };
                if n < 7 {
                    return;
                }
                let command = buf[4];
                let data: Vec<u8> = match command {
                    // U = 230.1 V, I = 1.50 A, P = 1350 W
                    0x63 => vec![0x23, 0x01, 0x01, 0x50, 0x00, 0x13, 0x50],
                    // 50.00 Hz
                    0x81 => vec![0x50, 0x00],
                    // T1 = 12.34 kWh, T2..T4 = 0
                    0x27 => {
                        let mut d = vec![0x00, 0x00, 0x12, 0x34];
                        d.extend_from_slice(&[0x00; 12]);
                        d
                    }
                    _ => return,
                };
                let mut frame = buf[..5].to_vec();
                frame.extend_from_slice(&data);
                if sock.write_all(&with_crc(frame)).await.is_err() {
                    return;
                }
            }
        });
    }
}

/// Serves Mercury 236 requests: accepts any credentials and answers reads
/// with fixed counters.
async fn serve_m236(listener: TcpListener) {
    while let Ok((mut sock, _)) = listener.accept().await {
        tokio::spawn(async move {
            let mut buf = [0u8; 256];
            loop {
                let Ok(n) = sock.read(&mut buf).await else { return };
                if n < 4 {
                    return;
                }
                let address = buf[0];
                let data: Vec<u8> = match buf[1] {
                    // test / open / close: status OK
                    0x00 | 0x01 | 0x02 => vec![0x00],
                    0x05 => {
                        if buf[2] >> 4 == 0x06 {
                            // Per-phase: 1000 Wh per phase, 2-1-4-3 order
                            let mut d = Vec::new();
                            for _ in 0..3 {
                                d.extend_from_slice(&[0x00, 0x00, 0xE8, 0x03]);
                            }
                            d
                        } else {
                            // A+ = 12345678 Wh, other channels unsupported
                            let mut d = vec![0xBC, 0x00, 0x4E, 0x61];
                            d.extend_from_slice(&[0xFF; 12]);
                            d
                        }
                    }
                    0x08 => match buf[3] {
                        // Frequency: 49.97 Hz
                        0x40 => vec![0x00, 0x85, 0x13],
                        // Voltages: 230.00 V
                        0x11..=0x13 => vec![0x00, 0xD8, 0x59],
                        // Currents: 1.500 A
                        0x21..=0x23 => vec![0x00, 0xDC, 0x05],
                        // Power sum: 1000.00 W
                        0x00 => vec![0x01, 0xA0, 0x86],
                        _ => return,
                    },
                    _ => return,
                };
                let mut frame = vec![address];
                frame.extend_from_slice(&data);
                if sock.write_all(&with_crc(frame)).await.is_err() {
                    return;
                }
            }
        });
    }
}

async fn bridge<F, Fut>(server: F) -> u16
where
    F: FnOnce(TcpListener) -> Fut,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(server(listener));
    port
}

#[tokio::test]
async fn test_poll_simple_family_over_tcp() {
    let port = bridge(serve_m206).await;

    let mut config = PollConfig::new(ProtocolFamily::Simple, "127.0.0.1");
    config.port = port;
    config.timeout = Duration::from_secs(1);

    let batch = poll(&[34197359], &config).await;
    assert_eq!(batch.len(), 1);

    let result = &batch.reports[0].result;
    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    let info = result.group("info").unwrap();
    assert_eq!(info.get("V"), Some(&MetricValue::Float(230.1)));
    assert_eq!(info.get("A"), Some(&MetricValue::Float(1.5)));
    assert_eq!(info.get("P"), Some(&MetricValue::Float(1350.0)));
    assert_eq!(info.get("freq"), Some(&MetricValue::Float(50.0)));
    let energy = result.group("energy").unwrap();
    assert_eq!(energy.get("T1"), Some(&MetricValue::Float(12.34)));
}

#[tokio::test]
async fn test_poll_authenticated_family_over_tcp() {
    let port = bridge(serve_m236).await;

    let mut config = PollConfig::new(ProtocolFamily::Authenticated, "127.0.0.1");
    config.port = port;
    config.timeout = Duration::from_secs(1);

    // Serial 34197101 resolves to bus address 101
    let batch = poll(&[34197101], &config).await;
    assert_eq!(batch.len(), 1);

    let result = &batch.reports[0].result;
    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);

    let totals = result.group("energy_phases_0").unwrap();
    assert_eq!(totals.get("A+"), Some(&MetricValue::Float(12345.678)));
    assert!(totals.get("A-").is_none());

    let tariffs = result.group("energy_tarif_0").unwrap();
    assert_eq!(tariffs.get("T1.A+"), Some(&MetricValue::Float(12345.678)));
    assert_eq!(tariffs.get("T4.A+"), Some(&MetricValue::Float(12345.678)));

    let phases = result.group("energy_phases").unwrap();
    assert_eq!(phases.get("phase1"), Some(&MetricValue::Float(1.0)));
    assert_eq!(phases.get("phase3"), Some(&MetricValue::Float(1.0)));

    let info = result.group("info").unwrap();
    assert_eq!(info.get("U1"), Some(&MetricValue::Float(230.0)));
    assert_eq!(info.get("I2"), Some(&MetricValue::Float(1.5)));
    assert_eq!(info.get("P"), Some(&MetricValue::Float(1000.0)));
    assert_eq!(info.get("freq"), Some(&MetricValue::Float(49.97)));
}

#[tokio::test]
async fn test_unreachable_bridge_fails_every_slot_without_aborting() {
    // Bind a port and drop the listener so connects are refused
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut config = PollConfig::new(ProtocolFamily::Simple, "127.0.0.1");
    config.port = port;
    config.timeout = Duration::from_millis(200);

    let batch = poll(&[1, 2], &config).await;
    assert_eq!(batch.len(), 2);
    for report in batch.iter() {
        let err = report.result.error.as_ref().unwrap();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(report.result.groups.is_empty());
    }
}

#[tokio::test]
async fn test_silent_bridge_times_out_per_device() {
    // Accepts connections but never answers
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((sock, _)) = listener.accept().await {
            held.push(sock);
        }
    });

    let mut config = PollConfig::new(ProtocolFamily::Simple, "127.0.0.1");
    config.port = port;
    config.timeout = Duration::from_millis(100);

    let batch = poll(&[42], &config).await;
    assert_eq!(batch.len(), 1);
    let err = batch.reports[0].result.error.as_ref().unwrap();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}
