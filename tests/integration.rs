//! Integration tests for sniffer-relay.
//!
//! These tests verify the integration between different modules through the
//! public API.

use std::io::Cursor;
use std::time::Duration;

use pcap_file::pcap::PcapReader;
use sniffer_relay::capture::{global_header, record, CaptureBuffer, GLOBAL_HEADER_SIZE};
use sniffer_relay::command::{Command, Opcode};
use sniffer_relay::protocol::{FixedFrequency, ProtocolRegistry};
use sniffer_relay::{CaptureConfig, SnifferError};

/// Every alias of every built-in protocol resolves to its own descriptor.
#[test]
fn test_aliases_resolve_to_their_descriptor() {
    let registry = ProtocolRegistry::global();

    for (index, descriptor) in registry.iter().enumerate() {
        assert_eq!(registry.resolve(descriptor.name()).unwrap(), descriptor);
        for alias in descriptor.aliases() {
            assert_eq!(registry.position(alias), Some(index), "alias {}", alias);
        }
    }
}

/// Zigbee and Thread share the PHY and the channel plan.
#[test]
fn test_zigbee_and_thread_share_phy() {
    let registry = ProtocolRegistry::global();
    let zigbee = registry.resolve("zigbee").unwrap();
    let thread = registry.resolve("thread").unwrap();

    assert_eq!(zigbee.phy_index(), thread.phy_index());
    assert_eq!(zigbee.channels(), thread.channels());
    assert_ne!(zigbee.profile(), thread.profile());
    assert_eq!(zigbee.frequency_of(26).unwrap(), 2480.0);
}

/// Listings match the CLI help format.
#[test]
fn test_listings() {
    let registry = ProtocolRegistry::global();
    assert_eq!(
        registry.list_protocols(),
        "[0] Bluetooth LE\n[1] Zigbee\n[2] Thread\n[3] LoRa\n"
    );
    assert_eq!(
        registry.list_channels(0).unwrap(),
        "[37] 2402\n[38] 2426\n[39] 2480\n"
    );
    assert!(registry.list_channels(9).is_err());
}

/// Startup sequence for BLE channel 37 byte for byte.
#[test]
fn test_ble_startup_sequence_bytes() {
    let ble = ProtocolRegistry::global().resolve("ble").unwrap();
    let commands = ble.commands().startup_sequence(37).unwrap();

    let wire: Vec<Vec<u8>> = commands.iter().map(|c| c.wire_bytes().to_vec()).collect();
    assert_eq!(
        wire,
        vec![
            vec![0x40],
            vec![0x42],
            vec![0x47, 0x13],
            vec![0x45, 0x62, 0x09, 0x00, 0x00], // 2402 MHz
            vec![0x41],
        ]
    );
}

/// Unknown channel fails before any command is produced.
#[test]
fn test_startup_sequence_unknown_channel() {
    let lora = ProtocolRegistry::global().resolve("lora").unwrap();
    let err = lora.commands().startup_sequence(3).unwrap_err();
    assert!(matches!(err, SnifferError::UnknownChannel { channel: 3, .. }));
}

/// Fractional frequencies round to the nearest 1/65536 MHz.
#[test]
fn test_fractional_frequency_encoding() {
    let half = FixedFrequency::from_mhz(433.5).unwrap();
    assert_eq!(half.encode(), [0xB1, 0x01, 0x00, 0x80]);

    let almost = FixedFrequency::from_mhz(867.999_999_9).unwrap();
    assert_eq!(almost.integer_mhz, 868);
    assert_eq!(almost.fraction, 0);

    assert!(FixedFrequency::from_mhz(70_000.0).is_err());
}

/// Device packets decode back to the same command.
#[test]
fn test_command_frames_through_device_envelope() {
    let thread = ProtocolRegistry::global().resolve("thread").unwrap();
    let mut stream = Vec::new();
    for command in thread.commands().startup_sequence(20).unwrap() {
        stream.extend_from_slice(&command.to_frame().unwrap());
    }

    // PING packet: 40 53 | 40 | 00 00 | fcs 40 | 40 45
    assert_eq!(&stream[..8], &[0x40, 0x53, 0x40, 0x00, 0x00, 0x40, 0x40, 0x45]);

    let phy = Command::from_frame(&stream[16..25]).unwrap();
    assert_eq!(phy.opcode(), Opcode::CfgPhy);
    assert_eq!(phy.payload(), &[0x12]);
}

/// A stream built by the capture module reads back with an independent pcap reader.
#[test]
fn test_pcap_stream_reads_with_pcap_file() {
    let mut stream = global_header(147).unwrap().to_vec();
    stream.extend_from_slice(&record(&[0x01, 0x02, 0x03], 1_700_000_000_250_000).unwrap());
    stream.extend_from_slice(&record(&[0xAA; 40], 1_700_000_001_000_000).unwrap());

    let mut reader = PcapReader::new(Cursor::new(stream)).unwrap();
    let header = reader.header();
    assert_eq!(u32::from(header.datalink), 147);
    assert_eq!(header.snaplen, 65_535);
    assert_eq!(header.version_major, 2);
    assert_eq!(header.version_minor, 4);

    let first = reader.next_packet().unwrap().unwrap();
    assert_eq!(&first.data[..], &[0x01, 0x02, 0x03]);
    assert_eq!(first.orig_len, 3);
    assert_eq!(first.timestamp, Duration::new(1_700_000_000, 250_000_000));

    let second = reader.next_packet().unwrap().unwrap();
    assert_eq!(second.data.len(), 40);

    assert!(reader.next_packet().is_none());
}

/// Config file to plan to relay.
#[test]
fn test_config_to_relay() {
    let config = CaptureConfig::from_json_str(
        r#"{"protocol": "Thread", "channel": 26, "pipe_name": "thread-it"}"#,
    )
    .unwrap();
    let relay = sniffer_relay::Relay::from_config(&config).unwrap();

    assert_eq!(relay.descriptor().name(), "Thread");
    assert_eq!(relay.frequency().integer_mhz, 2480);
    assert_eq!(relay.startup_commands().len(), 5);
    assert!(relay.pipe_path().ends_with("thread-it"));
}

/// Live session through a real FIFO, read the way Wireshark does.
#[cfg(unix)]
#[tokio::test]
async fn test_fifo_session_end_to_end() {
    use sniffer_relay::{PipeConfig, PipeState, StreamingPipe};
    use tokio::io::AsyncReadExt;
    use tokio::net::unix::pipe;

    let name = format!("sniffer-relay-it-{}", std::process::id());
    let mut relay_pipe = StreamingPipe::new(PipeConfig::new(name, 230));
    relay_pipe.start().unwrap();
    let path = relay_pipe.path().to_string();

    let mut reader = pipe::OpenOptions::new().open_receiver(&path).unwrap();
    let mut states = relay_pipe.subscribe_state();
    tokio::time::timeout(
        Duration::from_secs(2),
        states.wait_for(|s| *s == PipeState::Streaming),
    )
    .await
    .unwrap()
    .unwrap();

    relay_pipe.sender().submit_at(&b"\x41\x88\x01"[..], 5_000_000);

    let mut bytes = vec![0u8; GLOBAL_HEADER_SIZE + 16 + 3];
    tokio::time::timeout(Duration::from_secs(2), reader.read_exact(&mut bytes))
        .await
        .unwrap()
        .unwrap();

    let mut buffer = CaptureBuffer::new();
    let records = buffer.push(&bytes).unwrap();
    assert_eq!(buffer.link_type(), Some(230));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].data(), b"\x41\x88\x01");
    assert_eq!(records[0].captured_at_micros(), 5_000_000);

    relay_pipe.stop().await.unwrap();
    assert!(!std::path::Path::new(&path).exists());
}

/// Stopping while nobody ever opened the FIFO removes it and returns promptly.
#[cfg(unix)]
#[tokio::test]
async fn test_fifo_stop_before_consumer() {
    use sniffer_relay::{PipeConfig, PipeState, StreamingPipe};

    let name = format!("sniffer-relay-it-idle-{}", std::process::id());
    let mut relay_pipe = StreamingPipe::new(PipeConfig::new(name, 147));
    relay_pipe.start().unwrap();
    let path = relay_pipe.path().to_string();
    assert!(std::path::Path::new(&path).exists());

    relay_pipe.submit_frame(&b"dropped"[..]);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(relay_pipe.state(), PipeState::Opening);

    tokio::time::timeout(Duration::from_secs(1), relay_pipe.stop())
        .await
        .unwrap()
        .unwrap();
    assert!(!std::path::Path::new(&path).exists());
    assert_eq!(relay_pipe.stats().written, 0);
}

/// Rapid submission from another thread while a reader drains the FIFO:
/// records arrive in submit order, never more than were submitted, and the
/// final frame is the last one submitted.
#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fifo_rapid_submit_keeps_order() {
    use sniffer_relay::{PipeConfig, PipeState, StreamingPipe};
    use tokio::io::AsyncReadExt;
    use tokio::net::unix::pipe;

    const FRAMES: u32 = 20_000;

    let name = format!("sniffer-relay-it-rapid-{}", std::process::id());
    let mut relay_pipe = StreamingPipe::new(PipeConfig::new(name, 147));
    relay_pipe.start().unwrap();
    let path = relay_pipe.path().to_string();

    let mut reader = pipe::OpenOptions::new().open_receiver(&path).unwrap();
    let mut states = relay_pipe.subscribe_state();
    tokio::time::timeout(
        Duration::from_secs(2),
        states.wait_for(|s| *s == PipeState::Streaming),
    )
    .await
    .unwrap()
    .unwrap();

    let sender = relay_pipe.sender();
    let producer = std::thread::spawn(move || {
        for sequence in 0..FRAMES {
            sender.submit(sequence.to_le_bytes().to_vec());
        }
    });

    let mut buffer = CaptureBuffer::new();
    let mut sequences = Vec::new();
    let mut chunk = vec![0u8; 4096];
    let drained = tokio::time::timeout(Duration::from_secs(10), async {
        while sequences.last() != Some(&(FRAMES - 1)) {
            let n = reader.read(&mut chunk).await.unwrap();
            assert!(n > 0, "pipe closed early");
            for record in buffer.push(&chunk[..n]).unwrap() {
                let bytes: [u8; 4] = record.data().try_into().unwrap();
                sequences.push(u32::from_le_bytes(bytes));
            }
        }
    })
    .await;
    producer.join().unwrap();
    assert!(drained.is_ok(), "last frame never arrived");

    relay_pipe.stop().await.unwrap();
    let stats = relay_pipe.stats();

    assert_eq!(stats.submitted, u64::from(FRAMES));
    assert!(stats.written <= stats.submitted);
    assert_eq!(stats.written, sequences.len() as u64);
    assert!(sequences.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(sequences.last(), Some(&(FRAMES - 1)));
    assert!(!std::path::Path::new(&path).exists());
}
