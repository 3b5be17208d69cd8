// End-to-end transfers over loopback: a real server task, real UDP
// sockets, files in a scratch directory.

use std::path::PathBuf;
use std::time::Duration;

use netkit_tftp::{to_netascii, Client, Error, Mode, Packet, Server, Transport};
use tokio::time::timeout;

/// A scratch path outside the source tree. The server resolves
/// filenames verbatim, so absolute paths keep the tests out of the
/// working directory.
fn scratch_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("netkit-tftp-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("scratch dir");
    dir.join(name)
}

async fn spawn_server() -> u16 {
    let mut server = Server::bind(0).await.expect("bind");
    server.set_timeout(Duration::from_millis(200));
    let port = server.local_port().expect("port");
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    port
}

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn octet_download_round_trips() {
    let path = scratch_path("served.bin");
    // Three blocks: 512 + 512 + 276.
    let content = patterned(1300);
    std::fs::write(&path, &content).expect("write fixture");

    let port = spawn_server().await;
    let client = Client::new("127.0.0.1", port);

    let mut sink: Vec<u8> = Vec::new();
    client
        .read(path.to_str().expect("utf8 path"), &mut sink)
        .await
        .expect("download");
    assert_eq!(sink, content);
}

#[tokio::test]
async fn octet_upload_round_trips() {
    let path = scratch_path("uploaded.bin");
    let content = patterned(777);

    let port = spawn_server().await;
    let client = Client::new("127.0.0.1", port);

    client
        .write(path.to_str().expect("utf8 path"), &mut &content[..])
        .await
        .expect("upload");
    assert_eq!(std::fs::read(&path).expect("read back"), content);
}

#[tokio::test]
async fn block_aligned_upload_ends_with_empty_block() {
    let path = scratch_path("aligned.bin");
    let content = patterned(1024);

    let port = spawn_server().await;
    let client = Client::new("127.0.0.1", port);

    client
        .write(path.to_str().expect("utf8 path"), &mut &content[..])
        .await
        .expect("upload");
    assert_eq!(std::fs::read(&path).expect("read back"), content);
}

#[tokio::test]
async fn empty_file_round_trips() {
    let path = scratch_path("empty.bin");
    std::fs::write(&path, b"").expect("write fixture");

    let port = spawn_server().await;
    let client = Client::new("127.0.0.1", port);

    let mut sink: Vec<u8> = Vec::new();
    client
        .read(path.to_str().expect("utf8 path"), &mut sink)
        .await
        .expect("download");
    assert!(sink.is_empty());
}

#[tokio::test]
async fn missing_file_reports_file_not_found() {
    let port = spawn_server().await;
    let client = Client::new("127.0.0.1", port);

    let mut sink: Vec<u8> = Vec::new();
    let err = client
        .read("/definitely/not/a/real/file", &mut sink)
        .await
        .expect_err("must fail");
    match err {
        Error::Server(message) => assert_eq!(message, "File not found"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn netascii_download_encodes_line_endings() {
    let path = scratch_path("text.txt");
    std::fs::write(&path, b"line1\nline2\r").expect("write fixture");

    let port = spawn_server().await;
    let us = Transport::open(None).await.expect("open");
    let server = ([127, 0, 0, 1], port).into();
    us.send(
        server,
        &Packet::Rrq {
            filename: path.to_str().expect("utf8 path").to_string(),
            mode: Mode::Netascii,
        },
    )
    .await
    .expect("rrq");

    let received = timeout(Duration::from_secs(2), us.recv())
        .await
        .expect("no timeout")
        .expect("recv");
    match received.packet.expect("decodes") {
        Packet::Data { block: 1, payload } => {
            assert_eq!(payload, to_netascii(b"line1\nline2\r"));
            assert!(payload.len() < 512, "single short block");
        }
        other => panic!("unexpected packet: {other}"),
    }
    us.send(received.from, &Packet::Ack { block: 1 })
        .await
        .expect("ack");
}

#[tokio::test]
async fn netascii_upload_decodes_before_writing() {
    let path = scratch_path("decoded.txt");

    let port = spawn_server().await;
    let us = Transport::open(None).await.expect("open");
    let server = ([127, 0, 0, 1], port).into();
    us.send(
        server,
        &Packet::Wrq {
            filename: path.to_str().expect("utf8 path").to_string(),
            mode: Mode::Netascii,
        },
    )
    .await
    .expect("wrq");

    let ack0 = timeout(Duration::from_secs(2), us.recv())
        .await
        .expect("no timeout")
        .expect("recv");
    assert_eq!(ack0.packet.expect("decodes"), Packet::Ack { block: 0 });

    // One short block of NetASCII wire bytes.
    us.send(
        ack0.from,
        &Packet::Data {
            block: 1,
            payload: to_netascii(b"a\nb\rc"),
        },
    )
    .await
    .expect("data");
    let ack1 = timeout(Duration::from_secs(2), us.recv())
        .await
        .expect("no timeout")
        .expect("recv");
    assert_eq!(ack1.packet.expect("decodes"), Packet::Ack { block: 1 });

    // The final ACK only goes out after the decoded file hit disk.
    assert_eq!(std::fs::read(&path).expect("read back"), b"a\nb\rc");
}

#[tokio::test]
async fn duplicate_data_is_reacked_not_reappended() {
    let path = scratch_path("dup.bin");

    let port = spawn_server().await;
    let us = Transport::open(None).await.expect("open");
    let server = ([127, 0, 0, 1], port).into();
    us.send(
        server,
        &Packet::Wrq {
            filename: path.to_str().expect("utf8 path").to_string(),
            mode: Mode::Octet,
        },
    )
    .await
    .expect("wrq");

    let ack0 = timeout(Duration::from_secs(2), us.recv())
        .await
        .expect("no timeout")
        .expect("recv");
    assert_eq!(ack0.packet.expect("decodes"), Packet::Ack { block: 0 });
    let peer = ack0.from;

    let full = Packet::Data {
        block: 1,
        payload: vec![b'x'; 512],
    };
    us.send(peer, &full).await.expect("data 1");
    let ack1 = timeout(Duration::from_secs(2), us.recv())
        .await
        .expect("no timeout")
        .expect("recv");
    assert_eq!(ack1.packet.expect("decodes"), Packet::Ack { block: 1 });

    // Pretend the ACK got lost: resend block 1. The server must ACK it
    // again without appending it twice.
    us.send(peer, &full).await.expect("data 1 again");
    let re_ack = timeout(Duration::from_secs(2), us.recv())
        .await
        .expect("no timeout")
        .expect("recv");
    assert_eq!(re_ack.packet.expect("decodes"), Packet::Ack { block: 1 });

    us.send(
        peer,
        &Packet::Data {
            block: 2,
            payload: b"tail".to_vec(),
        },
    )
    .await
    .expect("data 2");
    let ack2 = timeout(Duration::from_secs(2), us.recv())
        .await
        .expect("no timeout")
        .expect("recv");
    assert_eq!(ack2.packet.expect("decodes"), Packet::Ack { block: 2 });

    let mut expected = vec![b'x'; 512];
    expected.extend_from_slice(b"tail");
    assert_eq!(std::fs::read(&path).expect("read back"), expected);
}

#[tokio::test]
async fn silent_peer_gets_retransmissions() {
    let path = scratch_path("retrans.bin");

    let port = spawn_server().await;
    let us = Transport::open(None).await.expect("open");
    let server = ([127, 0, 0, 1], port).into();
    us.send(
        server,
        &Packet::Wrq {
            filename: path.to_str().expect("utf8 path").to_string(),
            mode: Mode::Octet,
        },
    )
    .await
    .expect("wrq");

    // First ACK 0, then (because we go silent) a retransmitted ACK 0
    // within the transfer's 200 ms timeout window.
    let first = timeout(Duration::from_secs(2), us.recv())
        .await
        .expect("no timeout")
        .expect("recv");
    assert_eq!(first.packet.expect("decodes"), Packet::Ack { block: 0 });

    let second = timeout(Duration::from_secs(2), us.recv())
        .await
        .expect("server must retransmit")
        .expect("recv");
    assert_eq!(second.packet.expect("decodes"), Packet::Ack { block: 0 });
}

#[tokio::test]
async fn request_port_rejects_non_requests() {
    let port = spawn_server().await;
    let us = Transport::open(None).await.expect("open");
    let server = ([127, 0, 0, 1], port).into();

    us.send(server, &Packet::Ack { block: 3 }).await.expect("stray ack");
    let answer = timeout(Duration::from_secs(2), us.recv())
        .await
        .expect("no timeout")
        .expect("recv");
    match answer.packet.expect("decodes") {
        Packet::Error { message, .. } => assert_eq!(message, "Illegal TFTP operation"),
        other => panic!("unexpected packet: {other}"),
    }
}
