//! Batching, flush triggers and failure reporting of the UDP transport.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::BTreeSet;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use tagmetrics_core::Result;
use tagmetrics_reporters::config::SocketConfig;
use tagmetrics_reporters::network::{SendCallback, UdpTransport};
use tokio::net::UdpSocket;
use tokio::time::timeout;

async fn receiver() -> (UdpSocket, u16) {
    let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = sock.local_addr().unwrap().port();
    (sock, port)
}

async fn recv_text(sock: &UdpSocket) -> String {
    let mut buf = vec![0u8; 65_536];
    let n = timeout(Duration::from_secs(2), sock.recv(&mut buf))
        .await
        .expect("datagram expected")
        .unwrap();
    String::from_utf8(buf[..n].to_vec()).unwrap()
}

async fn assert_silent(sock: &UdpSocket) {
    let mut buf = vec![0u8; 1024];
    assert!(
        timeout(Duration::from_millis(200), sock.recv(&mut buf)).await.is_err(),
        "no datagram expected"
    );
}

fn cfg(port: u16) -> SocketConfig {
    SocketConfig {
        flush_interval_ms: 60_000,
        ..SocketConfig::new("127.0.0.1", port)
    }
}

fn callback(tx: &mpsc::Sender<Result<()>>) -> Option<SendCallback> {
    let tx = tx.clone();
    Some(Box::new(move |res: Result<()>| {
        let _ = tx.send(res);
    }))
}

#[tokio::test]
async fn close_flushes_one_joined_datagram() {
    let (rx_sock, port) = receiver().await;
    let t = UdpTransport::new(&cfg(port)).unwrap();
    let (tx, rx) = mpsc::channel();

    t.send("a:1|c", callback(&tx)).unwrap();
    t.send("b:2|g", None).unwrap();
    t.send("c:3|h", callback(&tx)).unwrap();
    assert!(rx.try_recv().is_err());

    t.close();
    assert_eq!(recv_text(&rx_sock).await, "a:1|c\nb:2|g\nc:3|h");
    assert_eq!(rx.try_recv().unwrap(), Ok(()));
    assert_eq!(rx.try_recv().unwrap(), Ok(()));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn size_threshold_triggers_flush() {
    let (rx_sock, port) = receiver().await;
    let t = UdpTransport::new(&SocketConfig {
        max_buffer_size: 5,
        ..cfg(port)
    })
    .unwrap();

    t.send("abc", None).unwrap();
    t.send("def", None).unwrap();
    assert_eq!(recv_text(&rx_sock).await, "abc\ndef");

    t.send("g", None).unwrap();
    assert_silent(&rx_sock).await;
    t.close();
    assert_eq!(recv_text(&rx_sock).await, "g");
}

#[tokio::test]
async fn timer_flushes_periodically() {
    let (rx_sock, port) = receiver().await;
    let t = UdpTransport::new(&SocketConfig {
        flush_interval_ms: 50,
        ..cfg(port)
    })
    .unwrap();

    t.send("tick", None).unwrap();
    assert_eq!(recv_text(&rx_sock).await, "tick");
    t.send("tock", None).unwrap();
    assert_eq!(recv_text(&rx_sock).await, "tock");
    t.close();
}

#[tokio::test]
async fn drop_without_close_flushes_buffer() {
    let (rx_sock, port) = receiver().await;
    let t = UdpTransport::new(&cfg(port)).unwrap();
    let (tx, rx) = mpsc::channel();

    t.send("late:1|c", callback(&tx)).unwrap();
    drop(t);

    assert_eq!(recv_text(&rx_sock).await, "late:1|c");
    assert_eq!(rx.try_recv().unwrap(), Ok(()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_sends_arrive_exactly_once() {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 250;

    let rx_sock = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    rx_sock.set_read_timeout(Some(Duration::from_millis(500))).unwrap();
    let port = rx_sock.local_addr().unwrap().port();

    // short timer and small buffer: timer and size flushes race the senders
    let t = Arc::new(
        UdpTransport::new(&SocketConfig {
            flush_interval_ms: 5,
            max_buffer_size: 200,
            ..cfg(port)
        })
        .unwrap(),
    );

    let senders: Vec<_> = (0..THREADS)
        .map(|n| {
            let t = t.clone();
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    t.send(format!("m-{n}-{i}"), None).unwrap();
                }
            })
        })
        .collect();
    for h in senders {
        h.join().unwrap();
    }
    t.close();

    let mut received = Vec::new();
    let mut buf = vec![0u8; 65_536];
    while let Ok(n) = rx_sock.recv(&mut buf) {
        let text = std::str::from_utf8(&buf[..n]).unwrap();
        received.extend(text.split('\n').map(str::to_string));
    }

    let expected: BTreeSet<String> = (0..THREADS)
        .flat_map(|n| (0..PER_THREAD).map(move |i| format!("m-{n}-{i}")))
        .collect();
    let unique: BTreeSet<String> = received.iter().cloned().collect();
    assert_eq!(received.len(), THREADS * PER_THREAD, "duplicated or lost messages");
    assert_eq!(unique, expected);
}

#[tokio::test]
async fn close_is_idempotent_and_never_sends_empty() {
    let (rx_sock, port) = receiver().await;
    let t = UdpTransport::new(&cfg(port)).unwrap();
    t.close();
    t.close();
    assert_silent(&rx_sock).await;
}

#[tokio::test]
async fn empty_message_is_rejected() {
    let (_rx_sock, port) = receiver().await;
    let t = UdpTransport::new(&cfg(port)).unwrap();
    let err = t.send("", None).unwrap_err();
    assert_eq!(err.code().as_str(), "BAD_REQUEST");
}

#[tokio::test]
async fn failed_batch_reports_same_error_to_every_callback() {
    let (rx_sock, port) = receiver().await;
    let t = UdpTransport::new(&cfg(port)).unwrap();
    let (tx, rx) = mpsc::channel();

    // larger than any UDP datagram: the send itself fails
    t.send("small", callback(&tx)).unwrap();
    t.send("x".repeat(70_000), callback(&tx)).unwrap();

    let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(first.is_err());
    assert_eq!(first, second);
    assert_eq!(first.unwrap_err().code().as_str(), "TRANSPORT");

    // not retried, later sends unaffected
    t.send("ok", callback(&tx)).unwrap();
    t.close();
    assert_eq!(recv_text(&rx_sock).await, "ok");
    assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), Ok(()));
}

#[test]
fn unbatched_sends_immediately() {
    let rx_sock = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    rx_sock.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let port = rx_sock.local_addr().unwrap().port();

    let t = UdpTransport::new(&SocketConfig {
        batch: false,
        ..cfg(port)
    })
    .unwrap();
    let (tx, rx) = mpsc::channel();

    t.send("one", callback(&tx)).unwrap();
    assert_eq!(rx.try_recv().unwrap(), Ok(()));

    let mut buf = [0u8; 64];
    let n = rx_sock.recv(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"one");

    t.send("x".repeat(70_000), callback(&tx)).unwrap();
    assert!(rx.try_recv().unwrap().is_err());
}

#[test]
fn batching_requires_a_runtime() {
    let err = UdpTransport::new(&cfg(9)).err().expect("must fail");
    assert_eq!(err.code().as_str(), "INVALID_CONFIG");
}
