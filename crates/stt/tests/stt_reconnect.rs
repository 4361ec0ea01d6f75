//! Stream lifecycle against a local mock vendor
//!
//! The mock accepts a WebSocket, emits transcript frames, and can drop the
//! TCP connection without a close handshake to simulate an abnormal (1006)
//! disconnect.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::Message;

use vaani_core::{AudioFrame, SampleRate};
use vaani_stt::{SttEvent, SttSessionConfig, SttStream, TranscriptEvent, WsPool};

fn transcript_frame(text: &str) -> Message {
    Message::Text(format!(
        r#"{{"type":"data","data":{{"transcript":"{}"}}}}"#,
        text
    ))
}

fn test_config(port: u16) -> SttSessionConfig {
    SttSessionConfig {
        ws_url: format!("ws://127.0.0.1:{}", port),
        api_key: "test-key".into(),
        language: "en-US".into(),
        sample_rate: SampleRate::Hz16000,
        reconnect_delay: Duration::from_millis(50),
        ..Default::default()
    }
}

async fn expect_transcript(
    events: &mut tokio::sync::mpsc::Receiver<SttEvent>,
    expected: &str,
) -> TranscriptEvent {
    loop {
        let event = timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("event within deadline")
            .expect("stream alive");
        match event {
            SttEvent::Transcript(t) => {
                assert_eq!(t.text, expected);
                return t;
            }
            SttEvent::Vad(_) => continue,
            SttEvent::Error(e) => panic!("unexpected stream error: {}", e),
        }
    }
}

#[tokio::test]
async fn stream_reconnects_after_abnormal_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        // First connection: one transcript, then an abrupt TCP drop.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(transcript_frame("hello caller")).await.unwrap();
        let _ = timeout(Duration::from_millis(200), ws.next()).await;
        drop(ws);

        // Second connection: the client's reconnect lands here.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(transcript_frame("back again")).await.unwrap();
        // Stay alive until the client closes.
        while let Ok(Some(Ok(message))) =
            timeout(Duration::from_secs(5), ws.next()).await
        {
            if message.is_close() {
                break;
            }
        }
    });

    let pool = Arc::new(WsPool::new());
    let (stream, mut events) = SttStream::start(pool, test_config(port)).await.unwrap();

    let first = expect_transcript(&mut events, "hello caller").await;
    assert!(first.is_final);

    // The server dropped the socket; the stream must reconnect on its own.
    let _ = expect_transcript(&mut events, "back again").await;
    assert_eq!(stream.reconnect_count(), 1);

    stream.close().await;
    assert!(stream.is_closed());
    let _ = timeout(Duration::from_secs(2), server).await;
}

#[tokio::test]
async fn stream_fails_after_exhausted_reconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        // Accept once, then drop; every reconnect attempt is refused by
        // closing the raw TCP connection before the handshake.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(transcript_frame("only message")).await.unwrap();
        drop(ws);
        loop {
            match listener.accept().await {
                Ok((stream, _)) => drop(stream),
                Err(_) => break,
            }
        }
    });

    let pool = Arc::new(WsPool::new());
    let (stream, mut events) = SttStream::start(pool, test_config(port)).await.unwrap();

    expect_transcript(&mut events, "only message").await;

    // Every retry fails, so the stream ends with a terminal error and no
    // further transcript events.
    let mut saw_error = false;
    while let Ok(Some(event)) = timeout(Duration::from_secs(5), events.recv()).await {
        match event {
            SttEvent::Error(_) => {
                saw_error = true;
                break;
            }
            SttEvent::Vad(_) => continue,
            SttEvent::Transcript(t) => panic!("unexpected transcript after failure: {}", t.text),
        }
    }
    assert!(saw_error, "expected a terminal error event");
    assert_eq!(stream.reconnect_count(), 0);
    server.abort();
}

#[tokio::test]
async fn close_is_idempotent_and_stops_reconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        // Drain until the client's close frame.
        while let Ok(Some(Ok(message))) = timeout(Duration::from_secs(5), ws.next()).await {
            if message.is_close() {
                break;
            }
        }
    });

    let pool = Arc::new(WsPool::new());
    let (stream, _events) = SttStream::start(pool, test_config(port)).await.unwrap();

    stream.close().await;
    stream.close().await;
    assert!(stream.is_closed());

    // Audio after close is rejected, not queued.
    let frame = AudioFrame::new(vec![0i16; 160], SampleRate::Hz16000, 0);
    assert!(stream.send_audio(frame).await.is_err());

    let _ = timeout(Duration::from_secs(2), server).await;
}

#[tokio::test]
async fn audio_frames_reach_the_vendor_in_100ms_chunks() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (chunk_tx, mut chunk_rx) = tokio::sync::mpsc::unbounded_channel::<serde_json::Value>();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Ok(Some(Ok(message))) = timeout(Duration::from_secs(5), ws.next()).await {
            match message {
                Message::Text(text) => {
                    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                    let done = value.get("type").is_some();
                    chunk_tx.send(value).unwrap();
                    if done {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    let pool = Arc::new(WsPool::new());
    let (stream, _events) = SttStream::start(pool, test_config(port)).await.unwrap();

    // 250 ms of audio at 16 kHz: exactly two 100 ms chunks leave the
    // client, the 50 ms remainder stays buffered.
    let frame = AudioFrame::new(vec![1i16; 4000], SampleRate::Hz16000, 0);
    stream.send_audio(frame).await.unwrap();
    stream.close().await;

    let mut audio_chunks = 0;
    let mut saw_end_of_stream = false;
    while let Ok(Some(value)) = timeout(Duration::from_secs(3), chunk_rx.recv()).await {
        if value.get("type").map(|t| t == "end_of_stream").unwrap_or(false) {
            saw_end_of_stream = true;
            break;
        }
        assert!(value.get("type").is_none(), "audio frames must be untyped");
        assert_eq!(value["audio"]["sample_rate"], 16000);
        // 1600 samples of PCM16 -> 3200 bytes -> 4268 base64 chars.
        let data = value["audio"]["data"].as_str().unwrap();
        assert_eq!(data.len(), 4268);
        audio_chunks += 1;
    }

    assert_eq!(audio_chunks, 2);
    assert!(saw_end_of_stream);
    let _ = timeout(Duration::from_secs(2), server).await;
}
