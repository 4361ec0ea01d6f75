//! STT stream lifecycle
//!
//! One task per call owns the socket. Caller audio arrives through a
//! bounded channel, is buffered into 100 ms PCM chunks, and leaves as
//! base64 JSON frames. Abnormal closes trigger reconnection (at most 3
//! attempts, 1 s apart); a deliberate `close()` is terminal and idempotent.
//! While the socket is down, frames queue in the channel; nothing is
//! dropped.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::pool::{PooledSocket, SttSessionConfig, WsPool};
use crate::protocol::{audio_message, demux, end_of_stream_message, SttEvent};
use crate::SttError;
use vaani_config::constants::stt as stt_constants;
use vaani_core::AudioFrame;

/// What the stream does after losing its socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Try again after the configured delay
    Retry { delay: Duration },
    /// Deliberate close (code 1000 or `close()` called): stop quietly
    Terminal,
    /// Attempt budget exhausted: stop and record a terminal error
    Failed,
}

/// Reconnection state machine
///
/// Attempts reset to zero once a reconnect succeeds, so only consecutive
/// failures count against the budget.
#[derive(Debug)]
pub struct ReconnectPolicy {
    attempts: u32,
    max_attempts: u32,
    delay: Duration,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            delay,
        }
    }

    /// Classify a connection loss. `close_code` is `None` when the
    /// transport died without a close frame (the 1006 case).
    pub fn on_connection_lost(
        &mut self,
        close_code: Option<u16>,
        is_closed: bool,
    ) -> ReconnectDecision {
        if is_closed || close_code == Some(1000) {
            return ReconnectDecision::Terminal;
        }

        self.attempts += 1;
        if self.attempts > self.max_attempts {
            ReconnectDecision::Failed
        } else {
            ReconnectDecision::Retry { delay: self.delay }
        }
    }

    pub fn on_reconnected(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

enum StreamInput {
    Frame(AudioFrame),
    End,
}

/// Handle to a running STT stream
pub struct SttStream {
    input_tx: mpsc::Sender<StreamInput>,
    is_closed: Arc<AtomicBool>,
    reconnects: Arc<AtomicU32>,
}

impl SttStream {
    /// Connect through the pool and spawn the stream task. Returns the
    /// handle plus the event receiver.
    pub async fn start(
        pool: Arc<WsPool>,
        config: SttSessionConfig,
    ) -> Result<(Self, mpsc::Receiver<SttEvent>), SttError> {
        let socket = pool.get(&config).await?;

        let (input_tx, input_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::channel(64);
        let is_closed = Arc::new(AtomicBool::new(false));
        let reconnects = Arc::new(AtomicU32::new(0));

        let task = StreamTask {
            pool,
            config,
            is_closed: is_closed.clone(),
            reconnects: reconnects.clone(),
        };
        tokio::spawn(task.run(socket, input_rx, event_tx));

        Ok((
            Self {
                input_tx,
                is_closed,
                reconnects,
            },
            event_rx,
        ))
    }

    /// Queue caller audio. Blocks (backpressure) while the stream is
    /// reconnecting and its channel is full.
    pub async fn send_audio(&self, frame: AudioFrame) -> Result<(), SttError> {
        if self.is_closed.load(Ordering::SeqCst) {
            return Err(SttError::Closed);
        }
        self.input_tx
            .send(StreamInput::Frame(frame))
            .await
            .map_err(|_| SttError::Closed)
    }

    /// Idempotent close: no reconnection happens afterwards.
    pub async fn close(&self) {
        if self.is_closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.input_tx.send(StreamInput::End).await;
    }

    pub fn is_closed(&self) -> bool {
        self.is_closed.load(Ordering::SeqCst)
    }

    /// Successful reconnects performed so far
    pub fn reconnect_count(&self) -> u32 {
        self.reconnects.load(Ordering::SeqCst)
    }
}

struct StreamTask {
    pool: Arc<WsPool>,
    config: SttSessionConfig,
    is_closed: Arc<AtomicBool>,
    reconnects: Arc<AtomicU32>,
}

enum LossOutcome {
    Resumed(PooledSocket),
    Stop,
}

impl StreamTask {
    async fn run(
        self,
        mut socket: PooledSocket,
        mut input_rx: mpsc::Receiver<StreamInput>,
        event_tx: mpsc::Sender<SttEvent>,
    ) {
        let chunk_samples = self
            .config
            .sample_rate
            .samples_for_ms(stt_constants::CHUNK_DURATION_MS);
        let mut policy = ReconnectPolicy::new(
            self.config.max_reconnect_attempts,
            self.config.reconnect_delay,
        );
        let mut buffer: Vec<i16> = Vec::with_capacity(chunk_samples * 2);

        loop {
            tokio::select! {
                input = input_rx.recv() => match input {
                    Some(StreamInput::Frame(frame)) => {
                        buffer.extend_from_slice(&frame.samples);
                        while buffer.len() >= chunk_samples {
                            let chunk: Vec<i16> = buffer.drain(..chunk_samples).collect();
                            let bytes: Vec<u8> = chunk
                                .iter()
                                .flat_map(|s| s.to_le_bytes())
                                .collect();
                            let message =
                                audio_message(&bytes, self.config.sample_rate.as_u32());
                            if let Err(e) = socket.ws.send(Message::Text(message)).await {
                                tracing::debug!(error = %e, "audio send failed");
                                match self.handle_loss(&mut policy, None, &event_tx).await {
                                    LossOutcome::Resumed(s) => socket = s,
                                    LossOutcome::Stop => return,
                                }
                                break;
                            }
                        }
                    }
                    Some(StreamInput::End) | None => {
                        self.shutdown(&mut socket).await;
                        return;
                    }
                },
                message = socket.ws.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(event) = demux(&text) {
                            if event_tx.send(event).await.is_err() {
                                // Receiver gone: the session ended.
                                self.shutdown(&mut socket).await;
                                return;
                            }
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let code = frame.map(|f| u16::from(f.code));
                        match self.handle_loss(&mut policy, code, &event_tx).await {
                            LossOutcome::Resumed(s) => socket = s,
                            LossOutcome::Stop => return,
                        }
                    }
                    Some(Ok(_)) => {
                        // Binary/ping/pong frames are not part of the contract.
                    }
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "socket error");
                        match self.handle_loss(&mut policy, None, &event_tx).await {
                            LossOutcome::Resumed(s) => socket = s,
                            LossOutcome::Stop => return,
                        }
                    }
                    None => {
                        match self.handle_loss(&mut policy, None, &event_tx).await {
                            LossOutcome::Resumed(s) => socket = s,
                            LossOutcome::Stop => return,
                        }
                    }
                },
            }
        }
    }

    /// Reconnect loop. Audio stays queued in the input channel while this
    /// runs; nothing is dropped.
    async fn handle_loss(
        &self,
        policy: &mut ReconnectPolicy,
        close_code: Option<u16>,
        event_tx: &mpsc::Sender<SttEvent>,
    ) -> LossOutcome {
        let mut code = close_code;
        loop {
            let decision =
                policy.on_connection_lost(code, self.is_closed.load(Ordering::SeqCst));
            match decision {
                ReconnectDecision::Terminal => {
                    tracing::debug!("stream closed deliberately, not reconnecting");
                    return LossOutcome::Stop;
                }
                ReconnectDecision::Failed => {
                    tracing::warn!(
                        attempts = policy.attempts(),
                        "reconnect budget exhausted, stream failed"
                    );
                    let _ = event_tx
                        .send(SttEvent::Error("reconnect failed".to_string()))
                        .await;
                    return LossOutcome::Stop;
                }
                ReconnectDecision::Retry { delay } => {
                    metrics::counter!("stt_reconnect_attempts").increment(1);
                    tokio::time::sleep(delay).await;
                    if self.is_closed.load(Ordering::SeqCst) {
                        return LossOutcome::Stop;
                    }
                    match self.pool.connect(&self.config).await {
                        Ok(socket) => {
                            tracing::info!(
                                attempt = policy.attempts(),
                                "STT stream reconnected"
                            );
                            self.reconnects.fetch_add(1, Ordering::SeqCst);
                            policy.on_reconnected();
                            return LossOutcome::Resumed(socket);
                        }
                        Err(e) => {
                            tracing::debug!(error = %e, "reconnect attempt failed");
                            code = None;
                        }
                    }
                }
            }
        }
    }

    async fn shutdown(&self, socket: &mut PooledSocket) {
        self.is_closed.store(true, Ordering::SeqCst);
        let _ = socket
            .ws
            .send(Message::Text(end_of_stream_message()))
            .await;
        let _ = socket.ws.send(Message::Close(None)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy::new(3, Duration::from_millis(1000))
    }

    #[test]
    fn test_abnormal_close_retries() {
        let mut policy = policy();
        match policy.on_connection_lost(None, false) {
            ReconnectDecision::Retry { delay } => assert_eq!(delay, Duration::from_millis(1000)),
            other => panic!("expected retry, got {:?}", other),
        }
        assert_eq!(policy.attempts(), 1);
    }

    #[test]
    fn test_normal_close_terminal() {
        let mut policy = policy();
        assert_eq!(
            policy.on_connection_lost(Some(1000), false),
            ReconnectDecision::Terminal
        );
        assert_eq!(policy.attempts(), 0);
    }

    #[test]
    fn test_closed_flag_terminal_even_on_1006() {
        let mut policy = policy();
        assert_eq!(
            policy.on_connection_lost(None, true),
            ReconnectDecision::Terminal
        );
    }

    #[test]
    fn test_budget_exhaustion() {
        let mut policy = policy();
        for _ in 0..3 {
            assert!(matches!(
                policy.on_connection_lost(Some(1006), false),
                ReconnectDecision::Retry { .. }
            ));
        }
        assert_eq!(
            policy.on_connection_lost(Some(1006), false),
            ReconnectDecision::Failed
        );
        assert_eq!(policy.attempts(), 4);
    }

    #[test]
    fn test_success_resets_attempts() {
        let mut policy = policy();
        policy.on_connection_lost(None, false);
        policy.on_connection_lost(None, false);
        policy.on_reconnected();
        assert_eq!(policy.attempts(), 0);
        // A fresh run of failures gets the full budget again.
        for _ in 0..3 {
            assert!(matches!(
                policy.on_connection_lost(None, false),
                ReconnectDecision::Retry { .. }
            ));
        }
        assert!(matches!(
            policy.on_connection_lost(None, false),
            ReconnectDecision::Failed
        ));
    }
}
