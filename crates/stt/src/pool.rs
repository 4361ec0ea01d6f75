//! WebSocket connection pool
//!
//! One pool per process; idle connections are bucketed by
//! (api key, language, model). Pooled connections expire after the maximum
//! session duration so a stale socket is never handed to a call.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::SttError;
use vaani_config::constants::timeouts;
use vaani_core::SampleRate;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Pool bucket key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub api_key: String,
    pub language: String,
    pub model: String,
}

/// Per-session STT configuration
#[derive(Debug, Clone)]
pub struct SttSessionConfig {
    pub ws_url: String,
    pub api_key: String,
    /// BCP-47 language tag sent as `language-code`
    pub language: String,
    pub model: String,
    pub sample_rate: SampleRate,
    pub vad_signals: bool,
    pub high_vad_sensitivity: bool,
    /// Accepted for vendors that emit partials; the demux treats every
    /// transcript as final either way
    pub interim_results: bool,
    pub reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
}

impl Default for SttSessionConfig {
    fn default() -> Self {
        Self {
            ws_url: vaani_config::constants::endpoints::STT_WS_DEFAULT.to_string(),
            api_key: String::new(),
            language: "en-US".to_string(),
            model: "saarika:v2".to_string(),
            sample_rate: SampleRate::Hz16000,
            vad_signals: true,
            high_vad_sensitivity: false,
            interim_results: false,
            reconnect_delay: Duration::from_millis(timeouts::STT_RECONNECT_DELAY_MS),
            max_reconnect_attempts: timeouts::STT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl SttSessionConfig {
    pub fn pool_key(&self) -> PoolKey {
        PoolKey {
            api_key: self.api_key.clone(),
            language: self.language.clone(),
            model: self.model.clone(),
        }
    }

    /// Vendor URL with query params plus the subscription-key header
    pub fn ws_request(
        &self,
    ) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request, SttError> {
        let url = format!(
            "{}?language-code={}&model={}&vad_signals={}&sample_rate={}&high_vad_sensitivity={}",
            self.ws_url,
            self.language,
            self.model,
            self.vad_signals,
            self.sample_rate.as_u32(),
            self.high_vad_sensitivity,
        );

        let mut request = url
            .into_client_request()
            .map_err(|e| SttError::Config(e.to_string()))?;
        request.headers_mut().insert(
            "api-subscription-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| SttError::Config(e.to_string()))?,
        );
        Ok(request)
    }
}

/// A pooled connection with its opening time
pub struct PooledSocket {
    pub ws: WsStream,
    pub opened_at: Instant,
}

impl PooledSocket {
    pub fn age(&self) -> Duration {
        self.opened_at.elapsed()
    }
}

/// Keyed WebSocket pool
pub struct WsPool {
    idle: DashMap<PoolKey, Vec<PooledSocket>>,
    connect_timeout: Duration,
    max_session: Duration,
}

impl WsPool {
    pub fn new() -> Self {
        Self::with_timeouts(
            Duration::from_millis(timeouts::STT_CONNECT_MS),
            Duration::from_secs(timeouts::STT_MAX_SESSION_SECS),
        )
    }

    pub fn with_timeouts(connect_timeout: Duration, max_session: Duration) -> Self {
        Self {
            idle: DashMap::new(),
            connect_timeout,
            max_session,
        }
    }

    /// Take an idle connection or open a fresh one
    pub async fn get(&self, config: &SttSessionConfig) -> Result<PooledSocket, SttError> {
        let key = config.pool_key();
        if let Some(mut bucket) = self.idle.get_mut(&key) {
            while let Some(socket) = bucket.pop() {
                if socket.age() < self.max_session {
                    tracing::trace!(language = key.language.as_str(), "reusing pooled STT socket");
                    return Ok(socket);
                }
                // Expired: drop silently, the vendor closed it long ago.
            }
        }
        self.connect(config).await
    }

    /// Open a new connection, bounded by the connect timeout
    pub async fn connect(&self, config: &SttSessionConfig) -> Result<PooledSocket, SttError> {
        let request = config.ws_request()?;
        let connect = connect_async(request);

        let (ws, _response) = tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| SttError::ConnectTimeout(self.connect_timeout.as_millis() as u64))?
            .map_err(|e| SttError::Connect(e.to_string()))?;

        Ok(PooledSocket {
            ws,
            opened_at: Instant::now(),
        })
    }

    /// Eagerly open `n` idle connections for a session shape
    pub async fn prewarm(&self, config: &SttSessionConfig, n: usize) -> Result<usize, SttError> {
        let key = config.pool_key();
        let mut opened = 0;
        for _ in 0..n {
            match self.connect(config).await {
                Ok(socket) => {
                    self.idle.entry(key.clone()).or_default().push(socket);
                    opened += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, opened, "prewarm stopped early");
                    break;
                }
            }
        }
        Ok(opened)
    }

    /// Return a healthy socket to its bucket
    pub fn release(&self, key: PoolKey, socket: PooledSocket) {
        if socket.age() < self.max_session {
            self.idle.entry(key).or_default().push(socket);
        }
    }

    pub fn idle_count(&self, key: &PoolKey) -> usize {
        self.idle.get(key).map(|b| b.len()).unwrap_or(0)
    }

    /// Close every idle connection
    pub async fn close_all(&self) {
        let keys: Vec<PoolKey> = self.idle.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            if let Some((_, bucket)) = self.idle.remove(&key) {
                for mut socket in bucket {
                    let _ = socket.ws.send(Message::Close(None)).await;
                }
            }
        }
    }
}

impl Default for WsPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_carries_params_and_header() {
        let config = SttSessionConfig {
            ws_url: "ws://localhost:9000/stt".into(),
            api_key: "secret-key".into(),
            language: "hi-IN".into(),
            model: "saarika:v2".into(),
            vad_signals: true,
            high_vad_sensitivity: true,
            ..Default::default()
        };

        let request = config.ws_request().unwrap();
        let uri = request.uri().to_string();
        assert!(uri.contains("language-code=hi-IN"));
        assert!(uri.contains("model=saarika:v2"));
        assert!(uri.contains("vad_signals=true"));
        assert!(uri.contains("sample_rate=16000"));
        assert!(uri.contains("high_vad_sensitivity=true"));
        assert_eq!(
            request.headers().get("api-subscription-key").unwrap(),
            "secret-key"
        );
    }

    #[test]
    fn test_pool_key_groups_sessions() {
        let a = SttSessionConfig {
            api_key: "k".into(),
            language: "en-US".into(),
            model: "m".into(),
            ..Default::default()
        };
        let mut b = a.clone();
        b.sample_rate = SampleRate::Hz8000;
        assert_eq!(a.pool_key(), b.pool_key());

        let mut c = a.clone();
        c.language = "hi-IN".into();
        assert_ne!(a.pool_key(), c.pool_key());
    }

    #[tokio::test]
    async fn test_connect_timeout_classified() {
        // Unroutable address: connect will hang until the timeout.
        let pool = WsPool::with_timeouts(Duration::from_millis(50), Duration::from_secs(300));
        let config = SttSessionConfig {
            ws_url: "ws://10.255.255.1:80".into(),
            api_key: "k".into(),
            ..Default::default()
        };

        let result = pool.get(&config).await;
        assert!(matches!(
            result,
            Err(SttError::ConnectTimeout(_)) | Err(SttError::Connect(_))
        ));
    }
}
