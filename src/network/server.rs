//! WebSocket Game Server
//!
//! Accepts connections, performs the WebSocket handshake with an origin and
//! path check, and hands each connection to a reader task. Owns the
//! matchmaking queue and its pairing loop.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{header::ORIGIN, StatusCode};
use tracing::{debug, error, info, instrument, warn};

use crate::network::matchmaking::{MatchmakingQueue, QueueHandle};
use crate::network::reader::serve_connection;
use crate::network::session::SessionConfig;
use crate::DEFAULT_PORT;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Origins allowed to open a socket. Empty allows any origin.
    pub allowed_origins: Vec<String>,
    /// Path of the upgrade endpoint.
    pub ws_path: String,
    /// Match timing.
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_connections: 1000,
            allowed_origins: vec![
                format!("http://localhost:{}", DEFAULT_PORT),
                format!("http://127.0.0.1:{}", DEFAULT_PORT),
            ],
            ws_path: "/ws".to_string(),
            session: SessionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, GameServerError> {
        let mut config = Self::default();

        if let Some(addr) = env_parse::<SocketAddr>("SIMON_BIND_ADDR")? {
            config.bind_addr = addr;
        }
        if let Some(max) = env_parse::<usize>("SIMON_MAX_CONNECTIONS")? {
            config.max_connections = max;
        }
        if let Ok(origins) = std::env::var("SIMON_ALLOWED_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Ok(path) = std::env::var("SIMON_WS_PATH") {
            config.ws_path = path;
        }
        if let Some(ms) = env_parse::<u64>("SIMON_INITIAL_DEADLINE_MS")? {
            config.session.initial_deadline = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("SIMON_REPLAY_DEADLINE_MS")? {
            config.session.replay_deadline = Duration::from_millis(ms);
        }

        Ok(config)
    }

    /// Whether a handshake from `origin` may proceed.
    pub fn origin_allowed(&self, origin: Option<&str>) -> bool {
        if self.allowed_origins.is_empty() {
            return true;
        }
        origin.is_some_and(|o| self.allowed_origins.iter().any(|a| a == o))
    }
}

fn env_parse<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, GameServerError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| GameServerError::InvalidConfig { var, value }),
        Err(_) => Ok(None),
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Unparsable configuration value.
    #[error("Invalid value for {var}: {value:?}")]
    InvalidConfig {
        /// Environment variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Open connections.
    connections: Arc<AtomicUsize>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            connections: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        }
    }

    /// Bind the configured address and run until shutdown.
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Run on an already-bound listener until shutdown.
    #[instrument(skip_all)]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!("Game server listening on {}", listener.local_addr()?);

        let queue = MatchmakingQueue::new(self.config.session.clone());
        let queue_handle = queue.handle();
        let pairing_handle = tokio::spawn(queue.run(self.shutdown_tx.subscribe()));

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.connection_count() >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr, queue_handle.clone());
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        if let Err(e) = pairing_handle.await {
            error!("Matchmaking task failed: {}", e);
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr, queue: QueueHandle) {
        let config = self.config.clone();
        let connections = self.connections.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        connections.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            let callback = |req: &Request, resp: Response| check_handshake(&config, req, resp);
            match accept_hdr_async(stream, callback).await {
                Ok(ws_stream) => {
                    let (ws_sender, ws_receiver) = ws_stream.split();
                    tokio::select! {
                        result = serve_connection(ws_receiver, ws_sender, &queue) => {
                            match result {
                                Ok(()) => debug!("Connection {} closed", addr),
                                Err(e) => debug!("Connection {} ended: {}", addr, e),
                            }
                        }
                        _ = shutdown_rx.recv() => {
                            debug!("Closing connection {} for shutdown", addr);
                        }
                    }
                }
                Err(e) => {
                    warn!("WebSocket handshake failed for {}: {}", addr, e);
                }
            }

            connections.fetch_sub(1, Ordering::SeqCst);
            info!("Client {} cleaned up", addr);
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Accept only the upgrade path and allowed origins.
fn check_handshake(
    config: &ServerConfig,
    req: &Request,
    resp: Response,
) -> Result<Response, ErrorResponse> {
    if req.uri().path() != config.ws_path {
        return Err(reject(StatusCode::NOT_FOUND, "not found"));
    }

    let origin = req.headers().get(ORIGIN).and_then(|v| v.to_str().ok());
    if !config.origin_allowed(origin) {
        debug!("Rejected handshake from origin {:?}", origin);
        return Err(reject(StatusCode::FORBIDDEN, "origin not allowed"));
    }

    Ok(resp)
}

fn reject(status: StatusCode, body: &str) -> ErrorResponse {
    let mut resp = ErrorResponse::new(Some(body.to_string()));
    *resp.status_mut() = status;
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: &str, origin: Option<&str>) -> Request {
        let mut builder = Request::builder().uri(path);
        if let Some(origin) = origin {
            builder = builder.header(ORIGIN, origin);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8000);
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.ws_path, "/ws");
        assert_eq!(config.session.initial_deadline, Duration::from_secs(30));
        assert_eq!(config.session.replay_deadline, Duration::from_secs(1));
    }

    #[test]
    fn test_origin_allow_list() {
        let config = ServerConfig::default();
        assert!(config.origin_allowed(Some("http://localhost:8000")));
        assert!(config.origin_allowed(Some("http://127.0.0.1:8000")));
        assert!(!config.origin_allowed(Some("http://evil.example")));
        assert!(!config.origin_allowed(None));

        let open = ServerConfig {
            allowed_origins: Vec::new(),
            ..Default::default()
        };
        assert!(open.origin_allowed(None));
    }

    #[test]
    fn test_handshake_checks() {
        let config = ServerConfig::default();

        let ok = check_handshake(
            &config,
            &request("/ws", Some("http://localhost:8000")),
            Response::default(),
        );
        assert!(ok.is_ok());

        let wrong_path = check_handshake(
            &config,
            &request("/", Some("http://localhost:8000")),
            Response::default(),
        );
        assert_eq!(wrong_path.unwrap_err().status(), StatusCode::NOT_FOUND);

        let wrong_origin = check_handshake(
            &config,
            &request("/ws", Some("http://evil.example")),
            Response::default(),
        );
        assert_eq!(wrong_origin.unwrap_err().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_invalid_env_value_reported() {
        std::env::set_var("SIMON_TEST_BAD_PORT", "not-a-number");
        let result = env_parse::<u16>("SIMON_TEST_BAD_PORT");
        assert!(matches!(
            result,
            Err(GameServerError::InvalidConfig { var: "SIMON_TEST_BAD_PORT", .. })
        ));
        assert!(matches!(env_parse::<u16>("SIMON_TEST_UNSET_VAR"), Ok(None)));
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = GameServer::new(ServerConfig::default());
        assert_eq!(server.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let server = Arc::new(GameServer::new(ServerConfig::default()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let running = server.clone();
        let task = tokio::spawn(async move { running.serve(listener).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        server.shutdown();
        task.await.unwrap().unwrap();
    }
}
