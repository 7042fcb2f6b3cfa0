use anyhow::{Context, Result};
use axum::{
    Router,
    extract::State,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc};
use tower_http::services::ServeDir;

/// WebSocket route the injected client connects to.
pub const RELOAD_PATH: &str = "/__livereload";

const RELOAD_MESSAGE: &str = "reload";
const MIN_RELOAD_INTERVAL: Duration = Duration::from_millis(1000);

/// Configuration for the preview server
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    pub host: String,
    pub port: u16,
    /// Build output to serve and watch
    pub root: PathBuf,
    /// Open the page in a browser once listening
    pub open: bool,
    /// Changed paths containing any of these are ignored
    pub ignore: Vec<String>,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            root: PathBuf::from("./dist"),
            open: false,
            ignore: vec![],
        }
    }
}

impl DevServerConfig {
    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

/// Serves the build output and tells connected pages to reload when it
/// changes.
pub struct DevServer {
    config: DevServerConfig,
}

impl DevServer {
    pub fn new(config: DevServerConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        if !self.config.root.exists() {
            anyhow::bail!("Output directory does not exist: {}", self.config.root.display());
        }
        let addr = self.config.addr()?;

        let (reload_tx, _) = broadcast::channel::<String>(100);

        let watch_root = self.config.root.clone();
        let ignore = self.config.ignore.clone();
        let watcher_tx = reload_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = watch_output(watch_root, watcher_tx, ignore).await {
                log::error!("Output watcher stopped: {e:#}");
            }
        });

        let app = Router::new()
            .route(RELOAD_PATH, get(websocket_handler))
            .fallback_service(ServeDir::new(&self.config.root))
            .with_state(AppState { reload_tx });

        log::info!("Serving {} at http://{addr}", self.config.root.display());

        if self.config.open {
            if let Err(e) = open::that(format!("http://{addr}")) {
                log::warn!("Failed to open browser: {e}");
            }
        }

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

#[derive(Clone)]
struct AppState {
    reload_tx: broadcast::Sender<String>,
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| forward_reloads(socket, state.reload_tx))
}

async fn forward_reloads(mut socket: WebSocket, reload_tx: broadcast::Sender<String>) {
    let mut rx = reload_tx.subscribe();

    if socket.send(Message::Text("connected".into())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            msg = rx.recv() => {
                let Ok(msg) = msg else { break };
                if socket.send(Message::Text(msg.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                if incoming.is_none() {
                    break;
                }
            }
        }
    }
}

fn is_ignored(path: &Path, patterns: &[String]) -> bool {
    let path = path.to_string_lossy();
    patterns.iter().any(|pattern| path.contains(pattern.as_str()))
}

/// Debounces bursts of file events; a rebuild rewrites many files at once.
struct ReloadThrottle {
    last: Option<Instant>,
    interval: Duration,
}

impl ReloadThrottle {
    fn new(interval: Duration) -> Self {
        Self { last: None, interval }
    }

    fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) <= self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

async fn watch_output(
    root: PathBuf,
    reload_tx: broadcast::Sender<String>,
    ignore: Vec<String>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(100);

    let mut debouncer = new_debouncer(Duration::from_millis(500), move |res: DebounceEventResult| {
        match res {
            Ok(events) => {
                for event in events {
                    if !is_ignored(&event.path, &ignore) {
                        let _ = tx.blocking_send(event.path);
                    }
                }
            }
            Err(e) => log::warn!("Watch error: {e}"),
        }
    })?;
    debouncer
        .watcher()
        .watch(&root, notify::RecursiveMode::Recursive)?;
    log::info!("Watching {}", root.display());

    let mut throttle = ReloadThrottle::new(MIN_RELOAD_INTERVAL);
    while let Some(path) = rx.recv().await {
        log::debug!("Changed: {}", path.display());
        if throttle.ready(Instant::now()) {
            // No subscribers just means no page is open
            let _ = reload_tx.send(RELOAD_MESSAGE.to_string());
            log::info!("Reloading connected pages");
        }
    }

    Ok(())
}
