//! Development server with live reload

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEvent};
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::helpers;
use crate::Site;

/// Live reload script injected into HTML pages
const LIVE_RELOAD_SCRIPT: &str = r#"
<script>
(function() {
    var ws = new WebSocket('ws://' + location.host + '/__livereload');
    ws.onmessage = function(msg) {
        if (msg.data === 'reload') {
            location.reload();
        }
    };
    ws.onclose = function() {
        console.log('Live reload disconnected. Attempting to reconnect...');
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
</body>
"#;

/// How `serve` listens
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub bind: String,
    pub port: u16,
    pub live_reload: bool,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 1313,
            live_reload: true,
        }
    }
}

impl ServeOptions {
    /// Base URL the served pages are rendered with
    pub fn base_url(&self) -> String {
        format!("http://{}:{}/", self.bind, self.port)
    }
}

struct ServerState {
    public_dir: PathBuf,
    reload_tx: broadcast::Sender<()>,
    live_reload: bool,
}

/// Build the site, serve the publish dir, and rebuild on changes
pub async fn start(site: Site, options: ServeOptions) -> Result<()> {
    let mut build_options = site.options.clone();
    if build_options.base_url.is_none() {
        build_options.base_url = Some(options.base_url());
    }
    let site = site.with_options(build_options);

    let report = site.build()?;
    if !report.is_success() {
        tracing::warn!("{} pages failed to render", report.failed.len());
    }

    let (reload_tx, _) = broadcast::channel::<()>(16);

    let state = Arc::new(ServerState {
        public_dir: site.public_dir.clone(),
        reload_tx: reload_tx.clone(),
        live_reload: options.live_reload,
    });

    let app = Router::new()
        .route("/__livereload", get(livereload_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let bind_ip = if options.bind == "localhost" {
        "127.0.0.1"
    } else {
        options.bind.as_str()
    };
    let addr: SocketAddr = format!("{}:{}", bind_ip, options.port)
        .parse()
        .with_context(|| format!("Invalid bind address {:?}", options.bind))?;

    println!("Server running at http://{}:{}/", options.bind, options.port);
    if options.live_reload {
        println!("Live reload enabled. Watching for changes...");
    }
    println!("Press Ctrl+C to stop.");

    tokio::task::spawn_blocking(move || {
        if let Err(e) = watch_and_rebuild(site, reload_tx) {
            tracing::error!("File watcher error: {:#}", e);
        }
    });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Directories and files whose changes trigger a rebuild
fn watched_paths(site: &Site) -> Vec<(PathBuf, RecursiveMode)> {
    let mut paths = vec![
        (site.content_dir.clone(), RecursiveMode::Recursive),
        (site.layout_dir.clone(), RecursiveMode::Recursive),
        (site.static_dir.clone(), RecursiveMode::Recursive),
        (site.archetype_dir.clone(), RecursiveMode::Recursive),
    ];
    if let Some(theme_dir) = &site.theme_dir {
        paths.push((theme_dir.clone(), RecursiveMode::Recursive));
    }
    if let Some(config_path) = &site.config_path {
        paths.push((config_path.clone(), RecursiveMode::NonRecursive));
    }
    paths
}

/// Block on file events, rebuilding after each debounced batch
fn watch_and_rebuild(site: Site, reload_tx: broadcast::Sender<()>) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(300), tx)?;

    for (path, mode) in watched_paths(&site) {
        if path.exists() {
            debouncer.watcher().watch(&path, mode)?;
            tracing::debug!("Watching: {:?}", path);
        }
    }

    let mut site = site;
    loop {
        let events = match rx.recv() {
            Ok(Ok(events)) => events,
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
                continue;
            }
            Err(_) => break,
        };

        let changed: Vec<&DebouncedEvent> = events
            .iter()
            .filter(|e| is_relevant(&e.path, &site.public_dir))
            .collect();
        if changed.is_empty() {
            continue;
        }
        for event in &changed {
            tracing::info!("Changed: {}", event.path.display());
        }

        let config_changed = site
            .config_path
            .as_ref()
            .map(|config| changed.iter().any(|e| &e.path == config))
            .unwrap_or(false);
        if config_changed {
            match reload_site(&site) {
                Ok(reloaded) => site = reloaded,
                Err(e) => {
                    tracing::error!("Failed to reload config: {:#}", e);
                    continue;
                }
            }
        } else {
            site.options.now = Utc::now();
        }

        match site.build() {
            Ok(report) => {
                if !report.is_success() {
                    tracing::warn!("{} pages failed to render", report.failed.len());
                }
                let _ = reload_tx.send(());
            }
            Err(e) => tracing::error!("Rebuild failed: {:#}", e),
        }
    }

    Ok(())
}

/// Re-read the config, keeping the command-line options
fn reload_site(site: &Site) -> Result<Site> {
    let mut options = site.options.clone();
    options.now = Utc::now();
    Ok(Site::new(&site.base_dir)?.with_options(options))
}

/// Editor droppings and our own output do not trigger rebuilds
fn is_relevant(path: &Path, public_dir: &Path) -> bool {
    if path.starts_with(public_dir) {
        return false;
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    let path_str = path.to_string_lossy();
    !path_str.contains("/.git/")
        && !name.starts_with('.')
        && !name.ends_with('~')
        && !name.ends_with(".swp")
}

async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            result = reload_rx.recv() => {
                match result {
                    Ok(_) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// Serve HTML with the live reload script injected, everything else through
/// `ServeDir`
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let Some(relative) = request_path(request.uri().path()) else {
        return (StatusCode::BAD_REQUEST, "Bad request").into_response();
    };

    let candidate = state.public_dir.join(&relative);
    let file_path = if candidate.is_dir() {
        candidate.join("index.html")
    } else {
        candidate
    };

    let is_html = file_path
        .extension()
        .map(|ext| ext == "html" || ext == "htm")
        .unwrap_or(false);

    if is_html && state.live_reload {
        match tokio::fs::read_to_string(&file_path).await {
            Ok(content) => Html(inject_live_reload(&content)).into_response(),
            Err(_) => not_found(&state).await,
        }
    } else {
        let mut service = ServeDir::new(&state.public_dir).append_index_html_on_directories(true);
        match service.try_call(request).await {
            Ok(response) if response.status() == StatusCode::NOT_FOUND => not_found(&state).await,
            Ok(response) => response.into_response(),
            Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
        }
    }
}

/// The site's own 404 page when it has one
async fn not_found(state: &ServerState) -> Response {
    match tokio::fs::read_to_string(state.public_dir.join("404.html")).await {
        Ok(content) if state.live_reload => {
            (StatusCode::NOT_FOUND, Html(inject_live_reload(&content))).into_response()
        }
        Ok(content) => (StatusCode::NOT_FOUND, Html(content)).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

/// Percent-decode a request path into a path relative to the publish dir.
/// Paths that would escape it are rejected.
fn request_path(path: &str) -> Option<PathBuf> {
    let decoded = helpers::decode_url(path);
    let mut relative = PathBuf::new();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(relative)
}

fn inject_live_reload(html: &str) -> String {
    if html.contains("</body>") {
        html.replacen("</body>", LIVE_RELOAD_SCRIPT, 1)
    } else {
        format!("{}{}", html, LIVE_RELOAD_SCRIPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_path() {
        assert_eq!(request_path("/"), Some(PathBuf::new()));
        assert_eq!(
            request_path("/posts/hello%20world/"),
            Some(PathBuf::from("posts/hello world"))
        );
        assert_eq!(request_path("/../etc/passwd"), None);
        assert_eq!(request_path("/posts/%2e%2e/%2e%2e/secret"), None);
    }

    #[test]
    fn test_inject_live_reload() {
        let html = inject_live_reload("<html><body><p>x</p></body></html>");
        assert!(html.contains("/__livereload"));
        assert!(html.ends_with("</body>\n</html>"));

        let fragment = inject_live_reload("<p>x</p>");
        assert!(fragment.starts_with("<p>x</p>"));
        assert!(fragment.contains("/__livereload"));
    }

    #[test]
    fn test_is_relevant() {
        let public = Path::new("/site/public");
        assert!(is_relevant(Path::new("/site/content/posts/a.md"), public));
        assert!(!is_relevant(Path::new("/site/public/index.html"), public));
        assert!(!is_relevant(Path::new("/site/content/.a.md.swp"), public));
        assert!(!is_relevant(Path::new("/site/content/a.md~"), public));
    }

    #[test]
    fn test_serve_base_url() {
        let options = ServeOptions::default();
        assert_eq!(options.base_url(), "http://127.0.0.1:1313/");
    }
}
