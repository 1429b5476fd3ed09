//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pagespeed_proxy::config::{PageSpeedConfig, RouteConfig};
use pagespeed_proxy::lifecycle::Shutdown;
use pagespeed_proxy::HttpServer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a mock origin that answers every request with `content_type` and `body`.
/// Returns the bound address.
pub async fn start_mock_origin(content_type: &'static str, body: &'static str) -> SocketAddr {
    start_recording_origin(content_type, body).await.0
}

/// Like [`start_mock_origin`], also keeping the head of every request it receives.
pub async fn start_recording_origin(
    content_type: &'static str,
    body: &'static str,
) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let heads = Arc::new(Mutex::new(Vec::new()));
    let recorded = heads.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let recorded = recorded.clone();
            tokio::spawn(async move {
                // Requests in these tests have no body; the head fits one read.
                let mut buf = [0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                recorded
                    .lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&buf[..n]).into_owned());

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    content_type,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, heads)
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Config proxying to `origin` with one catch-all route.
pub fn proxy_config(origin: SocketAddr) -> PageSpeedConfig {
    let mut config = PageSpeedConfig::default();
    config.origin.url = format!("http://{origin}");
    config.timeouts.connect_secs = 1;
    config.routes.push(RouteConfig {
        name: "pages".into(),
        host: None,
        path_prefix: Some("/".into()),
        controller: "Home".into(),
        action: "Index".into(),
        area: None,
        priority: 0,
    });
    config
}

/// Start the proxy on an ephemeral port. Keep the returned `Shutdown`
/// alive for as long as the proxy should run.
pub async fn start_proxy(config: PageSpeedConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, shutdown)
}
