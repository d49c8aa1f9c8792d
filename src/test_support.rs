//! Helpers shared by the inline test modules.

use axum::Router;
use std::time::Duration;
use tokio::net::TcpListener;

/// Serve `app` on a random local port and return its base URL (no trailing slash).
pub async fn spawn_stub(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}")
}
