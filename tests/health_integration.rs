//! Liveness endpoint served on a random port.

use std::time::Duration;

use tokio::net::TcpListener;

use onboard_bot::health::{ALIVE, health_routes, spawn_health_server};

/// Start the router on a random local port, return the port.
async fn start_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, health_routes()).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    port
}

#[tokio::test]
async fn root_reports_alive() {
    let port = start_server().await;

    let resp = reqwest::get(format!("http://127.0.0.1:{port}/"))
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "Bot is alive!");
}

#[tokio::test]
async fn other_paths_not_found() {
    let port = start_server().await;

    let resp = reqwest::get(format!("http://127.0.0.1:{port}/status"))
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn spawned_server_binds_all_interfaces() {
    // Port 0 lets the OS choose.
    let addr = spawn_health_server(0).await.unwrap();
    assert!(addr.ip().is_unspecified());

    let resp = reqwest::get(format!("http://127.0.0.1:{}/", addr.port()))
        .await
        .unwrap();
    assert_eq!(resp.text().await.unwrap(), ALIVE);
}
