#![allow(dead_code)]

use media_streamer::{AppState, ClaimAuthority, ClaimManager, Config, StorageManager};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::sleep;

pub const MIB: u64 = 1024 * 1024;
pub const HOUR: Duration = Duration::from_secs(3600);

pub const SESSION_KEY: [u8; 32] = [11u8; 32];
pub const RESOURCE_KEY: [u8; 32] = [22u8; 32];

/// Deterministic, non-repeating-looking test content
pub fn object(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}

/// Test harness around a gateway bound to a free local port
pub struct TestServer {
    handle: JoinHandle<()>,
    port: u16,
    pub storage: StorageManager,
    pub authority: ClaimAuthority,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Gateway over an in-memory store with a 1 MiB chunk ceiling
    pub async fn start() -> Self {
        Self::start_with(Config::default()).await
    }

    pub async fn start_with(config: Config) -> Self {
        // Only open when debugging
        // tracing_subscriber::fmt::init();

        let port = portpicker::pick_unused_port().expect("No available port");
        let storage = StorageManager::memory().expect("memory storage");
        let authority = authority();

        let state = AppState::new(Arc::new(storage.clone()), authority.clone(), &config);
        let cors = media_streamer::cors_layer(&config.allowed_origins).unwrap();
        let app = media_streamer::app(state, cors);

        let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = client();
        wait_ready(&client, port).await;

        TestServer {
            handle,
            port,
            storage,
            authority,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }

    pub async fn put(&self, key: &str, data: Vec<u8>) {
        self.storage.put_object(key, data).await.unwrap();
    }

    pub fn session(&self, user_id: &str) -> String {
        self.authority.issue_session(user_id, HOUR).unwrap()
    }

    pub fn video_token(&self, user_id: &str, path: &str) -> String {
        self.authority.issue_resource(user_id, path, HOUR).unwrap()
    }

    /// GET with the session cookie and an optional Range header
    pub async fn get(&self, path: &str, session: &str, range: Option<&str>) -> reqwest::Response {
        let mut request = self
            .client
            .get(self.url(path))
            .header("Cookie", format!("bs-token={session}"));
        if let Some(range) = range {
            request = request.header("Range", range);
        }
        request.send().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn authority() -> ClaimAuthority {
    ClaimAuthority::new(
        ClaimManager::with_key(1, SESSION_KEY),
        ClaimManager::with_key(1, RESOURCE_KEY),
    )
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Poll `/health` until the server answers
pub async fn wait_ready(client: &reqwest::Client, port: u16) {
    for _ in 0..50 {
        if let Ok(response) = client
            .get(format!("http://127.0.0.1:{port}/health"))
            .send()
            .await
            && response.status().is_success()
        {
            return;
        }

        sleep(Duration::from_millis(10)).await;
    }
    panic!("server on port {port} did not become ready");
}

pub async fn error_type(response: reqwest::Response) -> String {
    let body: serde_json::Value = response.json().await.unwrap();
    body["type"].as_str().unwrap().to_string()
}
