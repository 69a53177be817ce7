mod common;

use common::{MIB, TestServer, client, error_type, object, wait_ready};
use media_streamer::{ClaimAuthority, ClaimManager, Config};
use std::time::Duration;

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;

    let response = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_full_download_without_range() {
    let server = TestServer::start().await;
    // Larger than the chunk ceiling: full downloads are not clamped
    let data = object(MIB as usize + 4321);
    server.put("thumbs/big.png", data.clone()).await;
    let session = server.session("alice");

    let response = server.get("/thumbnail/thumbs/big.png", &session, None).await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-length"], data.len().to_string());
    assert_eq!(response.headers()["content-type"], "image/png");
    assert_eq!(response.headers()["accept-ranges"], "bytes");
    assert!(response.headers().get("content-range").is_none());
    assert_eq!(response.bytes().await.unwrap(), data);
}

#[tokio::test]
async fn test_open_ended_range_is_clamped_to_chunk_size() {
    let server = TestServer::start().await;
    let data = object(1285179);
    server.put("clip.mp4", data.clone()).await;
    let session = server.session("alice");
    let token = server.video_token("alice", "clip.mp4");

    let response = server
        .get(&format!("/video/clip.mp4?video-token={token}"), &session, Some("bytes=0-"))
        .await;
    assert_eq!(response.status(), 206);
    assert_eq!(response.headers()["content-range"], "bytes 0-1048575/1285179");
    assert_eq!(response.headers()["content-length"], "1048576");
    assert_eq!(response.headers()["content-type"], "video/mp4");
    assert_eq!(response.bytes().await.unwrap(), data[..1048576]);

    // The client continues where the clamp stopped
    let response = server
        .get(
            &format!("/video/clip.mp4?video-token={token}"),
            &session,
            Some("bytes=1048576-"),
        )
        .await;
    assert_eq!(response.status(), 206);
    assert_eq!(
        response.headers()["content-range"],
        "bytes 1048576-1285178/1285179"
    );
    assert_eq!(response.bytes().await.unwrap(), data[1048576..]);
}

#[tokio::test]
async fn test_explicit_range() {
    let server = TestServer::start().await;
    let data = object(1285179);
    server.put("preview.gif", data.clone()).await;
    let session = server.session("alice");

    let response = server
        .get("/preview/preview.gif", &session, Some("bytes=500-724"))
        .await;
    assert_eq!(response.status(), 206);
    assert_eq!(response.headers()["content-length"], "225");
    assert_eq!(response.headers()["content-range"], "bytes 500-724/1285179");
    assert_eq!(response.bytes().await.unwrap(), data[500..=724]);
}

#[tokio::test]
async fn test_over_long_range_is_clamped() {
    let server = TestServer::start().await;
    let data = object(3 * MIB as usize);
    server.put("thumb.png", data.clone()).await;
    let session = server.session("alice");

    let response = server
        .get("/thumbnail/thumb.png", &session, Some("bytes=10-2097162"))
        .await;
    assert_eq!(response.status(), 206);
    assert_eq!(
        response.headers()["content-range"],
        format!("bytes 10-{}/{}", 10 + MIB - 1, 3 * MIB)
    );
    assert_eq!(response.headers()["content-length"], MIB.to_string());
    assert_eq!(response.bytes().await.unwrap(), data[10..10 + MIB as usize]);
}

#[tokio::test]
async fn test_last_byte() {
    let server = TestServer::start().await;
    let data = object(1000);
    server.put("thumb.png", data.clone()).await;
    let session = server.session("alice");

    let response = server
        .get("/thumbnail/thumb.png", &session, Some("bytes=999-"))
        .await;
    assert_eq!(response.status(), 206);
    assert_eq!(response.headers()["content-range"], "bytes 999-999/1000");
    assert_eq!(response.bytes().await.unwrap(), data[999..]);
}

#[tokio::test]
async fn test_unsatisfiable_ranges() {
    let server = TestServer::start().await;
    server.put("thumb.png", object(100000)).await;
    let session = server.session("alice");

    for range in [
        "bytes=20000-10000",
        "bytes=100-100",
        "bytes=99800-100200",
        "bytes=0-100000",
        "bytes=100000-",
    ] {
        let response = server.get("/thumbnail/thumb.png", &session, Some(range)).await;
        assert_eq!(response.status(), 416, "{range}");
        assert_eq!(error_type(response).await, "RangeNotSatisfiableError");
    }
}

#[tokio::test]
async fn test_malformed_range_header() {
    let server = TestServer::start().await;
    server.put("thumb.png", object(1000)).await;
    let session = server.session("alice");

    for range in ["bytes=-100", "foo=0-100", "bytes=0-10,20-30", "bytes=a-b"] {
        let response = server.get("/thumbnail/thumb.png", &session, Some(range)).await;
        assert_eq!(response.status(), 416, "{range}");
        assert_eq!(error_type(response).await, "RangeHeaderInvalidError");
    }

    // Malformed beats missing: the size lookup never happens
    let response = server
        .get("/thumbnail/missing.png", &session, Some("bytes=-100"))
        .await;
    assert_eq!(response.status(), 416);
}

#[tokio::test]
async fn test_path_not_matching_endpoint() {
    let server = TestServer::start().await;
    server.put("clip.mp4", object(100)).await;
    let session = server.session("alice");

    for path in ["/thumbnail/clip.mp4", "/preview/clip.mp4", "/preview/noext"] {
        let response = server.get(path, &session, None).await;
        assert_eq!(response.status(), 400, "{path}");

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["type"], "PathInvalidError");
        assert_eq!(body["message"], "Path is invalid");
    }

    let token = server.video_token("alice", "clip.txt");
    let response = server
        .get(&format!("/video/clip.txt?video-token={token}"), &session, None)
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_missing_object() {
    let server = TestServer::start().await;
    let session = server.session("alice");
    let token = server.video_token("alice", "ghost.mp4");

    let response = server
        .get(&format!("/video/ghost.mp4?video-token={token}"), &session, None)
        .await;
    assert_eq!(response.status(), 404);
    assert_eq!(error_type(response).await, "ResourceNotFoundError");
}

#[tokio::test]
async fn test_empty_object() {
    let server = TestServer::start().await;
    server.put("empty.png", Vec::new()).await;
    let session = server.session("alice");

    let response = server.get("/thumbnail/empty.png", &session, None).await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-length"], "0");
    assert!(response.bytes().await.unwrap().is_empty());

    let response = server
        .get("/thumbnail/empty.png", &session, Some("bytes=0-"))
        .await;
    assert_eq!(response.status(), 416);
}

#[tokio::test]
async fn test_custom_chunk_size() {
    let server = TestServer::start_with(Config {
        max_chunk_size_mb: 2,
        ..Default::default()
    })
    .await;
    server.put("thumb.png", object(5 * MIB as usize)).await;
    let session = server.session("alice");

    let response = server
        .get("/thumbnail/thumb.png", &session, Some("bytes=0-"))
        .await;
    assert_eq!(response.status(), 206);
    assert_eq!(response.headers()["content-length"], (2 * MIB).to_string());
}

#[tokio::test]
async fn test_run_with_local_workspace() {
    let port = portpicker::pick_unused_port().expect("No available port");
    let workspace = format!("/tmp/test-workspace-{}", uuid::Uuid::new_v4());
    std::fs::create_dir_all(format!("{workspace}/media")).unwrap();
    let data = object(4096);
    std::fs::write(format!("{workspace}/media/thumb.png"), &data).unwrap();

    let config = Config {
        listen_on_port: port,
        workspace: workspace.clone(),
        session_keys: vec![(3, [1u8; 32])],
        resource_keys: vec![(3, [2u8; 32])],
        ..Default::default()
    };
    let handle = tokio::spawn(async move {
        media_streamer::run(config).await.unwrap();
    });

    let client = client();
    wait_ready(&client, port).await;

    let authority = ClaimAuthority::new(
        ClaimManager::with_key(3, [1u8; 32]),
        ClaimManager::with_key(3, [2u8; 32]),
    );
    let session = authority
        .issue_session("alice", Duration::from_secs(60))
        .unwrap();

    let response = client
        .get(format!("http://127.0.0.1:{port}/thumbnail/media/thumb.png"))
        .header("Authorization", format!("Bearer {session}"))
        .header("Range", "bytes=100-199")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 206);
    assert_eq!(response.headers()["content-range"], "bytes 100-199/4096");
    assert_eq!(response.bytes().await.unwrap(), data[100..200]);

    handle.abort();
    std::fs::remove_dir_all(&workspace).ok();
}

#[tokio::test]
async fn test_encoded_traversal_stays_in_workspace() {
    let port = portpicker::pick_unused_port().expect("No available port");
    let base = format!("/tmp/test-traversal-{}", uuid::Uuid::new_v4());
    let workspace = format!("{base}/ws");
    std::fs::create_dir_all(&workspace).unwrap();
    std::fs::write(format!("{base}/secret.png"), b"OUTSIDE-WORKSPACE").unwrap();

    let config = Config {
        listen_on_port: port,
        workspace: workspace.clone(),
        session_keys: vec![(3, [1u8; 32])],
        resource_keys: vec![(3, [2u8; 32])],
        ..Default::default()
    };
    let handle = tokio::spawn(async move {
        media_streamer::run(config).await.unwrap();
    });

    let client = client();
    wait_ready(&client, port).await;

    let session = ClaimAuthority::new(
        ClaimManager::with_key(3, [1u8; 32]),
        ClaimManager::with_key(3, [2u8; 32]),
    )
    .issue_session("alice", Duration::from_secs(60))
    .unwrap();

    for path in ["/thumbnail/..%2Fsecret.png", "/thumbnail/%2E%2E%2Fsecret.png"] {
        let response = client
            .get(format!("http://127.0.0.1:{port}{path}"))
            .header("Authorization", format!("Bearer {session}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "{path}");
        assert_eq!(error_type(response).await, "PathInvalidError");
    }

    handle.abort();
    std::fs::remove_dir_all(&base).ok();
}
