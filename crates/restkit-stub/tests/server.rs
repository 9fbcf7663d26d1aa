use std::time::{Duration, Instant};

use axum::http::StatusCode;
use restkit_stub::{StubConfig, StubReply, StubServer, NOT_FOUND_BODY};
use tokio::task::JoinHandle;

async fn spawn(server: StubServer) -> (String, restkit_stub::StopHandle, JoinHandle<()>) {
    let bound = server.bind().await.expect("Failed to bind stub server");
    let base = bound.url("");
    let stop = bound.stop_handle();
    let task = tokio::spawn(async move {
        bound.serve().await.expect("stub server failed");
    });
    (base, stop, task)
}

#[tokio::test]
async fn test_fixed_reply_for_every_method() {
    let config = StubConfig::new(0, "/test", StubReply::new(201, "created"));
    let (base, stop, task) = spawn(StubServer::new(config)).await;
    let client = reqwest::Client::new();

    for method in [
        reqwest::Method::GET,
        reqwest::Method::POST,
        reqwest::Method::PUT,
        reqwest::Method::DELETE,
    ] {
        let response = client
            .request(method, format!("{}/test?q=test", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
        assert_eq!(response.text().await.unwrap(), "created");
    }

    stop.done();
    task.await.unwrap();
}

#[tokio::test]
async fn test_unregistered_path_is_404() {
    let (base, stop, task) = spawn(StubServer::new(StubConfig::default())).await;

    let response = reqwest::get(format!("{}/missing", base)).await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(response.text().await.unwrap(), NOT_FOUND_BODY);

    stop.done();
    task.await.unwrap();
}

#[tokio::test]
async fn test_form_post_is_accepted() {
    let (base, stop, task) = spawn(StubServer::new(StubConfig::default())).await;

    let response = reqwest::Client::new()
        .post(format!("{}/test", base))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("q=test&name=a+b")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "Test Ok");

    stop.done();
    task.await.unwrap();
}

#[tokio::test]
async fn test_custom_handler_replaces_fixed_reply() {
    let server = StubServer::new(StubConfig::default())
        .custom_handler(|| async { (StatusCode::IM_A_TEAPOT, "short and stout") });
    let (base, stop, task) = spawn(server).await;

    let response = reqwest::get(format!("{}/test", base)).await.unwrap();
    assert_eq!(response.status().as_u16(), 418);
    assert_eq!(response.text().await.unwrap(), "short and stout");

    stop.done();
    task.await.unwrap();
}

#[tokio::test]
async fn test_extra_route() {
    let server = StubServer::new(StubConfig::default())
        .route("/health", || async { "healthy" });
    let (base, stop, task) = spawn(server).await;

    let response = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(response.text().await.unwrap(), "healthy");
    let response = reqwest::get(format!("{}/test", base)).await.unwrap();
    assert_eq!(response.text().await.unwrap(), "Test Ok");

    stop.done();
    task.await.unwrap();
}

#[tokio::test]
async fn test_start_blocks_until_done() {
    let server = StubServer::new(StubConfig::default());
    let stop = server.stop_handle();
    let task = tokio::spawn(server.start());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!task.is_finished());

    stop.done();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("start should return after done")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_stop_does_not_wait_for_slow_request() {
    let server = StubServer::new(StubConfig::default()).custom_handler(|| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        "late"
    });
    let (base, stop, task) = spawn(server).await;

    let request = tokio::spawn(async move { reqwest::get(format!("{}/test", base)).await });
    tokio::time::sleep(Duration::from_millis(200)).await;

    let stopped_at = Instant::now();
    stop.done();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("serve should return while the request is still running")
        .unwrap();
    assert!(stopped_at.elapsed() < Duration::from_millis(500));

    request.abort();
}

#[tokio::test]
async fn test_listener_closed_after_stop() {
    let (base, stop, task) = spawn(StubServer::new(StubConfig::default())).await;
    stop.done();
    task.await.unwrap();

    let result = reqwest::get(format!("{}/test", base)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_independent_stubs_run_side_by_side() {
    let (first, stop_first, task_first) =
        spawn(StubServer::new(StubConfig::new(0, "/a", StubReply::ok("first")))).await;
    let (second, stop_second, task_second) =
        spawn(StubServer::new(StubConfig::new(0, "/a", StubReply::ok("second")))).await;

    assert_eq!(reqwest::get(format!("{}/a", first)).await.unwrap().text().await.unwrap(), "first");
    assert_eq!(reqwest::get(format!("{}/a", second)).await.unwrap().text().await.unwrap(), "second");

    stop_first.done();
    task_first.await.unwrap();

    // Stopping one stub leaves the other serving.
    assert_eq!(reqwest::get(format!("{}/a", second)).await.unwrap().text().await.unwrap(), "second");

    stop_second.done();
    task_second.await.unwrap();
}
