//! Test utilities for restkit crates.

use restkit_stub::{StopHandle, StubConfig, StubError, StubReply, StubServer};
use tokio::task::JoinHandle;

/// A stub server serving on a background task.
pub struct RunningStub {
    base_url: String,
    stop: StopHandle,
    task: JoinHandle<Result<(), StubError>>,
}

impl RunningStub {
    /// Absolute URL for `path` on the stub.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Signal stop and wait for the server to close its listener.
    pub async fn shutdown(self) {
        self.stop.done();
        match self.task.await {
            Ok(result) => result.expect("stub server failed"),
            Err(e) => panic!("stub server task panicked: {}", e),
        }
    }
}

/// Bind `server` and serve it on a background task.
pub async fn spawn_stub(server: StubServer) -> RunningStub {
    restkit_log::init_for_tests();

    let bound = server.bind().await.expect("Failed to bind stub server");
    let base_url = bound.url("");
    let stop = bound.stop_handle();
    let task = tokio::spawn(bound.serve());

    RunningStub {
        base_url,
        stop,
        task,
    }
}

/// Stub on a free port replying `code`/`body` on `endpoint`.
pub async fn spawn_reply(endpoint: &str, code: u16, body: &str) -> RunningStub {
    spawn_stub(StubServer::new(StubConfig::new(
        0,
        endpoint,
        StubReply::new(code, body),
    )))
    .await
}

/// Assert that a Result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a Result is Err and return the error.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    };
}
