//! Stub server lifecycle.

use std::collections::HashSet;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::handler::Handler;
use axum::routing::{any, MethodRouter};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::StubConfig;
use crate::handler::{self, FixedReply};

/// Stub server errors.
#[derive(Debug, thiserror::Error)]
pub enum StubError {
    #[error("can't listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid reply status code: {0}")]
    InvalidStatus(u16),

    #[error("invalid route path: {0:?}")]
    InvalidPath(String),

    #[error("route registered twice: {0:?}")]
    DuplicatePath(String),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Signals a running stub server to stop.
///
/// Clones share one signal. Stopping is sticky: a handle signalled before
/// the server starts serving makes `serve` return right away.
#[derive(Debug, Clone)]
pub struct StopHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Stop the server.
    pub fn done(&self) {
        if !self.sender.send_replace(true) {
            info!("stop requested");
        }
    }

    /// Whether [`StopHandle::done`] has been called.
    pub fn is_stopped(&self) -> bool {
        *self.sender.borrow()
    }

    async fn stopped(&self) {
        let mut receiver = self.sender.subscribe();
        let _ = receiver.wait_for(|&stopped| stopped).await;
    }
}

/// Stub HTTP server answering one registered path.
///
/// Each instance owns its routes and stop signal, so independent stubs can
/// run side by side as long as they use different ports.
pub struct StubServer {
    config: StubConfig,
    custom: Option<MethodRouter>,
    routes: Vec<(String, MethodRouter)>,
    stop: StopHandle,
}

impl StubServer {
    /// Create a server replying with `config.reply` on `config.endpoint`.
    pub fn new(config: StubConfig) -> Self {
        Self {
            config,
            custom: None,
            routes: Vec::new(),
            stop: StopHandle::new(),
        }
    }

    /// Replace the fixed reply on the configured endpoint with `handler`.
    ///
    /// Any axum handler works, e.g. an async closure taking a
    /// `axum::extract::Request` or individual extractors.
    pub fn custom_handler<H, T>(mut self, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.custom = Some(any(handler));
        self
    }

    /// Register an additional path.
    pub fn route<H, T>(mut self, path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.routes.push((path.into(), any(handler)));
        self
    }

    /// Server configuration.
    pub fn config(&self) -> &StubConfig {
        &self.config
    }

    /// Handle used to stop the server.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Build the router: registered paths plus a 404 fallback.
    pub fn router(&self) -> Result<Router, StubError> {
        let mut router = Router::new();
        let mut paths = HashSet::new();

        if !self.config.endpoint.is_empty() {
            let endpoint = match &self.custom {
                Some(custom) => custom.clone(),
                None => handler::fixed(FixedReply::try_from(&self.config.reply)?),
            };
            router = add_route(router, &mut paths, &self.config.endpoint, endpoint)?;
        }

        for (path, route) in &self.routes {
            router = add_route(router, &mut paths, path, route.clone())?;
        }

        Ok(router.fallback(handler::not_found))
    }

    /// Open the listener on `localhost:<port>`.
    pub async fn bind(self) -> Result<BoundStub, StubError> {
        let router = self.router()?;
        let addr = SocketAddr::from(([127, 0, 0, 1], self.config.port));

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| StubError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| StubError::Bind { addr, source })?;

        info!("started test server on {}", local_addr);

        Ok(BoundStub {
            listener,
            router,
            local_addr,
            stop: self.stop,
        })
    }

    /// Bind and serve until stopped.
    pub async fn start(self) -> Result<(), StubError> {
        self.bind().await?.serve().await
    }
}

fn add_route<'a>(
    router: Router,
    paths: &mut HashSet<&'a str>,
    path: &'a str,
    route: MethodRouter,
) -> Result<Router, StubError> {
    if !path.starts_with('/') {
        return Err(StubError::InvalidPath(path.to_string()));
    }
    if !paths.insert(path) {
        return Err(StubError::DuplicatePath(path.to_string()));
    }
    info!("adding route {}", path);
    Ok(router.route(path, route))
}

/// How long `serve` waits for open connections after the stop signal.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// A stub server with an open listener.
pub struct BoundStub {
    listener: TcpListener,
    router: Router,
    local_addr: SocketAddr,
    stop: StopHandle,
}

impl BoundStub {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Absolute URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.local_addr, path)
    }

    /// Handle used to stop the server.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Serve requests until the stop signal, then close the listener.
    ///
    /// Idle connections are closed gracefully. Requests still running shortly
    /// after the stop signal are not waited for; they finish on their own tasks.
    pub async fn serve(self) -> Result<(), StubError> {
        let signal = self.stop.clone();
        let server = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move { signal.stopped().await })
            .into_future();

        let deadline = async {
            self.stop.stopped().await;
            tokio::time::sleep(SHUTDOWN_GRACE).await;
        };

        tokio::select! {
            result = server => result.map_err(StubError::Serve)?,
            _ = deadline => warn!("returning with requests still in flight"),
        }

        info!("bye bye..");
        Ok(())
    }
}
