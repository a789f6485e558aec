//! TCP accept loop and server configuration.

use crate::limits::ServerLimits;
use crate::router::Router;
use crate::server::connection;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// An HTTP/1.1 server: a listener, a routing table, and limits.
///
/// Each accepted connection runs as its own cooperative task; the
/// router is shared read-only across all of them, so handlers and
/// middleware must be reentrant. On one connection, requests are
/// answered strictly in arrival order.
///
/// # Examples
///
/// ```no_run
/// use wharf::{BoxFuture, Request, Response, Router, Server};
/// use tokio::net::TcpListener;
///
/// fn hello<'a>(_req: &'a Request, res: &'a mut Response) -> BoxFuture<'a, ()> {
///     Box::pin(async move { res.set_body("Hello World!") })
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let mut router = Router::new();
///     router.route("/", hello).unwrap();
///
///     Server::builder()
///         .listener(TcpListener::bind("127.0.0.1:8080").await.unwrap())
///         .router(router)
///         .build()
///         .launch()
///         .await;
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    router: Arc<Router>,
    limits: ServerLimits,
}

impl Server {
    /// Creates a builder for configuring a server instance.
    pub fn builder() -> ServerBuilder {
        ServerBuilder {
            listener: None,
            router: None,
            limits: None,
        }
    }

    /// Accepts connections forever, spawning a task per connection.
    pub async fn launch(self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, "listening");
        }

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    debug!(%err, "accept failed");
                    continue;
                }
            };
            debug!(%peer, "connection accepted");

            let router = self.router.clone();
            let limits = self.limits.clone();
            tokio::spawn(async move {
                connection::serve(stream, router, limits).await;
            });
        }
    }
}

/// Binds `addr` and serves `router` with default limits.
///
/// Convenience wrapper over the builder for the common case:
///
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> std::io::Result<()> {
/// use wharf::Router;
///
/// let router = Router::new();
/// wharf::bind_and_listen("127.0.0.1:8080", router).await
/// # }
/// ```
pub async fn bind_and_listen(addr: &str, router: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    Server::builder()
        .listener(listener)
        .router(router)
        .build()
        .launch()
        .await;
    Ok(())
}

/// Builder for [`Server`] instances.
pub struct ServerBuilder {
    listener: Option<TcpListener>,
    router: Option<Router>,
    limits: Option<ServerLimits>,
}

impl ServerBuilder {
    /// Sets the TCP listener to accept connections from.
    ///
    /// **This is a required component.**
    pub fn listener(mut self, listener: TcpListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Sets the routing table.
    ///
    /// **This is a required component.** The router is frozen here;
    /// registration happens before the server is built, so dispatch
    /// never takes a lock.
    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Overrides the default [`ServerLimits`].
    pub fn limits(mut self, limits: ServerLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Finalizes the builder.
    ///
    /// # Panics
    /// Error messages:
    /// - ``The `listener` method must be called to create``
    /// - ``The `router` method must be called to create``
    #[track_caller]
    pub fn build(self) -> Server {
        Server {
            listener: self
                .listener
                .expect("The `listener` method must be called to create"),
            router: Arc::new(
                self.router
                    .expect("The `router` method must be called to create"),
            ),
            limits: self.limits.unwrap_or_default(),
        }
    }
}
