//! HTTP server
//!
//! hyper HTTP/1.1 on a tokio listener:
//! - One task per connection, each request handled statelessly
//! - SO_REUSEADDR so restarts do not wait out TIME_WAIT
//! - TCP_NODELAY for prompt redirects

use crate::{Error, Method, Request, Response, Result, Router};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use socket2::{Domain, Protocol, Socket, Type};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Pause after a failed accept (EMFILE and friends) before retrying
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Create a listening TCP socket
pub fn create_listener_socket(addr: &SocketAddr) -> std::io::Result<Socket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nodelay(true)?;
    socket.bind(&(*addr).into())?;
    socket.listen(1024)?;

    Ok(socket)
}

/// HTTP front bound to a listening socket
#[derive(Debug)]
pub struct HttpServer {
    listener: TcpListener,
    router: Arc<Router>,
}

impl HttpServer {
    /// Bind the listener. Must be called from within a tokio runtime.
    pub fn bind(addr: SocketAddr, router: Router) -> Result<Self> {
        let socket = create_listener_socket(&addr)?;
        socket.set_nonblocking(true)?;
        let listener = TcpListener::from_std(socket.into())?;

        Ok(Self {
            listener,
            router: Arc::new(router),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` flips to `true`.
    ///
    /// Connections already accepted run to completion on their own tasks.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        tracing::info!(addr = ?self.listener.local_addr().ok(), "http server listening");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed");
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                            continue;
                        }
                    };

                    let router = self.router.clone();
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let service = service_fn(move |req| {
                            let router = router.clone();
                            async move { handle_request(&router, req).await }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            tracing::debug!(%peer, error = %e, "connection error");
                        }
                    });
                }
            }
        }

        tracing::info!("http server shutting down");
        Ok(())
    }
}

/// Handle incoming HTTP request
async fn handle_request(
    router: &Router,
    req: hyper::Request<Incoming>,
) -> std::result::Result<hyper::Response<Full<Bytes>>, Infallible> {
    let request = match from_hyper_request(req).await {
        Ok(request) => request,
        Err(Error::InvalidMethod(method)) => {
            tracing::debug!(%method, "unsupported method");
            return Ok(to_hyper_response(Response::not_implemented()));
        }
        Err(e) => {
            tracing::warn!(error = %e, "request body read failed");
            return Ok(to_hyper_response(Response::internal_error()));
        }
    };

    let response = router.handle(&request).await;
    tracing::debug!(
        method = %request.method,
        path = %request.path,
        status = %response.status,
        "request"
    );

    Ok(to_hyper_response(response))
}

/// Convert hyper request to our Request type, reading the whole body
pub async fn from_hyper_request(req: hyper::Request<Incoming>) -> Result<Request> {
    let (parts, body) = req.into_parts();
    let method = Method::parse(parts.method.as_str())?;

    // Query string is ignored
    let mut request = Request::new(method, parts.uri.path());

    if method == Method::Post {
        request.body = body.collect().await?.to_bytes();
    }

    Ok(request)
}

/// Convert our Response to hyper Response
pub fn to_hyper_response(res: Response) -> hyper::Response<Full<Bytes>> {
    let mut builder = hyper::Response::builder().status(res.status.as_u16());

    for (name, value) in &res.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder.body(Full::new(res.body)).unwrap_or_else(|e| {
        tracing::error!(error = %e, "invalid response");
        let mut fallback = hyper::Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
        *fallback.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}
