//! Orchestrator
//!
//! Binds both workers from one [`Config`], runs them as two tokio tasks and
//! stops them together. The workers share no memory; the only link between
//! them is the datagram relay.

use std::future::Future;
use std::net::SocketAddr;

use tokio::sync::watch;

use crate::config::Config;
use crate::handlers::{Pages, StaticFiles, Submit};
use crate::relay::{RelayReceiver, RelaySender};
use crate::server::HttpServer;
use crate::store::JsonStore;
use crate::writer::StoreWriter;
use crate::{Error, Result, Router};

/// Both workers, bound and ready to run
#[derive(Debug)]
pub struct App {
    server: HttpServer,
    writer: StoreWriter,
    http_addr: SocketAddr,
    relay_addr: SocketAddr,
}

impl App {
    /// Bind the relay receiver, then the HTTP listener.
    ///
    /// The receiver is bound first so the HTTP front forwards to the port it
    /// actually got, which matters when the configured port is 0.
    pub async fn bind(config: &Config) -> Result<Self> {
        config.validate()?;

        let receiver = RelayReceiver::bind(config.relay_addr()?, config.relay.buffer_size).await?;
        let relay_addr = receiver.local_addr()?;
        let writer = StoreWriter::new(receiver, JsonStore::new(&config.store.path));

        let router = Router::new(
            Pages::from_config(&config.http),
            StaticFiles::new(&config.http.static_dir),
            Submit::new(RelaySender::bind(relay_addr).await?),
        );
        let server = HttpServer::bind(config.http_addr()?, router)?;
        let http_addr = server.local_addr()?;

        Ok(Self {
            server,
            writer,
            http_addr,
            relay_addr,
        })
    }

    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    pub fn relay_addr(&self) -> SocketAddr {
        self.relay_addr
    }

    /// Run both workers until `shutdown` resolves, then stop and join them.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (stop_tx, stop_rx) = watch::channel(false);

        let http = tokio::spawn(self.server.run(stop_rx.clone()));
        let writer = tokio::spawn(self.writer.run(stop_rx));

        shutdown.await;
        tracing::info!("shutdown requested");
        let _ = stop_tx.send(true);

        let (http, writer) = tokio::join!(http, writer);
        http.map_err(|e| Error::Internal(e.to_string()))??;
        writer.map_err(|e| Error::Internal(e.to_string()))??;
        Ok(())
    }
}
