//! formrelay-core: static pages, form relay and JSON store
//!
//! Two workers share a process:
//! - the HTTP front serves pages and static files and turns every `POST`
//!   body into one UDP datagram
//! - the store writer receives those datagrams, decodes them as form data
//!   and appends them to a JSON document keyed by timestamp
//!
//! [`App`] binds both from a [`Config`] and runs them until shutdown.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod app;
pub mod config;
pub mod error;
pub mod form;
pub mod handlers;
pub mod logging;
pub mod relay;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod store;
pub mod writer;

// Re-exports
pub use app::App;
pub use config::Config;
pub use error::{Error, Result};
pub use form::{FormError, FormSubmission};
pub use relay::{Datagram, RelayReceiver, RelaySender};
pub use request::{Method, Request, RequestBuilder};
pub use response::{Response, ResponseBuilder, StatusCode};
pub use router::{route, Route, Router};
pub use server::HttpServer;
pub use store::JsonStore;
pub use writer::StoreWriter;
