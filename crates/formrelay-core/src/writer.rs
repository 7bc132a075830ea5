//! Store writer: the receiver loop
//!
//! Each datagram is decoded as a form body, stamped with the time it was
//! processed and appended to the [`JsonStore`]. Failures are logged and the
//! loop moves on to the next datagram.

use tokio::sync::watch;

use crate::form::FormSubmission;
use crate::relay::{Datagram, RelayReceiver};
use crate::store::{timestamp_now, JsonStore};
use crate::{Error, Result};

/// Decodes datagrams and persists them
#[derive(Debug)]
pub struct StoreWriter {
    receiver: RelayReceiver,
    store: JsonStore,
}

impl StoreWriter {
    pub fn new(receiver: RelayReceiver, store: JsonStore) -> Self {
        Self { receiver, store }
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    /// Run until `shutdown` flips to `true` or its sender goes away.
    ///
    /// The socket is closed when the loop returns.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        tracing::info!(
            addr = ?self.receiver.local_addr().ok(),
            store = %self.store.path().display(),
            "store writer listening"
        );

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
                received = self.receiver.recv() => match received {
                    Ok(Datagram::Complete { payload, peer }) => {
                        tracing::debug!(%peer, len = payload.len(), "datagram received");
                        let _ = persist(&self.store, &payload).await;
                    }
                    Ok(Datagram::Oversized { received, peer }) => {
                        tracing::warn!(
                            %peer,
                            received,
                            limit = self.receiver.buffer_size(),
                            "datagram exceeds receive buffer, dropped"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "datagram receive failed");
                    }
                },
            }
        }

        tracing::info!("store writer shutting down");
        Ok(())
    }
}

/// Decode `payload` and append it to `store`.
///
/// Returns the timestamp key the record was stored under. Errors are logged
/// here as well as returned.
pub async fn persist(store: &JsonStore, payload: &[u8]) -> Result<String> {
    let result = match FormSubmission::decode(payload) {
        Ok(form) => {
            let store = store.clone();
            tokio::task::spawn_blocking(move || {
                let key = timestamp_now();
                store.insert(&key, form.into_fields()).map(|()| key)
            })
            .await
            .unwrap_or_else(|e| Err(Error::Internal(e.to_string())))
        }
        Err(e) => Err(e.into()),
    };

    match &result {
        Ok(key) => tracing::info!(
            timestamp = %key,
            data = %String::from_utf8_lossy(payload),
            "form data saved"
        ),
        Err(e) => tracing::error!(error = %e, "error saving form data"),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::RelaySender;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_persist_valid_form() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("data.json"));

        let key = persist(&store, b"name=Ann&age=30").await.unwrap();

        let records = store.load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[&key], json!({"name": "Ann", "age": "30"}));
    }

    #[tokio::test]
    async fn test_persist_malformed_form_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let store = JsonStore::new(&path);

        assert!(matches!(
            persist(&store, b"name=Ann&broken").await,
            Err(Error::Form(_))
        ));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = RelayReceiver::bind("127.0.0.1:0".parse().unwrap(), 1024)
            .await
            .unwrap();
        let addr = receiver.local_addr().unwrap();
        let writer = StoreWriter::new(receiver, JsonStore::new(dir.path().join("data.json")));
        let store = writer.store().clone();

        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(writer.run(rx));

        let sender = RelaySender::bind(addr).await.unwrap();
        sender.forward(b"colour=green").await.unwrap();

        let mut records = store.load().unwrap();
        for _ in 0..100 {
            if !records.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            records = store.load().unwrap();
        }
        assert_eq!(records.len(), 1);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("writer stops")
            .unwrap()
            .unwrap();
    }
}
