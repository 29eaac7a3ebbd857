use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use registry_core::{EntityKind, ListOutcome, ListQuery, RequestId};
use registry_logging::{registry_debug, registry_warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::client::ResourceClient;
use crate::fetch::{FetchSettings, ReqwestTransport, Transport};
use crate::retry::RetryPolicy;
use crate::{EngineEvent, FetchError};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL for every resource without an override.
    pub base_url: String,
    pub base_overrides: BTreeMap<EntityKind, String>,
    pub fetch: FetchSettings,
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5092/api".to_string(),
            base_overrides: BTreeMap::new(),
            fetch: FetchSettings::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn base_url_for(&self, kind: EntityKind) -> &str {
        self.base_overrides
            .get(&kind)
            .map(String::as_str)
            .unwrap_or(&self.base_url)
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine setup failed: {0}")]
    Setup(#[from] FetchError),
    #[error("engine runtime failed to start: {0}")]
    Runtime(#[from] io::Error),
}

enum EngineCommand {
    Fetch {
        request_id: RequestId,
        kind: EntityKind,
        query: ListQuery,
    },
    Cancel {
        request_id: RequestId,
    },
    Delete {
        kind: EntityKind,
        id: String,
    },
    Shutdown,
}

type InFlight = Arc<Mutex<HashMap<RequestId, CancellationToken>>>;

/// Runs list and delete requests on a background tokio runtime.
///
/// Every list request gets its own child token of a root token, so a single
/// request can be cancelled by id and dropping the handle cancels them all.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    worker: Option<JoinHandle<()>>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let transport = ReqwestTransport::new(&config.fetch)?;
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(
        config: EngineConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, EngineError> {
        let mut clients = HashMap::new();
        for kind in EntityKind::ALL {
            let client = ResourceClient::new(
                kind,
                config.base_url_for(kind),
                transport.clone(),
                config.retry.clone(),
            )?;
            clients.insert(kind, client);
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("registry-io")
            .enable_all()
            .build()?;

        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        let worker = thread::Builder::new()
            .name("registry-engine".to_string())
            .spawn(move || {
                let root = CancellationToken::new();
                let in_flight: InFlight = Arc::default();

                while let Ok(command) = cmd_rx.recv() {
                    match command {
                        EngineCommand::Fetch {
                            request_id,
                            kind,
                            query,
                        } => {
                            let Some(client) = clients.get(&kind).cloned() else {
                                continue;
                            };
                            let token = root.child_token();
                            track(&in_flight, request_id, token.clone());
                            let in_flight = in_flight.clone();
                            let event_tx = event_tx.clone();
                            runtime.spawn(async move {
                                let outcome = run_list(&client, query, &token).await;
                                untrack(&in_flight, request_id);
                                let _ = event_tx.send(EngineEvent::ListCompleted {
                                    request_id,
                                    outcome,
                                });
                            });
                        }
                        EngineCommand::Cancel { request_id } => {
                            if let Some(token) = untrack(&in_flight, request_id) {
                                registry_debug!("cancelling request {}", request_id);
                                token.cancel();
                            }
                        }
                        EngineCommand::Delete { kind, id } => {
                            let Some(client) = clients.get(&kind).cloned() else {
                                continue;
                            };
                            let token = root.child_token();
                            let event_tx = event_tx.clone();
                            runtime.spawn(async move {
                                let result = client
                                    .delete(&id, &token)
                                    .await
                                    .map_err(|err| err.message);
                                let _ = event_tx.send(EngineEvent::DeleteCompleted { id, result });
                            });
                        }
                        EngineCommand::Shutdown => break,
                    }
                }

                root.cancel();
                runtime.shutdown_timeout(SHUTDOWN_GRACE);
            })?;

        Ok(Self {
            cmd_tx,
            event_rx,
            worker: Some(worker),
        })
    }

    pub fn fetch_list(&self, request_id: RequestId, kind: EntityKind, query: ListQuery) {
        self.send(EngineCommand::Fetch {
            request_id,
            kind,
            query,
        });
    }

    /// Cancels a list request; unknown or finished ids are ignored.
    pub fn cancel(&self, request_id: RequestId) {
        self.send(EngineCommand::Cancel { request_id });
    }

    pub fn delete(&self, kind: EntityKind, id: impl Into<String>) {
        self.send(EngineCommand::Delete {
            kind,
            id: id.into(),
        });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Blocks until the next event; `None` once the worker has stopped.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            registry_warn!("engine worker has stopped; command dropped");
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

async fn run_list(
    client: &ResourceClient,
    query: ListQuery,
    cancel: &CancellationToken,
) -> ListOutcome {
    match client.list_page(query, cancel).await {
        Ok(page) => page.into_outcome(),
        Err(err) if err.is_cancelled() => ListOutcome::Cancelled,
        Err(err) => ListOutcome::Exhausted {
            last_error: Some(err.to_string()),
        },
    }
}

fn track(in_flight: &InFlight, request_id: RequestId, token: CancellationToken) {
    if let Ok(mut map) = in_flight.lock() {
        map.insert(request_id, token);
    }
}

fn untrack(in_flight: &InFlight, request_id: RequestId) -> Option<CancellationToken> {
    in_flight.lock().ok()?.remove(&request_id)
}
