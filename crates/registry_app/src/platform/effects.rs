use std::collections::VecDeque;

use registry_core::{update, Effect, ListOutcome, ListPageState, Msg, Severity};
use registry_engine::{EngineEvent, EngineHandle};
use registry_logging::{registry_debug, registry_info, registry_warn};

/// Modal message raised by a mutating action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub severity: Severity,
    pub text: String,
}

/// Feeds messages through `update`, hands effects to the engine and
/// turns engine completions back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
    pending_deletes: usize,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self {
            engine,
            pending_deletes: 0,
        }
    }

    /// Applies `msgs` in order, then waits until no list or delete request
    /// is outstanding. Returns the settled state and any alerts raised.
    pub fn settle(
        &mut self,
        mut state: ListPageState,
        msgs: impl IntoIterator<Item = Msg>,
    ) -> (ListPageState, Vec<Alert>) {
        let mut queue: VecDeque<Msg> = msgs.into_iter().collect();
        let mut alerts = Vec::new();

        loop {
            while let Some(msg) = queue.pop_front() {
                let (next, effects) = update(state, msg);
                state = next;
                self.enqueue(effects, &mut alerts);
            }

            if state.active_request().is_none() && self.pending_deletes == 0 {
                return (state, alerts);
            }

            match self.engine.recv() {
                Some(EngineEvent::ListCompleted {
                    request_id,
                    outcome,
                }) => {
                    if let ListOutcome::Exhausted { last_error } = &outcome {
                        registry_warn!(
                            "List request {} exhausted every endpoint: {}",
                            request_id,
                            last_error.as_deref().unwrap_or("no error recorded")
                        );
                    }
                    queue.push_back(Msg::ListLoaded {
                        request_id,
                        outcome,
                    });
                }
                Some(EngineEvent::DeleteCompleted { id, result }) => {
                    self.pending_deletes = self.pending_deletes.saturating_sub(1);
                    queue.push_back(Msg::DeleteFinished { id, result });
                }
                None => {
                    registry_warn!("Engine stopped before the page settled");
                    let (next, _) = update(state, Msg::Unmounted);
                    return (next, alerts);
                }
            }
        }
    }

    fn enqueue(&mut self, effects: Vec<Effect>, alerts: &mut Vec<Alert>) {
        for effect in effects {
            match effect {
                Effect::FetchList {
                    request_id,
                    kind,
                    query,
                } => {
                    registry_debug!(
                        "FetchList request_id={} kind={} page={} size={}",
                        request_id,
                        kind,
                        query.page,
                        query.page_size
                    );
                    self.engine.fetch_list(request_id, kind, query);
                }
                Effect::CancelRequest { request_id } => {
                    registry_debug!("CancelRequest request_id={}", request_id);
                    self.engine.cancel(request_id);
                }
                Effect::DeleteRecord { kind, id } => {
                    registry_info!("DeleteRecord kind={} id={}", kind, id);
                    self.pending_deletes += 1;
                    self.engine.delete(kind, id);
                }
                Effect::Alert { severity, text } => alerts.push(Alert { severity, text }),
            }
        }
    }
}
