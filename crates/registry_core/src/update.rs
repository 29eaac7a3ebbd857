use crate::effect::Severity;
use crate::{reconcile, Effect, ListOutcome, ListPageState, ListQuery, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: ListPageState, msg: Msg) -> (ListPageState, Vec<Effect>) {
    let effects = match msg {
        Msg::Mounted => {
            state.set_mounted(true);
            start_fetch(&mut state)
        }
        Msg::PageRequested(page) => {
            let page = page.clamp(1, state.pagination().total_pages.max(1));
            if page == state.requested().page && state.active_request().is_none() {
                Vec::new()
            } else {
                let size = state.requested().page_size;
                state.set_requested(ListQuery::new(page, size));
                start_fetch(&mut state)
            }
        }
        Msg::NextPage => {
            let pagination = state.pagination();
            if pagination.has_next() {
                return update(state, Msg::PageRequested(pagination.page + 1));
            }
            Vec::new()
        }
        Msg::PreviousPage => {
            let pagination = state.pagination();
            if pagination.has_previous() {
                return update(state, Msg::PageRequested(pagination.page - 1));
            }
            Vec::new()
        }
        Msg::PageSizeChanged(size) => {
            if size == 0 || size == state.requested().page_size {
                Vec::new()
            } else {
                state.set_requested(ListQuery::new(1, size));
                start_fetch(&mut state)
            }
        }
        Msg::SearchChanged(text) => {
            state.set_search(text);
            Vec::new()
        }
        Msg::SortClicked(key) => {
            let (current, dir) = state.sort();
            let dir = if current == key {
                dir.flipped()
            } else {
                Default::default()
            };
            state.set_sort(key, dir);
            Vec::new()
        }
        Msg::RefreshClicked => start_fetch(&mut state),
        Msg::ListLoaded {
            request_id,
            outcome,
        } => {
            // Results of superseded requests never touch the page.
            if state.finish_request(request_id).is_none() {
                return (state, Vec::new());
            }
            apply_outcome(&mut state, outcome)
        }
        Msg::DeleteConfirmed { id } => {
            if state.mark_deleting(&id) {
                vec![Effect::DeleteRecord {
                    kind: state.kind(),
                    id,
                }]
            } else {
                Vec::new()
            }
        }
        Msg::DeleteFinished { id, result } => match result {
            Ok(()) => {
                state.finish_delete(&id, true);
                let mut effects = vec![Effect::Alert {
                    severity: Severity::Success,
                    text: format!("The record \"{id}\" has been deleted."),
                }];
                if state.is_mounted() {
                    effects.extend(start_fetch(&mut state));
                }
                effects
            }
            Err(message) => {
                state.finish_delete(&id, false);
                vec![Effect::Alert {
                    severity: Severity::Error,
                    text: message,
                }]
            }
        },
        Msg::Unmounted => {
            state.set_mounted(false);
            state
                .take_active_request()
                .map(|request_id| vec![Effect::CancelRequest { request_id }])
                .unwrap_or_default()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn start_fetch(state: &mut ListPageState) -> Vec<Effect> {
    let (request_id, previous) = state.begin_request();
    let mut effects = Vec::with_capacity(2);
    if let Some(previous) = previous {
        effects.push(Effect::CancelRequest {
            request_id: previous,
        });
    }
    effects.push(Effect::FetchList {
        request_id,
        kind: state.kind(),
        query: state.requested(),
    });
    effects
}

fn apply_outcome(state: &mut ListPageState, outcome: ListOutcome) -> Vec<Effect> {
    match outcome {
        ListOutcome::Cancelled => Vec::new(),
        ListOutcome::Loaded { records, hints } => {
            let requested = state.requested();
            let pagination = reconcile(&hints, records.len(), requested.page, requested.page_size);
            state.apply_page(records, pagination);
            if pagination.page != requested.page || pagination.page_size != requested.page_size {
                state.set_requested(ListQuery::new(pagination.page, pagination.page_size));
                if pagination.page != requested.page {
                    // The requested page no longer exists; show the first one.
                    return start_fetch(state);
                }
            }
            Vec::new()
        }
        ListOutcome::Exhausted { last_error } => {
            if state.records().is_empty() {
                let message = format!(
                    "No {} found. Please check your connection and try again.",
                    state.kind().label()
                );
                state.set_error(Some(message), last_error);
            }
            Vec::new()
        }
    }
}
