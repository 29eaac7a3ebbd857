use crate::{NormalizedRecord, PaginationHints, RequestId, SortKey};

/// Result of one list fetch as reported back by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOutcome {
    /// A candidate URL answered; `records` may legitimately be empty.
    Loaded {
        records: Vec<NormalizedRecord>,
        hints: PaginationHints,
    },
    /// Every candidate URL failed.
    Exhausted { last_error: Option<String> },
    /// The request was superseded or the page went away.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Page became visible; triggers the first fetch.
    Mounted,
    /// User jumped to a page number.
    PageRequested(u32),
    NextPage,
    PreviousPage,
    /// User picked a different page size; restarts at page 1.
    PageSizeChanged(u32),
    /// Client-side filter text changed.
    SearchChanged(String),
    /// Column header clicked; same key toggles direction.
    SortClicked(SortKey),
    RefreshClicked,
    /// Engine completion for a list request.
    ListLoaded {
        request_id: RequestId,
        outcome: ListOutcome,
    },
    /// User confirmed the delete dialog for a row.
    DeleteConfirmed { id: String },
    /// Engine completion for a delete.
    DeleteFinished {
        id: String,
        result: Result<(), String>,
    },
    /// Page is being torn down (navigation away).
    Unmounted,
    /// Fallback for placeholder wiring.
    NoOp,
}
