use crate::{EntityKind, ListQuery, RequestId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchList {
        request_id: RequestId,
        kind: EntityKind,
        query: ListQuery,
    },
    CancelRequest { request_id: RequestId },
    DeleteRecord { kind: EntityKind, id: String },
    /// Modal message for the outcome of a mutating action.
    Alert { severity: Severity, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}
