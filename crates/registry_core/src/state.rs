use std::collections::BTreeSet;

use crate::view_model::{build_view, ListViewModel};
use crate::{EntityKind, ListQuery, NormalizedRecord, PaginationState};

pub type RequestId = u64;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    Id,
    /// Highest identifier first, assuming identifiers grow over time.
    Newest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    pub fn flipped(self) -> Self {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }
}

/// State of one list page (table or card grid) for a single resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPageState {
    kind: EntityKind,
    records: Vec<NormalizedRecord>,
    pagination: PaginationState,
    requested: ListQuery,
    search: String,
    sort: SortKey,
    sort_dir: SortDir,
    loading: bool,
    error: Option<String>,
    /// Last transport failure behind `error`.
    error_cause: Option<String>,
    active_request: Option<RequestId>,
    next_request_id: RequestId,
    pending_deletes: BTreeSet<String>,
    mounted: bool,
    dirty: bool,
}

impl ListPageState {
    pub fn new(kind: EntityKind) -> Self {
        Self::with_page_size(kind, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(kind: EntityKind, page_size: u32) -> Self {
        Self::starting_at(kind, ListQuery::new(1, page_size))
    }

    /// Page whose first fetch (on [`Msg::Mounted`](crate::Msg::Mounted)) asks for `query`.
    pub fn starting_at(kind: EntityKind, query: ListQuery) -> Self {
        Self {
            kind,
            records: Vec::new(),
            pagination: PaginationState::new(query.page_size),
            requested: query,
            search: String::new(),
            sort: SortKey::default(),
            sort_dir: SortDir::default(),
            loading: false,
            error: None,
            error_cause: None,
            active_request: None,
            next_request_id: 1,
            pending_deletes: BTreeSet::new(),
            mounted: false,
            dirty: false,
        }
    }

    pub fn view(&self) -> ListViewModel {
        build_view(self)
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn pagination(&self) -> PaginationState {
        self.pagination
    }

    pub fn requested(&self) -> ListQuery {
        self.requested
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn sort(&self) -> (SortKey, SortDir) {
        (self.sort, self.sort_dir)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn error_cause(&self) -> Option<&str> {
        self.error_cause.as_deref()
    }

    pub fn active_request(&self) -> Option<RequestId> {
        self.active_request
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_deleting(&self, id: &str) -> bool {
        self.pending_deletes.contains(id)
    }

    /// Returns whether anything visible changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn set_mounted(&mut self, mounted: bool) {
        self.mounted = mounted;
    }

    pub(crate) fn set_requested(&mut self, query: ListQuery) {
        self.requested = query;
    }

    /// Allocates a request id and makes it the only one whose result is accepted.
    ///
    /// Returns the superseded request id, if one was still in flight.
    pub(crate) fn begin_request(&mut self) -> (RequestId, Option<RequestId>) {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        let previous = self.active_request.replace(request_id);
        self.loading = true;
        self.error = None;
        self.error_cause = None;
        self.dirty = true;
        (request_id, previous)
    }

    /// Ends the active request; `None` when `request_id` is not the active one.
    pub(crate) fn finish_request(&mut self, request_id: RequestId) -> Option<()> {
        if self.active_request != Some(request_id) {
            return None;
        }
        self.active_request = None;
        self.loading = false;
        self.dirty = true;
        Some(())
    }

    pub(crate) fn take_active_request(&mut self) -> Option<RequestId> {
        let active = self.active_request.take();
        if active.is_some() {
            self.loading = false;
            self.dirty = true;
        }
        active
    }

    pub(crate) fn apply_page(&mut self, records: Vec<NormalizedRecord>, pagination: PaginationState) {
        self.records = records;
        self.pagination = pagination;
        self.error = None;
        self.error_cause = None;
        self.dirty = true;
    }

    pub(crate) fn set_error(&mut self, error: Option<String>, cause: Option<String>) {
        self.error = error;
        self.error_cause = cause;
        self.dirty = true;
    }

    pub(crate) fn set_search(&mut self, search: String) {
        if self.search != search {
            self.search = search;
            self.dirty = true;
        }
    }

    pub(crate) fn set_sort(&mut self, sort: SortKey, dir: SortDir) {
        self.sort = sort;
        self.sort_dir = dir;
        self.dirty = true;
    }

    pub(crate) fn mark_deleting(&mut self, id: &str) -> bool {
        let inserted = self.pending_deletes.insert(id.to_string());
        self.dirty |= inserted;
        inserted
    }

    pub(crate) fn finish_delete(&mut self, id: &str, removed: bool) {
        self.pending_deletes.remove(id);
        if removed {
            self.records.retain(|record| record.id != id);
        }
        self.dirty = true;
    }
}
