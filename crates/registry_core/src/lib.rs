//! Registry core: pure list-page state machine and payload helpers.
mod draft;
mod effect;
mod entity;
mod extract;
mod msg;
mod pagination;
mod query;
mod record;
pub mod session;
mod state;
mod store;
mod update;
mod view_model;

pub use draft::{validate_name, DraftSlot, NAME_MAX_LEN, NAME_MIN_LEN};
pub use effect::{Effect, Severity};
pub use entity::{EntityKind, UnknownEntity};
pub use extract::{extract_list, WRAPPER_KEYS};
pub use msg::{ListOutcome, Msg};
pub use pagination::{reconcile, PaginationHints, PaginationState, PAGINATION_HEADERS};
pub use query::{
    delete_candidates, item_url, list_candidates, resource_url, search_candidates, ListQuery,
};
pub use record::{normalize_all, AliasTable, NormalizedRecord};
pub use state::{ListPageState, RequestId, SortDir, SortKey, DEFAULT_PAGE_SIZE};
pub use store::{KeyValueStore, MemoryStore};
pub use update::update;
pub use view_model::{ListViewModel, RowView};
pub use url::Url;
