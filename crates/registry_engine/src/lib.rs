//! Registry engine: HTTP plumbing and effect execution.
mod client;
mod decode;
mod engine;
mod fetch;
mod persist;
mod retry;
mod types;
mod upload;

pub use client::{server_message, ListPage, ResourceClient};
pub use decode::{decode_text, safe_parse_json};
pub use engine::{EngineConfig, EngineError, EngineHandle};
pub use fetch::{fetch_with_timeout, FetchSettings, ReqwestTransport, Transport};
pub use persist::{ensure_storage_dir, AtomicFileWriter, PersistError};
pub use retry::{fetch_list_with_fallback, CandidateFailure, ListFetch, RetryPolicy};
pub use types::{
    EngineEvent, FailureKind, FetchError, HttpRequest, HttpResponse, Method, MultipartFile,
    RequestBody,
};
pub use upload::{ImageUploader, HOSTED_URL_KEYS};
