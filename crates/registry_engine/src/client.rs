use std::sync::Arc;

use registry_core::{
    delete_candidates, item_url, list_candidates, normalize_all, resource_url, search_candidates,
    EntityKind, ListOutcome, ListQuery, NormalizedRecord, PaginationHints,
};
use registry_logging::{registry_debug, registry_info, registry_warn};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::decode::safe_parse_json;
use crate::fetch::{fetch_with_timeout, Transport};
use crate::retry::{fetch_list_with_fallback, RetryPolicy};
use crate::{FailureKind, FetchError, HttpRequest, HttpResponse, Method};

/// One normalized page of a resource list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage {
    pub records: Vec<NormalizedRecord>,
    pub hints: PaginationHints,
    /// Every candidate URL failed; `records` is empty.
    pub exhausted: bool,
    pub last_error: Option<String>,
}

impl ListPage {
    pub fn into_outcome(self) -> ListOutcome {
        if self.exhausted {
            ListOutcome::Exhausted {
                last_error: self.last_error,
            }
        } else {
            ListOutcome::Loaded {
                records: self.records,
                hints: self.hints,
            }
        }
    }
}

/// CRUD access to one backend resource, tolerant of envelope and casing drift.
#[derive(Clone)]
pub struct ResourceClient {
    kind: EntityKind,
    resource: Url,
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for ResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceClient")
            .field("kind", &self.kind)
            .field("resource", &self.resource.as_str())
            .field("policy", &self.policy)
            .finish()
    }
}

impl ResourceClient {
    pub fn new(
        kind: EntityKind,
        base_url: &str,
        transport: Arc<dyn Transport>,
        policy: RetryPolicy,
    ) -> Result<Self, FetchError> {
        let resource = resource_url(base_url, kind)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, format!("{base_url}: {err}")))?;
        Ok(Self {
            kind,
            resource,
            transport,
            policy,
        })
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn resource(&self) -> &Url {
        &self.resource
    }

    /// Fetches one page through the fallback probe and normalizes it.
    ///
    /// Only cancellation is reported as an error; a page nobody could serve
    /// comes back with `exhausted` set.
    pub async fn list_page(
        &self,
        query: ListQuery,
        cancel: &CancellationToken,
    ) -> Result<ListPage, FetchError> {
        let candidates = list_candidates(&self.resource, self.kind, query);
        let template = HttpRequest::get(self.resource.clone());
        let fetched = fetch_list_with_fallback(
            self.transport.as_ref(),
            &candidates,
            &template,
            self.kind,
            &self.policy,
            cancel,
        )
        .await?;

        let records = normalize_all(&self.kind.alias_table(), &fetched.list);
        if records.len() < fetched.list.len() {
            registry_debug!(
                "dropped {} {} without an identifier",
                fetched.list.len() - records.len(),
                self.kind.label()
            );
        }
        let hints = fetched
            .response
            .as_ref()
            .map(HttpResponse::pagination_hints)
            .unwrap_or_default();
        Ok(ListPage {
            records,
            hints,
            exhausted: fetched.is_exhausted(),
            last_error: fetched.last_error().map(ToString::to_string),
        })
    }

    /// Raw record, as the edit command loads it.
    pub async fn get(&self, id: &str, cancel: &CancellationToken) -> Result<Value, FetchError> {
        let request = HttpRequest::get(item_url(&self.resource, id));
        let response = self.send(&request, cancel).await?;
        safe_parse_json(&response.body, response.content_type()).ok_or_else(|| {
            FetchError::new(
                FailureKind::Undecodable,
                format!("{} {id} is not JSON", self.kind),
            )
        })
    }

    pub async fn get_normalized(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<NormalizedRecord>, FetchError> {
        let raw = self.get(id, cancel).await?;
        Ok(self.kind.alias_table().normalize(&raw))
    }

    /// POSTs `payload`; returns the decoded response body when there is one.
    pub async fn create(
        &self,
        payload: Value,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>, FetchError> {
        let request = HttpRequest::json(Method::Post, self.resource.clone(), payload);
        let response = self.send(&request, cancel).await?;
        registry_info!("created {} at {}", self.kind, response.url);
        Ok(safe_parse_json(&response.body, response.content_type()))
    }

    /// Creates a name-only record, trying each field casing until one is accepted.
    pub async fn create_with_payload_variants(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>, FetchError> {
        let mut last_error = None;
        for payload in self.name_payloads(name) {
            match self.create(payload, cancel).await {
                Ok(body) => return Ok(body),
                Err(err) if err.is_cancelled() => return Err(err),
                Err(err) => {
                    registry_debug!("create {} rejected: {}", self.kind, err);
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            FetchError::new(FailureKind::Network, format!("Failed to create {}", self.kind))
        }))
    }

    /// Renames record `id`, trying each id/name casing until one is accepted.
    pub async fn update_with_payload_variants(
        &self,
        id: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>, FetchError> {
        let mut last_error = None;
        for payload in self.rename_payloads(id, name) {
            match self.update(id, payload, cancel).await {
                Ok(body) => {
                    registry_info!("updated {} {}", self.kind, id);
                    return Ok(body);
                }
                Err(err) if err.is_cancelled() => return Err(err),
                Err(err) => {
                    registry_debug!("update {} {} rejected: {}", self.kind, id, err);
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            FetchError::new(FailureKind::Network, format!("Failed to update {} {id}", self.kind))
        }))
    }

    pub async fn update(
        &self,
        id: &str,
        payload: Value,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>, FetchError> {
        let request = HttpRequest::json(Method::Put, item_url(&self.resource, id), payload);
        let response = self.send(&request, cancel).await?;
        Ok(safe_parse_json(&response.body, response.content_type()))
    }

    /// Deletes via `{resource}/{id}`, falling back to `{resource}?id={id}`.
    pub async fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<(), FetchError> {
        let mut last_error = None;
        for url in delete_candidates(&self.resource, id) {
            let request = HttpRequest::new(Method::Delete, url);
            match self.send(&request, cancel).await {
                Ok(_) => {
                    registry_info!("deleted {} {}", self.kind, id);
                    return Ok(());
                }
                Err(err) if err.is_cancelled() => return Err(err),
                Err(err) => last_error = Some(err),
            }
        }
        let err = last_error
            .unwrap_or_else(|| FetchError::new(FailureKind::Network, "no delete endpoint"));
        registry_warn!("delete {} {} failed: {}", self.kind, id, err);
        Err(err)
    }

    /// Existing record whose name equals `name`, ignoring case.
    ///
    /// Best effort: search endpoints are probed once each and the first
    /// non-empty list is searched, so a missed duplicate is possible.
    pub async fn find_duplicate(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<NormalizedRecord>, FetchError> {
        self.find_duplicate_by("name", name, cancel).await
    }

    /// Like [`find_duplicate`](Self::find_duplicate), ignoring the record `id`
    /// itself so an unchanged name is not reported against its own record.
    pub async fn find_duplicate_except(
        &self,
        name: &str,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<NormalizedRecord>, FetchError> {
        self.find_match("name", name, Some(id), cancel).await
    }

    /// Like [`find_duplicate`](Self::find_duplicate) for any canonical field, e.g. `email`.
    pub async fn find_duplicate_by(
        &self,
        field: &str,
        value: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<NormalizedRecord>, FetchError> {
        self.find_match(field, value, None, cancel).await
    }

    async fn find_match(
        &self,
        field: &str,
        value: &str,
        except_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Option<NormalizedRecord>, FetchError> {
        let wanted = value.trim().to_lowercase();
        let template = HttpRequest::get(self.resource.clone());
        let policy = self.policy.single_attempt();

        let mut list = Vec::new();
        for url in search_candidates(&self.resource, field, value.trim()) {
            let fetched = fetch_list_with_fallback(
                self.transport.as_ref(),
                std::slice::from_ref(&url),
                &template,
                self.kind,
                &policy,
                cancel,
            )
            .await?;
            if !fetched.list.is_empty() {
                list = fetched.list;
                break;
            }
        }

        let table = self.kind.alias_table();
        Ok(list
            .iter()
            .filter_map(|raw| {
                // Duplicate detection does not need an id.
                let record = table.normalize(raw).or_else(|| {
                    let without_id = table.normalize(&with_placeholder_id(raw))?;
                    Some(NormalizedRecord {
                        id: String::new(),
                        ..without_id
                    })
                })?;
                if except_id.is_some_and(|id| !record.id.is_empty() && record.id == id) {
                    return None;
                }
                (record.get(field).trim().to_lowercase() == wanted).then_some(record)
            })
            .next())
    }

    fn name_payloads(&self, name: &str) -> Vec<Value> {
        let stem = self.kind.stem();
        let pascal = pascal_stem(stem);
        vec![
            json!({ "Name": name }),
            json!({ "name": name }),
            json!({ format!("{stem}Name"): name }),
            json!({ format!("{pascal}Name"): name }),
        ]
    }

    fn rename_payloads(&self, id: &str, name: &str) -> Vec<Value> {
        let stem = self.kind.stem();
        let pascal = pascal_stem(stem);
        vec![
            json!({ "id": id, "Name": name }),
            json!({ "id": id, "name": name }),
            json!({ format!("{stem}Id"): id, format!("{stem}Name"): name }),
            json!({ format!("{pascal}Id"): id, format!("{pascal}Name"): name }),
        ]
    }

    async fn send(
        &self,
        request: &HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, FetchError> {
        let response = fetch_with_timeout(
            self.transport.as_ref(),
            request,
            self.policy.request_timeout,
            cancel,
        )
        .await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(FetchError::new(
                FailureKind::HttpStatus(response.status),
                server_message(&response)
                    .unwrap_or_else(|| format!("{} {} returned {}", request.method, request.url, response.status)),
            ))
        }
    }
}

/// Human-readable reason from an error body: `message`, `error` or `title`.
pub fn server_message(response: &HttpResponse) -> Option<String> {
    let body = safe_parse_json(&response.body, response.content_type())?;
    ["message", "error", "title"]
        .iter()
        .filter_map(|key| body.get(key))
        .find_map(|value| value.as_str().map(str::to_string))
        .filter(|message| !message.trim().is_empty())
}

fn pascal_stem(stem: &str) -> String {
    let mut pascal = stem.to_string();
    if let Some(first) = pascal.get_mut(..1) {
        first.make_ascii_uppercase();
    }
    pascal
}

fn with_placeholder_id(raw: &Value) -> Value {
    let mut raw = raw.clone();
    if let Some(object) = raw.as_object_mut() {
        object.insert("id".to_string(), Value::String("?".to_string()));
    }
    raw
}
