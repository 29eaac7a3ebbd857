use url::Url;

use crate::EntityKind;

/// One requested page of a resource list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub page_size: u32,
}

impl ListQuery {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

/// `{base}/{resource}`, e.g. `http://localhost:5092/api/Asset`.
pub fn resource_url(base: &str, kind: EntityKind) -> Result<Url, url::ParseError> {
    Url::parse(&format!("{}/{}", base.trim_end_matches('/'), kind.resource()))
}

/// `{resource}/{id}`, with `id` percent-encoded as a single path segment.
pub fn item_url(resource: &Url, id: &str) -> Url {
    let mut url = resource.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(id);
    }
    url
}

/// List URLs in probing order, one per known pagination convention, then
/// the `page`/`limit` form on each alternate spelling of the resource.
pub fn list_candidates(resource: &Url, kind: EntityKind, query: ListQuery) -> Vec<Url> {
    let page = query.page.to_string();
    let size = query.page_size.to_string();
    let offset = query.offset().to_string();
    let mut urls = vec![
        with_pairs(resource, &[("page", &page), ("limit", &size)]),
        with_pairs(resource, &[("page", &page), ("pageSize", &size)]),
        with_pairs(resource, &[("pageNumber", &page), ("pageSize", &size)]),
        with_pairs(resource, &[("page", &page)]),
        with_pairs(resource, &[("skip", &offset), ("take", &size)]),
        with_pairs(resource, &[("offset", &offset), ("limit", &size)]),
        resource.clone(),
    ];
    urls.extend(kind.alternate_resources().iter().map(|segment| {
        with_pairs(
            &sibling(resource, segment),
            &[("page", &page), ("limit", &size)],
        )
    }));
    urls
}

/// URLs probed when looking for an existing record whose `field` equals `term`.
///
/// Names go through the generic search parameters first; any other field is
/// queried by its own name before falling back to `search`.
pub fn search_candidates(resource: &Url, field: &str, term: &str) -> Vec<Url> {
    let mut urls = if field == "name" {
        vec![
            with_pairs(resource, &[("search", term)]),
            with_pairs(resource, &[("name", term)]),
            with_pairs(resource, &[("q", term)]),
        ]
    } else {
        vec![
            with_pairs(resource, &[(field, term)]),
            with_pairs(resource, &[("search", term)]),
        ]
    };
    urls.push(resource.clone());
    urls
}

/// Delete endpoints in probing order.
pub fn delete_candidates(resource: &Url, id: &str) -> Vec<Url> {
    vec![item_url(resource, id), with_pairs(resource, &[("id", id)])]
}

/// `resource` with its last path segment replaced.
fn sibling(resource: &Url, segment: &str) -> Url {
    let mut url = resource.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().pop().push(segment);
    }
    url
}

fn with_pairs(resource: &Url, pairs: &[(&str, &str)]) -> Url {
    let mut url = resource.clone();
    url.query_pairs_mut().extend_pairs(pairs.iter().copied());
    url
}
