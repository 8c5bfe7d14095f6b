//! Identifier resolution for user-supplied dataset and notebook references.
//!
//! Callers may hand the tools either a compact `owner/slug` handle or a full
//! Kaggle web URL. Both forms are validated here and reduced to a single
//! [`ResourceRef`] before any network call is made. When both forms are
//! supplied at once, the handle wins and the URL is ignored.

use url::Url;

use crate::client::KaggleError;

/// Hosts accepted in a user-supplied resource URL. `localhost` is kept in
/// the list so a local Kaggle instance can be exercised during development.
pub const ALLOWED_HOSTS: &[&str] = &["www.kaggle.com", "localhost"];

/// The two resource families the resolver knows about. Each family pins the
/// URL path prefix its web URLs must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Dataset,
    Notebook,
}

impl ResourceKind {
    /// First path segment required in a web URL of this kind.
    pub fn url_prefix(self) -> &'static str {
        match self {
            ResourceKind::Dataset => "datasets",
            ResourceKind::Notebook => "code",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            ResourceKind::Dataset => "dataset",
            ResourceKind::Notebook => "notebook",
        }
    }
}

/// A fully resolved `owner`/`slug` pair, the only identifier form the rest
/// of the crate works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub owner: String,
    pub slug: String,
}

impl ResourceRef {
    pub fn new<O: Into<String>, S: Into<String>>(owner: O, slug: S) -> Self {
        Self {
            owner: owner.into(),
            slug: slug.into(),
        }
    }

    /// Renders the compact `owner/slug` form, used when echoing identifiers
    /// back to the caller and when attaching data sources to a notebook.
    pub fn handle(&self) -> String {
        format!("{}/{}", self.owner, self.slug)
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.slug)
    }
}

/// One named validation rule applied to a parsed resource URL. Rules run in
/// order and the first failure short-circuits with its fixed message.
struct UrlRule {
    name: &'static str,
    message: &'static str,
    check: fn(&Url, ResourceKind) -> bool,
}

const URL_RULES: &[UrlRule] = &[
    UrlRule {
        name: "allowed-host",
        message: "URL host is not in the Kaggle host allow-list",
        check: |url, _| {
            url.host_str()
                .is_some_and(|host| ALLOWED_HOSTS.contains(&host))
        },
    },
    UrlRule {
        name: "resource-prefix",
        message: "URL path does not start with the required resource prefix",
        check: |url, kind| path_segments(url).first() == Some(&kind.url_prefix()),
    },
    UrlRule {
        name: "owner-and-slug",
        message: "URL path is missing the owner and resource segments",
        check: |url, _| path_segments(url).len() >= 3,
    },
];

fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .into_iter()
        .flatten()
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Reduce an optional handle and an optional web URL to one [`ResourceRef`].
///
/// The handle takes priority when both are present. Blank strings are
/// treated the same as absent values. When neither identifier is supplied
/// this is an explicit error, never a silent default.
pub fn resolve(
    handle: Option<&str>,
    url: Option<&str>,
    kind: ResourceKind,
) -> Result<ResourceRef, KaggleError> {
    let handle = handle.map(str::trim).filter(|value| !value.is_empty());
    let url = url.map(str::trim).filter(|value| !value.is_empty());

    if let Some(handle) = handle {
        return parse_handle(handle);
    }
    if let Some(url) = url {
        return parse_resource_url(url, kind);
    }

    Err(KaggleError::invalid_identifier(format!(
        "no {} identifier provided: expected an owner/slug handle or a Kaggle URL",
        kind.noun()
    )))
}

/// Validate a compact `owner/slug` handle. Exactly one separator, both
/// sides non-empty.
pub fn parse_handle(handle: &str) -> Result<ResourceRef, KaggleError> {
    let mut parts = handle.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(slug), None) if !owner.is_empty() && !slug.is_empty() => {
            Ok(ResourceRef::new(owner, slug))
        }
        _ => Err(KaggleError::invalid_identifier(format!(
            "invalid handle {handle:?}: expected exactly one \"owner/slug\" pair"
        ))),
    }
}

/// Validate a full Kaggle web URL and extract the owner and slug from the
/// fixed positions after the resource prefix. Trailing path segments (tabs,
/// file views) are tolerated and ignored.
pub fn parse_resource_url(raw: &str, kind: ResourceKind) -> Result<ResourceRef, KaggleError> {
    let url = Url::parse(raw)
        .map_err(|err| KaggleError::invalid_identifier(format!("invalid URL {raw:?}: {err}")))?;

    for rule in URL_RULES {
        if !(rule.check)(&url, kind) {
            tracing::debug!(rule = rule.name, url = raw, "resource URL rejected");
            return Err(KaggleError::invalid_identifier(format!(
                "{}: {raw:?}",
                rule.message
            )));
        }
    }

    // The rules above guarantee prefix/owner/slug are present.
    let segments = path_segments(&url);
    Ok(ResourceRef::new(segments[1], segments[2]))
}
