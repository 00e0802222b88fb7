//! Domain models for the pizza service.
//!
//! These are the shapes that cross the HTTP boundary. Field names follow
//! the JSON the web client already speaks (`franchiseId`, `menuId`, ...).

pub mod franchise;
pub mod menu;
pub mod order;
pub mod user;

pub use franchise::{Franchise, FranchiseAdmin, Store};
pub use menu::{MenuItem, NewMenuItem};
pub use order::{Order, OrderItem, OrderRequest};
pub use user::{NewUser, User, UserUpdate};

/// Pagination window shared by the list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based page index.
    pub page: u32,
    /// Maximum rows per page.
    pub limit: u32,
}

impl PageRequest {
    /// Default page size used when the client does not send one.
    pub const DEFAULT_LIMIT: u32 = 10;
    /// Largest page a client may request.
    pub const MAX_LIMIT: u32 = 100;

    /// Build a window, clamping `limit` into `1..=MAX_LIMIT`.
    #[must_use]
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page,
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Row offset of the first item on this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.page as u64 * self.limit as u64
    }
}

/// One page of results plus whether another page follows.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub more: bool,
}

impl<T> Page<T> {
    /// Build a page from `limit + 1` fetched rows: the extra row only signals `more`.
    #[must_use]
    pub fn from_overfetch(mut rows: Vec<T>, request: PageRequest) -> Self {
        let limit = request.limit as usize;
        let more = rows.len() > limit;
        rows.truncate(limit);
        Self { items: rows, more }
    }
}

/// Translate a client name filter (`*` wildcards) into a SQL `LIKE` pattern.
#[must_use]
pub fn like_pattern(filter: &str) -> String {
    let escaped = filter
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    escaped.replace('*', "%")
}

/// Match a name against a client filter with `*` wildcards (case-insensitive).
#[must_use]
pub fn matches_filter(name: &str, filter: &str) -> bool {
    let name = name.to_lowercase();
    let filter = filter.to_lowercase();
    let parts: Vec<&str> = filter.split('*').collect();
    if parts.len() == 1 {
        return name == filter;
    }

    let mut rest = name.as_str();
    let last = parts.len() - 1;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            let Some(stripped) = rest.strip_prefix(part) else {
                return false;
            };
            rest = stripped;
        } else if i == last {
            return rest.ends_with(part);
        } else {
            let Some(pos) = rest.find(part) else {
                return false;
            };
            rest = rest.get(pos + part.len()..).unwrap_or_default();
        }
    }
    true
}
