//! Static page store.
//!
//! Rendered pages live in memory keyed by route. Each route is a two-state
//! machine: absent (not yet generated) or present (generated). A missing
//! entry is generated on first request, blocking that requester; a present
//! but stale entry is served as-is while a single background regeneration
//! refreshes it.

mod store;

pub use store::PageStore;
