//! feedmill: a multi-tenant content-aggregation backend.
//!
//! Users register RSS/Atom feeds, follow feeds other users registered, and
//! read a deduplicated stream of posts pulled from those feeds. The heart of
//! the crate is [`ingest`]: a continuous scheduler that selects stale feeds,
//! fetches and parses them concurrently under a bounded worker budget,
//! dedup-persists new posts, and records per-feed freshness — isolating
//! per-feed failures so one broken source never stalls the rest.

pub mod config;
pub mod ingest;
pub mod storage;
