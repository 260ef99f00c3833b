//! Weft Storage
//!
//! Ordered byte-key transactional storage for the hub core, backed by redb.
//! A single `data` table holds every row; the first key byte (`RootPrefix`)
//! discriminates logical tables, and `UserPostfix` enumerates per-fid rows
//! and secondary indices.

pub mod db;
pub mod keys;

pub use db::{HubDb, StoreDbError, TABLE_DATA};
pub use keys::{RootPrefix, UserPostfix};
