//! # vaultdex
//!
//! Slug indexer for Markdown vaults.
//!
//! Every note whose frontmatter declares a `slug` becomes one record in a
//! flat JSON index. `inherits` references are resolved to the slugs of the
//! notes they point at, and when a vault mirrors notes from another vault
//! (a *remote root*) local notes shadow remote ones on slug collisions and
//! ambiguous links.
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────────┐
//! │  Vault   │──▶│  Corpus  │──▶│ Resolver │──▶│ Index build  │──▶ JSON + note
//! │ FS walk  │   │ + ranks  │   │ 4 steps  │   │ arbitration  │
//! └──────────┘   └──────────┘   └──────────┘   └──────────────┘
//! ```
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | `.vaultdex.toml` parsing |
//! | [`vault`] | Storage access trait and filesystem implementation |
//! | [`frontmatter`] | YAML header extraction and normalization |
//! | [`corpus`] | Eligible notes and their origin ranks |
//! | [`link`] | Reference syntax parsing |
//! | [`resolve`] | Reference resolution |
//! | [`index`] | Slug index construction |
//! | [`render`] | Readable index note and output writes |
//! | [`expand`] | Inline linked note bodies into a document |

pub mod config;
pub mod corpus;
pub mod error;
pub mod expand;
pub mod frontmatter;
pub mod index;
pub mod link;
pub mod render;
pub mod resolve;
pub mod vault;

pub use error::{Result, VaultError};
