//! # Artifact Store
//!
//! Durable storage for the per-date digest artifacts: the JSON content record
//! and the narrated audio files. Objects are addressed by a logical key and
//! every successful write hands back a [`Locator`] that can be used to
//! retrieve the object later.
//!
//! Two backends are provided: a Postgres table (via sqlx) and a plain
//! directory on the local filesystem. Both give last-writer-wins semantics
//! per key.

mod store;

pub use store::local::LocalArtifactStore;
pub use store::postgres::PgArtifactStore;
pub use store::{AnyArtifactStore, ArtifactStore, Locator};
