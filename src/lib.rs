//! # qanat
//!
//! Partial knowledge-graph query answering over an entity-importance engine.
//!
//! ## Architecture
//!
//! - **Rank engine** (`rank`): PageRank over a streamed triple file, with
//!   dangling-mass redistribution and a persisted id → rank table
//! - **Search index** (`index`): document models, lookup contract, and the
//!   in-process implementation plus search-term hygiene
//! - **Type index** (`typeindex`): type → observed property-id mapping,
//!   built once per session and shared read-only
//! - **Query resolution** (`query`): classification of partial query graphs
//!   and routed remote-first/local-fallback resolution
//! - **Remote endpoint** (`endpoint`): SPARQL rendering and the blocking
//!   best-effort client
//!
//! ## Library usage
//!
//! ```no_run
//! use qanat::session::{Session, SessionConfig};
//!
//! let mut config = SessionConfig::new("index.json");
//! config.seed = Some(42);
//! let session = Session::open(config).unwrap();
//! let resolution = session
//!     .resolve_request(r#"{"nodes": [{"id": 0}], "edges": []}"#)
//!     .unwrap();
//! println!("{}", serde_json::to_string_pretty(&resolution).unwrap());
//! ```

pub mod endpoint;
pub mod error;
pub mod index;
pub mod query;
pub mod rank;
pub mod session;
pub mod triples;
pub mod typeindex;

pub use error::{QanatError, QanatResult};
pub use session::{Session, SessionConfig};
