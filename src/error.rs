//! Rich diagnostic error types for the qanat engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the qanat engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum QanatError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Rank(#[from] RankError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Endpoint(#[from] EndpointError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Session(#[from] SessionError),
}

// ---------------------------------------------------------------------------
// Rank errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RankError {
    #[error("I/O error reading triple stream: {source}")]
    #[diagnostic(
        code(qanat::rank::io),
        help(
            "The triples file could not be read. Check that the path exists, \
             is a plain-text N-Triples file, and has read permissions."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error for rank table: {message}")]
    #[diagnostic(
        code(qanat::rank::serde),
        help(
            "Failed to encode or decode the persisted rank table. \
             The file may have been written by an incompatible version — \
             rebuild it with `qanat rank`."
        )
    )]
    Serialization { message: String },
}

// ---------------------------------------------------------------------------
// Index errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IndexError {
    #[error("I/O error accessing index file: {source}")]
    #[diagnostic(
        code(qanat::index::io),
        help("Check that the index file exists and has read permissions.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("index deserialization error: {message}")]
    #[diagnostic(
        code(qanat::index::serde),
        help(
            "The index file could not be decoded. It may be truncated or \
             written by an incompatible version — re-export it."
        )
    )]
    Serialization { message: String },

    #[error("unparsable search text: {term}")]
    #[diagnostic(
        code(qanat::index::query_parse),
        help(
            "The search text could not be parsed, even after escaping special \
             characters. Remove unbalanced quotes or leading wildcards and retry."
        )
    )]
    QueryParse { term: String },
}

// ---------------------------------------------------------------------------
// Query graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("edge {edge} references unknown node {node}")]
    #[diagnostic(
        code(qanat::query::dangling_edge),
        help(
            "Every edge's sourceId and targetId must match a node id in the \
             same query graph. Fix the ids in the submitted graph."
        )
    )]
    DanglingEdge { edge: i32, node: i32 },

    #[error("query graph JSON error: {message}")]
    #[diagnostic(
        code(qanat::query::json),
        help("The query graph JSON is malformed. Expected {{\"nodes\": [...], \"edges\": [...]}}.")
    )]
    Json { message: String },
}

// ---------------------------------------------------------------------------
// Remote endpoint errors
// ---------------------------------------------------------------------------

/// Errors from the remote SPARQL endpoint.
///
/// These never reach the caller of a resolution: the resolver converts them
/// into "no remote answer" and falls back to the local index. They exist as a
/// typed layer so the remote path stays testable on its own.
#[derive(Debug, Error, Diagnostic)]
pub enum EndpointError {
    #[error("transport error reaching endpoint: {message}")]
    #[diagnostic(
        code(qanat::endpoint::transport),
        help(
            "The endpoint could not be reached within the request timeout. \
             The resolver falls back to local heuristics; no action is required \
             unless this persists."
        )
    )]
    Transport { message: String },

    #[error("endpoint returned HTTP {code}")]
    #[diagnostic(
        code(qanat::endpoint::status),
        help("The endpoint rejected the query. Broad queries commonly time out server-side.")
    )]
    Status { code: u16 },

    #[error("malformed endpoint response: {message}")]
    #[diagnostic(
        code(qanat::endpoint::malformed),
        help("The response body was not valid SPARQL JSON results.")
    )]
    Malformed { message: String },
}

// ---------------------------------------------------------------------------
// Session errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SessionError {
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(qanat::session::invalid_config),
        help("Check the SessionConfig fields. {message}")
    )]
    InvalidConfig { message: String },

    #[error("data file error: {path}")]
    #[diagnostic(
        code(qanat::session::data_file),
        help("The data file could not be accessed. Ensure the path exists and is readable.")
    )]
    DataFile { path: String },
}

/// Convenience alias for functions returning qanat results.
pub type QanatResult<T> = std::result::Result<T, QanatError>;
