//! Line-level access to the pre-sorted triple stream.
//!
//! The rank builder consumes plain-text N-Triples-style lines, pre-sorted so
//! that all lines sharing a subject are contiguous. This module provides the
//! thin tokenizing layer on top of that stream: leading-token extraction,
//! entity/literal classification, and a grouping iterator.
//!
//! Out-of-order input is not detected: a subject that reappears after a
//! different subject silently starts a new group.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::RankError;

/// A single parsed triple line, borrowing from the underlying line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripleLine<'a> {
    pub subject: &'a str,
    pub predicate: &'a str,
    pub object: &'a str,
}

impl<'a> TripleLine<'a> {
    /// Parse the three leading whitespace-separated tokens of a line.
    /// Returns `None` for blank or truncated lines.
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let subject = tokens.next()?;
        let predicate = tokens.next()?;
        let object = tokens.next()?;
        Some(Self {
            subject,
            predicate,
            object,
        })
    }
}

/// The leading subject token of a line, used as the grouping key.
pub fn subject_token(line: &str) -> &str {
    line.split_whitespace().next().unwrap_or("")
}

/// Extract the bare identifier from a token.
///
/// `<http://www.wikidata.org/entity/Q42>` → `Q42`; a bare `Q42` passes
/// through unchanged. Literals keep their quotes and fail the entity checks.
pub fn token_id(token: &str) -> &str {
    let trimmed = token.trim_start_matches('<').trim_end_matches('>');
    match trimmed.rfind('/') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

fn id_has_prefix(token: &str, prefix: char) -> bool {
    let id = token_id(token);
    let mut chars = id.chars();
    chars.next() == Some(prefix) && chars.clone().next().is_some() && chars.all(|c| c.is_ascii_digit())
}

/// Whether a token denotes an entity (`Q`-prefixed id). Literals are not entities.
pub fn is_entity(token: &str) -> bool {
    !token.starts_with('"') && id_has_prefix(token, 'Q')
}

/// Whether a token denotes a property (`P`-prefixed id).
pub fn is_property(token: &str) -> bool {
    !token.starts_with('"') && id_has_prefix(token, 'P')
}

/// Iterator adaptor yielding contiguous groups of lines that share a subject.
pub struct SubjectGroups<I: Iterator<Item = String>> {
    lines: I,
    pending: Option<String>,
}

impl<I: Iterator<Item = String>> Iterator for SubjectGroups<I> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Vec<String>> {
        let first = match self.pending.take() {
            Some(line) => line,
            None => self.lines.next()?,
        };
        let key = subject_token(&first).to_string();
        let mut group = vec![first];

        for line in self.lines.by_ref() {
            if subject_token(&line) == key {
                group.push(line);
            } else {
                self.pending = Some(line);
                break;
            }
        }
        Some(group)
    }
}

/// Group a pre-sorted line stream by subject token.
pub fn group_by_subject<I>(lines: I) -> SubjectGroups<I::IntoIter>
where
    I: IntoIterator<Item = String>,
{
    SubjectGroups {
        lines: lines.into_iter(),
        pending: None,
    }
}

/// Open a triples file as a streaming line iterator.
///
/// Lines that are not valid UTF-8 are skipped and the stream continues;
/// dump exports are expected to be clean UTF-8, so a skipped line is noise,
/// not a truncation point.
pub fn stream_lines(path: &Path) -> Result<impl Iterator<Item = String>, RankError> {
    let file = File::open(path).map_err(|source| RankError::Io { source })?;
    Ok(BufReader::new(file).lines().filter_map(Result::ok))
}
