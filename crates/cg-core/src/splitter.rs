//! Splitting one model response into named source files.
//!
//! Models emit several files in one answer, each introduced by a comment
//! line carrying the file name:
//!
//! ~~~text
//! // CleanerModule.swift
//! ```swift
//! class CleanerModule { ... }
//! ```
//! // CleanerModule.m
//! ...
//! ~~~
//!
//! Every marker line starts a new file that runs until the next marker or
//! the end of the response. The code fence some models wrap around the body
//! is removed afterwards.

use std::ops::Range;

use crate::file::GeneratedFile;

/// Line-comment prefix that introduces a marker line.
const COMMENT_PREFIX: &str = "//";

/// The file name starts after the comment prefix and one separator
/// character; marker lines must be longer than this many characters.
const NAME_OFFSET: usize = 3;

/// Longest language tag accepted after an opening fence.
const FENCE_TAG_LEN_MAX: usize = 10;

/// Characters trimmed from both ends of a stripped body.
const TRIM_CHARS: &[char] = &['\n', '\r', '`', '*', ' '];

/// Extensions recognized in marker lines by default (Swift + Objective-C).
pub const DEFAULT_EXTENSIONS: &[&str] = &[".swift", ".m", ".h"];

/// Splitter configuration.
#[derive(Debug, Clone)]
pub struct SplitterConfig {
    /// Substrings that identify a file name in a comment line
    pub extensions: Vec<String>,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl SplitterConfig {
    /// Replace the recognized extensions.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        debug_assert!(
            self.extensions.iter().all(|e| !e.is_empty()),
            "Extensions must not be empty strings"
        );
        self
    }
}

/// Raw extent of one file inside a response, before fence stripping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSpan {
    /// File name captured from the marker line
    pub name: String,
    /// 0-indexed line range, marker line included
    pub lines: Range<usize>,
}

/// Splits a completed response into [`GeneratedFile`] records.
#[derive(Debug, Clone, Default)]
pub struct FileSplitter {
    config: SplitterConfig,
}

impl FileSplitter {
    /// Create a splitter with the given config.
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    /// Return the file name carried by `line` if it is a marker line.
    pub fn marker_name<'a>(&self, line: &'a str) -> Option<&'a str> {
        let trimmed = line.trim();
        if !trimmed.starts_with(COMMENT_PREFIX) || trimmed.chars().count() <= NAME_OFFSET {
            return None;
        }
        let recognized = self
            .config
            .extensions
            .iter()
            .any(|ext| trimmed.contains(ext.as_str()));
        if !recognized {
            return None;
        }
        Some(name_after_prefix(trimmed))
    }

    /// Locate every marker and the raw line range it owns.
    ///
    /// Spans are returned in order of appearance. They are contiguous and
    /// together cover the response from the first marker to the last line.
    pub fn split_spans(&self, response: &str) -> Vec<MarkerSpan> {
        let lines: Vec<&str> = response.split('\n').collect();
        let markers: Vec<(usize, &str)> = lines
            .iter()
            .enumerate()
            .filter_map(|(index, line)| self.marker_name(line).map(|name| (index, name)))
            .collect();

        markers
            .iter()
            .enumerate()
            .map(|(k, &(start, name))| {
                let end = markers
                    .get(k + 1)
                    .map(|&(next, _)| next)
                    .unwrap_or(lines.len());
                debug_assert!(start < end, "Marker span must not be empty");
                MarkerSpan {
                    name: name.to_string(),
                    lines: start..end,
                }
            })
            .collect()
    }

    /// Split a response into files.
    ///
    /// Never returns an empty vector. Without any marker line the result is a
    /// single unnamed record holding the whole response; callers must treat
    /// that as "no files identified" (see [`ensure_named`]).
    pub fn split(&self, response: &str) -> Vec<GeneratedFile> {
        let spans = self.split_spans(response);
        if spans.is_empty() {
            return vec![GeneratedFile::unnamed(response)];
        }

        let lines: Vec<&str> = response.split('\n').collect();
        spans
            .into_iter()
            .map(|span| {
                let body = lines[span.lines].join("\n");
                GeneratedFile::new(span.name, strip_fences(&body))
            })
            .collect()
    }
}

/// Remove code fences and trim the body.
///
/// Text between a leading comment line (the marker) and the first opening
/// fence is dropped. From there on every fence line is removed and all other
/// lines are kept, so a file spread over several fenced blocks stays whole.
/// An opening fence with no closing fence only loses the fence line itself.
/// Blank lines, spaces, backticks and asterisks are then trimmed from both
/// ends.
pub fn strip_fences(body: &str) -> String {
    let lines: Vec<&str> = body.split('\n').collect();

    let Some(open) = lines.iter().position(|line| is_opening_fence(line)) else {
        return body.trim_matches(TRIM_CHARS).to_string();
    };

    let mut kept: Vec<&str> = Vec::with_capacity(lines.len());
    if open > 0 && lines[0].trim().starts_with(COMMENT_PREFIX) {
        kept.push(lines[0]);
    }

    let mut in_block = false;
    for &line in &lines[open..] {
        if in_block && is_closing_fence(line) {
            in_block = false;
        } else if !in_block && is_opening_fence(line) {
            in_block = true;
        } else {
            kept.push(line);
        }
    }

    kept.join("\n").trim_matches(TRIM_CHARS).to_string()
}

/// Extract a file name from the first line of a response, if it has one.
///
/// Looser than the marker rule: any `//` comment longer than three characters
/// that contains a dot counts. Used for logging only.
pub fn find_filename_hint(response: &str) -> Option<String> {
    let first = response.split('\n').next()?;
    if first.starts_with(COMMENT_PREFIX)
        && first.chars().count() > NAME_OFFSET
        && first.contains('.')
    {
        Some(name_after_prefix(first).to_string())
    } else {
        None
    }
}

/// Fail when any record lacks a file name.
///
/// `stage` names the generation step for the error message.
pub fn ensure_named(files: &[GeneratedFile], stage: &'static str) -> Result<(), ParseError> {
    match files.iter().find(|file| !file.is_named()) {
        Some(file) => Err(ParseError::MissingFilename {
            stage,
            response_len: file.source.len(),
        }),
        None => Ok(()),
    }
}

/// Everything after the comment prefix and the character that follows it.
fn name_after_prefix(line: &str) -> &str {
    let mut rest = line[COMMENT_PREFIX.len()..].chars();
    rest.next();
    rest.as_str()
}

fn is_opening_fence(line: &str) -> bool {
    let trimmed = line.trim();
    let ticks = trimmed.chars().take_while(|&c| c == '`').count();
    if ticks < 3 {
        return false;
    }
    let tag = &trimmed[ticks..];
    tag.len() <= FENCE_TAG_LEN_MAX
        && tag
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c == '_' || c == '-')
}

fn is_closing_fence(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == '`')
}

/// Errors raised when model output cannot be attributed to files.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("No file name found in {stage} output ({response_len} bytes)")]
    MissingFilename {
        stage: &'static str,
        response_len: usize,
    },
}
