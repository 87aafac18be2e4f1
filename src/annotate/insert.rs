use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::comment::render_comment;
use crate::cli::FailurePolicy;
use crate::model::{CommentRecord, FileResult, FileStatus, JustifiedRowSet};
use crate::util::sha256_bytes;

const MISSING_LINE: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn detect(content: &[u8]) -> Self {
        match content.iter().position(|byte| *byte == b'\n') {
            Some(end) if content[..end].ends_with(b"\r") => Self::Crlf,
            _ => Self::Lf,
        }
    }

    fn terminate(self, text: &str) -> Vec<u8> {
        let body = text.strip_suffix('\n').unwrap_or(text);
        let body = body.strip_suffix('\r').unwrap_or(body);
        let mut line = body.as_bytes().to_vec();
        match self {
            Self::Lf => line.push(b'\n'),
            Self::Crlf => line.extend_from_slice(b"\r\n"),
        }
        line
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommentCollection {
    pub records: Vec<CommentRecord>,
    pub skipped_rows: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertionOutcome {
    pub inserted: usize,
    pub dropped: usize,
}

pub fn parse_line_number(value: &str) -> Option<i64> {
    let digits = value.trim().replace(',', "");
    if let Ok(number) = digits.parse::<i64>() {
        return Some(number);
    }

    digits
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite() && number.fract() == 0.0)
        .filter(|number| number.abs() < i64::MAX as f64)
        .map(|number| number as i64)
}

pub fn collect_comment_records(row_sets: &[JustifiedRowSet]) -> CommentCollection {
    let mut collection = CommentCollection::default();

    for row_set in row_sets {
        for row in &row_set.rows {
            let line = row
                .line
                .as_deref()
                .and_then(parse_line_number)
                .unwrap_or(MISSING_LINE);
            if line == MISSING_LINE {
                collection.skipped_rows += 1;
                continue;
            }

            collection.records.push(CommentRecord {
                line,
                text: render_comment(row),
            });
        }
    }

    collection
}

pub fn insert_comments(
    lines: &mut Vec<Vec<u8>>,
    records: &[CommentRecord],
    ending: LineEnding,
) -> InsertionOutcome {
    let mut sorted = records.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|record| record.line);

    let mut grouped = BTreeMap::<i64, Vec<&CommentRecord>>::new();
    for record in sorted {
        grouped.entry(record.line).or_default().push(record);
    }

    let mut outcome = InsertionOutcome::default();
    let mut offset = 0_i64;

    for (line, group) in &grouped {
        let position = line
            .checked_add(offset)
            .and_then(|shifted| shifted.checked_sub(1))
            .and_then(|shifted| usize::try_from(shifted).ok())
            .filter(|position| *position < lines.len());

        let Some(mut position) = position else {
            outcome.dropped += group.len();
            continue;
        };

        for record in group {
            debug!(line = line, comment = %record.text.trim_end(), "inserting comment");
            lines.insert(position, ending.terminate(&record.text));
            position += 1;
            offset += 1;
            outcome.inserted += 1;
        }
    }

    outcome
}

pub fn split_lines(content: &[u8]) -> Vec<Vec<u8>> {
    content
        .split_inclusive(|byte| *byte == b'\n')
        .map(<[u8]>::to_vec)
        .collect()
}

pub fn annotate_file(path: &Path, records: &[CommentRecord], dry_run: bool) -> Result<FileResult> {
    let raw =
        fs::read(path).with_context(|| format!("failed to read source file: {}", path.display()))?;
    let sha256_before = sha256_bytes(&raw);

    let ending = LineEnding::detect(&raw);
    let mut lines = split_lines(&raw);
    let line_count_before = lines.len();

    let outcome = insert_comments(&mut lines, records, ending);
    let updated = lines.concat();

    if !dry_run {
        fs::write(path, &updated)
            .with_context(|| format!("failed to write source file: {}", path.display()))?;
    }

    Ok(FileResult {
        path: path.display().to_string(),
        status: FileStatus::Annotated,
        comments_inserted: outcome.inserted,
        comments_dropped: outcome.dropped,
        line_count_before,
        line_count_after: lines.len(),
        sha256_before: Some(sha256_before),
        sha256_after: Some(sha256_bytes(&updated)),
        error: None,
    })
}

pub fn annotate_files(
    paths: &[PathBuf],
    records: &[CommentRecord],
    policy: FailurePolicy,
    dry_run: bool,
) -> Vec<FileResult> {
    let mut results = Vec::with_capacity(paths.len());
    let mut aborted = false;

    for path in paths {
        if aborted {
            results.push(unprocessed_result(path, FileStatus::Skipped, None));
            continue;
        }

        match annotate_file(path, records, dry_run) {
            Ok(result) => {
                info!(
                    path = %path.display(),
                    inserted = result.comments_inserted,
                    dropped = result.comments_dropped,
                    dry_run,
                    "annotated source file"
                );
                results.push(result);
            }
            Err(err) => {
                let message = format!("{err:#}");
                warn!(path = %path.display(), error = %message, "failed to annotate source file");
                results.push(unprocessed_result(path, FileStatus::Failed, Some(message)));

                if policy == FailurePolicy::Abort {
                    warn!(
                        remaining = paths.len() - results.len(),
                        "aborting annotation of remaining source files"
                    );
                    aborted = true;
                }
            }
        }
    }

    results
}

fn unprocessed_result(path: &Path, status: FileStatus, error: Option<String>) -> FileResult {
    FileResult {
        path: path.display().to_string(),
        status,
        comments_inserted: 0,
        comments_dropped: 0,
        line_count_before: 0,
        line_count_after: 0,
        sha256_before: None,
        sha256_after: None,
        error,
    }
}
