use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub index: usize,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_position(name).is_some()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum ReportColumn {
    Guideline,
    Line,
    Severity,
    Status,
    Comment,
}

impl ReportColumn {
    pub const PROJECTION: [ReportColumn; 5] = [
        ReportColumn::Guideline,
        ReportColumn::Line,
        ReportColumn::Severity,
        ReportColumn::Status,
        ReportColumn::Comment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guideline => "Guideline",
            Self::Line => "Line",
            Self::Severity => "Severity",
            Self::Status => "Status",
            Self::Comment => "Comment",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectedRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guideline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl SelectedRow {
    pub fn field(&self, column: ReportColumn) -> Option<&str> {
        match column {
            ReportColumn::Guideline => self.guideline.as_deref(),
            ReportColumn::Line => self.line.as_deref(),
            ReportColumn::Severity => self.severity.as_deref(),
            ReportColumn::Status => self.status.as_deref(),
            ReportColumn::Comment => self.comment.as_deref(),
        }
    }

    pub fn set_field(&mut self, column: ReportColumn, value: Option<String>) {
        let slot = match column {
            ReportColumn::Guideline => &mut self.guideline,
            ReportColumn::Line => &mut self.line,
            ReportColumn::Severity => &mut self.severity,
            ReportColumn::Status => &mut self.status,
            ReportColumn::Comment => &mut self.comment,
        };
        *slot = value;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JustifiedRowSet {
    pub table_index: usize,
    pub columns: Vec<ReportColumn>,
    pub rows: Vec<SelectedRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    pub line: i64,
    pub text: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    NoTables,
    NoStatusTables,
    NoJustifiedRows,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Annotated,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub path: String,
    pub status: FileStatus,
    pub comments_inserted: usize,
    pub comments_dropped: usize,
    pub line_count_before: usize,
    pub line_count_after: usize,
    pub sha256_before: Option<String>,
    pub sha256_after: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunCounts {
    pub tables_extracted: usize,
    pub status_tables: usize,
    pub justified_tables: usize,
    pub justified_rows: usize,
    pub comment_records: usize,
    pub rows_skipped_invalid_line: usize,
    pub comments_inserted: usize,
    pub comments_dropped_out_of_range: usize,
    pub files_annotated: usize,
    pub files_failed: usize,
    pub files_skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotateRunSummary {
    pub manifest_version: u32,
    pub generated_at: String,
    pub html_path: String,
    pub html_sha256: Option<String>,
    pub failure_policy: String,
    pub dry_run: bool,
    pub outcome: RunOutcome,
    pub extraction_error: Option<String>,
    pub counts: RunCounts,
    pub files: Vec<FileResult>,
}
