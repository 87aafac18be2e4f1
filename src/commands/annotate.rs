use anyhow::Result;
use tracing::{info, warn};

use crate::annotate::{annotate_files, collect_comment_records};
use crate::cli::AnnotateArgs;
use crate::model::{AnnotateRunSummary, FileStatus, RunCounts, RunOutcome};
use crate::report::{extract_tables, filter_status_tables, select_justified_rows};
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

const SUMMARY_MANIFEST_VERSION: u32 = 1;

pub fn run(args: AnnotateArgs) -> Result<()> {
    info!(
        html_path = %args.html_path.display(),
        sources = args.sources.len(),
        failure_policy = args.failure_policy.as_str(),
        dry_run = args.dry_run,
        "starting annotation"
    );

    let summary = execute(&args);

    info!(
        outcome = ?summary.outcome,
        inserted = summary.counts.comments_inserted,
        dropped = summary.counts.comments_dropped_out_of_range,
        files_annotated = summary.counts.files_annotated,
        files_failed = summary.counts.files_failed,
        files_skipped = summary.counts.files_skipped,
        "annotation finished"
    );

    if let Some(summary_path) = &args.summary_path {
        write_json_pretty(summary_path, &summary)?;
        info!(path = %summary_path.display(), "wrote run summary");
    }

    Ok(())
}

pub fn execute(args: &AnnotateArgs) -> AnnotateRunSummary {
    let mut summary = AnnotateRunSummary {
        manifest_version: SUMMARY_MANIFEST_VERSION,
        generated_at: now_utc_string(),
        html_path: args.html_path.display().to_string(),
        html_sha256: sha256_file(&args.html_path).ok(),
        failure_policy: args.failure_policy.as_str().to_string(),
        dry_run: args.dry_run,
        outcome: RunOutcome::NoTables,
        extraction_error: None,
        counts: RunCounts::default(),
        files: Vec::new(),
    };

    let tables = match extract_tables(&args.html_path) {
        Ok(tables) => tables,
        Err(err) => {
            let message = format!("{err:#}");
            warn!(error = %message, "failed to extract tables from report");
            summary.extraction_error = Some(message);
            Vec::new()
        }
    };
    summary.counts.tables_extracted = tables.len();

    if tables.is_empty() {
        info!("no tables were extracted from the report");
        return summary;
    }
    info!(tables = tables.len(), "extracted report tables");

    let status_tables = filter_status_tables(tables);
    summary.counts.status_tables = status_tables.len();

    if status_tables.is_empty() {
        summary.outcome = RunOutcome::NoStatusTables;
        info!("no tables with a Status column were found");
        return summary;
    }
    info!(tables = status_tables.len(), "found tables with a Status column");

    let row_sets = select_justified_rows(&status_tables);
    summary.counts.justified_tables = row_sets.len();
    summary.counts.justified_rows = row_sets.iter().map(|row_set| row_set.rows.len()).sum();

    if row_sets.is_empty() {
        summary.outcome = RunOutcome::NoJustifiedRows;
        info!("no rows with Justified status were found");
        return summary;
    }

    let collection = collect_comment_records(&row_sets);
    summary.counts.comment_records = collection.records.len();
    summary.counts.rows_skipped_invalid_line = collection.skipped_rows;

    info!(
        rows = summary.counts.justified_rows,
        records = collection.records.len(),
        skipped = collection.skipped_rows,
        files = args.sources.len(),
        "inserting justification comments"
    );

    summary.files = annotate_files(
        &args.sources,
        &collection.records,
        args.failure_policy,
        args.dry_run,
    );

    for file in &summary.files {
        summary.counts.comments_inserted += file.comments_inserted;
        summary.counts.comments_dropped_out_of_range += file.comments_dropped;
        match file.status {
            FileStatus::Annotated => summary.counts.files_annotated += 1,
            FileStatus::Failed => summary.counts.files_failed += 1,
            FileStatus::Skipped => summary.counts.files_skipped += 1,
        }
    }
    summary.outcome = RunOutcome::Completed;

    summary
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::cli::FailurePolicy;

    const REPORT: &str = r#"<html><body>
        <table><tr><th>Project</th></tr><tr><td>demo</td></tr></table>
        <table>
          <tr><th>Guideline</th><th>Line</th><th>Severity</th><th>Status</th><th>Comment</th></tr>
          <tr><td>R1</td><td>5</td><td>Low</td><td>Justified</td><td>ok</td></tr>
          <tr><td>R9</td><td>2</td><td>High</td><td>Unreviewed</td><td>later</td></tr>
          <tr><td>R2</td><td>5</td><td>Low</td><td>Justified - fine</td><td>fine2</td></tr>
        </table>
    </body></html>"#;

    const SOURCE: &str = "l1\nl2\nl3\nl4\nl5\nl6\n";

    fn args(html_path: &Path, sources: Vec<PathBuf>) -> AnnotateArgs {
        AnnotateArgs {
            html_path: html_path.to_path_buf(),
            sources,
            failure_policy: FailurePolicy::Abort,
            dry_run: false,
            summary_path: None,
        }
    }

    fn write_fixture(dir: &Path, report: &str) -> (PathBuf, PathBuf) {
        let html_path = dir.join("report.html");
        let source_path = dir.join("module.c");
        fs::write(&html_path, report).unwrap();
        fs::write(&source_path, SOURCE).unwrap();
        (html_path, source_path)
    }

    #[test]
    fn justified_rows_are_inserted_before_their_line() {
        let dir = tempfile::tempdir().unwrap();
        let (html_path, source_path) = write_fixture(dir.path(), REPORT);

        let summary = execute(&args(&html_path, vec![source_path.clone()]));

        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert_eq!(summary.counts.tables_extracted, 2);
        assert_eq!(summary.counts.status_tables, 1);
        assert_eq!(summary.counts.justified_rows, 2);
        assert_eq!(summary.counts.comments_inserted, 2);
        assert_eq!(summary.counts.files_annotated, 1);

        let annotated = fs::read_to_string(&source_path).unwrap();
        let lines = annotated.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[3], "l4");
        assert_eq!(lines[4], "/* polyspace<MISRA-C3: R1: Low: justified> ok */");
        assert_eq!(lines[5], "/* polyspace<MISRA-C3: R2: Low: justified> fine2 */");
        assert_eq!(lines[6], "l5");
    }

    #[test]
    fn rerunning_duplicates_previous_comments() {
        let dir = tempfile::tempdir().unwrap();
        let (html_path, source_path) = write_fixture(dir.path(), REPORT);
        let run_args = args(&html_path, vec![source_path.clone()]);

        execute(&run_args);
        execute(&run_args);

        let annotated = fs::read_to_string(&source_path).unwrap();
        let lines = annotated.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 10);
        assert_eq!(
            lines
                .iter()
                .filter(|line| line.contains("R1: Low: justified> ok"))
                .count(),
            2
        );
        assert_eq!(lines[4], "/* polyspace<MISRA-C3: R1: Low: justified> ok */");
        assert_eq!(lines[5], "/* polyspace<MISRA-C3: R2: Low: justified> fine2 */");
        assert_eq!(lines[8], "l5");
    }

    #[test]
    fn report_without_tables_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (html_path, source_path) = write_fixture(dir.path(), "<html><p>empty</p></html>");

        let summary = execute(&args(&html_path, vec![source_path.clone()]));

        assert_eq!(summary.outcome, RunOutcome::NoTables);
        assert!(summary.extraction_error.is_none());
        assert!(summary.files.is_empty());
        assert_eq!(fs::read_to_string(&source_path).unwrap(), SOURCE);
    }

    #[test]
    fn missing_report_degrades_to_no_tables() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("module.c");
        fs::write(&source_path, SOURCE).unwrap();

        let summary = execute(&args(&dir.path().join("absent.html"), vec![source_path]));

        assert_eq!(summary.outcome, RunOutcome::NoTables);
        assert!(summary.html_sha256.is_none());
        assert!(
            summary
                .extraction_error
                .as_deref()
                .unwrap_or_default()
                .contains("does not exist")
        );
    }

    #[test]
    fn tables_without_status_column_stop_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let (html_path, source_path) = write_fixture(
            dir.path(),
            "<table><tr><th>Line</th><th>State</th></tr><tr><td>1</td><td>Justified</td></tr></table>",
        );

        let summary = execute(&args(&html_path, vec![source_path.clone()]));

        assert_eq!(summary.outcome, RunOutcome::NoStatusTables);
        assert_eq!(summary.counts.tables_extracted, 1);
        assert_eq!(fs::read_to_string(&source_path).unwrap(), SOURCE);
    }

    #[test]
    fn status_table_without_justified_rows_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let (html_path, source_path) = write_fixture(
            dir.path(),
            "<table><tr><th>Line</th><th>Status</th></tr><tr><td>1</td><td>Open</td></tr></table>",
        );

        let summary = execute(&args(&html_path, vec![source_path.clone()]));

        assert_eq!(summary.outcome, RunOutcome::NoJustifiedRows);
        assert_eq!(fs::read_to_string(&source_path).unwrap(), SOURCE);
    }

    #[test]
    fn run_writes_summary_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let (html_path, source_path) = write_fixture(dir.path(), REPORT);
        let summary_path = dir.path().join("out").join("summary.json");

        let mut run_args = args(&html_path, vec![source_path, dir.path().join("gone.c")]);
        run_args.summary_path = Some(summary_path.clone());
        run(run_args).unwrap();

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&summary_path).unwrap()).unwrap();
        assert_eq!(summary["outcome"], "completed");
        assert_eq!(summary["failure_policy"], "abort");
        assert_eq!(summary["counts"]["comments_inserted"], 2);
        assert_eq!(summary["counts"]["files_failed"], 1);
        assert_eq!(summary["files"][1]["status"], "failed");
    }
}
