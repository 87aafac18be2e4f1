use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ExtractArgs;
use crate::model::JustifiedRowSet;
use crate::report::{extract_tables, filter_status_tables, select_justified_rows};
use crate::util::{now_utc_string, write_json_pretty};

#[derive(Debug, Serialize)]
struct JustifiedRowsOutput {
    generated_at: String,
    html_path: String,
    tables_extracted: usize,
    status_tables: usize,
    justified_rows: usize,
    row_sets: Vec<JustifiedRowSet>,
}

pub fn run(args: ExtractArgs) -> Result<()> {
    let output = collect(&args)?;

    info!(
        tables = output.tables_extracted,
        status_tables = output.status_tables,
        justified_rows = output.justified_rows,
        "extracted justified rows"
    );

    match &args.output_path {
        Some(output_path) => {
            write_json_pretty(output_path, &output)?;
            info!(path = %output_path.display(), "wrote justified rows");
        }
        None => {
            let mut stdout = io::BufWriter::new(io::stdout().lock());
            serde_json::to_writer_pretty(&mut stdout, &output)
                .context("failed to serialize justified rows")?;
            writeln!(stdout)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

fn collect(args: &ExtractArgs) -> Result<JustifiedRowsOutput> {
    let tables = extract_tables(&args.html_path)?;
    let tables_extracted = tables.len();

    let status_tables = filter_status_tables(tables);
    let row_sets = select_justified_rows(&status_tables);

    Ok(JustifiedRowsOutput {
        generated_at: now_utc_string(),
        html_path: args.html_path.display().to_string(),
        tables_extracted,
        status_tables: status_tables.len(),
        justified_rows: row_sets.iter().map(|row_set| row_set.rows.len()).sum(),
        row_sets,
    })
}
