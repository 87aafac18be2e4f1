use std::borrow::Cow;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::model::{ReportColumn, Table};

const MAX_COLSPAN: usize = 1000;
const MAX_ROWSPAN: usize = 65534;

pub fn extract_tables(html_path: &Path) -> Result<Vec<Table>> {
    if !html_path.exists() {
        bail!("report file does not exist: {}", html_path.display());
    }

    let raw = fs::read(html_path)
        .with_context(|| format!("failed to read report: {}", html_path.display()))?;
    let html = String::from_utf8_lossy(&raw);
    if let Cow::Owned(_) = html {
        warn!(
            path = %html_path.display(),
            "report is not valid UTF-8; invalid bytes were replaced"
        );
    }

    let parser = TableParser::new()?;
    Ok(parser.parse_document(&html))
}

pub fn filter_status_tables(tables: Vec<Table>) -> Vec<Table> {
    tables
        .into_iter()
        .filter(|table| table.has_column(ReportColumn::Status.as_str()))
        .collect()
}

pub struct TableParser {
    table_selector: Selector,
    row_selector: Selector,
    whitespace: Regex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Head,
    Body,
    Foot,
}

#[derive(Debug, Clone)]
struct RawCell {
    text: String,
    is_header: bool,
    colspan: usize,
    rowspan: usize,
}

#[derive(Debug, Clone)]
struct PendingSpan {
    column: usize,
    text: String,
    rows_left: usize,
}

impl TableParser {
    pub fn new() -> Result<Self> {
        let table_selector =
            Selector::parse("table").map_err(|err| anyhow!("invalid table selector: {err}"))?;
        let row_selector =
            Selector::parse("tr").map_err(|err| anyhow!("invalid row selector: {err}"))?;
        let whitespace =
            Regex::new(r"[\r\n]+|\s{2,}").context("failed to compile whitespace regex")?;

        Ok(Self {
            table_selector,
            row_selector,
            whitespace,
        })
    }

    pub fn parse_document(&self, html: &str) -> Vec<Table> {
        let document = Html::parse_document(html);

        document
            .select(&self.table_selector)
            .enumerate()
            .map(|(index, table)| self.parse_table(index, table))
            .collect()
    }

    fn parse_table(&self, index: usize, table: ElementRef<'_>) -> Table {
        let mut head = Vec::<Vec<RawCell>>::new();
        let mut body = Vec::<Vec<RawCell>>::new();
        let mut foot = Vec::<Vec<RawCell>>::new();

        for row in table.select(&self.row_selector) {
            if !belongs_to(row, table) {
                continue;
            }

            let cells = self.row_cells(row);
            match section_of(row) {
                Section::Head => head.push(cells),
                Section::Body => body.push(cells),
                Section::Foot => foot.push(cells),
            }
        }

        if head.is_empty() {
            let promoted = body
                .iter()
                .take_while(|cells| !cells.is_empty() && cells.iter().all(|cell| cell.is_header))
                .count();
            head.extend(body.drain(..promoted));
        }

        let header_rows = expand_spans(&head);
        let mut body_rows = expand_spans(&body);
        body_rows.extend(expand_spans(&foot));

        let header = header_rows.last();
        let width = body_rows
            .iter()
            .map(Vec::len)
            .chain(header.map(Vec::len))
            .max()
            .unwrap_or(0);

        let columns = match header {
            Some(names) => column_names(names, width),
            None => (0..width).map(|position| position.to_string()).collect(),
        };

        let rows = body_rows
            .into_iter()
            .map(|texts| {
                let mut row = texts
                    .into_iter()
                    .map(|text| if text.is_empty() { None } else { Some(text) })
                    .collect::<Vec<_>>();
                row.resize(width, None);
                row
            })
            .collect::<Vec<_>>();

        debug!(
            table = index,
            columns = columns.len(),
            rows = rows.len(),
            "parsed report table"
        );

        Table {
            index,
            columns,
            rows,
        }
    }

    fn row_cells(&self, row: ElementRef<'_>) -> Vec<RawCell> {
        row.children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| matches!(cell.value().name(), "td" | "th"))
            .map(|cell| RawCell {
                text: self.cell_text(cell),
                is_header: cell.value().name() == "th",
                colspan: span_attribute(cell, "colspan", MAX_COLSPAN),
                rowspan: span_attribute(cell, "rowspan", MAX_ROWSPAN),
            })
            .collect()
    }

    fn cell_text(&self, cell: ElementRef<'_>) -> String {
        let raw = cell.text().collect::<String>();
        self.whitespace.replace_all(raw.trim(), " ").into_owned()
    }
}

fn belongs_to(row: ElementRef<'_>, table: ElementRef<'_>) -> bool {
    row.ancestors()
        .find(|node| {
            node.value()
                .as_element()
                .is_some_and(|element| element.name() == "table")
        })
        .is_some_and(|owner| owner.id() == table.id())
}

fn section_of(row: ElementRef<'_>) -> Section {
    let parent_name = row
        .parent()
        .and_then(|node| node.value().as_element().map(|element| element.name()));

    match parent_name {
        Some("thead") => Section::Head,
        Some("tfoot") => Section::Foot,
        _ => Section::Body,
    }
}

fn span_attribute(cell: ElementRef<'_>, name: &str, max: usize) -> usize {
    cell.value()
        .attr(name)
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(1)
        .min(max)
}

fn expand_spans(rows: &[Vec<RawCell>]) -> Vec<Vec<String>> {
    let mut expanded = Vec::with_capacity(rows.len());
    let mut remainder = VecDeque::<PendingSpan>::new();

    for row in rows {
        let mut texts = Vec::new();
        let mut next_remainder = VecDeque::new();
        let mut column = 0_usize;

        for cell in row {
            while let Some(pending) = remainder
                .front()
                .filter(|pending| pending.column <= column)
                .cloned()
            {
                remainder.pop_front();
                carry_span(pending, &mut texts, &mut next_remainder);
                column += 1;
            }

            for _ in 0..cell.colspan {
                texts.push(cell.text.clone());
                if cell.rowspan > 1 {
                    next_remainder.push_back(PendingSpan {
                        column,
                        text: cell.text.clone(),
                        rows_left: cell.rowspan - 1,
                    });
                }
                column += 1;
            }
        }

        for pending in remainder.drain(..) {
            carry_span(pending, &mut texts, &mut next_remainder);
        }

        expanded.push(texts);
        remainder = next_remainder;
    }

    while !remainder.is_empty() {
        let mut texts = Vec::new();
        let mut next_remainder = VecDeque::new();
        for pending in remainder.drain(..) {
            carry_span(pending, &mut texts, &mut next_remainder);
        }
        expanded.push(texts);
        remainder = next_remainder;
    }

    expanded
}

fn carry_span(
    pending: PendingSpan,
    texts: &mut Vec<String>,
    next_remainder: &mut VecDeque<PendingSpan>,
) {
    texts.push(pending.text.clone());
    if pending.rows_left > 1 {
        next_remainder.push_back(PendingSpan {
            rows_left: pending.rows_left - 1,
            ..pending
        });
    }
}

fn column_names(header: &[String], width: usize) -> Vec<String> {
    let mut seen = HashMap::<String, usize>::new();

    (0..width)
        .map(|position| {
            let base = header
                .get(position)
                .filter(|name| !name.is_empty())
                .cloned()
                .unwrap_or_else(|| format!("Unnamed: {position}"));

            let occurrences = seen.entry(base.clone()).or_insert(0);
            let name = if *occurrences == 0 {
                base
            } else {
                format!("{base}.{occurrences}")
            };
            *occurrences += 1;
            name
        })
        .collect()
}
