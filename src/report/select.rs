use crate::model::{JustifiedRowSet, ReportColumn, SelectedRow, Table};

const JUSTIFIED_MARKER: &str = "justified";

pub fn select_justified_rows(tables: &[Table]) -> Vec<JustifiedRowSet> {
    let mut row_sets = Vec::new();

    for table in tables {
        let Some(status_position) = table.column_position(ReportColumn::Status.as_str()) else {
            continue;
        };

        let matching = table
            .rows
            .iter()
            .filter(|row| status_is_justified(cell(row, status_position)))
            .collect::<Vec<_>>();
        if matching.is_empty() {
            continue;
        }

        let projection = ReportColumn::PROJECTION
            .iter()
            .filter_map(|column| {
                table
                    .column_position(column.as_str())
                    .map(|position| (*column, position))
            })
            .collect::<Vec<_>>();

        let rows = matching
            .into_iter()
            .map(|row| {
                let mut selected = SelectedRow::default();
                for (column, position) in &projection {
                    selected.set_field(*column, cell(row, *position).map(str::to_owned));
                }
                selected
            })
            .collect();

        row_sets.push(JustifiedRowSet {
            table_index: table.index,
            columns: projection.iter().map(|(column, _)| *column).collect(),
            rows,
        });
    }

    row_sets
}

pub fn status_is_justified(status: Option<&str>) -> bool {
    status.is_some_and(|value| value.to_lowercase().contains(JUSTIFIED_MARKER))
}

fn cell(row: &[Option<String>], position: usize) -> Option<&str> {
    row.get(position).and_then(|value| value.as_deref())
}
