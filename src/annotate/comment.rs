use crate::model::{ReportColumn, SelectedRow};

pub fn render_comment(row: &SelectedRow) -> String {
    format!(
        "/* polyspace<MISRA-C3: {}: {}: justified> {} */\n",
        row.field(ReportColumn::Guideline).unwrap_or_default(),
        row.field(ReportColumn::Severity).unwrap_or_default(),
        row.field(ReportColumn::Comment).unwrap_or_default(),
    )
}
