use crate::config::SheetConfig;
use std::collections::HashSet;
use std::sync::Arc;
use tickmirror_domain::repositories::spreadsheet::{SpreadsheetService, Worksheet};
use tickmirror_domain::services::row_layout::{header_row, placeholder_row, COLUMN_COUNT};
use tickmirror_domain::value_objects::instrument::Instrument;
use tickmirror_domain::value_objects::row_assignment::RowAssignment;

/// Opens (or creates) the destination worksheet, reserves a row for every
/// instrument not yet listed, and returns the token→row assignment.
///
/// Rows are assigned from row 2 in `instruments` order whatever the sheet
/// already contains, so a worksheet written in a different order will not
/// line up with the assignment.
pub fn initialize(
    service: &dyn SpreadsheetService,
    settings: &SheetConfig,
    instruments: &[Instrument],
) -> Result<(Arc<dyn Worksheet>, RowAssignment), String> {
    initialize_inner(service, settings, instruments).map_err(|err| {
        tracing::error!(error = %err, "error setting up worksheet");
        err
    })
}

fn initialize_inner(
    service: &dyn SpreadsheetService,
    settings: &SheetConfig,
    instruments: &[Instrument],
) -> Result<(Arc<dyn Worksheet>, RowAssignment), String> {
    let spreadsheet = service
        .open(&settings.spreadsheet)
        .map_err(|err| format!("failed to open spreadsheet '{}': {err}", settings.spreadsheet))?;
    tracing::info!(title = spreadsheet.title(), "spreadsheet opened");

    let worksheet = match spreadsheet.worksheet(&settings.worksheet)? {
        Some(ws) => ws,
        None => {
            let ws = spreadsheet.add_worksheet(
                &settings.worksheet,
                settings.new_worksheet_rows,
                COLUMN_COUNT as u32,
            )?;
            ws.append_row(&header_row())
                .map_err(|err| format!("failed to write header row: {err}"))?;
            tracing::info!(worksheet = ws.title(), "worksheet created and headers added");
            ws
        }
    };

    let existing = existing_tokens(worksheet.as_ref())?;
    let mut appended = 0usize;
    for instrument in instruments {
        if existing.contains(&instrument.token) {
            continue;
        }
        worksheet
            .append_row(&placeholder_row(instrument.token, &instrument.trading_symbol))
            .map_err(|err| {
                format!(
                    "failed to reserve row for {} ({}): {err}",
                    instrument.trading_symbol, instrument.token
                )
            })?;
        appended += 1;
    }

    let rows = RowAssignment::sequential(instruments);
    tracing::info!(
        appended,
        assignments = ?rows.entries(),
        "initial rows for selected instruments set up"
    );
    Ok((worksheet, rows))
}

/// Tokens already listed in column A, below the header.
fn existing_tokens(worksheet: &dyn Worksheet) -> Result<HashSet<u32>, String> {
    let cells = worksheet
        .col_values(1)
        .map_err(|err| format!("failed to read existing tokens: {err}"))?;
    Ok(cells
        .iter()
        .skip(1)
        .filter(|cell| !cell.is_empty() && cell.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|cell| cell.parse::<u32>().ok())
        .collect())
}
