//! Write a single-sheet xlsx workbook from text rows

use rust_xlsxwriter::{Format, Workbook};

use crate::error::EngineResult;

/// Build a workbook in memory. Blank cells are left empty.
pub fn write_table<S: AsRef<str>>(
    sheet_name: &str,
    header: &[S],
    rows: &[Vec<String>],
) -> EngineResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, name) in header.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, name.as_ref(), &header_format)?;
    }

    for (idx, row) in rows.iter().enumerate() {
        let row_num = (idx + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            if !value.is_empty() {
                worksheet.write_string(row_num, col as u16, value)?;
            }
        }
    }

    worksheet.autofit();

    Ok(workbook.save_to_buffer()?)
}
