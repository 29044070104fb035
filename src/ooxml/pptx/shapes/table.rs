/// Table shape implementation for PowerPoint presentations.
///
/// Tables are DrawingML tables (`a:tbl`) hosted in a graphic frame. Cell text
/// is kept as plain text; one paragraph per line when written.
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::namespace;
use std::fmt::Write as FmtWrite;

use super::base::{Placeholder, Position, ShapeExtras, write_c_nv_pr, write_nv_pr};
use super::textframe::TextBody;

/// Default row height in EMU (0.4 inch).
pub const DEFAULT_ROW_HEIGHT: i64 = 370_840;

/// A table cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCell {
    pub text: String,
    /// Rows spanned by a merge origin
    pub row_span: u32,
    /// Columns spanned by a merge origin
    pub col_span: u32,
    /// Covered by a horizontal merge
    pub h_merge: bool,
    /// Covered by a vertical merge
    pub v_merge: bool,
}

impl Default for TableCell {
    fn default() -> Self {
        Self {
            text: String::new(),
            row_span: 1,
            col_span: 1,
            h_merge: false,
            v_merge: false,
        }
    }
}

impl TableCell {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// True for cells hidden under another cell's span.
    #[inline]
    pub fn is_spanned(&self) -> bool {
        self.h_merge || self.v_merge
    }
}

/// A table in a graphic frame.
///
/// # Examples
///
/// ```rust
/// use slidekit::ooxml::pptx::shapes::{Position, Table};
///
/// let data = vec![
///     vec!["Region".to_string(), "Sales".to_string()],
///     vec!["North".to_string(), "120".to_string()],
/// ];
/// let table = Table::from_data(&data, Position::new(0, 0, 4_000_000, 1_000_000)).unwrap();
/// assert_eq!((table.row_count(), table.col_count()), (2, 2));
/// assert_eq!(table.cell(1, 0).unwrap().text, "North");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub id: u32,
    pub name: String,
    pub position: Position,
    pub rows: Vec<Vec<TableCell>>,
    pub col_widths: Vec<i64>,
    pub row_heights: Vec<i64>,
    /// Header row formatting (`a:tblPr@firstRow`)
    pub first_row: bool,
    /// Banded rows (`a:tblPr@bandRow`)
    pub band_row: bool,
    /// Set on table placeholders of layouts
    pub placeholder: Option<Placeholder>,
}

impl Table {
    /// An empty `rows` x `cols` table; columns share the frame width evenly.
    pub fn new(rows: usize, cols: usize, position: Position) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(OoxmlError::InvalidInput(format!(
                "table needs at least one row and one column, got {}x{}",
                rows, cols
            )));
        }
        let col_width = position.cx / cols as i64;
        Ok(Self {
            id: 0,
            name: "Table".to_string(),
            position,
            rows: vec![vec![TableCell::default(); cols]; rows],
            col_widths: vec![col_width; cols],
            row_heights: vec![DEFAULT_ROW_HEIGHT; rows],
            first_row: true,
            band_row: true,
            placeholder: None,
        })
    }

    /// A table filled from row-major data. Short rows are padded with empty cells.
    pub fn from_data(data: &[Vec<String>], position: Position) -> Result<Self> {
        let cols = data.iter().map(Vec::len).max().unwrap_or(0);
        let mut table = Self::new(data.len(), cols, position)?;
        for (r, row) in data.iter().enumerate() {
            for (c, text) in row.iter().enumerate() {
                table.rows[r][c].text = text.clone();
            }
        }
        Ok(table)
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of grid columns.
    pub fn col_count(&self) -> usize {
        if self.col_widths.is_empty() {
            self.rows.iter().map(Vec::len).max().unwrap_or(0)
        } else {
            self.col_widths.len()
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&TableCell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut TableCell> {
        self.rows.get_mut(row).and_then(|r| r.get_mut(col))
    }

    pub fn set_cell_text(&mut self, row: usize, col: usize, text: &str) -> Result<()> {
        let (rows, cols) = (self.row_count(), self.col_count());
        let cell = self.cell_mut(row, col).ok_or_else(|| {
            OoxmlError::InvalidInput(format!(
                "cell ({}, {}) outside {}x{} table",
                row, col, rows, cols
            ))
        })?;
        cell.text = text.to_string();
        Ok(())
    }

    /// Merge the rectangle from `(first_row, first_col)` to `(last_row, last_col)` inclusive.
    pub fn merge(&mut self, first_row: usize, first_col: usize, last_row: usize, last_col: usize) -> Result<()> {
        if first_row > last_row
            || first_col > last_col
            || last_row >= self.row_count()
            || last_col >= self.rows[last_row].len()
        {
            return Err(OoxmlError::InvalidInput(format!(
                "invalid merge range ({}, {})..({}, {})",
                first_row, first_col, last_row, last_col
            )));
        }

        for r in first_row..=last_row {
            for c in first_col..=last_col {
                let cell = &mut self.rows[r][c];
                cell.h_merge = c > first_col;
                cell.v_merge = r > first_row;
                cell.row_span = 1;
                cell.col_span = 1;
            }
        }
        let origin = &mut self.rows[first_row][first_col];
        origin.row_span = (last_row - first_row + 1) as u32;
        origin.col_span = (last_col - first_col + 1) as u32;
        Ok(())
    }

    pub(crate) fn write_xml(&self, xml: &mut String) -> Result<()> {
        xml.push_str("<p:graphicFrame><p:nvGraphicFramePr>");
        let extras = ShapeExtras::default();
        write_c_nv_pr(xml, self.id, &self.name, None, &extras)?;
        xml.push_str(r#"<p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr>"#);
        write_nv_pr(xml, self.placeholder.as_ref(), &extras)?;
        xml.push_str("</p:nvGraphicFramePr>");
        self.position.write_xfrm(xml, "p:xfrm")?;

        write!(
            xml,
            r#"<a:graphic><a:graphicData uri="{}"><a:tbl>"#,
            namespace::DML_TABLE
        )?;
        write!(
            xml,
            r#"<a:tblPr firstRow="{}" bandRow="{}"/>"#,
            self.first_row as u8, self.band_row as u8
        )?;

        xml.push_str("<a:tblGrid>");
        for width in &self.col_widths {
            write!(xml, r#"<a:gridCol w="{}"/>"#, width)?;
        }
        xml.push_str("</a:tblGrid>");

        for (r, row) in self.rows.iter().enumerate() {
            let height = self.row_heights.get(r).copied().unwrap_or(DEFAULT_ROW_HEIGHT);
            write!(xml, r#"<a:tr h="{}">"#, height)?;
            for cell in row {
                xml.push_str("<a:tc");
                if cell.row_span > 1 {
                    write!(xml, r#" rowSpan="{}""#, cell.row_span)?;
                }
                if cell.col_span > 1 {
                    write!(xml, r#" gridSpan="{}""#, cell.col_span)?;
                }
                if cell.h_merge {
                    xml.push_str(r#" hMerge="1""#);
                }
                if cell.v_merge {
                    xml.push_str(r#" vMerge="1""#);
                }
                xml.push('>');
                TextBody::from_text(&cell.text).write_xml(xml, "a:txBody")?;
                xml.push_str("<a:tcPr/></a:tc>");
            }
            xml.push_str("</a:tr>");
        }

        xml.push_str("</a:tbl></a:graphicData></a:graphic></p:graphicFrame>");
        Ok(())
    }
}
