//! In-memory model of the parts of a Word body we turn into HTML.

/// A block-level item of the body, a table cell or a note.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Paragraph {
    pub style_id: Option<String>,
    pub numbering: Option<NumberingRef>,
    pub children: Vec<Inline>,
}

/// `w:numPr` of a paragraph: which list it belongs to and how deep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NumberingRef {
    pub num_id: String,
    pub level: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Inline {
    Run(Run),
    /// `w:bookmarkStart` name.
    Bookmark(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Run {
    pub props: RunProps,
    /// Enclosing `w:hyperlink`, if any.
    pub link: Option<Hyperlink>,
    pub content: Vec<RunContent>,
}

/// The subset of run formatting that survives into HTML.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RunProps {
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
    pub vertical: VerticalAlign,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum VerticalAlign {
    #[default]
    Baseline,
    Superscript,
    Subscript,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Hyperlink {
    /// `r:id` pointing at an external target in the relationships part.
    pub rel_id: Option<String>,
    /// `w:anchor` naming a bookmark in this document.
    pub anchor: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RunContent {
    Text(String),
    Tab,
    Break,
    Image(ImageRef),
    NoteReference(NoteKind, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImageRef {
    pub rel_id: String,
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum NoteKind {
    Footnote,
    Endnote,
}

impl NoteKind {
    /// Prefix used in element ids and hrefs.
    pub fn id_prefix(self) -> &'static str {
        match self {
            NoteKind::Footnote => "footnote",
            NoteKind::Endnote => "endnote",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Note {
    pub kind: NoteKind,
    pub id: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Table {
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Row {
    pub is_header: bool,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Cell {
    pub colspan: usize,
    pub rowspan: usize,
    pub vmerge: VMerge,
    pub blocks: Vec<Block>,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            colspan: 1,
            rowspan: 1,
            vmerge: VMerge::None,
            blocks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum VMerge {
    #[default]
    None,
    Restart,
    Continue,
}

impl Table {
    /// Build a table from parsed rows, folding `vMerge` continuation cells
    /// into the `rowspan` of the cell above them.
    pub fn from_rows(mut rows: Vec<Row>) -> Table {
        for r in 0..rows.len() {
            let mut col = 0;
            for c in 0..rows[r].cells.len() {
                let span = rows[r].cells[c].colspan;
                if rows[r].cells[c].vmerge == VMerge::Continue {
                    match find_merge_owner(&rows, r, col) {
                        Some((owner_row, owner_cell)) => {
                            rows[owner_row].cells[owner_cell].rowspan += 1;
                        }
                        // Nothing to merge into: keep it as an ordinary cell.
                        None => rows[r].cells[c].vmerge = VMerge::None,
                    }
                }
                col += span;
            }
        }

        for row in &mut rows {
            row.cells.retain(|cell| cell.vmerge != VMerge::Continue);
        }
        Table { rows }
    }
}

/// Walk upwards from `row` to the first cell starting at grid column `col`
/// that is not itself a continuation.
fn find_merge_owner(rows: &[Row], row: usize, col: usize) -> Option<(usize, usize)> {
    for r in (0..row).rev() {
        let (idx, cell) = cell_at_column(&rows[r], col)?;
        if cell.vmerge != VMerge::Continue {
            return Some((r, idx));
        }
    }
    None
}

fn cell_at_column(row: &Row, col: usize) -> Option<(usize, &Cell)> {
    let mut start = 0;
    for (idx, cell) in row.cells.iter().enumerate() {
        if start == col {
            return Some((idx, cell));
        }
        if start > col {
            return None;
        }
        start += cell.colspan;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(vmerge: VMerge) -> Cell {
        Cell {
            vmerge,
            ..Cell::default()
        }
    }

    fn row(cells: Vec<Cell>) -> Row {
        Row {
            is_header: false,
            cells,
        }
    }

    #[test]
    fn vertical_merge_becomes_rowspan() {
        let table = Table::from_rows(vec![
            row(vec![cell(VMerge::Restart), cell(VMerge::None)]),
            row(vec![cell(VMerge::Continue), cell(VMerge::None)]),
            row(vec![cell(VMerge::Continue), cell(VMerge::None)]),
        ]);
        assert_eq!(table.rows[0].cells[0].rowspan, 3);
        assert_eq!(table.rows[1].cells.len(), 1);
        assert_eq!(table.rows[2].cells.len(), 1);
    }

    #[test]
    fn merge_respects_column_spans() {
        let wide = Cell {
            colspan: 2,
            ..Cell::default()
        };
        let table = Table::from_rows(vec![
            row(vec![wide, cell(VMerge::Restart)]),
            row(vec![cell(VMerge::None), cell(VMerge::None), cell(VMerge::Continue)]),
        ]);
        assert_eq!(table.rows[0].cells[1].rowspan, 2);
        assert_eq!(table.rows[1].cells.len(), 2);
    }

    #[test]
    fn orphan_continuation_is_kept() {
        let table = Table::from_rows(vec![row(vec![cell(VMerge::Continue)])]);
        assert_eq!(table.rows[0].cells.len(), 1);
        assert_eq!(table.rows[0].cells[0].vmerge, VMerge::None);
    }
}
