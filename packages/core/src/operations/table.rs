//! Table structure edits
//!
//! A table is a `Table` element whose children are `TableRow` elements whose
//! children are `TableCell` elements. Every edit here leaves the grid
//! rectangular; removing the last row or column removes the table itself.

use crate::models::{Document, Element, ElementKind, Node, NodePath};
use crate::operations::error::TransformError;
use std::ops::RangeInclusive;

/// Result of a row or column removal
#[derive(Debug, Clone, PartialEq)]
pub enum TableRemoval {
    /// Table still exists with the remaining rows/columns
    Shrunk,
    /// Nothing was left, the table node was removed
    TableRemoved,
}

impl Document {
    fn table(&self, path: &[usize]) -> Result<&Element, TransformError> {
        let node = self
            .get(path)
            .ok_or_else(|| TransformError::node_not_found(path))?;
        let el = node
            .as_element()
            .ok_or_else(|| TransformError::not_an_element(path))?;
        if el.kind != ElementKind::Table {
            return Err(TransformError::UnexpectedKind {
                path: path.to_vec(),
                expected: "table",
                found: el.kind.name(),
            });
        }
        Ok(el)
    }

    fn table_rows_mut(&mut self, path: &[usize]) -> Result<&mut Vec<Node>, TransformError> {
        self.table(path)?;
        self.children_at_mut(path)
    }

    /// `(rows, columns)` of a rectangular table
    pub fn table_dimensions(&self, path: &[usize]) -> Result<(usize, usize), TransformError> {
        let table = self.table(path)?;
        let widths: Vec<usize> = table.children.iter().map(row_width).collect();
        let columns = widths.first().copied().unwrap_or(0);
        if widths.iter().any(|w| *w != columns) {
            return Err(TransformError::invalid_table("rows have different cell counts"));
        }
        Ok((widths.len(), columns))
    }

    /// Insert an empty row at `index`
    pub fn insert_table_row(&mut self, path: &[usize], index: usize) -> Result<NodePath, TransformError> {
        let (rows, columns) = self.table_dimensions(path)?;
        if index > rows {
            return Err(TransformError::invalid_table(format!(
                "row index {} past end of {}-row table",
                index, rows
            )));
        }
        let row = empty_row(columns.max(1));
        self.table_rows_mut(path)?.insert(index, Node::Element(row));
        let mut row_path = path.to_vec();
        row_path.push(index);
        Ok(row_path)
    }

    /// Remove the rows in `rows` (inclusive)
    pub fn remove_table_rows(
        &mut self,
        path: &[usize],
        rows: RangeInclusive<usize>,
    ) -> Result<TableRemoval, TransformError> {
        let (count, _) = self.table_dimensions(path)?;
        let (first, last) = (*rows.start(), *rows.end());
        if first > last || last >= count {
            return Err(TransformError::invalid_table(format!(
                "row range {}..={} outside {}-row table",
                first, last, count
            )));
        }
        if last - first + 1 == count {
            self.remove_node(path)?;
            return Ok(TableRemoval::TableRemoved);
        }
        self.table_rows_mut(path)?.drain(first..=last);
        Ok(TableRemoval::Shrunk)
    }

    /// Insert an empty cell at `index` in every row
    pub fn insert_table_column(&mut self, path: &[usize], index: usize) -> Result<(), TransformError> {
        let (_, columns) = self.table_dimensions(path)?;
        if index > columns {
            return Err(TransformError::invalid_table(format!(
                "column index {} past end of {}-column table",
                index, columns
            )));
        }
        for row in self.table_rows_mut(path)? {
            if let Some(row) = row.as_element_mut() {
                row.children.insert(index, Node::Element(empty_cell()));
            }
        }
        Ok(())
    }

    /// Remove the cell at `index` from every row
    pub fn remove_table_column(
        &mut self,
        path: &[usize],
        index: usize,
    ) -> Result<TableRemoval, TransformError> {
        let (_, columns) = self.table_dimensions(path)?;
        if index >= columns {
            return Err(TransformError::invalid_table(format!(
                "column index {} outside {}-column table",
                index, columns
            )));
        }
        if columns == 1 {
            self.remove_node(path)?;
            return Ok(TableRemoval::TableRemoved);
        }
        for row in self.table_rows_mut(path)? {
            if let Some(row) = row.as_element_mut() {
                row.children.remove(index);
            }
        }
        Ok(TableRemoval::Shrunk)
    }

    /// Split a table before row `at`; rows `at..` move to a new table inserted
    /// right after the original. Returns the new table's path.
    pub fn split_table(&mut self, path: &[usize], at: usize) -> Result<NodePath, TransformError> {
        let (rows, _) = self.table_dimensions(path)?;
        if at == 0 || at >= rows {
            return Err(TransformError::invalid_table(format!(
                "cannot split {}-row table at row {}",
                rows, at
            )));
        }
        let moved: Vec<Node> = self.table_rows_mut(path)?.drain(at..).collect();
        let (index, parent) = path
            .split_last()
            .ok_or_else(|| TransformError::node_not_found(path))?;
        let mut new_path = parent.to_vec();
        new_path.push(index + 1);
        self.insert_node(&new_path, Node::Element(Element::new(ElementKind::Table, moved)))?;
        Ok(new_path)
    }
}

fn row_width(row: &Node) -> usize {
    row.children()
        .iter()
        .filter(|cell| matches!(cell.as_element(), Some(el) if el.kind == ElementKind::TableCell))
        .count()
}

fn empty_cell() -> Element {
    Element::new(ElementKind::TableCell, vec![])
}

fn empty_row(columns: usize) -> Element {
    let cells = (0..columns).map(|_| Node::Element(empty_cell())).collect();
    Element::new(ElementKind::TableRow, cells)
}

/// Table element built from rows of plain-text cells
pub fn table_from_rows(rows: &[Vec<String>]) -> Element {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let rows = rows
        .iter()
        .map(|cells| {
            let cells = (0..width)
                .map(|i| {
                    let text = cells.get(i).cloned().unwrap_or_default();
                    Node::Element(Element::new(ElementKind::TableCell, vec![Node::text(text)]))
                })
                .collect();
            Node::Element(Element::new(ElementKind::TableRow, cells))
        })
        .collect();
    Element::new(ElementKind::Table, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: usize, columns: usize) -> Vec<Vec<String>> {
        (0..rows)
            .map(|r| (0..columns).map(|c| format!("r{}c{}", r, c)).collect())
            .collect()
    }

    fn doc_with_table(rows: usize, columns: usize) -> Document {
        Document::new(vec![
            Node::Element(Element::paragraph(vec![Node::text("before")])),
            Node::Element(table_from_rows(&grid(rows, columns))),
        ])
    }

    fn cell_text(doc: &Document, path: &[usize]) -> String {
        doc.get(path).unwrap().text_content()
    }

    #[test]
    fn test_remove_row_range_keeps_cell_counts() {
        let mut doc = doc_with_table(4, 3);
        let result = doc.remove_table_rows(&[1], 1..=2).unwrap();

        assert_eq!(result, TableRemoval::Shrunk);
        assert_eq!(doc.table_dimensions(&[1]).unwrap(), (2, 3));
        assert_eq!(cell_text(&doc, &[1, 0, 0]), "r0c0");
        assert_eq!(cell_text(&doc, &[1, 1, 2]), "r3c2");
    }

    #[test]
    fn test_removing_all_rows_removes_table() {
        let mut doc = doc_with_table(2, 2);
        assert_eq!(
            doc.remove_table_rows(&[1], 0..=1).unwrap(),
            TableRemoval::TableRemoved
        );
        assert_eq!(doc.children().len(), 1);
    }

    #[test]
    fn test_remove_rows_out_of_range() {
        let mut doc = doc_with_table(2, 2);
        assert!(doc.remove_table_rows(&[1], 1..=5).is_err());
        assert!(matches!(
            doc.remove_table_rows(&[0], 0..=0),
            Err(TransformError::UnexpectedKind { expected: "table", .. })
        ));
    }

    #[test]
    fn test_insert_row_and_column_stay_rectangular() {
        let mut doc = doc_with_table(2, 2);
        let row_path = doc.insert_table_row(&[1], 1).unwrap();
        assert_eq!(row_path, vec![1, 1]);
        assert_eq!(doc.table_dimensions(&[1]).unwrap(), (3, 2));
        assert_eq!(cell_text(&doc, &[1, 1, 0]), "");

        doc.insert_table_column(&[1], 0).unwrap();
        assert_eq!(doc.table_dimensions(&[1]).unwrap(), (3, 3));
        assert_eq!(cell_text(&doc, &[1, 0, 1]), "r0c0");
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_remove_column() {
        let mut doc = doc_with_table(2, 2);
        assert_eq!(doc.remove_table_column(&[1], 0).unwrap(), TableRemoval::Shrunk);
        assert_eq!(doc.table_dimensions(&[1]).unwrap(), (2, 1));
        assert_eq!(cell_text(&doc, &[1, 1, 0]), "r1c1");

        assert_eq!(
            doc.remove_table_column(&[1], 0).unwrap(),
            TableRemoval::TableRemoved
        );
        assert_eq!(doc.children().len(), 1);
    }

    #[test]
    fn test_split_table() {
        let mut doc = doc_with_table(4, 2);
        let original_id = doc.get(&[1]).unwrap().id().to_string();

        let new_path = doc.split_table(&[1], 3).unwrap();
        assert_eq!(new_path, vec![2]);
        assert_eq!(doc.table_dimensions(&[1]).unwrap(), (3, 2));
        assert_eq!(doc.table_dimensions(&[2]).unwrap(), (1, 2));
        assert_eq!(doc.get(&[1]).unwrap().id(), original_id);
        assert_ne!(doc.get(&[2]).unwrap().id(), original_id);
        assert_eq!(cell_text(&doc, &[2, 0, 1]), "r3c1");

        assert!(doc.split_table(&[1], 0).is_err());
    }

    #[test]
    fn test_ragged_table_is_reported() {
        let mut table = table_from_rows(&grid(2, 2));
        if let Node::Element(row) = &mut table.children[1] {
            row.children.pop();
        }
        let doc = Document::new(vec![Node::Element(table)]);
        assert!(matches!(
            doc.table_dimensions(&[0]),
            Err(TransformError::InvalidTable { .. })
        ));
    }

    #[test]
    fn test_table_from_ragged_rows_pads_cells() {
        let table = table_from_rows(&[vec!["a".into()], vec!["b".into(), "c".into()]]);
        let doc = Document::new(vec![Node::Element(table)]);
        assert_eq!(doc.table_dimensions(&[0]).unwrap(), (2, 2));
    }
}
