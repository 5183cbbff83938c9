//! Minimal line tables for CLI output.

use console::style;

/// Column alignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// A simple table with a bold header and a rule under it.
///
/// ```text
/// Day        Breakfast      Lunch          Cost
/// ─────────────────────────────────────────────
/// Monday     Oatmeal        Lentil soup     620
/// ```
pub struct Table {
    headers: Vec<String>,
    align: Vec<Align>,
    rows: Vec<Vec<String>>,
    widths: Vec<usize>,
}

impl Table {
    #[must_use]
    pub fn new(headers: &[&str]) -> Self {
        let headers: Vec<String> = headers.iter().map(|&s| s.to_string()).collect();
        let widths = headers.iter().map(|h| h.chars().count()).collect();

        Self {
            align: vec![Align::Left; headers.len()],
            headers,
            rows: Vec::new(),
            widths,
        }
    }

    /// Set the alignment of one column.
    #[must_use]
    pub fn align(mut self, column: usize, align: Align) -> Self {
        if let Some(slot) = self.align.get_mut(column) {
            *slot = align;
        }
        self
    }

    /// Add a row. Cells beyond the header count are dropped.
    pub fn add_row(&mut self, cells: &[String]) {
        let row: Vec<String> = cells.iter().take(self.headers.len()).cloned().collect();

        for (width, cell) in self.widths.iter_mut().zip(&row) {
            *width = (*width).max(cell.chars().count());
        }

        self.rows.push(row);
    }

    pub fn print(&self) {
        println!("{}", style(self.format_row(&self.headers)).bold());
        println!("{}", "─".repeat(self.total_width()));
        for row in &self.rows {
            println!("{}", self.format_row(row));
        }
    }

    fn total_width(&self) -> usize {
        self.widths.iter().sum::<usize>() + self.widths.len().saturating_sub(1) * 2
    }

    fn format_row(&self, cells: &[String]) -> String {
        cells
            .iter()
            .zip(self.widths.iter().zip(&self.align))
            .map(|(cell, (&width, align))| {
                let pad = " ".repeat(width.saturating_sub(cell.chars().count()));
                match align {
                    Align::Left => format!("{cell}{pad}"),
                    Align::Right => format!("{pad}{cell}"),
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    }
}
