// Parser for the text tables printed by systemctl

use crate::error::CheckError;

/// One table row as ordered `column name -> value` pairs
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    /// Value of a column, `None` if the table has no such column
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Like [`Row::get`] but failing with [`CheckError::MissingColumn`]
    pub fn require(&self, column: &str) -> Result<&str, CheckError> {
        self.get(column)
            .ok_or_else(|| CheckError::MissingColumn(column.to_string()))
    }
}

/// A table as printed by `systemctl list-units` or `systemctl list-timers`.
///
/// Column boundaries are derived from the header row: every header word
/// together with the spaces following it forms one column. The body ends at
/// the first blank line, everything below is the footer.
#[derive(Debug, Clone)]
pub struct Table {
    header_row: String,
    body_rows: Vec<String>,
    column_lengths: Vec<usize>,
    columns: Vec<String>,
}

impl Table {
    pub fn new(stdout: &str) -> Self {
        let mut lines = stdout.lines();
        let header_row = lines.next().unwrap_or_default().to_lowercase();
        let column_lengths = detect_lengths(&header_row);
        let columns = split_row(&header_row, &column_lengths)
            .into_iter()
            .enumerate()
            .map(|(index, column)| {
                if column.is_empty() {
                    format!("column_{}", index)
                } else {
                    column
                }
            })
            .collect();
        let body_rows = lines
            .take_while(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            header_row,
            body_rows,
            column_lengths,
            columns,
        }
    }

    /// The lowercased header row
    pub fn header_row(&self) -> &str {
        &self.header_row
    }

    /// Resolved column names, empty header cells named `column_<index>`
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Widths of all columns except the last one, which runs to the end of line
    pub fn column_lengths(&self) -> &[usize] {
        &self.column_lengths
    }

    /// Number of body rows, the header is not counted
    pub fn row_count(&self) -> usize {
        self.body_rows.len()
    }

    /// Fail if one of the expected columns is missing from the header, which
    /// means the output layout of the host tool has changed
    pub fn check_header<S: AsRef<str>>(&self, expected: &[S]) -> Result<(), CheckError> {
        for column in expected {
            let column = column.as_ref();
            let wanted = column.to_lowercase();
            if !self.columns.iter().any(|name| *name == wanted) {
                return Err(CheckError::MissingColumn(column.to_string()));
            }
        }
        Ok(())
    }

    /// The body row at `index` (starting at 0)
    pub fn get_row(&self, index: usize) -> Result<Row, CheckError> {
        let line = self
            .body_rows
            .get(index)
            .ok_or(CheckError::RowOutOfBounds {
                index,
                rows: self.body_rows.len(),
            })?;
        let values = split_row(line, &self.column_lengths);
        let cells = self
            .columns
            .iter()
            .cloned()
            .zip(values)
            .collect();
        Ok(Row { cells })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        (0..self.row_count()).filter_map(move |index| self.get_row(index).ok())
    }
}

/// Column widths in characters, derived from the header row.
///
/// Leading whitespace forms a column of its own (the state marker column of
/// `systemctl list-units`). A column boundary is any switch from whitespace
/// back to a non-space character, whatever the gap width.
fn detect_lengths(header_row: &str) -> Vec<usize> {
    let mut lengths = Vec::new();
    let prefix = header_row.chars().take_while(|c| *c == ' ').count();
    if prefix > 0 {
        lengths.push(prefix);
    }

    let mut word = 0;
    let mut space = 0;
    for c in header_row.chars().skip(prefix) {
        if word > 0 && space >= 1 && c != ' ' {
            lengths.push(word + space);
            word = 0;
            space = 0;
        }
        if c == ' ' {
            space += 1;
        } else {
            word += 1;
        }
    }
    lengths
}

/// Cut a line into trimmed cells; the last cell takes the rest of the line
fn split_row(line: &str, column_lengths: &[usize]) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let slice = |left: usize, right: usize| -> String {
        let left = left.min(chars.len());
        let right = right.min(chars.len());
        chars[left..right].iter().collect::<String>().trim().to_string()
    };

    let mut cells = Vec::with_capacity(column_lengths.len() + 1);
    let mut right = 0;
    for length in column_lengths {
        let left = right;
        right += length;
        cells.push(slice(left, right));
    }
    cells.push(slice(right, chars.len()));
    cells
}
