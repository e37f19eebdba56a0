use crate::{Code, Position, SourceLocation};
use once_cell::unsync::OnceCell;
use std::fmt::{Display, Formatter};

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl<'c> From<&'c str> for Code<'c> {
    fn from(value: &'c str) -> Self {
        Code::new(value)
    }
}

impl<'c> Code<'c> {
    pub fn new(value: &'c str) -> Self {
        Self {
            value,
            line_breaks: OnceCell::new(),
        }
    }

    pub fn obtain_line_breaks(&self) -> &Vec<usize> {
        self.line_breaks.get_or_init(|| {
            self.value
                .bytes()
                .enumerate()
                .filter_map(|(index, b)| if b == b'\n' { Some(index) } else { None })
                .collect()
        })
    }

    pub fn obtain_position(&self, pointer: usize) -> Position {
        let line_breaks = self.obtain_line_breaks();
        let index = match line_breaks.binary_search(&pointer) {
            Ok(index) | Err(index) => index,
        };

        if index == 0 {
            Position::new(1, pointer + 1)
        } else {
            let break_point = line_breaks[index - 1] + 1;
            Position::new(index + 1, pointer - break_point + 1)
        }
    }

    /// Compute the span of the slice `start..end` of the input.
    pub fn obtain_location(&self, start: usize, end: usize) -> SourceLocation {
        let start_position = self.obtain_position(start);
        let end_position = self.obtain_position(end);
        SourceLocation {
            start_offset: start,
            end_offset: end,
            start_line: start_position.line,
            end_line: end_position.line,
            start_column: start_position.column,
            end_column: end_position.column,
        }
    }

    /// A one line extract of the source around `pointer` with a caret marker beneath
    /// the offending column, appended to error messages.
    pub fn obtain_extract(&self, pointer: usize) -> String {
        let pointer = pointer.min(self.value.len());
        let line_start = self.value[..pointer]
            .rfind('\n')
            .map_or(0, |index| index + 1);
        let line_end = self.value[pointer..]
            .find('\n')
            .map_or(self.value.len(), |index| pointer + index);
        let line = &self.value[line_start..line_end];
        let caret_offset = pointer - line_start;
        format!("{}\n{}^", line, " ".repeat(caret_offset))
    }
}

impl SourceLocation {
    /// Merge two endpoint locations into the location of a reduced non-terminal:
    /// start fields from the first endpoint, end fields from the last.
    ///
    /// An epsilon reduction carries no location; the non-null endpoint is propagated
    /// so the next non-empty reduction re-establishes the span.
    pub fn merge(first: Option<SourceLocation>, last: Option<SourceLocation>) -> Option<SourceLocation> {
        match (first, last) {
            (Some(first), Some(last)) => Some(SourceLocation {
                start_offset: first.start_offset,
                end_offset: last.end_offset,
                start_line: first.start_line,
                end_line: last.end_line,
                start_column: first.start_column,
                end_column: last.end_column,
            }),
            (Some(single), None) | (None, Some(single)) => Some(single),
            (None, None) => None,
        }
    }
}
