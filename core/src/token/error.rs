use serde::Serialize;
use std::fmt;

/// A position inside a source file.
///
/// `line` and `column` are 1-based and are what editors exchange with us.
/// `offset` is the character index into the decoded source; it is carried by
/// every position the lexer produces, but positions built from editor
/// coordinates will not have one. Ordering and equality therefore use only
/// `line`/`column`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FilePos {
    pub line: u32,
    pub column: u32,
    pub offset: Option<usize>,
}

impl FilePos {
    pub fn new(line: u32, column: u32) -> Self {
        Self {
            line,
            column,
            offset: None,
        }
    }

    pub fn with_offset(line: u32, column: u32, offset: usize) -> Self {
        Self {
            line,
            column,
            offset: Some(offset),
        }
    }
}

impl PartialEq for FilePos {
    fn eq(&self, other: &Self) -> bool {
        self.line == other.line && self.column == other.column
    }
}

impl Eq for FilePos {}

impl PartialOrd for FilePos {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FilePos {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.line, self.column).cmp(&(other.line, other.column))
    }
}

impl std::hash::Hash for FilePos {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.line.hash(state);
        self.column.hash(state);
    }
}

impl fmt::Display for FilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A source range, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Range {
    pub start: FilePos,
    pub end: FilePos,
}

impl Range {
    pub fn new(start: FilePos, end: FilePos) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, pos: FilePos) -> bool {
        self.start <= pos && pos <= self.end
    }
}

/// Fatal lexing failure. Anything recoverable (unterminated strings,
/// unbalanced braces) is reported as data on the analysis result instead;
/// this error only fires when no token pattern applies at the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub pos: Option<FilePos>,
}

impl LexError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            pos: None,
        }
    }

    pub fn at(message: impl Into<String>, pos: FilePos) -> Self {
        Self {
            message: message.into(),
            pos: Some(pos),
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pos {
            Some(pos) => write!(f, "lex error at {}: {}", pos, self.message),
            None => write!(f, "lex error: {}", self.message),
        }
    }
}

impl std::error::Error for LexError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pos_ordering_ignores_offset() {
        let a = FilePos::with_offset(2, 5, 40);
        let b = FilePos::new(2, 5);
        assert_eq!(a, b);
        assert!(FilePos::new(1, 99) < FilePos::new(2, 1));
        assert!(FilePos::new(3, 4) < FilePos::new(3, 5));
    }

    #[test]
    fn test_range_contains_is_inclusive() {
        let range = Range::new(FilePos::new(2, 3), FilePos::new(4, 1));
        assert!(range.contains(FilePos::new(2, 3)));
        assert!(range.contains(FilePos::new(3, 77)));
        assert!(range.contains(FilePos::new(4, 1)));
        assert!(!range.contains(FilePos::new(4, 2)));
        assert!(!range.contains(FilePos::new(2, 2)));
    }

    #[test]
    fn test_error_display() {
        let err = LexError::at("no token pattern matched", FilePos::new(7, 12));
        assert_eq!(
            err.to_string(),
            "lex error at 7:12: no token pattern matched"
        );
    }
}
