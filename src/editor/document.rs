// SPDX-License-Identifier: MIT
//! The mutable text buffer behind the editing surface.
//!
//! The daemon holds the authoritative copy; the browser widget mirrors it.
//! Positions are 1-based (line, column) in characters, matching what the
//! editing widget reports.

use serde::{Deserialize, Serialize};

/// A cursor position on the editing surface. Line and column are 1-based;
/// column counts characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Default for Position {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

/// Mutable text buffer plus language tag and cursor. Lives for the session
/// only — there is no persistence.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub text: String,
    pub language: String,
    pub cursor: Position,
}

impl Document {
    /// A fresh document populated with a language's starter template.
    pub fn new(language: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            text: template.into(),
            language: language.into(),
            cursor: Position::default(),
        }
    }

    pub fn set_text(&mut self, text: String) {
        self.text = text;
    }

    pub fn set_cursor(&mut self, cursor: Position) {
        self.cursor = cursor;
    }

    /// Byte offset of `pos`, clamped to the document. A line past the end
    /// resolves to the end of the text; a column past a line's end resolves
    /// to the end of that line.
    fn offset_at(&self, pos: Position) -> usize {
        let mut line_start = 0;
        let mut remaining_lines = pos.line.saturating_sub(1);
        if remaining_lines > 0 {
            let mut found = false;
            for (i, ch) in self.text.char_indices() {
                if ch == '\n' {
                    remaining_lines -= 1;
                    if remaining_lines == 0 {
                        line_start = i + 1;
                        found = true;
                        break;
                    }
                }
            }
            if !found {
                return self.text.len();
            }
        }

        let mut offset = line_start;
        let mut columns = pos.column.saturating_sub(1);
        for ch in self.text[line_start..].chars() {
            if columns == 0 || ch == '\n' {
                break;
            }
            offset += ch.len_utf8();
            columns -= 1;
        }
        offset
    }

    /// Insert `"\n" + snippet` at the current cursor as one atomic edit.
    ///
    /// The leading newline is always added, even when the cursor already sits
    /// at a line start. The cursor (standing in for any markers anchored at
    /// or after the edit) is moved past the inserted text so later edits stay
    /// consistent. Returns the republished full text, which callers treat as
    /// the new authoritative document state.
    pub fn insert_at_cursor(&mut self, snippet: &str) -> String {
        let inserted = format!("\n{snippet}");
        let at = self.offset_at(self.cursor);
        self.text.insert_str(at, &inserted);

        let newlines = inserted.matches('\n').count() as u32;
        let tail_len = inserted
            .rsplit('\n')
            .next()
            .map(|tail| tail.chars().count() as u32)
            .unwrap_or(0);
        self.cursor = Position {
            line: self.cursor.line + newlines,
            column: tail_len + 1,
        };

        self.text.clone()
    }

    pub fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        let mut d = Document::new("javascript", "");
        d.set_text(text.to_string());
        d
    }

    #[test]
    fn insertion_is_positional_and_additive() {
        let mut d = doc("aaa\nbbb\nccc");
        d.set_cursor(Position { line: 2, column: 1 });
        let text = d.insert_at_cursor("X");
        assert_eq!(text, "aaa\n\nXbbb\nccc");
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines, vec!["aaa", "", "Xbbb", "ccc"]);
        assert_eq!(d.line_count(), 4);
    }

    #[test]
    fn insertion_mid_line_keeps_prefix() {
        let mut d = doc("hello world");
        d.set_cursor(Position { line: 1, column: 6 });
        assert_eq!(d.insert_at_cursor("HI"), "hello\nHI world");
    }

    #[test]
    fn cursor_lands_after_inserted_text() {
        let mut d = doc("aaa");
        d.set_cursor(Position { line: 1, column: 4 });
        d.insert_at_cursor("xy");
        assert_eq!(d.cursor, Position { line: 2, column: 3 });
        // A second insertion continues from there.
        assert_eq!(d.insert_at_cursor("z"), "aaa\nxy\nz");
    }

    #[test]
    fn multiline_snippet_moves_cursor_to_its_last_line() {
        let mut d = doc("aaa");
        d.set_cursor(Position { line: 1, column: 4 });
        d.insert_at_cursor("one\ntwo");
        assert_eq!(d.cursor, Position { line: 3, column: 4 });
    }

    #[test]
    fn positions_past_the_end_clamp() {
        let mut d = doc("ab");
        d.set_cursor(Position { line: 9, column: 9 });
        assert_eq!(d.insert_at_cursor("x"), "ab\nx");

        let mut d = doc("ab\ncd");
        d.set_cursor(Position { line: 1, column: 99 });
        assert_eq!(d.insert_at_cursor("x"), "ab\nx\ncd");
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        let mut d = doc("héllo\nwörld");
        d.set_cursor(Position { line: 2, column: 3 });
        assert_eq!(d.insert_at_cursor("x"), "héllo\nwö\nxrld");
    }

    #[test]
    fn empty_document_insertion() {
        let mut d = doc("");
        d.set_cursor(Position::default());
        assert_eq!(d.insert_at_cursor("x"), "\nx");
    }
}
