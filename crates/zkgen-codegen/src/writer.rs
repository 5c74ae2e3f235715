//! Indentation-aware line buffer.

const INDENT: &str = "    ";

/// Accumulates source lines at the current indentation level.
#[derive(Debug, Default)]
pub struct CodeWriter {
    lines: Vec<String>,
    depth: usize,
}

impl CodeWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line at the current indentation.
    pub fn line<S: AsRef<str>>(&mut self, text: S) -> &mut Self {
        let text = text.as_ref();
        if text.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("{}{}", INDENT.repeat(self.depth), text));
        }
        self
    }

    /// Append an empty line.
    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    /// Append `open`, the lines written by `body` one level deeper, then `close`.
    pub fn block<F>(&mut self, open: &str, close: &str, body: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        self.line(open);
        self.indented(body);
        self.line(close)
    }

    /// Write the lines of `body` one level deeper.
    pub fn indented<F>(&mut self, body: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        self.depth += 1;
        body(self);
        self.depth -= 1;
        self
    }

    /// Finish and return the lines.
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_blocks() {
        let mut w = CodeWriter::new();
        w.block("fn main() {", "}", |w| {
            w.block("if ok {", "}", |w| {
                w.line("run();");
            });
            w.blank();
            w.line("done();");
        });

        assert_eq!(
            w.into_lines(),
            vec![
                "fn main() {",
                "    if ok {",
                "        run();",
                "    }",
                "",
                "    done();",
                "}",
            ]
        );
    }

    #[test]
    fn test_indented_continuation() {
        let mut w = CodeWriter::new();
        w.line("let x = a");
        w.indented(|w| {
            w.line(".b()");
        });
        assert_eq!(w.into_lines(), vec!["let x = a", "    .b()"]);
    }

    #[test]
    fn test_empty_line_has_no_indent() {
        let mut w = CodeWriter::new();
        w.block("{", "}", |w| {
            w.line("");
        });
        assert_eq!(w.into_lines(), vec!["{", "", "}"]);
    }
}
