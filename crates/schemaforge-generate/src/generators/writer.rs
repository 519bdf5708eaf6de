/// Line buffer with two-space indentation for rendering source text.
#[derive(Debug, Default)]
pub struct CodeWriter {
    lines: Vec<String>,
    depth: usize,
}

const INDENT: &str = "  ";

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push one line at the current depth. Empty text pushes a blank line.
    pub fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        let text = text.as_ref();
        if text.trim().is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("{}{text}", INDENT.repeat(self.depth)));
        }
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    /// `header {` and indent.
    pub fn open(&mut self, header: impl AsRef<str>) -> &mut Self {
        self.line(format!("{} {{", header.as_ref()));
        self.depth += 1;
        self
    }

    /// Dedent and close with `}` followed by `suffix`.
    pub fn close(&mut self, suffix: &str) -> &mut Self {
        self.depth = self.depth.saturating_sub(1);
        self.line(format!("}}{suffix}"));
        self
    }

    pub fn indent(&mut self) -> &mut Self {
        self.depth += 1;
        self
    }

    pub fn dedent(&mut self) -> &mut Self {
        self.depth = self.depth.saturating_sub(1);
        self
    }

    /// Drop a trailing blank line, if any.
    pub fn trim_blank(&mut self) -> &mut Self {
        while self.lines.last().is_some_and(|line| line.is_empty()) {
            self.lines.pop();
        }
        self
    }

    pub fn finish(mut self) -> String {
        self.trim_blank();
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

/// Single-quoted string literal for generated code.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// `import { A, B } from 'source';`
pub fn import_line(names: &[&str], source: &str) -> String {
    format!("import {{ {} }} from {};", names.join(", "), quote(source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indents_blocks_and_ends_with_newline() {
        let mut writer = CodeWriter::new();
        writer.open("export class Foo");
        writer.line("bar: string;");
        writer.blank();
        writer.close("");
        writer.blank();
        assert_eq!(writer.finish(), "export class Foo {\n  bar: string;\n\n}\n");
    }

    #[test]
    fn quotes_single_quoted_literals() {
        assert_eq!(quote("it's"), "'it\\'s'");
        assert_eq!(import_line(&["A", "B"], "./a"), "import { A, B } from './a';");
    }
}
