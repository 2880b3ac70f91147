use super::{line_col, line_text, Diagnostic, Severity};

pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn bold(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1m{s}\x1b[0m") } else { s.to_string() }
    }

    fn bold_red(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1;31m{s}\x1b[0m") } else { s.to_string() }
    }

    fn cyan(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[36m{s}\x1b[0m") } else { s.to_string() }
    }

    fn dim(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[2m{s}\x1b[0m") } else { s.to_string() }
    }

    pub fn render(&self, d: &Diagnostic) -> String {
        let mut out = String::new();

        let severity_label = match d.severity {
            Severity::Error => self.bold_red("error"),
            Severity::Warning => self.bold(&self.cyan("warning")),
        };
        match d.code {
            Some(code) => {
                out.push_str(&format!("{}[{}]: {}\n", severity_label, code, self.bold(&d.message)))
            }
            None => out.push_str(&format!("{}: {}\n", severity_label, self.bold(&d.message))),
        }

        // Snippet for the first labeled span, when the source is attached.
        if let (Some(label), Some(source)) = (d.labels.first(), &d.source) {
            let (line, col) = line_col(source, label.span.start);
            let text = line_text(source, line);

            out.push_str(&format!("  {} {}:{}\n", self.cyan("-->"), line, col));

            let gutter = line.to_string().len();
            let pipe = self.cyan("|");
            let pad = " ".repeat(gutter);

            out.push_str(&format!("{pad} {pipe}\n"));
            let line_num = self.cyan(&format!("{line:>gutter$}"));
            out.push_str(&format!("{line_num} {pipe} {text}\n"));

            let carets = self.bold_red(&"^".repeat(label.span.len().max(1)));
            let indent = " ".repeat(col.saturating_sub(1));
            if label.message.is_empty() {
                out.push_str(&format!("{pad} {pipe} {indent}{carets}\n"));
            } else {
                out.push_str(&format!(
                    "{pad} {pipe} {indent}{carets} {}\n",
                    self.bold_red(&label.message)
                ));
            }
            out.push_str(&format!("{pad} {pipe}\n"));
        }

        for note in &d.notes {
            out.push_str(&format!("  {} note: {}\n", self.dim("="), note));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_diag(source: &str, start: usize, end: usize) -> Diagnostic {
        Diagnostic::error("unrecognized command sequence")
            .with_code("WS-P002")
            .with_span(start..end, "here")
            .with_source(source.to_string())
            .with_note("in this file")
    }

    #[test]
    fn render_contains_code_and_message() {
        let r = AnsiRenderer { use_color: false };
        let out = r.render(&make_diag("+[x]", 2, 3));
        assert!(out.contains("error[WS-P002]:"), "missing header in:\n{out}");
        assert!(out.contains("unrecognized command sequence"));
    }

    #[test]
    fn render_contains_location_and_carets() {
        let r = AnsiRenderer { use_color: false };
        let out = r.render(&make_diag("+[x]", 2, 3));
        assert!(out.contains("--> 1:3"), "missing location in:\n{out}");
        assert!(out.contains('^'), "missing caret in:\n{out}");
        assert!(out.contains("+[x]"), "missing source line in:\n{out}");
    }

    #[test]
    fn render_without_source_skips_the_snippet() {
        let r = AnsiRenderer { use_color: false };
        let out = r.render(&Diagnostic::error("pop on empty operand stack").with_code("WS-R001"));
        assert!(out.contains("error[WS-R001]: pop on empty operand stack"));
        assert!(!out.contains("-->"));
    }

    #[test]
    fn color_toggle_controls_escape_codes() {
        let d = make_diag("+[x]", 2, 3);
        let plain = AnsiRenderer { use_color: false }.render(&d);
        let colored = AnsiRenderer { use_color: true }.render(&d);
        assert!(!plain.contains("\x1b["));
        assert!(colored.contains("\x1b["));
    }

    #[test]
    fn note_lines_render() {
        let r = AnsiRenderer { use_color: false };
        let out = r.render(&make_diag("+[x]", 2, 3));
        assert!(out.contains("= note: in this file"));
    }
}
