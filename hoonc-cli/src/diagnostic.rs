use std::io;
use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use hoonc_core::{CoreError, Span};

/// A compiler error positioned in its source file.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub stage: &'static str,
    pub message: String,
    pub span: Span,
    pub help: Option<String>,
}

impl Diagnostic {
    /// `None` for errors that have no source location (I/O, options).
    pub fn from_error(err: &CoreError) -> Option<Self> {
        let span = err.span()?;
        let help = match err {
            CoreError::UnknownRune { .. } => {
                Some("this rune has no grammar entry in hoonc".to_string())
            }
            CoreError::ReduceError { .. } => {
                Some("only runes with a known rewrite can be compiled".to_string())
            }
            _ => None,
        };
        Some(Diagnostic {
            stage: err.stage(),
            message: err.message(),
            span,
            help,
        })
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) -> io::Result<()> {
        self.report(filename, source, true)
            .eprint((filename, Source::from(source)))
    }

    /// One-line `file:line:column` form, used when the excerpt cannot be
    /// written.
    pub fn headline(&self, filename: &str, source: &str) -> String {
        let position = self.span.position(source);
        format!("{filename}:{position}: {} error: {}", self.stage, self.message)
    }

    fn report<'a>(
        &self,
        filename: &'a str,
        source: &str,
        color: bool,
    ) -> Report<'a, (&'a str, Range<usize>)> {
        let range = char_range(source, self.span);
        let mut report = Report::build(ReportKind::Error, filename, range.start)
            .with_config(Config::default().with_color(color))
            .with_message(format!("{} error", self.stage))
            .with_label(
                Label::new((filename, range))
                    .with_message(&self.message)
                    .with_color(Color::Red),
            );
        if let Some(help) = &self.help {
            report = report.with_help(help);
        }
        report.finish()
    }
}

/// ariadne counts characters, spans count bytes.
fn char_range(source: &str, span: Span) -> Range<usize> {
    let to_chars = |byte: usize| {
        let byte = byte.min(source.len());
        source
            .char_indices()
            .take_while(|(index, _)| *index < byte)
            .count()
    };
    let start = to_chars(span.start);
    let end = to_chars(span.end).max(start + 1);
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_positioned_errors() {
        let err = hoonc_core::compile("=/  n  1\n  ?:(=(n 1) n !!)").unwrap_err();
        let diag = Diagnostic::from_error(&err).expect("positioned");
        assert_eq!(diag.stage, "parse");
        assert_eq!(diag.message, "unknown rune !!");
        assert_eq!(diag.span, Span::new(23, 25));
        assert!(diag.help.is_some());
    }

    #[test]
    fn skips_errors_without_location() {
        let err = CoreError::UnsupportedFormat("wasm".to_string());
        assert!(Diagnostic::from_error(&err).is_none());
    }

    #[test]
    fn renders_source_excerpt() {
        let source = "(add a 1)";
        let err = hoonc_core::compile(source).unwrap_err();
        let diag = Diagnostic::from_error(&err).expect("positioned");
        let mut buffer = Vec::new();
        diag.report("sum.hoon", source, false)
            .write(("sum.hoon", Source::from(source)), &mut buffer)
            .expect("render");
        let text = String::from_utf8_lossy(&buffer);
        assert!(text.contains("codegen error"), "{text}");
        assert!(text.contains("unbound face a"), "{text}");
        assert!(text.contains("sum.hoon"), "{text}");
    }

    #[test]
    fn headline_carries_line_and_column() {
        let source = "=/  n  1\n  ?:(=(n 1) n !!)";
        let err = hoonc_core::compile(source).unwrap_err();
        let diag = Diagnostic::from_error(&err).expect("positioned");
        assert_eq!(
            diag.headline("bad.hoon", source),
            "bad.hoon:2:15: parse error: unknown rune !!"
        );
    }

    #[test]
    fn converts_byte_offsets_to_characters() {
        let source = "é=1";
        assert_eq!(char_range(source, Span::new(2, 3)), 1..2);
        assert_eq!(char_range(source, Span::new(4, 4)), 3..4);
    }
}
