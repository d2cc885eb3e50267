use std::fmt::Write;

use tracing::debug;

use crate::Diagnostic;

/// Renders diagnostics the way `dcc` prints them: a header, at most `limit`
/// diagnostic lines, and a count of what was left out.
pub fn render(diagnostics: &[Diagnostic], limit: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Encountered {} errors while parsing dclass file...", diagnostics.len());
    for diagnostic in diagnostics.iter().take(limit) {
        let _ = writeln!(out, " - {}", diagnostic);
    }
    if diagnostics.len() > limit {
        let extra = diagnostics.len() - limit;
        debug!(extra, "truncated diagnostic report");
        let _ = writeln!(out, "... an extra {} errors were not printed.", extra);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_truncates() {
        let diagnostics: Vec<_> = (1..=3)
            .map(|line| Diagnostic::parse(format!("problem {}", line), line))
            .collect();

        assert_eq!(
            render(&diagnostics, 2),
            "Encountered 3 errors while parsing dclass file...\n\
             \x20- parse error(line: 1): problem 1\n\
             \x20- parse error(line: 2): problem 2\n\
             ... an extra 1 errors were not printed.\n"
        );
        assert!(!render(&diagnostics, 10).contains("extra"));
    }
}
