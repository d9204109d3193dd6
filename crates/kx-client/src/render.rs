//! Build log line classification.
//!
//! A pure function of line content: the viewer styles error lines,
//! command headers and step markers differently from plain output. The
//! rules are checked in order and the first match wins.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Build failure output (`❌`, `FAILED`, `error:` in any case).
    Error,
    /// A `$ command` header written before a process was spawned.
    Command,
    /// A `--- step ---` marker between pipeline stages.
    Step,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub kind: LineKind,
    pub text: String,
}

pub fn classify_line(line: &str) -> LineKind {
    if line.contains('❌') || line.contains("FAILED") || line.to_lowercase().contains("error:") {
        LineKind::Error
    } else if line.contains('$') {
        LineKind::Command
    } else if line.contains("---") {
        LineKind::Step
    } else {
        LineKind::Plain
    }
}

/// Split a log snapshot into classified lines.
pub fn render_log(text: &str) -> Vec<LogLine> {
    text.lines()
        .map(|line| LogLine {
            kind: classify_line(line),
            text: line.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_markers() {
        assert_eq!(classify_line("❌ Command failed: npm run build"), LineKind::Error);
        assert_eq!(classify_line("Build FAILED after 32s"), LineKind::Error);
        assert_eq!(classify_line("npm ERROR: peer dep conflict"), LineKind::Error);
        assert_eq!(classify_line("Error: missing module"), LineKind::Error);
        assert_eq!(classify_line("error: missing module"), LineKind::Error);
    }

    #[test]
    fn error_wins_over_later_rules() {
        // Contains both `$` and `error:`; the error rule is checked first.
        assert_eq!(classify_line("[12:01:05] $ npm run build error: exit 1"), LineKind::Error);
        assert_eq!(classify_line("--- Step FAILED ---"), LineKind::Error);
    }

    #[test]
    fn command_and_step_markers() {
        assert_eq!(
            classify_line("[12:00:01] $ npm install --legacy-peer-deps"),
            LineKind::Command
        );
        assert_eq!(
            classify_line("[12:00:00] --- Step 1/4: Unzipping files... ---"),
            LineKind::Step
        );
        assert_eq!(classify_line("added 1204 packages in 42s"), LineKind::Plain);
    }

    #[test]
    fn classification_is_pure() {
        // Same content, same class, no matter how often the snapshot is re-rendered.
        let line = "ERROR: build halted";
        for _ in 0..3 {
            assert_eq!(classify_line(line), LineKind::Error);
        }
    }

    #[test]
    fn renders_whole_snapshot() {
        let snapshot = "\
[12:00:00] --- Step 1/4: Unzipping files... ---
[12:00:01] $ npm install --legacy-peer-deps
added 1204 packages
❌ Command failed: npm run build";
        let lines = render_log(snapshot);
        let kinds: Vec<LineKind> = lines.iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![LineKind::Step, LineKind::Command, LineKind::Plain, LineKind::Error]
        );
    }
}
