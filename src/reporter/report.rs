use std::fmt::Write as _;

use chrono::{DateTime, Local};

use crate::reporter::{TestSession, TestStep};

/// Markdown report for a finished session.
pub fn render(session: &TestSession, success: bool, summary: &str, end_time: DateTime<Local>) -> String {
    let status = if success { "PASSED" } else { "FAILED" };
    let duration = (end_time - session.start_time)
        .to_std()
        .unwrap_or_default()
        .as_secs_f64();

    let mut out = String::new();
    let _ = writeln!(out, "# Test Report: {}", session.name);
    let _ = writeln!(out);
    let _ = writeln!(out, "**Status:** {status}  ");
    let _ = writeln!(out, "**Started:** {}  ", session.start_time.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "**Finished:** {}  ", end_time.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "**Duration:** {duration:.1}s");
    let _ = writeln!(out);
    let _ = writeln!(out, "## Summary");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", if summary.trim().is_empty() { "(none)" } else { summary.trim() });
    let _ = writeln!(out);
    let _ = writeln!(out, "## Steps");
    let _ = writeln!(out);
    let _ = writeln!(out, "| # | Time | Action | Result |");
    let _ = writeln!(out, "|---|------|--------|--------|");
    for (i, step) in session.steps.iter().enumerate() {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} |",
            i + 1,
            step.timestamp.format("%H:%M:%S%.3f"),
            cell(&step.action),
            result_cell(step),
        );
    }
    out
}

fn result_cell(step: &TestStep) -> String {
    if step.is_screenshot {
        format!("![{}]({})", cell(&step.action), step.result)
    } else {
        cell(&step.result)
    }
}

/// Keeps a value on one table row.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(steps: Vec<TestStep>) -> TestSession {
        TestSession {
            name: "Login flow".into(),
            start_time: Local::now(),
            steps,
            artifact_dir: None,
        }
    }

    #[test]
    fn empty_session_has_header_only_table() {
        let s = session(Vec::new());
        let md = render(&s, true, "ok", s.start_time);
        assert!(md.contains("**Status:** PASSED"));
        assert!(md.trim_end().ends_with("|---|------|--------|--------|"));
    }

    #[test]
    fn pipes_and_newlines_stay_in_their_cell() {
        let s = session(vec![TestStep::new("type_text Form/Name", "FAILED: a | b\nc")]);
        let md = render(&s, false, "", s.start_time);
        assert!(md.contains("**Status:** FAILED"));
        assert!(md.contains("| type_text Form/Name | FAILED: a \\| b c |"));
        assert!(md.contains("(none)"));
    }
}
