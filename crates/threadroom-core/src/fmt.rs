//! Rendering of diagnosis results for the terminal.
//!
//! Text output is meant for humans; JSON output mirrors the serialized
//! [`DiagnosisResult`] and always carries `findings` and `suggestions`
//! arrays, empty or not.

use crate::diagnosis::DiagnosisResult;

/// Renders `result` as indented plain text.
pub fn render_text(result: &DiagnosisResult) -> String {
    let mut out = format!("== {} ==\n", result.plugin);

    if result.findings.is_empty() {
        out.push_str("no findings\n");
    }
    for finding in &result.findings {
        out += &format!(
            "[{}] {}: {}\n",
            finding.severity.label().to_uppercase(),
            finding.id,
            finding.title
        );
        push_indented(&mut out, &finding.description, 4);
        push_indented(&mut out, &format!("impact: {}", finding.impact), 4);
    }

    if !result.suggestions.is_empty() {
        out.push_str("\nSuggestions:\n");
    }
    for suggestion in &result.suggestions {
        out += &format!("  - {} ({})\n", suggestion.title, suggestion.finding_id);
        push_indented(&mut out, suggestion.details.trim_end(), 6);
    }
    out
}

/// Renders `result` as pretty-printed JSON.
pub fn render_json(result: &DiagnosisResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}

fn push_indented(out: &mut String, text: &str, width: usize) {
    for line in text.lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push_str(&" ".repeat(width));
            out.push_str(line);
            out.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::{Finding, Severity, Suggestion};

    fn sample() -> DiagnosisResult {
        DiagnosisResult {
            plugin: "maxproc".into(),
            findings: vec![Finding {
                id: "maxproc.thread.headroom".into(),
                title: "Thread creation headroom".into(),
                description: "about 5 more\nC(kernel threads-max) remaining: 5".into(),
                severity: Severity::Info,
                impact: "threads fail".into(),
            }],
            suggestions: vec![Suggestion {
                finding_id: "maxproc.thread.headroom".into(),
                title: "Raise kernel.threads-max".into(),
                details: "sysctl -w kernel.threads-max=<new limit>\n".into(),
            }],
        }
    }

    #[test]
    fn test_render_text() {
        let text = render_text(&sample());
        assert_eq!(
            text,
            "== maxproc ==\n\
             [INFO] maxproc.thread.headroom: Thread creation headroom\n    \
             about 5 more\n    \
             C(kernel threads-max) remaining: 5\n    \
             impact: threads fail\n\
             \n\
             Suggestions:\n  \
             - Raise kernel.threads-max (maxproc.thread.headroom)\n      \
             sysctl -w kernel.threads-max=<new limit>\n"
        );
    }

    #[test]
    fn test_render_text_empty() {
        let text = render_text(&DiagnosisResult::new("kernel"));
        assert_eq!(text, "== kernel ==\nno findings\n");
    }

    #[test]
    fn test_render_json() {
        let json = render_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["plugin"], "maxproc");
        assert_eq!(value["findings"][0]["severity"], "info");
        assert_eq!(value["suggestions"][0]["finding_id"], "maxproc.thread.headroom");
    }

    #[test]
    fn test_render_json_empty_lists() {
        let json = render_json(&DiagnosisResult::new("kernel")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["findings"], serde_json::json!([]));
        assert_eq!(value["suggestions"], serde_json::json!([]));
    }
}
