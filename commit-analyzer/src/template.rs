//! Deterministic commit-message template, used when no AI provider is
//! configured.
//!
//! ```text
//! <type>(<scope>): <imperative subject ≤72 chars>
//!
//! <optional body listing files/symbols/modified/removed>
//!
//! [BREAKING CHANGE: <reason>; …]
//! ```

use crate::analyzer::{CommitAnalysis, CommitType};
use std::fmt::{Display, Formatter};

const SUBJECT_LIMIT: usize = 72;

#[derive(Debug, Clone, PartialEq)]
pub struct CommitMessage {
    pub subject: String,
    pub body: Option<String>,
    pub breaking: Option<String>,
}

impl Display for CommitMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.subject)?;
        if let Some(body) = &self.body {
            write!(f, "\n\n{body}")?;
        }
        if let Some(breaking) = &self.breaking {
            write!(f, "\n\n{breaking}")?;
        }
        Ok(())
    }
}

pub fn generate_template_message(analysis: &CommitAnalysis) -> CommitMessage {
    let prefix = match &analysis.suggested_scope {
        Some(scope) => format!("{}({scope}): ", analysis.suggested_type),
        None => format!("{}: ", analysis.suggested_type),
    };
    let subject = truncate(&format!("{prefix}{}", imperative(analysis)), SUBJECT_LIMIT);

    let body = body_lines(analysis);
    let breaking = breaking_line(analysis);

    CommitMessage {
        subject,
        body,
        breaking,
    }
}

fn imperative(analysis: &CommitAnalysis) -> String {
    let named = |changes: &[crate::analyzer::SymbolChange]| {
        changes
            .iter()
            .take(3)
            .map(|s| s.name.clone())
            .collect::<Vec<_>>()
            .join(", ")
    };

    match analysis.suggested_type {
        CommitType::Test => "add tests".to_string(),
        CommitType::Docs => "update documentation".to_string(),
        CommitType::Build => "update build configuration".to_string(),
        CommitType::Ci => "update ci configuration".to_string(),
        CommitType::Feat if !analysis.symbols_added.is_empty() => {
            format!("add {}", named(&analysis.symbols_added))
        }
        CommitType::Fix if !analysis.symbols_modified.is_empty() => {
            format!("update {}", named(&analysis.symbols_modified))
        }
        CommitType::Refactor if !analysis.symbols_deleted.is_empty() => {
            format!("remove {}", named(&analysis.symbols_deleted))
        }
        _ => match analysis.files_changed.len() {
            0 => "update project".to_string(),
            1 => format!("update {}", analysis.files_changed[0]),
            n => format!("update {n} files"),
        },
    }
}

fn body_lines(analysis: &CommitAnalysis) -> Option<String> {
    let mut lines = Vec::new();

    if analysis.files_changed.len() > 1 {
        lines.push(format!(
            "Files changed ({}):",
            analysis.files_changed.len()
        ));
        for file in analysis.files_changed.iter().take(10) {
            lines.push(format!("- {file}"));
        }
        if analysis.files_changed.len() > 10 {
            lines.push(format!("- … {} more", analysis.files_changed.len() - 10));
        }
    }

    let list = |label: &str, changes: &[crate::analyzer::SymbolChange]| {
        if changes.is_empty() {
            return None;
        }
        let names: Vec<String> = changes.iter().map(|s| s.name.clone()).collect();
        Some(format!("{label}: {}", names.join(", ")))
    };
    lines.extend(list("Added", &analysis.symbols_added));
    lines.extend(list("Modified", &analysis.symbols_modified));
    lines.extend(list("Removed", &analysis.symbols_deleted));

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn breaking_line(analysis: &CommitAnalysis) -> Option<String> {
    if analysis.breaking_changes.is_empty() {
        return None;
    }
    let reasons: Vec<String> = analysis
        .breaking_changes
        .iter()
        .map(|b| {
            format!(
                "{} {} ({} callers affected)",
                b.symbol,
                b.reason,
                b.affected_callers.len()
            )
        })
        .collect();
    Some(format!("BREAKING CHANGE: {}", reasons.join("; ")))
}

fn truncate(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        return s.to_string();
    }
    let mut out: String = s.chars().take(limit - 1).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::SymbolChange;

    fn change(name: &str) -> SymbolChange {
        SymbolChange {
            name: name.into(),
            qualified_name: format!("src/a.ts:{name}"),
            kind: "function".into(),
            file: "src/a.ts".into(),
            complexity: 1,
            signature: None,
        }
    }

    fn base_analysis() -> CommitAnalysis {
        CommitAnalysis {
            files_changed: vec!["src/auth/login.ts".into()],
            lines_added: 12,
            lines_removed: 0,
            symbols_added: vec![change("login")],
            symbols_modified: Vec::new(),
            symbols_deleted: Vec::new(),
            callers_affected: Vec::new(),
            breaking_changes: Vec::new(),
            suggested_type: CommitType::Feat,
            suggested_scope: Some("auth".into()),
            complexity_delta: 1,
            raw_diff: String::new(),
            graph_baseline: true,
        }
    }

    #[test]
    fn subject_has_type_scope_and_stays_short() {
        let msg = generate_template_message(&base_analysis());
        assert!(msg.subject.starts_with("feat(auth): add login"));
        assert!(msg.subject.chars().count() <= 72);
    }

    #[test]
    fn breaking_trailer_lists_reasons() {
        let mut analysis = base_analysis();
        analysis.breaking_changes.push(crate::analyzer::BreakingChange {
            symbol: "login".into(),
            file: "src/auth/login.ts".into(),
            reason: "signature changed".into(),
            affected_callers: vec!["src/app.ts:main".into(), "src/cli.ts:run".into()],
        });
        let msg = generate_template_message(&analysis);
        let trailer = msg.breaking.unwrap();
        assert!(trailer.starts_with("BREAKING CHANGE: "));
        assert!(trailer.contains("2 callers affected"));
    }

    #[test]
    fn full_message_renders_sections_in_order() {
        let msg = generate_template_message(&base_analysis());
        let rendered = msg.to_string();
        let subject_pos = rendered.find("feat(auth)").unwrap();
        let body_pos = rendered.find("Added: login").unwrap();
        assert!(subject_pos < body_pos);
    }

    #[test]
    fn overlong_subjects_are_truncated() {
        let mut analysis = base_analysis();
        analysis.symbols_added = vec![
            change("averyveryverylongfunctionnameindeed"),
            change("anotherextremelylongsymbolnamehere"),
            change("andyetanotherridiculouslylongname"),
        ];
        let msg = generate_template_message(&analysis);
        assert!(msg.subject.chars().count() <= 72);
    }
}
