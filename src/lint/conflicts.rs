//! Unresolved version-control conflict markers.
//!
//! `<<<<<<<`, `|||||||` and `>>>>>>>` lines are always markers. A bare
//! `=======` line is also a valid setext heading underline, so it is only
//! reported when the file contains one of the other markers.

use super::{DiagnosticSink, DocumentCheck, LintContext, RuleId};
use crate::document::PromptDocument;

const MARKER_LEN: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Ours,
    Base,
    Separator,
    Theirs,
}

impl Marker {
    fn describe(self) -> &'static str {
        match self {
            Marker::Ours => "conflict start marker '<<<<<<<'",
            Marker::Base => "conflict base marker '|||||||'",
            Marker::Separator => "conflict separator '======='",
            Marker::Theirs => "conflict end marker '>>>>>>>'",
        }
    }
}

/// Classifies `line` as a conflict marker.
fn classify(line: &str) -> Option<Marker> {
    let line = line.trim_end_matches(['\r', '\n']);
    let labelled = |c: char| {
        let run = line.chars().take_while(|&ch| ch == c).count();
        run == MARKER_LEN && line[run..].chars().next().map_or(true, char::is_whitespace)
    };

    if labelled('<') {
        Some(Marker::Ours)
    } else if labelled('|') {
        Some(Marker::Base)
    } else if labelled('>') {
        Some(Marker::Theirs)
    } else if line.trim_end() == "=======" {
        Some(Marker::Separator)
    } else {
        None
    }
}

/// Finds conflict markers in `content`, returning (1-based line, label).
pub fn find_conflict_markers(content: &str) -> Vec<(usize, &'static str)> {
    let markers: Vec<(usize, Marker)> = content
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| classify(line).map(|m| (idx + 1, m)))
        .collect();

    let has_anchor = markers.iter().any(|(_, m)| *m != Marker::Separator);
    markers
        .into_iter()
        .filter(|(_, m)| has_anchor || *m != Marker::Separator)
        .map(|(line, m)| (line, m.describe()))
        .collect()
}

/// Reports each conflict marker line.
pub struct MergeConflictCheck;

impl DocumentCheck for MergeConflictCheck {
    fn name(&self) -> &'static str {
        "merge-conflict"
    }

    fn check(&self, doc: &PromptDocument, _ctx: &LintContext<'_>, sink: &mut DiagnosticSink<'_>) {
        for (line, label) in find_conflict_markers(&doc.content) {
            sink.emit(
                RuleId::MergeConflict,
                doc.path.clone(),
                Some(line),
                format!("unresolved {}", label),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_conflict() {
        let content = "# Title\n<<<<<<< HEAD\nours\n=======\ntheirs\n>>>>>>> main\n";
        let lines: Vec<usize> = find_conflict_markers(content)
            .into_iter()
            .map(|(line, _)| line)
            .collect();
        assert_eq!(lines, vec![2, 4, 6]);
    }

    #[test]
    fn test_setext_underline_alone_is_not_a_conflict() {
        let content = "Title\n=======\n\nText\n";
        assert!(find_conflict_markers(content).is_empty());
    }

    #[test]
    fn test_lone_start_marker() {
        let found = find_conflict_markers("text\n<<<<<<<\n");
        assert_eq!(found, vec![(2, "conflict start marker '<<<<<<<'")]);
    }

    #[test]
    fn test_longer_runs_and_inline_text_ignored() {
        let content = "<<<<<<<< too long\nuse <<<<<<< inline\n>>>>>>>>\n";
        assert!(find_conflict_markers(content).is_empty());
    }

    #[test]
    fn test_diff3_base_marker() {
        let content = "<<<<<<< HEAD\na\n||||||| base\nb\n=======\nc\n>>>>>>> feature\n";
        assert_eq!(find_conflict_markers(content).len(), 4);
    }
}
