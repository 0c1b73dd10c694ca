//! C4 partition classifier: a deterministic, total, ordered-rule mapping
//! from a repository-relative path to `(partition_id, authority_score,
//! reason)`. Classification is pure and side-effect free.

use archivist_core::types::Classification;

const ROLE_PATTERNS: &[&str] = &["etc/prompts/role_", "roles/", "/role-", "role_"];
const CONSTITUTIONAL_PATTERNS: &[&str] =
    &["claude.md", "etc/prompts/", "etc/decisions/", ".claude/", "decision-log", "decisions/"];
const LANGUAGE_SPEC_PATTERNS: &[&str] = &["lang-spec", "language-spec", "spec/lang_", "reference/lang_"];
const TALENT_PATTERNS: &[&str] = &["talent/", "talent-memory/", "talents/"];
const SESSION_PATTERNS: &[&str] = &["session/", "sessions/", "tmp/", "temp/", "experiment/", "experiments/"];
const WHITEBOARD_PATTERNS: &[&str] = &["whiteboard/", "scratch/", "wip/"];

/// Classify a repository-relative path.
/// Matching is substring-based over the lowercased, forward-slash-normalized
/// path — role detection must precede `dom0` because role prompts live under
/// the same `etc/prompts/` tree as constitutional files.
pub fn classify_path(path: &str) -> Classification {
    let normalized = path.replace('\\', "/").to_ascii_lowercase();

    if let Some(role) = match_role(&normalized) {
        return Classification {
            partition_id: format!("role_{role}"),
            authority_score: 0.70,
            reason: format!("matches role pattern ({role})"),
        };
    }

    if matches_any(&normalized, CONSTITUTIONAL_PATTERNS) {
        return Classification {
            partition_id: "dom0".to_string(),
            authority_score: 0.95,
            reason: "constitutional path (manifest/prompts/decisions)".to_string(),
        };
    }

    if let Some(lang) = match_language_spec(&normalized) {
        return Classification {
            partition_id: format!("lang_{lang}"),
            authority_score: 0.85,
            reason: format!("language specification document ({lang})"),
        };
    }

    if let Some(id) = match_talent(&normalized) {
        return Classification {
            partition_id: format!("talent_{id}"),
            authority_score: 0.50,
            reason: "under talent-memory root".to_string(),
        };
    }

    if matches_any(&normalized, SESSION_PATTERNS) {
        return Classification {
            partition_id: "session".to_string(),
            authority_score: 0.20,
            reason: "session/temporary/experiment path".to_string(),
        };
    }

    if matches_any(&normalized, WHITEBOARD_PATTERNS) {
        return Classification {
            partition_id: "whiteboard".to_string(),
            authority_score: 0.10,
            reason: "whiteboard/scratch/WIP path".to_string(),
        };
    }

    Classification {
        partition_id: "project".to_string(),
        authority_score: 0.35,
        reason: "default: ordinary project file".to_string(),
    }
}

fn matches_any(path: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| path.contains(p))
}

fn match_role(path: &str) -> Option<String> {
    if !matches_any(path, ROLE_PATTERNS) {
        return None;
    }
    for marker in ["role_", "role-"] {
        if let Some(idx) = path.rfind(marker) {
            let rest = &path[idx + marker.len()..];
            let role: String = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            let role = role.trim_end_matches(".md").trim_end_matches(".txt");
            if !role.is_empty() {
                return Some(role.to_string());
            }
        }
    }
    Some("unknown".to_string())
}

fn match_language_spec(path: &str) -> Option<String> {
    for pattern in LANGUAGE_SPEC_PATTERNS {
        if let Some(idx) = path.find(pattern) {
            let rest = &path[idx + pattern.len()..];
            let lang: String = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            if !lang.is_empty() {
                return Some(lang);
            }
        }
    }
    None
}

fn match_talent(path: &str) -> Option<String> {
    for pattern in TALENT_PATTERNS {
        if let Some(idx) = path.find(pattern) {
            let rest = &path[idx + pattern.len()..];
            let id: String = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
                .collect();
            if !id.is_empty() {
                return Some(id);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constitutional_paths_classify_as_dom0() {
        let c = classify_path("CLAUDE.md");
        assert_eq!(c.partition_id, "dom0");
        assert!((c.authority_score - 0.95).abs() < 1e-9);

        let c2 = classify_path("etc/decisions/adr-001.md");
        assert_eq!(c2.partition_id, "dom0");
    }

    #[test]
    fn role_prompt_inside_constitutional_tree_still_wins_role_rule() {
        let c = classify_path("etc/prompts/role_backend.md");
        assert_eq!(c.partition_id, "role_backend");
        assert!((c.authority_score - 0.70).abs() < 1e-9);
    }

    #[test]
    fn language_spec_documents_classify_with_language_suffix() {
        let c = classify_path("reference/lang_python/builtins.md");
        assert_eq!(c.partition_id, "lang_python");
        assert!((c.authority_score - 0.85).abs() < 1e-9);
    }

    #[test]
    fn talent_memory_roots_classify_with_id_suffix() {
        let c = classify_path("talent/alice/notes.md");
        assert_eq!(c.partition_id, "talent_alice");
        assert!((c.authority_score - 0.50).abs() < 1e-9);
    }

    #[test]
    fn session_and_whiteboard_paths_classify_correctly() {
        assert_eq!(classify_path("sessions/2024-01-01/notes.md").partition_id, "session");
        assert_eq!(classify_path("whiteboard/draft.md").partition_id, "whiteboard");
    }

    #[test]
    fn ordinary_files_default_to_project() {
        let c = classify_path("src/lib.rs");
        assert_eq!(c.partition_id, "project");
        assert!((c.authority_score - 0.35).abs() < 1e-9);
    }

    #[test]
    fn classification_is_deterministic() {
        assert_eq!(classify_path("src/lib.rs"), classify_path("src/lib.rs"));
    }

    #[test]
    fn matching_is_case_and_separator_insensitive() {
        let c = classify_path("ETC\\PROMPTS\\readme.md");
        assert_eq!(c.partition_id, "dom0");
    }
}
