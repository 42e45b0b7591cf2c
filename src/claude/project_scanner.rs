//! Discovery of per-project session logs under the Claude data directory.
//!
//! Layout on disk: `<claude_dir>/projects/<sanitized-dir>/*.jsonl` holds the
//! main sessions, and `<sanitized-dir>/<session>/subagents/*.jsonl` holds
//! subagent transcripts spawned from a session. The sanitized directory name
//! encodes the original working directory with separators flattened to dashes,
//! so the real project name is recovered from the `cwd` field of a recent
//! session when possible.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::session_parser::{self, ConversationUsage};

/// One project directory and the usable conversations found inside it.
#[derive(Debug, Clone)]
pub struct ScannedProject {
    pub name: String,
    pub dir: PathBuf,
    pub conversations: Vec<ConversationUsage>,
}

/// Scan every project directory under `<claude_dir>/projects`.
///
/// Sessions without any input/output tokens (aborted starts, empty files) are
/// dropped; a project with no usable sessions is omitted entirely.
pub fn scan_projects(claude_dir: &Path) -> Result<Vec<ScannedProject>> {
    let projects_dir = claude_dir.join("projects");
    if !projects_dir.exists() {
        info!(dir = %projects_dir.display(), "projects directory not found");
        return Ok(Vec::new());
    }

    let mut projects = Vec::new();
    let entries = fs::read_dir(&projects_dir)
        .with_context(|| format!("reading {}", projects_dir.display()))?;

    for entry in entries {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(project) = scan_project_dir(&path)? {
            projects.push(project);
        }
    }

    projects.sort_by(|a, b| a.name.cmp(&b.name));
    info!(projects = projects.len(), "scan complete");
    Ok(projects)
}

fn scan_project_dir(project_dir: &Path) -> Result<Option<ScannedProject>> {
    let name = project_display_name(project_dir);
    let mut conversations = Vec::new();

    for entry in fs::read_dir(project_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            let session_id = file_stem(&path);
            // one unreadable session must not take down the whole scan
            let records = match session_parser::read_jsonl(&path) {
                Ok(records) => records,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping unreadable session");
                    continue;
                }
            };
            if records.is_empty() {
                continue;
            }
            let conv = session_parser::summarize_conversation(&records, &session_id, &name);
            if conv.tokens.total() > 0 {
                conversations.push(conv);
            }
        }
    }

    for entry in fs::read_dir(project_dir)? {
        let session_dir = entry?.path();
        if !session_dir.is_dir() {
            continue;
        }
        let subagents_dir = session_dir.join("subagents");
        if !subagents_dir.is_dir() {
            continue;
        }
        let parent_session = file_stem(&session_dir);

        for sub_entry in fs::read_dir(&subagents_dir)? {
            let path = sub_entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("jsonl") {
                continue;
            }
            let session_id = format!("{parent_session}/subagent/{}", file_stem(&path));
            let records = match session_parser::read_jsonl(&path) {
                Ok(records) => records,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping unreadable session");
                    continue;
                }
            };
            if records.is_empty() {
                continue;
            }
            let mut conv = session_parser::summarize_conversation(&records, &session_id, &name);
            conv.is_subagent = true;
            if conv.tokens.total() > 0 {
                conversations.push(conv);
            }
        }
    }

    if conversations.is_empty() {
        debug!(dir = %project_dir.display(), "no usable sessions");
        return Ok(None);
    }

    Ok(Some(ScannedProject {
        name,
        dir: project_dir.to_path_buf(),
        conversations,
    }))
}

/// Recover a human-readable project name for a sanitized directory.
///
/// Preferred source is the `cwd` field near the top of the most recently
/// modified session file; the directory-name reconstruction is a fallback for
/// directories whose sessions never recorded a working directory.
fn project_display_name(project_dir: &Path) -> String {
    if let Some(cwd) = cwd_from_recent_session(project_dir) {
        if let Some(base) = Path::new(&cwd).file_name().and_then(|s| s.to_str()) {
            return base.to_string();
        }
    }

    let dir_name = project_dir
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    reconstruct_name(dir_name)
}

fn cwd_from_recent_session(project_dir: &Path) -> Option<String> {
    let mut jsonl_files: Vec<(PathBuf, SystemTime)> = Vec::new();
    for entry in fs::read_dir(project_dir).ok()?.flatten() {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            if let Ok(modified) = fs::metadata(&path).and_then(|m| m.modified()) {
                jsonl_files.push((path, modified));
            }
        }
    }
    jsonl_files.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, _) in jsonl_files {
        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };
        // cwd appears on the first records of a session, no need to read far
        for line in content.lines().take(10) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Ok(value) = serde_json::from_str::<Value>(line) {
                if let Some(cwd) = value.get("cwd").and_then(Value::as_str) {
                    if !cwd.is_empty() && cwd != "/" {
                        return Some(cwd.to_string());
                    }
                }
            }
        }
    }
    None
}

/// Best-effort inverse of the directory-name sanitization: the final dashed
/// segment is usually the project basename.
fn reconstruct_name(sanitized: &str) -> String {
    sanitized
        .rsplit('-')
        .find(|part| !part.is_empty())
        .unwrap_or(sanitized)
        .to_string()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_session(dir: &Path, name: &str, lines: &[Value]) {
        let mut file = fs::File::create(dir.join(name)).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
    }

    fn usage_record(input: u64, output: u64) -> Value {
        json!({
            "type": "assistant",
            "timestamp": "2024-06-01T10:00:00Z",
            "cwd": "/home/dev/widget-factory",
            "message": {
                "model": "claude-3-5-sonnet",
                "usage": {"input_tokens": input, "output_tokens": output}
            }
        })
    }

    #[test]
    fn test_scan_missing_projects_dir() {
        let dir = tempfile::tempdir().unwrap();
        let projects = scan_projects(dir.path()).unwrap();
        assert!(projects.is_empty());
    }

    #[test]
    fn test_scan_finds_sessions_and_names_from_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join("projects").join("-home-dev-widget-factory");
        fs::create_dir_all(&project_dir).unwrap();
        write_session(&project_dir, "abc123.jsonl", &[usage_record(100, 50)]);

        let projects = scan_projects(dir.path()).unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "widget-factory");
        assert_eq!(projects[0].conversations.len(), 1);
        assert_eq!(projects[0].conversations[0].session_id, "abc123");
        assert!(!projects[0].conversations[0].is_subagent);
    }

    #[test]
    fn test_zero_token_sessions_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join("projects").join("-home-dev-empty");
        fs::create_dir_all(&project_dir).unwrap();
        write_session(
            &project_dir,
            "idle.jsonl",
            &[json!({"type": "user", "message": {"content": "never answered"}})],
        );

        let projects = scan_projects(dir.path()).unwrap();
        assert!(projects.is_empty());
    }

    #[test]
    fn test_subagent_sessions_discovered() {
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join("projects").join("-home-dev-app");
        let subagents = project_dir.join("main-session").join("subagents");
        fs::create_dir_all(&subagents).unwrap();
        write_session(&project_dir, "main-session.jsonl", &[usage_record(10, 5)]);
        write_session(&subagents, "worker.jsonl", &[usage_record(200, 80)]);

        let projects = scan_projects(dir.path()).unwrap();
        assert_eq!(projects[0].conversations.len(), 2);
        let sub = projects[0]
            .conversations
            .iter()
            .find(|c| c.is_subagent)
            .unwrap();
        assert_eq!(sub.session_id, "main-session/subagent/worker");
    }

    #[test]
    fn test_corrupt_session_file_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join("projects").join("-home-dev-widget-factory");
        fs::create_dir_all(&project_dir).unwrap();
        write_session(&project_dir, "good.jsonl", &[usage_record(100, 50)]);
        // non-UTF-8 bytes make the file unreadable as text
        fs::write(project_dir.join("corrupt.jsonl"), [0xff, 0xfe, 0x80, 0x81]).unwrap();

        let projects = scan_projects(dir.path()).unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].conversations.len(), 1);
        assert_eq!(projects[0].conversations[0].session_id, "good");
    }

    #[test]
    fn test_reconstruct_name_fallback() {
        assert_eq!(reconstruct_name("-home-dev-my-tool"), "tool");
        assert_eq!(reconstruct_name("plain"), "plain");
        assert_eq!(reconstruct_name("trailing-"), "trailing");
    }
}
