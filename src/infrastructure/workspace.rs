//! # Workspace Store
//!
//! Filesystem and shell access confined to a single working directory.
//!
//! Every path is validated against the canonical root before use. Public operations
//! are total: failures come back as text (or [`WriteResult::Failed`]) so one bad
//! action cannot abort the rest of a batch.

use anyhow::{Context as AnyhowContext, Result};
use similar::TextDiff;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use walkdir::WalkDir;

use crate::domain::types::{WriteAction, WriteResult};

const STDERR_MARKER: &str = "[STDERR]";
const MAX_LINK_HOPS: usize = 40;

/// Sandboxed view of one directory tree.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    command_timeout: Duration,
}

impl Workspace {
    /// Opens (creating if absent) the working directory.
    pub fn open(root: impl AsRef<Path>, command_timeout: Duration) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            std::fs::create_dir_all(root)
                .with_context(|| format!("Failed to create working directory {}", root.display()))?;
        }
        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to resolve working directory {}", root.display()))?;
        if !root.is_dir() {
            anyhow::bail!("Working directory {} is not a directory", root.display());
        }

        Ok(Self {
            root,
            command_timeout,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `path` against the root and rejects anything that lands outside it.
    ///
    /// `..` components are folded lexically first; the deepest existing ancestor is
    /// then canonicalized so symlinks pointing out of the tree are caught too.
    /// Dangling links are followed by hand to the path they would create.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let joined = normalize(&self.root.join(path));

        let mut current = joined.clone();
        let mut missing: Vec<OsString> = Vec::new();
        let mut hops = 0;
        let resolved = loop {
            // symlink_metadata so a dangling link counts as present
            if current.symlink_metadata().is_ok() {
                match current.canonicalize() {
                    Ok(mut resolved) => {
                        for part in missing.iter().rev() {
                            resolved.push(part);
                        }
                        break resolved;
                    }
                    Err(_) if current.is_symlink() && hops < MAX_LINK_HOPS => {
                        let target = std::fs::read_link(&current)
                            .with_context(|| format!("Unable to validate path: {}", path))?;
                        let base = current.parent().unwrap_or(self.root.as_path());
                        let next = normalize(&base.join(target));
                        current = next;
                        hops += 1;
                        continue;
                    }
                    Err(e) => {
                        return Err(e).with_context(|| format!("Unable to validate path: {}", path));
                    }
                }
            }
            match (current.file_name(), current.parent()) {
                (Some(name), Some(parent)) => {
                    missing.push(name.to_owned());
                    current = parent.to_path_buf();
                }
                _ => anyhow::bail!("Unable to validate path: {}", path),
            }
        };

        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            tracing::warn!("Workspace: denied access to '{}' ({:?})", path, resolved);
            Err(anyhow::anyhow!(
                "Access denied: path '{}' is outside the working directory",
                path
            ))
        }
    }

    /// Indented tree of directories and non-hidden files below `subdir`.
    ///
    /// Directories deeper than `max_depth` are not entered; the files of a
    /// directory at depth `max_depth - 1` are the deepest entries shown.
    pub fn list_files(&self, subdir: &str, max_depth: usize) -> String {
        if max_depth == 0 {
            return String::new();
        }
        let start = match self.resolve(subdir) {
            Ok(p) => p,
            Err(e) => return format!("Error: {}", e),
        };
        if !start.is_dir() {
            return "Error: Directory does not exist.".to_string();
        }

        let mut tree = Vec::new();
        let walker = WalkDir::new(&start)
            .max_depth(max_depth)
            .sort_by(|a, b| {
                // Files before subdirectories, each group by name.
                a.file_type()
                    .is_dir()
                    .cmp(&b.file_type().is_dir())
                    .then_with(|| a.file_name().cmp(b.file_name()))
            })
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Workspace: skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let depth = entry.depth();

            if entry.file_type().is_dir() {
                if depth >= max_depth && depth > 0 {
                    continue;
                }
                let name = if depth == 0 {
                    root_label(&start, subdir)
                } else {
                    entry.file_name().to_string_lossy().to_string()
                };
                if name.is_empty() {
                    continue;
                }
                tree.push(format!("{}{}/", "  ".repeat(depth), name));
            } else {
                let name = entry.file_name().to_string_lossy();
                if name.is_empty() {
                    continue;
                }
                tree.push(format!("{}{}", "  ".repeat(depth), name));
            }
        }

        tree.join("\n")
    }

    /// Full UTF-8 contents of a file, or an error text.
    pub async fn read_file(&self, path: &str) -> String {
        let full_path = match self.resolve(path) {
            Ok(p) => p,
            Err(e) => return format!("Error: {}", e),
        };
        if !full_path.is_file() {
            return format!("Error: File not found: {}", path);
        }
        match tokio::fs::read_to_string(&full_path).await {
            Ok(content) => content,
            Err(e) => format!("Error reading file: {}", e),
        }
    }

    /// Writes `content` to `path`, or only computes the diff when `dry_run` is set.
    pub async fn write_file(&self, path: &str, content: &str, dry_run: bool) -> WriteResult {
        match self.try_write(path, content, dry_run).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Workspace: write to '{}' failed: {:#}", path, e);
                WriteResult::Failed {
                    error: format!("{:#}", e),
                }
            }
        }
    }

    async fn try_write(&self, path: &str, content: &str, dry_run: bool) -> Result<WriteResult> {
        let full_path = self.resolve(path)?;
        if full_path.is_dir() {
            anyhow::bail!("'{}' is a directory", path);
        }

        let old_content = if full_path.exists() {
            tokio::fs::read_to_string(&full_path)
                .await
                .context("Failed to read existing file")?
        } else {
            String::new()
        };
        let diff = unified_diff(&old_content, content, path);

        if dry_run {
            return Ok(WriteResult::Success {
                diff,
                action: WriteAction::WouldWrite,
                path: path.to_string(),
            });
        }

        if let Some(parent) = full_path.parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context("Failed to create parent directories")?;
            }
        }
        tokio::fs::write(&full_path, content)
            .await
            .context("Failed to write file")?;
        tracing::info!("Workspace: wrote {} ({} bytes)", path, content.len());

        Ok(WriteResult::Success {
            diff,
            action: WriteAction::Wrote,
            path: path.to_string(),
        })
    }

    /// Runs `command` through the shell in the workspace root.
    ///
    /// Returns stdout, followed by `[STDERR]` and stderr when stderr is non-empty.
    pub async fn run_command(&self, command: &str) -> String {
        match self.try_run(command).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("Workspace: command `{}` failed: {:#}", command, e);
                format!("Execution Error: {:#}", e)
            }
        }
    }

    async fn try_run(&self, command: &str) -> Result<String> {
        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = tokio::process::Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = tokio::process::Command::new("sh");
            c.args(["-c", command]);
            c
        };

        cmd.current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::info!("Workspace: running `{}`", command);
        let child = cmd.spawn().context("Failed to spawn command shell")?;

        let output = tokio::time::timeout(self.command_timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "Command timed out after {} seconds",
                    self.command_timeout.as_secs()
                )
            })?
            .context("Failed to collect command output")?;

        let mut result = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            result.push_str(&format!("\n{}\n{}", STDERR_MARKER, stderr));
        }
        if !output.status.success() {
            tracing::debug!("Workspace: `{}` exited with {}", command, output.status);
        }
        Ok(result)
    }
}

/// Unified diff of `old` against `new`; empty when they are identical.
pub fn unified_diff(old: &str, new: &str, path: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(path, path)
        .to_string()
}

/// Folds `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

fn root_label(start: &Path, subdir: &str) -> String {
    match start.file_name() {
        Some(name) => name.to_string_lossy().to_string(),
        None => subdir.trim_end_matches('/').to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn workspace() -> (TempDir, Workspace) {
        let temp_dir = TempDir::new().unwrap();
        let ws = Workspace::open(temp_dir.path(), Duration::from_secs(30)).unwrap();
        (temp_dir, ws)
    }

    #[test]
    fn test_open_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("nested/project");
        let ws = Workspace::open(&root, Duration::from_secs(1)).unwrap();
        assert!(root.is_dir());
        assert!(ws.root().is_absolute());
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let (_tmp, ws) = workspace();
        assert!(ws.resolve("src/main.rs").is_ok());
        assert!(ws.resolve("a/../b.txt").is_ok());
        assert!(ws.resolve("../../etc/passwd").is_err());
        assert!(ws.resolve("a/../../outside.txt").is_err());
        assert!(ws.resolve("/etc/passwd").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_escape() {
        let (tmp, ws) = workspace();
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), tmp.path().join("link")).unwrap();
        assert!(ws.resolve("link/secret.txt").is_err());
    }

    #[tokio::test]
    async fn test_write_through_dangling_symlink_is_denied() {
        let (tmp, ws) = workspace();
        let outside = TempDir::new().unwrap();
        let target = outside.path().join("escaped.txt");
        std::os::unix::fs::symlink(&target, tmp.path().join("link")).unwrap();

        assert!(ws.resolve("link").is_err());
        let result = ws.write_file("link", "pwned\n", false).await;
        assert!(matches!(result, WriteResult::Failed { .. }));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_dangling_symlink_inside_root_resolves() {
        let (tmp, ws) = workspace();
        std::os::unix::fs::symlink("fresh.txt", tmp.path().join("alias")).unwrap();

        assert_eq!(ws.resolve("alias").unwrap(), ws.root().join("fresh.txt"));
        let result = ws.write_file("alias", "hi\n", false).await;
        assert!(result.is_success());
        assert_eq!(std::fs::read_to_string(tmp.path().join("fresh.txt")).unwrap(), "hi\n");
    }

    #[tokio::test]
    async fn test_dry_run_does_not_mutate() {
        let (tmp, ws) = workspace();
        fs::write(tmp.path().join("notes.txt"), "original\n").unwrap();

        let result = ws.write_file("notes.txt", "changed\n", true).await;
        assert!(matches!(
            &result,
            WriteResult::Success { action: WriteAction::WouldWrite, .. }
        ));
        let diff = result.diff().unwrap();
        assert!(diff.contains("-original"));
        assert!(diff.contains("+changed"));

        assert_eq!(ws.read_file("notes.txt").await, "original\n");
    }

    #[tokio::test]
    async fn test_dry_run_on_new_file_creates_nothing() {
        let (tmp, ws) = workspace();
        let result = ws.write_file("new/dir/file.txt", "x\n", true).await;
        assert!(result.is_success());
        assert!(!tmp.path().join("new").exists());
    }

    #[tokio::test]
    async fn test_diff_round_trip() {
        let (_tmp, ws) = workspace();
        let content = "line one\nline two\n";

        let first = ws.write_file("src/app.txt", content, false).await;
        assert!(matches!(
            &first,
            WriteResult::Success { action: WriteAction::Wrote, .. }
        ));
        let diff = first.diff().unwrap();
        let body: Vec<&str> = diff
            .lines()
            .filter(|l| !l.starts_with("---") && !l.starts_with("+++") && !l.starts_with("@@"))
            .collect();
        assert_eq!(body, vec!["+line one", "+line two"]);

        let second = ws.write_file("src/app.txt", content, false).await;
        assert_eq!(second.diff(), Some(""));
        assert_eq!(ws.read_file("src/app.txt").await, content);
    }

    #[tokio::test]
    async fn test_write_outside_root_fails_as_value() {
        let (_tmp, ws) = workspace();
        let result = ws.write_file("../escape.txt", "nope", false).await;
        match result {
            WriteResult::Failed { error } => assert!(error.contains("Access denied")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_onto_directory_fails_as_value() {
        let (tmp, ws) = workspace();
        fs::create_dir(tmp.path().join("dir")).unwrap();
        assert!(!ws.write_file("dir", "x", false).await.is_success());
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let (_tmp, ws) = workspace();
        assert_eq!(ws.read_file("nope.txt").await, "Error: File not found: nope.txt");
        assert!(ws.read_file("../../etc/passwd").await.starts_with("Error: Access denied"));
    }

    #[test]
    fn test_list_files_depth_and_hidden() {
        let (tmp, ws) = workspace();
        let root = tmp.path();
        fs::write(root.join("top.txt"), "").unwrap();
        fs::write(root.join(".secret"), "").unwrap();
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::write(root.join("a/one.txt"), "").unwrap();
        fs::write(root.join("a/b/two.txt"), "").unwrap();
        fs::write(root.join("a/b/c/deep.txt"), "").unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".git/HEAD"), "").unwrap();

        let tree = ws.list_files(".", 2);
        let root_name = ws.root().file_name().unwrap().to_string_lossy().to_string();
        let lines: Vec<&str> = tree.lines().collect();

        assert_eq!(lines[0], format!("{}/", root_name));
        assert!(lines.contains(&"  top.txt"));
        assert!(lines.contains(&"  a/"));
        assert!(lines.contains(&"    one.txt"));
        assert!(!lines.iter().any(|l| l.trim() == "b/"));
        assert!(!tree.contains("two.txt"));
        assert!(!tree.contains("deep.txt"));
        assert!(!tree.contains(".secret"));
        assert!(!tree.contains(".git"));
        assert!(lines.iter().all(|l| !l.trim().is_empty()));
    }

    #[test]
    fn test_list_files_depth_zero_is_empty() {
        let (tmp, ws) = workspace();
        fs::write(tmp.path().join("top.txt"), "").unwrap();
        assert_eq!(ws.list_files(".", 0), "");
    }

    #[test]
    fn test_list_files_deeper() {
        let (tmp, ws) = workspace();
        fs::create_dir_all(tmp.path().join("a/b/c")).unwrap();
        fs::write(tmp.path().join("a/b/c/deep.txt"), "").unwrap();

        let tree = ws.list_files(".", 3);
        assert!(tree.contains("    b/"));
        assert!(!tree.lines().any(|l| l.trim() == "c/"));

        let tree = ws.list_files(".", 4);
        assert!(tree.contains("        deep.txt"));
    }

    #[test]
    fn test_list_files_subdir() {
        let (tmp, ws) = workspace();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src/lib.rs"), "").unwrap();

        assert_eq!(ws.list_files("src", 2), "src/\n  lib.rs");
        assert_eq!(ws.list_files("missing", 2), "Error: Directory does not exist.");
        assert!(ws.list_files("..", 2).starts_with("Error: Access denied"));
    }

    #[tokio::test]
    async fn test_run_command_stdout() {
        let (_tmp, ws) = workspace();
        let output = ws.run_command("echo hi").await;
        assert!(output.contains("hi"));
        assert!(!output.contains(STDERR_MARKER));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_stderr_marker() {
        let (_tmp, ws) = workspace();
        let output = ws.run_command("echo oops 1>&2").await;
        assert!(output.contains("[STDERR]\noops"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_uses_workspace_cwd() {
        let (tmp, ws) = workspace();
        fs::write(tmp.path().join("marker.txt"), "").unwrap();
        assert!(ws.run_command("ls").await.contains("marker.txt"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_timeout() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::open(tmp.path(), Duration::from_millis(200)).unwrap();
        let output = ws.run_command("sleep 5").await;
        assert!(output.starts_with("Execution Error: Command timed out"));
    }
}
