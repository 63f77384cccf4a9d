//! Per-item output destinations.
//!
//! Every item of a run gets two files under `<results_root>/<run_id>/`:
//! `<base>.stdout.txt` and `<base>.stderr.txt`, where `<base>` is derived
//! from the item alone. Paths are therefore known before the run starts and
//! callers can tail them while processes are still writing.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Longest base name kept, in characters.
pub const MAX_BASENAME_LEN: usize = 100;
pub const STDOUT_SUFFIX: &str = ".stdout.txt";
pub const STDERR_SUFFIX: &str = ".stderr.txt";

const FALLBACK_BASENAME: &str = "item";

/// Derive a filesystem-safe base name from an item.
///
/// Items that look like paths or URLs are reduced to their last non-empty
/// segment. Characters outside `[A-Za-z0-9._-]` become `_`. Distinct items
/// may map to the same name and then share its files.
pub fn sanitize_basename(item: &str) -> String {
    let segment = if item.contains(['/', '\\']) {
        item.rsplit(['/', '\\'])
            .find(|s| !s.is_empty())
            .unwrap_or("")
    } else {
        item
    };

    let base: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_BASENAME_LEN)
        .collect();

    if base.is_empty() {
        FALLBACK_BASENAME.to_string()
    } else {
        base
    }
}

/// Locations of one item's output files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkPaths {
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

/// Hands out sink locations inside a single run directory.
#[derive(Debug, Clone)]
pub struct SinkAllocator {
    run_dir: PathBuf,
}

impl SinkAllocator {
    pub fn new(results_root: &Path, run_id: &str) -> Self {
        Self {
            run_dir: results_root.join(run_id),
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Create the run directory and any missing parents.
    pub async fn prepare(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.run_dir).await
    }

    /// Sink locations for `item`. Pure: same item, same paths.
    pub fn paths_for(&self, item: &str) -> SinkPaths {
        let base = sanitize_basename(item);
        SinkPaths {
            stdout: self.run_dir.join(format!("{base}{STDOUT_SUFFIX}")),
            stderr: self.run_dir.join(format!("{base}{STDERR_SUFFIX}")),
        }
    }
}

/// Open handles for one invocation's output.
///
/// Consumed by [`SinkPair::close`], so a pair is closed at most once; the
/// runner calls it on every exit path.
#[derive(Debug)]
pub struct SinkPair {
    pub stdout: File,
    pub stderr: File,
}

impl SinkPair {
    pub async fn open(paths: &SinkPaths) -> io::Result<Self> {
        Ok(Self {
            stdout: open_sink(&paths.stdout).await?,
            stderr: open_sink(&paths.stderr).await?,
        })
    }

    /// Append a message to the diagnostic sink.
    pub async fn write_diagnostic(&mut self, message: &str) -> io::Result<()> {
        self.stderr.write_all(message.as_bytes()).await?;
        if !message.ends_with('\n') {
            self.stderr.write_all(b"\n").await?;
        }
        Ok(())
    }

    /// Flush and release both handles.
    pub async fn close(mut self) -> io::Result<()> {
        let out = self.stdout.flush().await;
        let err = self.stderr.flush().await;
        out.and(err)
    }
}

// Append mode: items sharing a name interleave whole writes instead of
// overwriting each other at independent offsets. Run directories are fresh,
// so nothing stale is appended to.
async fn open_sink(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_allowed(c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
    }

    #[test]
    fn test_plain_name_kept() {
        assert_eq!(sanitize_basename("report-2024_v1.txt"), "report-2024_v1.txt");
    }

    #[test]
    fn test_path_reduced_to_last_segment() {
        assert_eq!(sanitize_basename("src/lib/main.rs"), "main.rs");
        assert_eq!(sanitize_basename("/var/log/"), "log");
        assert_eq!(sanitize_basename(r"C:\Users\me\notes.md"), "notes.md");
    }

    #[test]
    fn test_url_reduced_to_last_segment() {
        assert_eq!(
            sanitize_basename("https://example.com/docs/page?id=7"),
            "page_id_7"
        );
    }

    #[test]
    fn test_disallowed_chars_replaced_one_for_one() {
        assert_eq!(sanitize_basename("a b;c"), "a_b_c");
        assert_eq!(sanitize_basename("héllo"), "h_llo");
        assert_eq!(sanitize_basename("it's `x`"), "it_s__x_");
    }

    #[test]
    fn test_long_names_truncated() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_basename(&long).len(), MAX_BASENAME_LEN);
        let long_unicode = "ü".repeat(300);
        let base = sanitize_basename(&long_unicode);
        assert_eq!(base.len(), MAX_BASENAME_LEN);
        assert!(base.chars().all(|c| c == '_'));
    }

    #[test]
    fn test_empty_and_separator_only_items() {
        assert_eq!(sanitize_basename(""), "item");
        assert_eq!(sanitize_basename("///"), "item");
    }

    #[test]
    fn test_sanitized_charset_and_length() {
        let samples = [
            "normal.txt",
            "../../etc/passwd",
            "with space and 'quotes'",
            "emoji 🎉 name",
            "tab\tnewline\nnull\0",
            "$(rm -rf ~)",
            "https://x.y/z/",
            &"abc/".repeat(80),
            &"ß".repeat(150),
        ];
        for sample in samples {
            let base = sanitize_basename(sample);
            assert!(!base.is_empty());
            assert!(base.chars().count() <= MAX_BASENAME_LEN, "{sample:?} -> {base:?}");
            assert!(base.chars().all(is_allowed), "{sample:?} -> {base:?}");
        }
    }

    #[test]
    fn test_paths_are_deterministic() {
        let alloc = SinkAllocator::new(Path::new("/results"), "run-1");
        let first = alloc.paths_for("dir/a.txt");
        let second = alloc.paths_for("dir/a.txt");
        assert_eq!(first, second);
        assert_eq!(first.stdout, PathBuf::from("/results/run-1/a.txt.stdout.txt"));
        assert_eq!(first.stderr, PathBuf::from("/results/run-1/a.txt.stderr.txt"));

        let again = SinkAllocator::new(Path::new("/results"), "run-1");
        assert_eq!(again.paths_for("dir/a.txt"), first);
    }

    #[tokio::test]
    async fn test_prepare_and_open_close() {
        let root = tempfile::tempdir().unwrap();
        let alloc = SinkAllocator::new(&root.path().join("nested/results"), "run-x");
        alloc.prepare().await.unwrap();
        assert!(alloc.run_dir().is_dir());

        let paths = alloc.paths_for("item one");
        let mut sinks = SinkPair::open(&paths).await.unwrap();
        sinks.stdout.write_all(b"out").await.unwrap();
        sinks.write_diagnostic("oops").await.unwrap();
        sinks.close().await.unwrap();

        assert_eq!(std::fs::read_to_string(&paths.stdout).unwrap(), "out");
        assert_eq!(std::fs::read_to_string(&paths.stderr).unwrap(), "oops\n");
    }

    #[tokio::test]
    async fn test_colliding_items_keep_both_outputs() {
        let root = tempfile::tempdir().unwrap();
        let alloc = SinkAllocator::new(root.path(), "run-c");
        alloc.prepare().await.unwrap();
        let paths = alloc.paths_for("a b");
        assert_eq!(paths, alloc.paths_for("a?b"));

        let mut first = SinkPair::open(&paths).await.unwrap();
        let mut second = SinkPair::open(&paths).await.unwrap();
        first.stdout.write_all(b"first\n").await.unwrap();
        second.stdout.write_all(b"second\n").await.unwrap();
        first.close().await.unwrap();
        second.close().await.unwrap();

        assert_eq!(std::fs::read_to_string(&paths.stdout).unwrap(), "first\nsecond\n");
    }
}
