use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Fires once after `window` has passed without another change.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Records a change, pushing the deadline out. A window too large for
    /// the clock fires on the next poll.
    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now.checked_add(self.window).unwrap_or(now));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True exactly once per burst of changes, when the quiet period is over.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// A plain file standing in for an editor widget.
///
/// An installed shader is mirrored into the file; edits made with any
/// text editor are picked up by a file watcher and handed back after the
/// debounce window. Content equal to the last mirrored or submitted text is
/// never handed back.
pub struct LiveEditor {
    path: PathBuf,
    last_text: Option<String>,
    debouncer: Debouncer,
    change_tx: Sender<()>,
    change_rx: Receiver<()>,
    watcher: Option<RecommendedWatcher>,
}

impl LiveEditor {
    pub fn new(path: PathBuf, debounce: Duration) -> Self {
        let (change_tx, change_rx) = unbounded();
        Self {
            path,
            last_text: None,
            debouncer: Debouncer::new(debounce),
            change_tx,
            change_rx,
            watcher: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Starts watching the buffer's directory. Editors that save by renaming
    /// a temporary file over the buffer are covered as well.
    pub fn watch(&mut self) -> Result<()> {
        let dir = self.ensure_parent()?;
        let target = self.path.file_name().map(|name| name.to_os_string());
        let tx = self.change_tx.clone();
        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                match res {
                    Ok(event) => {
                        let relevant = matches!(
                            event.kind,
                            EventKind::Modify(_) | EventKind::Create(_)
                        );
                        let hit = event
                            .paths
                            .iter()
                            .any(|path| path.file_name().map(|name| name.to_os_string()) == target);
                        if relevant && hit {
                            let _ = tx.send(());
                        }
                    }
                    Err(err) => tracing::warn!("editor watcher error: {err}"),
                }
            })
            .context("failed to create editor buffer watcher")?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", dir.display()))?;
        tracing::debug!(buffer = %self.path.display(), "watching editor buffer");
        self.watcher = Some(watcher);
        Ok(())
    }

    /// Raw change notifications from the watcher.
    pub fn changes(&self) -> &Receiver<()> {
        &self.change_rx
    }

    pub fn note_change(&mut self, now: Instant) {
        self.debouncer.touch(now);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Returns the buffer content once the debounce window has elapsed and
    /// the content differs from what was last mirrored or submitted.
    pub fn take_submission(&mut self, now: Instant) -> Result<Option<String>> {
        if !self.debouncer.poll(now) {
            return Ok(None);
        }
        let text = self.contents()?;
        if self.last_text.as_deref() == Some(text.as_str()) {
            tracing::trace!("editor buffer unchanged; skipping recompile");
            return Ok(None);
        }
        self.last_text = Some(text.clone());
        Ok(Some(text))
    }

    /// Replaces the buffer with `text` without handing it back as an edit.
    pub fn mirror(&mut self, text: &str) -> Result<()> {
        self.ensure_parent()?;
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write editor buffer {}", self.path.display()))?;
        self.last_text = Some(text.to_string());
        Ok(())
    }

    pub fn contents(&self) -> Result<String> {
        fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read editor buffer {}", self.path.display()))
    }

    /// Last text mirrored into or submitted from the buffer.
    pub fn last_text(&self) -> Option<&str> {
        self.last_text.as_deref()
    }

    fn ensure_parent(&self) -> Result<PathBuf> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const WINDOW: Duration = Duration::from_millis(1000);

    #[test]
    fn debouncer_waits_for_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        assert!(!debouncer.poll(start));

        debouncer.touch(start);
        debouncer.touch(start + Duration::from_millis(600));
        assert!(!debouncer.poll(start + Duration::from_millis(1200)));
        assert!(debouncer.poll(start + Duration::from_millis(1600)));
        assert!(!debouncer.poll(start + Duration::from_millis(5000)));
        assert!(debouncer.deadline().is_none());
    }

    #[test]
    fn oversized_window_does_not_overflow_the_clock() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::MAX);
        debouncer.touch(start);
        assert_eq!(debouncer.deadline(), Some(start));
        assert!(debouncer.poll(start));
    }

    #[test]
    fn mirrored_text_is_not_resubmitted() {
        let dir = TempDir::new().unwrap();
        let mut editor = LiveEditor::new(dir.path().join("nested/editor.glsl"), WINDOW);
        editor.mirror("void main() {}").unwrap();
        assert_eq!(editor.contents().unwrap(), "void main() {}");

        let start = Instant::now();
        editor.note_change(start);
        assert_eq!(editor.take_submission(start + WINDOW).unwrap(), None);
    }

    #[test]
    fn edits_are_submitted_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("editor.glsl");
        let mut editor = LiveEditor::new(path.clone(), WINDOW);
        editor.mirror("void main() {}").unwrap();

        fs::write(&path, "void main() { gl_FragColor = vec4(1.0); }").unwrap();
        let start = Instant::now();
        editor.note_change(start);
        assert_eq!(editor.take_submission(start).unwrap(), None);
        assert_eq!(
            editor.take_submission(start + WINDOW).unwrap().as_deref(),
            Some("void main() { gl_FragColor = vec4(1.0); }")
        );

        editor.note_change(start + WINDOW);
        assert_eq!(editor.take_submission(start + WINDOW * 2).unwrap(), None);
    }

    #[test]
    fn missing_buffer_reports_path() {
        let dir = TempDir::new().unwrap();
        let mut editor = LiveEditor::new(dir.path().join("missing.glsl"), WINDOW);
        let start = Instant::now();
        editor.note_change(start);
        let err = editor.take_submission(start + WINDOW).unwrap_err();
        assert!(format!("{err:#}").contains("missing.glsl"));
    }
}
