//! Command history persistence
//!
//! Line-oriented history file for the interactive shell: one command per
//! line, capped, with consecutive duplicates suppressed. Kept between
//! sessions in the user's home directory.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use turnkit_core::{Error, Result};

/// Maximum retained entries.
pub const MAX_HISTORY: usize = 1000;

/// Interactive-shell command history.
#[derive(Debug, Clone, Default)]
pub struct CommandHistory {
    entries: VecDeque<String>,
    path: Option<PathBuf>,
}

impl CommandHistory {
    /// Empty, unpersisted history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load history from `path`; a missing file is an empty history.
    pub fn load(path: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => VecDeque::new(),
        };

        let mut history = Self {
            entries,
            path: Some(path),
        };
        history.truncate();
        history
    }

    /// Default history file path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|dir| dir.join(".turnkit_history"))
    }

    /// Record a command. Blank input and a repeat of the latest entry are
    /// skipped.
    pub fn push(&mut self, command: &str) {
        let command = command.trim();
        if command.is_empty() {
            return;
        }
        if self.entries.back().map(String::as_str) == Some(command) {
            return;
        }
        self.entries.push_back(command.to_string());
        self.truncate();
    }

    /// The most recent `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &str> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).map(String::as_str)
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget everything and delete the history file if one exists.
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        if let Some(path) = &self.path {
            if path.exists() {
                std::fs::remove_file(path)
                    .map_err(|e| Error::other(format!("Failed to remove history file: {}", e)))?;
            }
        }
        Ok(())
    }

    /// Write the history back to its file; a no-op without one.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        self.save_to(path)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        let mut content = self
            .entries
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        content.push('\n');
        std::fs::write(path, content)
            .map_err(|e| Error::other(format!("Failed to write history file: {}", e)))
    }

    fn truncate(&mut self) {
        while self.entries.len() > MAX_HISTORY {
            self.entries.pop_front();
        }
    }
}
