//! JSONL journals and atomic file writes

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Append-only JSONL file shared by concurrently handled messages.
///
/// Each record is serialized to a single line before the lock is taken, so
/// concurrent writers never interleave partial lines.
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    lock: Mutex<()>,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append<T: Serialize>(&self, record: &T) -> std::io::Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self
            .lock
            .lock()
            .map_err(|_| std::io::Error::other("journal lock poisoned"))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }

    pub fn read_all<T: for<'de> Deserialize<'de>>(&self) -> std::io::Result<Vec<T>> {
        read_jsonl(&self.path)
    }
}

/// Read all records from a JSONL file, skipping lines that fail to parse
pub fn read_jsonl<T: for<'de> Deserialize<'de>>(path: &Path) -> std::io::Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(record) = serde_json::from_str(&line) {
            records.push(record);
        }
    }

    Ok(records)
}

/// Write data atomically using temp file + rename
pub fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, data)?;
    std::fs::rename(temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Entry {
        id: u32,
        note: String,
    }

    #[test]
    fn test_journal_append_and_read() {
        let dir = tempfile::TempDir::new().unwrap();
        let journal = Journal::new(dir.path().join("nested").join("turns.jsonl"));

        journal
            .append(&Entry {
                id: 1,
                note: "first".to_string(),
            })
            .unwrap();
        journal
            .append(&Entry {
                id: 2,
                note: "second".to_string(),
            })
            .unwrap();

        let entries: Vec<Entry> = journal.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].note, "second");
    }

    #[test]
    fn test_read_skips_malformed_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("mixed.jsonl");
        std::fs::write(&path, "{\"id\":1,\"note\":\"ok\"}\nnot json\n\n{\"id\":2,\"note\":\"ok\"}\n")
            .unwrap();

        let entries: Vec<Entry> = read_jsonl(&path).unwrap();
        assert_eq!(entries.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_missing_journal_reads_empty() {
        let journal = Journal::new("/nonexistent/helpdesk/turns.jsonl");
        let entries: Vec<Entry> = journal.read_all().unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_concurrent_appends_keep_whole_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let journal = Arc::new(Journal::new(dir.path().join("turns.jsonl")));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let journal = Arc::clone(&journal);
                std::thread::spawn(move || {
                    for j in 0..25 {
                        journal
                            .append(&Entry {
                                id: i * 100 + j,
                                note: "x".repeat(64),
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entries: Vec<Entry> = journal.read_all().unwrap();
        assert_eq!(entries.len(), 200);
    }

    #[test]
    fn test_atomic_write() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        atomic_write(&path, b"{}").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
        assert!(!path.with_extension("tmp").exists());
    }
}
