use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, Utc};
use serde_json::Value;

use crate::settings::Settings;

const BACKUP_DIR: &str = "backup";
const SETTINGS_FILE: &str = "settings.json";

/// A document file as listed from the data directory, with its
/// display metadata merged in from settings.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
    pub title: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BackupEntry {
    pub name: String,
    pub size: u64,
    pub created: Option<DateTime<Local>>,
}

/// A loaded document: raw file text plus its parsed value.
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub raw: String,
    pub value: Value,
}

/// What a save or restore did: which file was written and which
/// snapshot was taken immediately before the overwrite, if any.
#[derive(Debug, Clone)]
pub struct SaveReceipt {
    pub filename: String,
    pub backup: Option<String>,
}

/// Filesystem persistence for one data directory of JSON documents,
/// with a `backup/` subdirectory of timestamped snapshots.
///
/// Last-write-wins, no locking; the backup taken before every
/// overwrite is the only recovery mechanism.
pub struct FileStore {
    data_dir: PathBuf,
    backup_dir: PathBuf,
    keep_backups: Option<usize>,
}

impl FileStore {
    /// Open (creating if needed) a store over `data_dir`.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        let backup_dir = data_dir.join(BACKUP_DIR);
        fs::create_dir_all(&backup_dir)
            .with_context(|| format!("creating data directory {}", data_dir.display()))?;
        Ok(Self {
            data_dir,
            backup_dir,
            keep_backups: None,
        })
    }

    /// Cap the number of backups kept per file; oldest are pruned
    /// after each save. `None` keeps everything.
    pub fn with_keep_backups(mut self, keep: Option<usize>) -> Self {
        self.keep_backups = keep.filter(|&n| n > 0);
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// List the `.json` documents in the data directory, sorted by
    /// name, with title/url merged from settings.
    pub fn list_files(&self) -> Result<Vec<FileEntry>> {
        let settings = self.settings()?;
        let mut entries = Vec::new();
        let dir = fs::read_dir(&self.data_dir)
            .with_context(|| format!("reading {}", self.data_dir.display()))?;
        for entry in dir {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name == SETTINGS_FILE || !name.ends_with(".json") {
                continue;
            }
            let meta = entry.metadata()?;
            let known = settings.entry_for(&name);
            entries.push(FileEntry {
                size: meta.len(),
                modified: meta.modified().ok().map(DateTime::from),
                title: known.and_then(|e| e.title.clone()),
                url: known.and_then(|e| e.url.clone()),
                name,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Load a document and parse it. A file that no longer parses is
    /// an error here; callers edit raw text through their own session.
    pub fn load(&self, name: &str) -> Result<Document> {
        let name = sanitize_name(name)?;
        let path = self.data_dir.join(&name);
        let raw =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("{} is not valid JSON", name))?;
        Ok(Document {
            filename: name,
            raw,
            value,
        })
    }

    /// Read a document's text without parsing it, for callers that
    /// want to validate or display possibly-broken content.
    pub fn load_raw(&self, name: &str) -> Result<String> {
        let name = sanitize_name(name)?;
        let path = self.data_dir.join(&name);
        fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
    }

    /// Write a document, snapshotting the existing content to the
    /// backup directory first. New files get no backup.
    pub fn save(&self, name: &str, text: &str) -> Result<SaveReceipt> {
        let name = sanitize_name(name)?;
        let path = self.data_dir.join(&name);
        let backup = if path.exists() {
            Some(self.snapshot(&name, &path, None)?)
        } else {
            None
        };
        write_atomic(&path, text)?;
        if let Some(keep) = self.keep_backups {
            self.prune_backups(&name, keep)?;
        }
        Ok(SaveReceipt {
            filename: name,
            backup,
        })
    }

    /// List this file's backups, newest first.
    pub fn list_backups(&self, name: &str) -> Result<Vec<BackupEntry>> {
        let name = sanitize_name(name)?;
        let stem = stem_of(&name);
        let mut entries = Vec::new();
        let dir = fs::read_dir(&self.backup_dir)
            .with_context(|| format!("reading {}", self.backup_dir.display()))?;
        for entry in dir {
            let entry = entry?;
            let backup_name = entry.file_name().to_string_lossy().to_string();
            if !is_backup_of(stem, &backup_name) {
                continue;
            }
            let meta = entry.metadata()?;
            entries.push(BackupEntry {
                name: backup_name,
                size: meta.len(),
                created: meta.modified().ok().map(DateTime::from),
            });
        }
        // Timestamped names sort chronologically, so a name-descending
        // order is newest first even when mtimes are unreliable.
        entries.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(entries)
    }

    /// Overwrite a document with one of its backups, snapshotting the
    /// current content as a pre-restore backup first.
    pub fn restore(&self, name: &str, backup_name: &str) -> Result<SaveReceipt> {
        let name = sanitize_name(name)?;
        let backup_name = sanitize_name(backup_name)?;
        let backup_path = self.backup_dir.join(&backup_name);
        if !backup_path.exists() {
            bail!("backup {} not found", backup_name);
        }
        let content = fs::read_to_string(&backup_path)
            .with_context(|| format!("reading {}", backup_path.display()))?;
        let path = self.data_dir.join(&name);
        let pre_restore = if path.exists() {
            Some(self.snapshot(&name, &path, Some("pre-restore"))?)
        } else {
            None
        };
        write_atomic(&path, &content)?;
        Ok(SaveReceipt {
            filename: name,
            backup: pre_restore,
        })
    }

    pub fn settings(&self) -> Result<Settings> {
        let path = self.data_dir.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Settings::default());
        }
        let raw =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let path = self.data_dir.join(SETTINGS_FILE);
        let text = serde_json::to_string_pretty(settings)?;
        write_atomic(&path, &text)?;
        Ok(())
    }

    fn snapshot(&self, name: &str, path: &Path, tag: Option<&str>) -> Result<String> {
        let stamp = backup_timestamp();
        let backup_name = match tag {
            Some(tag) => format!("{}_{}_{}.json", stem_of(name), tag, stamp),
            None => format!("{}_{}.json", stem_of(name), stamp),
        };
        let backup_path = self.backup_dir.join(&backup_name);
        fs::copy(path, &backup_path)
            .with_context(|| format!("backing up to {}", backup_path.display()))?;
        Ok(backup_name)
    }

    fn prune_backups(&self, name: &str, keep: usize) -> Result<()> {
        let backups = self.list_backups(name)?;
        for old in backups.iter().skip(keep) {
            let path = self.backup_dir.join(&old.name);
            fs::remove_file(&path).with_context(|| format!("pruning {}", path.display()))?;
        }
        Ok(())
    }
}

// Write through a temp file in the same directory and rename into
// place; a failed write leaves the previous document intact. The
// `.tmp` suffix keeps the scratch file out of `list_files`.
fn write_atomic(path: &Path, text: &str) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, text).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

/// UTC ISO-8601 with `:` and `.` replaced so the stamp is a valid
/// filename component on every platform.
fn backup_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}

fn stem_of(name: &str) -> &str {
    name.strip_suffix(".json").unwrap_or(name)
}

// A document's backups are `<stem>_<stamp>.json` and
// `<stem>_pre-restore_<stamp>.json`. The remainder after `<stem>_`
// must have the exact timestamp shape, so a sibling document whose
// name extends the stem (`a_b.json` next to `a.json`) never matches.
fn is_backup_of(stem: &str, backup_name: &str) -> bool {
    let Some(rest) = backup_name
        .strip_prefix(stem)
        .and_then(|r| r.strip_prefix('_'))
        .and_then(|r| r.strip_suffix(".json"))
    else {
        return false;
    };
    let stamp = rest.strip_prefix("pre-restore_").unwrap_or(rest);
    is_backup_stamp(stamp)
}

// Shape produced by backup_timestamp(): 2026-08-30T05-40-33-845Z
fn is_backup_stamp(stamp: &str) -> bool {
    let bytes = stamp.as_bytes();
    if bytes.len() != 24 || bytes[23] != b'Z' {
        return false;
    }
    bytes[..23].iter().enumerate().all(|(i, &b)| match i {
        4 | 7 | 13 | 16 | 19 => b == b'-',
        10 => b == b'T',
        _ => b.is_ascii_digit(),
    })
}

// Reduce a requested name to its final path component so a crafted
// filename cannot escape the data directory.
fn sanitize_name(name: &str) -> Result<String> {
    let cleaned = Path::new(name.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string);
    match cleaned {
        Some(n) if !n.is_empty() => Ok(n),
        _ => bail!("invalid filename '{}'", name),
    }
}
