//! Open-workbook registry
//!
//! Commands in one script share in-memory workbooks through a registry keyed
//! by absolute file path. A workbook stays registered while commands ask to
//! keep it open and is written to disk when a command releases it, or when
//! `CloseExcelWorkbook` runs.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::Lazy;
use tsxl_core::Workbook;
use tsxl_xlsx::{XlsxReader, XlsxWriter};

use crate::error::{CommandError, Result};

/// How a registered workbook was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenMode {
    /// `r`: opened for reading; never written back
    Read,
    /// `w`: created or opened for writing; flushed on release
    Write,
}

impl OpenMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpenMode::Read => "r",
            OpenMode::Write => "w",
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpenMode {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "r" | "R" => Ok(OpenMode::Read),
            "w" | "W" => Ok(OpenMode::Write),
            other => Err(CommandError::invalid_value(other, "open mode must be r or w")),
        }
    }
}

/// A workbook checked out of the registry
#[derive(Debug)]
pub struct OpenWorkbook {
    pub workbook: Workbook,
    pub mode: OpenMode,
    /// Whether the workbook came from the registry rather than from disk
    pub was_registered: bool,
}

static GLOBAL: Lazy<Arc<WorkbookRegistry>> = Lazy::new(|| Arc::new(WorkbookRegistry::new()));

/// Map from normalized path to open workbook
#[derive(Debug, Default)]
pub struct WorkbookRegistry {
    entries: Mutex<HashMap<PathBuf, (Workbook, OpenMode)>>,
}

impl WorkbookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> Arc<WorkbookRegistry> {
        Arc::clone(&GLOBAL)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, (Workbook, OpenMode)>> {
        // A panic while holding the lock leaves the map itself consistent
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Workbook for reading: the registered one, or a fresh read from disk
    ///
    /// The workbook is taken out of the registry until [`release`](Self::release).
    pub fn open_for_read(&self, path: &Path) -> Result<OpenWorkbook> {
        let key = normalize_path(path);
        if let Some((workbook, mode)) = self.lock().remove(&key) {
            log::debug!("reusing open workbook {} ({})", key.display(), mode);
            return Ok(OpenWorkbook {
                workbook,
                mode,
                was_registered: true,
            });
        }
        if !key.exists() {
            return Err(CommandError::FileNotFound(key));
        }
        log::info!("opening workbook {} for reading", key.display());
        Ok(OpenWorkbook {
            workbook: XlsxReader::read_file(&key)?,
            mode: OpenMode::Read,
            was_registered: false,
        })
    }

    /// Workbook for writing: the registered one, the file on disk, or a new
    /// empty workbook; the mode is always `w`
    pub fn open_for_write(&self, path: &Path) -> Result<OpenWorkbook> {
        let key = normalize_path(path);
        if let Some((workbook, mode)) = self.lock().remove(&key) {
            if mode == OpenMode::Read {
                log::info!("workbook {} was opened for reading, now writing", key.display());
            }
            return Ok(OpenWorkbook {
                workbook,
                mode: OpenMode::Write,
                was_registered: true,
            });
        }
        let workbook = if key.exists() {
            log::info!("opening workbook {} for writing", key.display());
            XlsxReader::read_file(&key)?
        } else {
            log::info!("creating workbook {}", key.display());
            Workbook::empty()
        };
        Ok(OpenWorkbook {
            workbook,
            mode: OpenMode::Write,
            was_registered: false,
        })
    }

    /// Register a workbook, replacing any entry for the same path
    pub fn put(&self, path: &Path, workbook: Workbook, mode: OpenMode) {
        let key = normalize_path(path);
        log::debug!("registering workbook {} ({})", key.display(), mode);
        self.lock().insert(key, (workbook, mode));
    }

    /// Hand a workbook back after a command
    ///
    /// With `keep_open` the workbook is registered again. Otherwise a `w`
    /// workbook is written to `path` and nothing stays registered. A
    /// workbook that fails to write stays registered so it can still be
    /// closed to another path.
    pub fn release(
        &self,
        path: &Path,
        workbook: Workbook,
        mode: OpenMode,
        keep_open: bool,
    ) -> Result<()> {
        if keep_open {
            self.put(path, workbook, mode);
            return Ok(());
        }
        let key = normalize_path(path);
        self.lock().remove(&key);
        if mode == OpenMode::Write {
            if let Err(e) = write_workbook(&workbook, &key) {
                log::warn!("{} was not written and stays open", key.display());
                self.lock().insert(key, (workbook, mode));
                return Err(e);
            }
        }
        Ok(())
    }

    /// Check out a workbook, run `f` on it and release it
    ///
    /// If `f` fails, a workbook that was registered (or is meant to stay
    /// open) goes back into the registry unchanged in mode and unwritten.
    pub fn with_workbook<T, F>(
        &self,
        path: &Path,
        mode: OpenMode,
        keep_open: bool,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut Workbook) -> Result<T>,
    {
        let mut open = match mode {
            OpenMode::Read => self.open_for_read(path)?,
            OpenMode::Write => self.open_for_write(path)?,
        };
        match f(&mut open.workbook) {
            Ok(value) => {
                self.release(path, open.workbook, open.mode, keep_open)?;
                Ok(value)
            }
            Err(e) => {
                if open.was_registered || keep_open {
                    self.put(path, open.workbook, open.mode);
                }
                Err(e)
            }
        }
    }

    /// Flush a `w` workbook (to `new_path` when given) and unregister it
    ///
    /// Returns false when no workbook is open at `path`. If the write
    /// fails the workbook stays registered at `path`.
    pub fn close(&self, path: &Path, new_path: Option<&Path>) -> Result<bool> {
        let key = normalize_path(path);
        let Some((workbook, mode)) = self.lock().remove(&key) else {
            return Ok(false);
        };
        match mode {
            OpenMode::Write => {
                let target = new_path.map(normalize_path).unwrap_or_else(|| key.clone());
                if let Err(e) = write_workbook(&workbook, &target) {
                    self.lock().entry(key).or_insert((workbook, mode));
                    return Err(e);
                }
            }
            OpenMode::Read => log::info!("closed workbook {} (read only)", key.display()),
        }
        Ok(true)
    }

    /// Unregister without writing
    pub fn discard(&self, path: &Path) -> bool {
        self.lock().remove(&normalize_path(path)).is_some()
    }

    pub fn is_open(&self, path: &Path) -> bool {
        self.lock().contains_key(&normalize_path(path))
    }

    pub fn mode(&self, path: &Path) -> Option<OpenMode> {
        self.lock().get(&normalize_path(path)).map(|(_, m)| *m)
    }

    /// Sorted paths of all open workbooks
    pub fn open_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Write every `w` workbook and empty the registry
    ///
    /// Workbooks that fail to write stay registered; the first error is
    /// returned after every workbook has been tried.
    pub fn close_all(&self) -> Result<usize> {
        let mut entries: Vec<(PathBuf, (Workbook, OpenMode))> = self.lock().drain().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let mut written = 0;
        let mut first_error = None;
        for (path, (workbook, mode)) in entries {
            if mode != OpenMode::Write {
                continue;
            }
            match write_workbook(&workbook, &path) {
                Ok(()) => written += 1,
                Err(e) => {
                    log::warn!("{} was not written and stays open", path.display());
                    self.lock().entry(path).or_insert((workbook, mode));
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }
}

fn write_workbook(workbook: &Workbook, path: &Path) -> Result<()> {
    if workbook.is_empty() {
        return Err(CommandError::other(format!(
            "workbook {} has no worksheets to write",
            path.display()
        )));
    }
    log::info!("writing workbook {}", path.display());
    XlsxWriter::write_file(workbook, path)?;
    Ok(())
}

/// Absolute, lexically cleaned form of a path used as the registry key
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let mut out = PathBuf::new();
    for component in absolute.components() {
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
