// src/fs/mod.rs

//! Filesystem seam for every persisted document (config, submission store,
//! verification log).
//!
//! Documents are always read and written whole. `write` replaces the target
//! in one step so readers never observe a partially written document.

use std::fmt::Debug;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

pub mod mock;

pub use mock::MockFileSystem;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
            }
        }

        // Write a sibling temp file, then rename over the target.
        let mut tmp_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        let mut file =
            fs::File::create(&tmp_path).with_context(|| format!("creating file {:?}", tmp_path))?;
        file.write_all(contents)
            .with_context(|| format!("writing to file {:?}", tmp_path))?;
        file.sync_all()
            .with_context(|| format!("syncing file {:?}", tmp_path))?;
        drop(file);

        fs::rename(&tmp_path, path)
            .with_context(|| format!("replacing {:?} with {:?}", path, tmp_path))?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}
