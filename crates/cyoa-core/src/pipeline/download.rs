//! Image files on disk: collision-free names and `.part`-then-rename writes.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::CyoaError;
use crate::url_model::{split_extension, truncate_bytes, NAME_MAX};

/// Suffix of an image file while it is being written.
pub const TEMP_SUFFIX: &str = ".part";

/// Longest name handed out; `<name>.part` must still fit in one path component.
const MAX_NAME_LEN: usize = NAME_MAX - TEMP_SUFFIX.len();

/// Longer "extensions" are treated as part of the stem.
const MAX_EXTENSION_LEN: usize = 16;

/// Filenames handed out during one download pass.
///
/// A name is free when this table has not handed it out and no file by that
/// name already exists in the directory. Taken names get `_1`, `_2`, ...
/// inserted before the extension. The stem is shortened as needed so that
/// stem, counter, extension and `.part` fit in `NAME_MAX`.
#[derive(Debug)]
pub struct FilenameTable {
    dir: PathBuf,
    used: HashSet<String>,
}

impl FilenameTable {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            used: HashSet::new(),
        }
    }

    fn is_taken(&self, name: &str) -> bool {
        self.used.contains(name) || self.dir.join(name).exists()
    }

    /// Reserve a free name derived from `wanted`.
    pub fn claim(&mut self, wanted: &str) -> String {
        let (stem, ext) = match split_extension(wanted) {
            (_, ext) if ext.len() > MAX_EXTENSION_LEN => (wanted, ""),
            split => split,
        };
        let mut n = 0u32;
        loop {
            let counter = if n == 0 { String::new() } else { format!("_{n}") };
            let room = MAX_NAME_LEN - ext.len() - counter.len();
            let name = format!("{}{counter}{ext}", truncate_bytes(stem, room));
            if !self.is_taken(&name) {
                self.used.insert(name.clone());
                return name;
            }
            n += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

/// Write `bytes` to `dir/name` through `dir/name.part`.
pub fn write_image(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, CyoaError> {
    let final_path = dir.join(name);
    let temp_path = dir.join(format!("{name}{TEMP_SUFFIX}"));
    if let Err(e) = fs::write(&temp_path, bytes) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    fs::rename(&temp_path, &final_path)?;
    debug!(bytes = bytes.len(), "wrote {}", final_path.display());
    Ok(final_path)
}
