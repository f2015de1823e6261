//! Zip the staging directory of a download run.

use anyhow::{Context, Result};
use std::fs::File;
use std::io;
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Archive every file under `src_dir` into `dest`, with paths relative to
/// `src_dir` and `/` as separator. Entries are written in file-name order.
/// Returns the number of files written.
pub fn zip_dir(src_dir: &Path, dest: &Path) -> Result<usize> {
    let file = File::create(dest).with_context(|| format!("failed to create {}", dest.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut count = 0usize;
    for entry in WalkDir::new(src_dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", src_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let rel = path
            .strip_prefix(src_dir)
            .with_context(|| format!("{} is outside {}", path.display(), src_dir.display()))?;
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        zip.start_file(name, options)?;
        io::copy(&mut File::open(path)?, &mut zip)?;
        count += 1;
    }
    zip.finish()?;
    tracing::info!(files = count, "created zip file: {}", dest.display());
    Ok(count)
}
