//! Archive extraction.
//!
//! Each daily raster is distributed as a zip archive holding a single GeoTIFF.

use crate::error::RasterError;

use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// A file in the scratch directory which is removed when dropped.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Path of the scratch file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), "failed to remove scratch file: {}", err);
            }
        }
    }
}

/// Extracts one member of a zip archive into a scratch file.
///
/// Returns a [ScratchFile] guard; the extracted file is deleted when it goes out of scope.
///
/// # Arguments
///
/// * `archive`: Zip archive data
/// * `member`: Name of the file to extract
/// * `scratch_dir`: Directory in which to write the extracted file
pub fn extract_member(
    archive: &[u8],
    member: &str,
    scratch_dir: &Path,
) -> Result<ScratchFile, RasterError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;
    let mut entry = zip.by_name(member)?;
    std::fs::create_dir_all(scratch_dir)?;
    // The guard is created before writing so that partial output is also cleaned up.
    let scratch = ScratchFile {
        path: scratch_dir.join(member),
    };
    let mut writer = BufWriter::new(File::create(scratch.path())?);
    std::io::copy(&mut entry, &mut writer)?;
    writer.flush()?;
    Ok(scratch)
}
