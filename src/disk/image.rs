//! Host filesystem adapters around the in-memory engine: the engine
//! itself only consumes and produces byte buffers.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap::MmapOptions;

use crate::disk::error::Result;
use crate::disk::Disk;
use crate::util;

/// Open an existing disk image file. The file is mapped read-only
/// and parsed into an in-memory [`Disk`]; the mapping is dropped
/// afterwards.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Disk> {
    let file = File::open(path)?;
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    Disk::load(&mmap)
}

/// Serialize the disk to a file, creating or overwriting it. Returns
/// the number of bytes written.
pub fn save<P: AsRef<Path>>(disk: &Disk, path: P) -> Result<u64> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let written = disk.write_to(&mut writer)?;
    writer.flush()?;
    Ok(written)
}

/// Read a PRG from the host filesystem and add it to the disk under
/// a normalized rendition of `filename`.
pub fn add_file<P: AsRef<Path>>(disk: &mut Disk, path: P, filename: &str) -> Result<()> {
    let prg = fs::read(path)?;
    disk.add_prg(&util::normalize_filename(filename), &prg)
}

/// Write every PRG in the directory to `out_dir` as
/// `<filename>.prg`, and return the written paths. Forward slashes
/// are stripped from filenames; entries whose name comes out empty
/// get a synthetic `fileN` name. Duplicate names overwrite each
/// other.
pub fn extract_to_dir<P: AsRef<Path>>(disk: &Disk, out_dir: P) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for (index, entry) in disk.directory().iter().enumerate() {
        let mut filename: String = entry.filename.chars().filter(|&c| c != '/').collect();
        if filename.is_empty() {
            filename = format!("file{}", index);
        }
        let path = out_dir.as_ref().join(filename + ".prg");
        fs::write(&path, disk.extract(entry.track, entry.sector))?;
        paths.push(path);
    }
    Ok(paths)
}
