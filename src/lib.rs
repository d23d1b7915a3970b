//! This is a Rust library for working with disk images in the
//! Commodore 1541's `.d64` container format, as used by the
//! legendary Commodore 64 home computer.
//!
//! Features:
//!
//! * Create freshly formatted 35-track disk images.
//! * Load existing images and list their directory.
//! * Add PRG files under a chosen sector interleave, emulating the
//! outward-growth allocation of CBM DOS 2.6.
//! * Extract PRG files by walking their sector chains.
//! * Rebuild ("validate") the Block Availability Map from the
//! directory.
//! * Serialize back to the exact 174,848-byte binary layout.
//! * A sample `d64` program for operating on disk images from the
//! command line.
//!
//! Current shortcomings:
//!
//! * Only PRG files can be written; DEL/SEQ/USR/REL entries are
//! ignored when reading.
//! * Files cannot be scratched.
//! * 40-track images and attached error tables are not produced.
//! (Images with an error table are accepted on load, and the table
//! is ignored.)
//!
//! # Example
//!
//! The following example builds a blank disk, stores a small PRG on
//! it, and round-trips the result through the binary image format:
//!
//! ```
//! use d64::Disk;
//!
//! let mut disk = Disk::new("demo disk", "dd 2a", 10);
//! disk.add_prg("intro", &[0x01, 0x08, 0x0b, 0x08, 0x0a, 0x00])
//!     .unwrap();
//!
//! let mut image = Vec::new();
//! disk.write_to(&mut image).unwrap();
//! assert_eq!(image.len(), 174_848);
//!
//! let loaded = Disk::load(&image).unwrap();
//! assert_eq!(loaded.label, "demo disk");
//! let entries = loaded.directory();
//! assert_eq!(entries.len(), 1);
//! assert_eq!(entries[0].filename, "intro");
//! ```
//!
//! A directory listing in the familiar shape is available through
//! the `Display` implementation on `Disk`, and the allocation state
//! can be inspected through the `Debug` implementation on the BAM
//! shadow returned by `Disk::bam()`.

pub mod disk;

mod util;

pub use crate::disk::{size_to_blocks, BamShadow, DirEntry, Disk, DiskError, Result};
pub use crate::util::normalize_filename;
