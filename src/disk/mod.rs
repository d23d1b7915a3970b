//! Reading, constructing, and mutating 1541 disk images.
//!
//! A [`Disk`] holds the full sector grid of a 35-track image plus a
//! boolean shadow of the Block Availability Map. All mutation happens
//! in memory; [`Disk::write_to`] serializes the grid back to the
//! exact 174,848-byte layout used by CBM DOS 2.6.
//!
//! Only PRG files are supported for writing, and non-PRG directory
//! entries are invisible when reading. There is no scratch/delete,
//! and tracks 36-40 are neither produced nor validated.

mod bam;
mod directory;
mod error;
mod sector;

pub mod geometry;
pub mod image;

use std::fmt;
use std::io::{Read, Write};

pub use self::bam::BamShadow;
pub use self::directory::{size_to_blocks, DirEntry};
pub use self::error::{DiskError, Result};
pub use self::sector::{ChainLink, Sector, Track};

use self::geometry::{
    image_offset, total_sectors, Location, BLOCK_SIZE, DEFAULT_INTERLEAVE, DIRECTORY_TRACK,
    FIRST_DIRECTORY_SECTOR, IMAGE_SIZE, IMAGE_SIZE_WITH_ERROR_TABLE, MAX_BLOCKS, MAX_DISK_ID_SIZE,
    MAX_FILENAME_SIZE, MAX_TRACKS, PADDING_BYTE, SECTOR_COUNT, SECTOR_SIZE,
};

/// An in-memory 1541 disk image.
pub struct Disk {
    /// Disk label, up to 16 characters. Stored uppercased on the
    /// image; lowercased when read back.
    pub label: String,
    /// Disk id, up to 5 characters.
    pub disk_id: String,
    /// Sector step applied between successive sectors of a file.
    pub interleave: u8,
    pub(crate) tracks: Vec<Track>,
    pub(crate) bam: BamShadow,
}

impl Disk {
    /// Build a fully formatted blank disk.
    pub fn new(label: &str, disk_id: &str, interleave: u8) -> Disk {
        let mut disk = Disk {
            label: label.chars().take(MAX_FILENAME_SIZE).collect(),
            disk_id: disk_id.chars().take(MAX_DISK_ID_SIZE).collect(),
            interleave,
            tracks: (1..=MAX_TRACKS).map(Track::new).collect(),
            bam: BamShadow::new(),
        };
        disk.format_directory();
        disk.format_bam();
        disk.write_bam();
        disk
    }

    /// Parse a disk from the raw bytes of a `.d64` file. Accepts the
    /// plain 174,848-byte layout and the variant with a trailing
    /// error table, which is ignored.
    pub fn load(bytes: &[u8]) -> Result<Disk> {
        match bytes.len() {
            IMAGE_SIZE | IMAGE_SIZE_WITH_ERROR_TABLE => {}
            n => return Err(DiskError::InvalidLayout(n)),
        }

        let mut disk = Disk {
            label: String::new(),
            disk_id: String::new(),
            interleave: DEFAULT_INTERLEAVE,
            tracks: (1..=MAX_TRACKS).map(Track::new).collect(),
            bam: BamShadow::new(),
        };
        for track in 1..=MAX_TRACKS {
            for sector in 0..total_sectors(track) {
                let offset = image_offset(Location(track, sector));
                disk.tracks[track as usize - 1].sectors[sector as usize]
                    .data
                    .copy_from_slice(&bytes[offset..offset + SECTOR_SIZE]);
            }
        }
        disk.read_bam();
        disk.guess_interleave();
        Ok(disk)
    }

    /// Serialize every sector in track order and return the number
    /// of bytes written.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<u64> {
        let mut written = 0u64;
        for track in &self.tracks {
            for sector in &track.sectors {
                writer.write_all(&sector.data)?;
                written += SECTOR_SIZE as u64;
            }
        }
        Ok(written)
    }

    /// Store a PRG on the disk under the given filename.
    ///
    /// The payload is chained through free sectors picked by the
    /// allocator under the disk interleave, a directory entry is
    /// inserted, and the on-image BAM is refreshed. A failure part
    /// way through (disk full) leaves the image inconsistent;
    /// callers that need atomicity should serialize a snapshot
    /// first.
    pub fn add_prg(&mut self, filename: &str, prg: &[u8]) -> Result<()> {
        if prg.is_empty() {
            return Err(DiskError::EmptyPrg);
        }
        let start = self.bam.first_free()?;
        directory::add_file(self, start, filename, prg.len())?;

        let mut location = start;
        let mut buf = prg;
        while buf.len() > BLOCK_SIZE {
            self.bam.allocate(location);
            let (chunk, rest) = buf.split_at(BLOCK_SIZE);
            let next = self.bam.next_free(location, self.interleave)?;
            let sector = self.sector_mut(location);
            sector.set_track_link(next.0);
            sector.set_sector_link(next.1);
            sector.data[2..].copy_from_slice(chunk);
            location = next;
            buf = rest;
        }

        // The tail always holds between 1 and 254 bytes; a full
        // 254-byte tail encodes the (0x00, 0xFF) terminator.
        self.bam.allocate(location);
        let sector = self.sector_mut(location);
        sector.set_track_link(0);
        sector.set_sector_link((buf.len() + 1) as u8);
        sector.data[2..2 + buf.len()].copy_from_slice(buf);

        self.write_bam();
        Ok(())
    }

    /// Drain a reader and store its contents as a PRG.
    pub fn add_prg_from_reader<R: Read>(&mut self, filename: &str, reader: &mut R) -> Result<()> {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        self.add_prg(filename, &buffer)
    }

    /// Return the PRG whose chain starts at the given track and
    /// sector. A link pointing outside the geometry ends the walk,
    /// as does visiting more sectors than the disk holds.
    pub fn extract(&self, track: u8, sector: u8) -> Vec<u8> {
        let mut prg = Vec::new();
        let mut location = Location(track, sector);
        for _ in 0..SECTOR_COUNT {
            if !location.is_valid() {
                break;
            }
            let sector = self.sector(location);
            prg.extend_from_slice(sector.payload());
            match sector.chain_link() {
                ChainLink::Next(next) => location = next,
                ChainLink::Tail { .. } => break,
            }
        }
        prg
    }

    /// Return the first PRG in the directory, or `None` on an empty
    /// disk.
    pub fn extract_boot(&self) -> Option<Vec<u8>> {
        let entry = self.directory().into_iter().next()?;
        Some(self.extract(entry.track, entry.sector))
    }

    /// Collect all PRG entries in directory-chain order.
    pub fn directory(&self) -> Vec<DirEntry> {
        let mut entries = Vec::new();
        let mut location = Location(DIRECTORY_TRACK, FIRST_DIRECTORY_SECTOR);
        for _ in 0..total_sectors(DIRECTORY_TRACK) {
            if !location.is_valid() {
                break;
            }
            let sector = self.sector(location);
            entries.extend(directory::entries_in(sector));
            match sector.chain_link() {
                ChainLink::Next(next) => location = next,
                ChainLink::Tail { .. } => break,
            }
        }
        entries
    }

    /// Rebuild the BAM from the directory: clear the shadow, walk
    /// every file chain plus the BAM/directory chain, mark the
    /// visited sectors used, and re-emit the on-image BAM bytes.
    /// This recovers consistency on images with a stale BAM.
    pub fn validate(&mut self) {
        self.bam.clear();
        let mut starts: Vec<Location> = self
            .directory()
            .iter()
            .map(|entry| Location(entry.track, entry.sector))
            .collect();
        starts.push(Location(DIRECTORY_TRACK, 0));

        for start in starts {
            let mut location = start;
            for _ in 0..SECTOR_COUNT {
                if !location.is_valid() {
                    break;
                }
                self.bam.allocate(location);
                match self.sector(location).chain_link() {
                    ChainLink::Next(next) => location = next,
                    ChainLink::Tail { .. } => break,
                }
            }
        }
        self.write_bam();
    }

    /// Initialize the BAM sector (18,0): chain link to the first
    /// directory sector, the DOS version marker, filler, and the
    /// uppercased label and disk id.
    pub fn format_bam(&mut self) {
        let label: Vec<u8> = self
            .label
            .to_uppercase()
            .bytes()
            .take(MAX_FILENAME_SIZE)
            .collect();
        let id: Vec<u8> = self
            .disk_id
            .to_uppercase()
            .bytes()
            .take(MAX_DISK_ID_SIZE)
            .map(|b| if b == b' ' { PADDING_BYTE } else { b })
            .collect();

        let sector = self.sector_mut(Location(DIRECTORY_TRACK, 0));
        sector.data = [0u8; SECTOR_SIZE];
        sector.set_track_link(DIRECTORY_TRACK);
        sector.set_sector_link(FIRST_DIRECTORY_SECTOR);
        sector.data[2] = b'A';
        for b in sector.data[0x90..0xAA].iter_mut() {
            *b = PADDING_BYTE;
        }
        sector.data[0x90..0x90 + label.len()].copy_from_slice(&label);
        sector.data[0xA2..0xA2 + id.len()].copy_from_slice(&id);

        self.bam.allocate(Location(DIRECTORY_TRACK, 0));
    }

    /// Initialize the first directory sector (18,1) as an empty tail
    /// and reserve it in the shadow.
    pub fn format_directory(&mut self) {
        let sector = self.sector_mut(Location(DIRECTORY_TRACK, FIRST_DIRECTORY_SECTOR));
        sector.data = [0u8; SECTOR_SIZE];
        sector.set_track_link(0);
        sector.set_sector_link(0xFF);
        self.bam.allocate(Location(DIRECTORY_TRACK, FIRST_DIRECTORY_SECTOR));
    }

    /// Zero-fill a track and mark its sectors free in the shadow.
    ///
    /// Panics when `id` is outside 1..=35.
    pub fn format_track(&mut self, id: u8) {
        self.tracks[id as usize - 1] = Track::new(id);
        self.bam.clear_track(id);
    }

    /// The allocation shadow, for inspection.
    pub fn bam(&self) -> &BamShadow {
        &self.bam
    }

    /// Borrow a single sector.
    ///
    /// Panics when the location is outside the disk geometry.
    pub fn sector(&self, location: Location) -> &Sector {
        &self.tracks[location.0 as usize - 1].sectors[location.1 as usize]
    }

    pub(crate) fn sector_mut(&mut self, location: Location) -> &mut Sector {
        &mut self.tracks[location.0 as usize - 1].sectors[location.1 as usize]
    }

    /// Re-derive the on-image BAM bytes from the shadow.
    pub(crate) fn write_bam(&mut self) {
        let data = &mut self.tracks[DIRECTORY_TRACK as usize - 1].sectors[0].data;
        self.bam.encode(data);
    }

    /// Read label, disk id, and the allocation bitmap from the BAM
    /// sector.
    fn read_bam(&mut self) {
        let data = self.sector(Location(DIRECTORY_TRACK, 0)).data;

        let mut label = String::new();
        for &b in &data[0x90..0x90 + MAX_FILENAME_SIZE] {
            if b == PADDING_BYTE {
                break;
            }
            label.push((b as char).to_ascii_lowercase());
        }
        self.label = label;

        let mut disk_id = String::new();
        for &b in &data[0xA2..0xA2 + MAX_DISK_ID_SIZE] {
            let b = if b == PADDING_BYTE { b' ' } else { b };
            disk_id.push((b as char).to_ascii_lowercase());
        }
        self.disk_id = disk_id;

        self.bam.decode(&data);
    }

    /// Recover the interleave a loaded image was written with: the
    /// first file whose start sector links forward on its own track
    /// reveals the step. Falls back to the default of 10.
    fn guess_interleave(&mut self) {
        self.interleave = DEFAULT_INTERLEAVE;
        for entry in self.directory() {
            let start = self.sector(Location(entry.track, entry.sector));
            let (track_link, sector_link) = (start.track_link(), start.sector_link());
            if track_link == entry.track && entry.sector < sector_link {
                self.interleave = sector_link - entry.sector;
                return;
            }
        }
    }
}

impl fmt::Display for Disk {
    /// Render a human readable directory listing.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{:?} {:?}", self.label, self.disk_id)?;
        let mut blocks_free = MAX_BLOCKS as i64;
        for entry in self.directory() {
            writeln!(f, "{:3} {:?} prg", entry.block_size, entry.filename)?;
            blocks_free -= i64::from(entry.block_size);
        }
        writeln!(f, "{:3} blocks free", blocks_free)
    }
}
