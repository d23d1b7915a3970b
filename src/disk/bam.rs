//! The Block Availability Map, kept in two forms: a boolean shadow
//! grid that drives every allocation decision, and the packed
//! on-image bytes in the BAM sector, which are re-derived from the
//! shadow after each mutation.
//!
//! The on-image encoding stores four bytes per track at offset 4 of
//! track 18 sector 0: a free-sector count followed by three bitmap
//! bytes in which a set bit means the sector is free. The shadow
//! tracks 24 slots per track so it lines up with the three bitmap
//! bytes; slots beyond a track's physical sector count are kept
//! permanently used so the allocator can never hand them out.

use std::fmt;
use std::fmt::Write;

use crate::disk::error::{DiskError, Result};
use crate::disk::geometry::{
    total_sectors, Location, DIRECTORY_INTERLEAVE, DIRECTORY_TRACK, MAX_TRACKS, SECTOR_SIZE,
};

/// Sectors representable per track in the three bitmap bytes.
pub const BITMAP_SECTORS: usize = 24;

/// Offset of the first per-track BAM entry within the BAM sector.
const BAM_ENTRIES_OFFSET: usize = 4;
/// Bytes per track entry: free count plus three bitmap bytes.
const BAM_ENTRY_SIZE: usize = 4;

/// In-memory allocation state for every sector of the disk.
#[derive(Clone)]
pub struct BamShadow {
    map: [[bool; BITMAP_SECTORS]; MAX_TRACKS as usize],
}

impl BamShadow {
    /// A shadow with every physical sector free and every impossible
    /// slot used.
    pub fn new() -> BamShadow {
        let mut shadow = BamShadow {
            map: [[false; BITMAP_SECTORS]; MAX_TRACKS as usize],
        };
        shadow.prepare();
        shadow
    }

    #[inline]
    pub fn is_used(&self, location: Location) -> bool {
        self.map[location.0 as usize - 1][location.1 as usize]
    }

    /// Mark a sector as used.
    #[inline]
    pub fn allocate(&mut self, location: Location) {
        self.map[location.0 as usize - 1][location.1 as usize] = true;
    }

    /// Mark every physical sector of a track as free.
    pub fn clear_track(&mut self, track: u8) {
        for sector in 0..total_sectors(track) {
            self.map[track as usize - 1][sector as usize] = false;
        }
    }

    /// Forget all allocations. Used when rebuilding the map from the
    /// directory.
    pub fn clear(&mut self) {
        self.map = [[false; BITMAP_SECTORS]; MAX_TRACKS as usize];
    }

    /// Mark the slots beyond each track's physical sector count as
    /// used. Run before every emit so the bitmaps always show them
    /// as allocated.
    pub fn prepare(&mut self) {
        for track in 1..=MAX_TRACKS {
            for sector in total_sectors(track)..BITMAP_SECTORS as u8 {
                self.map[track as usize - 1][sector as usize] = true;
            }
        }
    }

    /// Render the shadow into the 140 BAM entry bytes of the given
    /// BAM sector data.
    pub fn encode(&mut self, data: &mut [u8; SECTOR_SIZE]) {
        self.prepare();
        let mut offset = BAM_ENTRIES_OFFSET;
        for track in 1..=MAX_TRACKS {
            let total = total_sectors(track);
            let mut free = total;
            let mut bitmap = [0u8; 3];
            for sector in 0..BITMAP_SECTORS as u8 {
                if self.map[track as usize - 1][sector as usize] {
                    if sector < total {
                        free -= 1;
                    }
                    bitmap[sector as usize / 8] |= 1 << (sector % 8);
                }
            }
            data[offset] = free;
            for (i, bits) in bitmap.iter().enumerate() {
                data[offset + 1 + i] = bits ^ 0xFF;
            }
            offset += BAM_ENTRY_SIZE;
        }
    }

    /// Rebuild the shadow from the BAM entry bytes of the given BAM
    /// sector data. The stored free counts are informational only;
    /// the bitmaps are authoritative.
    pub fn decode(&mut self, data: &[u8; SECTOR_SIZE]) {
        for track in 1..=MAX_TRACKS {
            let offset = BAM_ENTRIES_OFFSET + (track as usize - 1) * BAM_ENTRY_SIZE;
            let bitmap = &data[offset + 1..offset + 4];
            for sector in 0..total_sectors(track) {
                let free = bitmap[sector as usize / 8] & (1 << (sector % 8)) != 0;
                self.map[track as usize - 1][sector as usize] = !free;
            }
        }
        self.prepare();
    }

    /// Return the first unallocated sector on the disk, scanning
    /// from track 1 and skipping the directory track. Picks the
    /// start of a new file chain.
    pub fn first_free(&self) -> Result<Location> {
        for track in 1..=MAX_TRACKS {
            if track == DIRECTORY_TRACK {
                continue;
            }
            for sector in 0..total_sectors(track) {
                let location = Location(track, sector);
                if !self.is_used(location) {
                    return Ok(location);
                }
            }
        }
        Err(DiskError::DiskFull)
    }

    /// Return the next unallocated sector after `from`, stepping by
    /// the interleave and wrapping within the track before moving
    /// outward to higher tracks. The directory track is skipped
    /// unless the walk starts there, in which case the directory
    /// interleave applies instead. Tracks below the current one are
    /// never revisited, matching the outward growth of CBM DOS.
    pub fn next_free(&self, from: Location, interleave: u8) -> Result<Location> {
        let Location(start_track, mut sector) = from;
        let expanding_directory = start_track == DIRECTORY_TRACK;
        let step = if expanding_directory {
            DIRECTORY_INTERLEAVE
        } else {
            interleave
        };

        for track in start_track..=MAX_TRACKS {
            if !expanding_directory && track == DIRECTORY_TRACK {
                continue;
            }
            let total = total_sectors(track);
            sector = (sector + step) % total;
            for s in sector..total {
                let location = Location(track, s);
                if !self.is_used(location) {
                    return Ok(location);
                }
            }
            for s in 0..total {
                let location = Location(track, s);
                if !self.is_used(location) {
                    return Ok(location);
                }
            }
        }
        Err(DiskError::DiskFull)
    }

    /// Count the free sectors outside the directory track.
    pub fn blocks_free(&self) -> usize {
        let mut free = 0;
        for track in 1..=MAX_TRACKS {
            if track == DIRECTORY_TRACK {
                continue;
            }
            for sector in 0..total_sectors(track) {
                if !self.is_used(Location(track, sector)) {
                    free += 1;
                }
            }
        }
        free
    }
}

impl Default for BamShadow {
    fn default() -> BamShadow {
        BamShadow::new()
    }
}

impl fmt::Debug for BamShadow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for track in 1..=MAX_TRACKS {
            let total = total_sectors(track);
            let used = (0..total)
                .filter(|&s| self.is_used(Location(track, s)))
                .count();
            write!(f, "t{:02}: [{:02}/{:02}] ", track, total as usize - used, total)?;
            for sector in 0..total {
                let c = if self.is_used(Location(track, sector)) {
                    'x'
                } else {
                    '.'
                };
                f.write_char(c)?;
            }
            f.write_char('\n')?;
        }
        writeln!(f, "{} blocks free.", self.blocks_free())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_shadow() {
        let shadow = BamShadow::new();
        assert!(!shadow.is_used(Location(1, 0)));
        assert!(!shadow.is_used(Location(18, 0)));
        // Impossible slots are born used.
        assert!(shadow.map[0][21]);
        assert!(shadow.map[17][19]);
        assert!(shadow.map[34][17]);
        assert_eq!(shadow.blocks_free(), 664);
    }

    #[test]
    fn test_encode_fresh_format() {
        let mut shadow = BamShadow::new();
        shadow.allocate(Location(18, 0));
        shadow.allocate(Location(18, 1));

        let mut data = [0u8; SECTOR_SIZE];
        shadow.encode(&mut data);

        // Track 1: 21 sectors, all free.
        assert_eq!(&data[4..8], &[21, 0xFF, 0xFF, 0x1F]);
        // Track 17 is the last 21-sector track.
        assert_eq!(&data[4 + 16 * 4..4 + 17 * 4], &[21, 0xFF, 0xFF, 0x1F]);
        // Track 18: BAM sector and first directory sector allocated.
        assert_eq!(&data[4 + 17 * 4..4 + 18 * 4], &[17, 0xFC, 0xFF, 0x07]);
        // Tracks 19, 25, and 31 head the remaining sector-count zones.
        assert_eq!(&data[4 + 18 * 4..4 + 19 * 4], &[19, 0xFF, 0xFF, 0x07]);
        assert_eq!(&data[4 + 24 * 4..4 + 25 * 4], &[18, 0xFF, 0xFF, 0x03]);
        assert_eq!(&data[4 + 30 * 4..4 + 31 * 4], &[17, 0xFF, 0xFF, 0x01]);
    }

    #[test]
    fn test_codec_round_trip() {
        let mut shadow = BamShadow::new();
        shadow.allocate(Location(18, 0));
        shadow.allocate(Location(18, 1));
        shadow.allocate(Location(1, 0));
        shadow.allocate(Location(1, 10));
        shadow.allocate(Location(35, 16));

        let mut data = [0u8; SECTOR_SIZE];
        shadow.encode(&mut data);

        let mut decoded = BamShadow::new();
        decoded.decode(&data);
        for track in 1..=MAX_TRACKS {
            for sector in 0..total_sectors(track) {
                let location = Location(track, sector);
                assert_eq!(
                    decoded.is_used(location),
                    shadow.is_used(location),
                    "mismatch at {}",
                    location
                );
            }
        }
    }

    #[test]
    fn test_free_count_matches_bitmap() {
        let mut shadow = BamShadow::new();
        shadow.allocate(Location(18, 0));
        shadow.allocate(Location(18, 1));
        for sector in [0u8, 5, 9, 13] {
            shadow.allocate(Location(7, sector));
        }

        let mut data = [0u8; SECTOR_SIZE];
        shadow.encode(&mut data);
        for track in 1..=MAX_TRACKS {
            let offset = 4 + (track as usize - 1) * 4;
            let free_bits: u32 = data[offset + 1..offset + 4]
                .iter()
                .map(|b| b.count_ones())
                .sum();
            let dead_slots = BITMAP_SECTORS as u32 - total_sectors(track) as u32;
            assert_eq!(
                data[offset] as u32,
                free_bits,
                "free count vs bitmap on track {}",
                track
            );
            // Every impossible slot reads as used.
            let used_bits: u32 = data[offset + 1..offset + 4]
                .iter()
                .map(|b| (!b).count_ones())
                .sum();
            assert!(used_bits >= dead_slots);
        }
    }

    #[test]
    fn test_first_free_skips_directory_track() {
        let mut shadow = BamShadow::new();
        assert_eq!(shadow.first_free().unwrap(), Location(1, 0));

        // Fill tracks 1-17 entirely.
        for track in 1..=17 {
            for sector in 0..total_sectors(track) {
                shadow.allocate(Location(track, sector));
            }
        }
        assert_eq!(shadow.first_free().unwrap(), Location(19, 0));
    }

    #[test]
    fn test_next_free_interleave_walk() {
        let shadow = BamShadow::new();
        // Interleave 10 on a 21-sector track: 0 -> 10 -> 20 -> 9.
        assert_eq!(shadow.next_free(Location(1, 0), 10).unwrap(), Location(1, 10));
        assert_eq!(shadow.next_free(Location(1, 10), 10).unwrap(), Location(1, 20));
        assert_eq!(shadow.next_free(Location(1, 20), 10).unwrap(), Location(1, 9));
    }

    #[test]
    fn test_next_free_scans_forward_then_wraps() {
        let mut shadow = BamShadow::new();
        for sector in 10..21 {
            shadow.allocate(Location(1, sector));
        }
        // The stepped position and everything after it is taken, so
        // the scan wraps to the start of the track.
        assert_eq!(shadow.next_free(Location(1, 0), 10).unwrap(), Location(1, 0));
    }

    #[test]
    fn test_next_free_skips_directory_track() {
        let mut shadow = BamShadow::new();
        for sector in 0..total_sectors(17) {
            shadow.allocate(Location(17, sector));
        }
        let next = shadow.next_free(Location(17, 2), 10).unwrap();
        assert_eq!(next.0, 19);
    }

    #[test]
    fn test_next_free_directory_expansion() {
        let mut shadow = BamShadow::new();
        shadow.allocate(Location(18, 0));
        shadow.allocate(Location(18, 1));
        // Directory growth uses interleave 3 and stays on track 18.
        assert_eq!(
            shadow.next_free(Location(18, 1), 10).unwrap(),
            Location(18, 4)
        );
        shadow.allocate(Location(18, 4));
        assert_eq!(
            shadow.next_free(Location(18, 4), 10).unwrap(),
            Location(18, 7)
        );
    }

    #[test]
    fn test_disk_full() {
        let mut shadow = BamShadow::new();
        for track in 1..=MAX_TRACKS {
            for sector in 0..total_sectors(track) {
                shadow.allocate(Location(track, sector));
            }
        }
        assert!(matches!(shadow.first_free(), Err(DiskError::DiskFull)));
        assert!(matches!(
            shadow.next_free(Location(1, 0), 10),
            Err(DiskError::DiskFull)
        ));
    }
}
