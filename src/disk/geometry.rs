//! The fixed track and sector layout of a 35-track 1541 disk.

use std::fmt;

/// Bytes in a raw sector, including the two link bytes.
pub const SECTOR_SIZE: usize = 256;
/// Usable payload bytes per sector.
pub const BLOCK_SIZE: usize = 254;
/// Data blocks available to files on a freshly formatted disk.
pub const MAX_BLOCKS: usize = 664;

/// The last track in use. CBM DOS never touches tracks 36-40.
pub const MAX_TRACKS: u8 = 35;
/// The track holding the BAM sector and the directory chain.
pub const DIRECTORY_TRACK: u8 = 18;
/// The first directory sector, pointed to from the BAM sector.
pub const FIRST_DIRECTORY_SECTOR: u8 = 1;

/// Sector step used between successive sectors of a file unless the
/// caller picks another one.
pub const DEFAULT_INTERLEAVE: u8 = 10;
/// Sector step used when growing the directory chain.
pub const DIRECTORY_INTERLEAVE: u8 = 3;

pub const MAX_FILENAME_SIZE: usize = 16;
pub const MAX_DISK_ID_SIZE: usize = 5;

/// Filler byte used for names and padding on the image (a shifted
/// space in PETSCII).
pub const PADDING_BYTE: u8 = 0xA0;

/// Total sectors on a 35-track disk.
pub const SECTOR_COUNT: usize = 683;
/// Size in bytes of a plain 35-track image: 683 sectors of 256 bytes.
pub const IMAGE_SIZE: usize = SECTOR_COUNT * SECTOR_SIZE;
/// Size of an image with a trailing one-byte-per-sector error table.
pub const IMAGE_SIZE_WITH_ERROR_TABLE: usize = IMAGE_SIZE + SECTOR_COUNT;

static SECTORS_PER_TRACK: [u8; 36] = [
    0, // There is no track 0.
    21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, // 1-17
    19, 19, 19, 19, 19, 19, 19, // 18-24
    18, 18, 18, 18, 18, 18, // 25-30
    17, 17, 17, 17, 17, // 31-35
];

/// Return the number of sectors on the given track, or 0 for tracks
/// outside the 1..=35 range.
#[inline]
pub fn total_sectors(track: u8) -> u8 {
    if track > MAX_TRACKS {
        return 0;
    }
    SECTORS_PER_TRACK[track as usize]
}

/// A track and sector pair.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub struct Location(pub u8, pub u8);

impl Location {
    #[inline]
    pub fn new(track: u8, sector: u8) -> Location {
        Location(track, sector)
    }

    /// Return true if this location exists on a 35-track disk.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.0 >= 1 && self.0 <= MAX_TRACKS && self.1 < total_sectors(self.0)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{})", self.0, self.1)
    }
}

/// Return the byte offset of a sector within the linear image.
/// There are no inter-track gaps.
pub fn image_offset(location: Location) -> usize {
    let Location(track, sector) = location;
    let mut offset = sector as usize * SECTOR_SIZE;
    for t in 1..track {
        offset += total_sectors(t) as usize * SECTOR_SIZE;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_consistency() {
        let mut sectors = 0usize;
        for track in 1..=MAX_TRACKS {
            sectors += total_sectors(track) as usize;
        }
        assert_eq!(sectors, 683);
        assert_eq!(sectors * SECTOR_SIZE, IMAGE_SIZE);
    }

    #[test]
    fn test_total_sectors_out_of_range() {
        assert_eq!(total_sectors(0), 0);
        assert_eq!(total_sectors(36), 0);
        assert_eq!(total_sectors(0xFF), 0);
    }

    #[test]
    fn test_image_offset() {
        let cases: &[(u8, u8, usize)] = &[
            (1, 0, 0),
            (1, 1, 0x100),
            (1, 20, 0x1400),
            (2, 0, 0x1500),
            (2, 1, 0x1600),
            (3, 0, 0x2a00),
            (3, 1, 0x2b00),
            (17, 0, 0x15000),
            (18, 0, 0x16500),
            (35, 10, 0x2a400),
        ];
        for &(track, sector, want) in cases {
            assert_eq!(
                image_offset(Location(track, sector)),
                want,
                "offset of ({},{})",
                track,
                sector
            );
        }
    }
}
