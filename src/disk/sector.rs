//! Sectors, tracks, and the chain links between sectors of a file.

use crate::disk::geometry::{total_sectors, Location, SECTOR_SIZE};

/// The decoded meaning of a sector's first two bytes.
///
/// A non-zero track byte links to the next sector of the chain. A
/// zero track byte marks the tail, and the second byte then encodes
/// how many bytes of the sector are in use, counting the link bytes
/// themselves.
#[derive(Debug, PartialEq, Eq)]
pub enum ChainLink {
    Next(Location),
    Tail { used: usize },
}

/// A single 256-byte sector. Bytes 0 and 1 are the chain link, the
/// remaining 254 bytes are payload.
#[derive(Clone)]
pub struct Sector {
    pub id: u8,
    pub data: [u8; SECTOR_SIZE],
}

impl Sector {
    pub fn new(id: u8) -> Sector {
        Sector {
            id,
            data: [0u8; SECTOR_SIZE],
        }
    }

    #[inline]
    pub fn track_link(&self) -> u8 {
        self.data[0]
    }

    #[inline]
    pub fn sector_link(&self) -> u8 {
        self.data[1]
    }

    #[inline]
    pub fn set_track_link(&mut self, track: u8) {
        self.data[0] = track;
    }

    #[inline]
    pub fn set_sector_link(&mut self, sector: u8) {
        self.data[1] = sector;
    }

    /// Decode the chain link stored in the first two bytes.
    pub fn chain_link(&self) -> ChainLink {
        if self.track_link() == 0 {
            // 0xFF means the whole sector is used; anything below 2
            // is degenerate and treated as an empty tail.
            let used = match self.sector_link() {
                0xFF => SECTOR_SIZE,
                n => (n as usize + 1).max(2).min(SECTOR_SIZE),
            };
            ChainLink::Tail { used }
        } else {
            ChainLink::Next(Location(self.track_link(), self.sector_link()))
        }
    }

    /// Return the payload bytes of this sector. For a linked sector
    /// that is the full 254 bytes; for a tail sector only the used
    /// portion.
    pub fn payload(&self) -> &[u8] {
        match self.chain_link() {
            ChainLink::Next(_) => &self.data[2..],
            ChainLink::Tail { used } => &self.data[2..used],
        }
    }
}

/// A track and its ordered sectors.
#[derive(Clone)]
pub struct Track {
    pub id: u8,
    pub sectors: Vec<Sector>,
}

impl Track {
    /// Build a zero-filled track with the sector count its id calls
    /// for.
    pub fn new(id: u8) -> Track {
        let count = total_sectors(id);
        let sectors = (0..count).map(Sector::new).collect();
        Track { id, sectors }
    }

    #[inline]
    pub fn total_sectors(&self) -> u8 {
        total_sectors(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_link() {
        let mut sector = Sector::new(0);
        sector.set_track_link(17);
        sector.set_sector_link(9);
        assert_eq!(sector.chain_link(), ChainLink::Next(Location(17, 9)));

        sector.set_track_link(0);
        sector.set_sector_link(0xFF);
        assert_eq!(sector.chain_link(), ChainLink::Tail { used: 256 });

        sector.set_sector_link(5);
        assert_eq!(sector.chain_link(), ChainLink::Tail { used: 6 });

        // A tail that claims fewer bytes than the link itself.
        sector.set_sector_link(0);
        assert_eq!(sector.chain_link(), ChainLink::Tail { used: 2 });
    }

    #[test]
    fn test_payload() {
        let mut sector = Sector::new(3);
        for (i, b) in sector.data.iter_mut().enumerate() {
            *b = i as u8;
        }

        // Linked sector: the full 254 bytes.
        sector.set_track_link(2);
        sector.set_sector_link(11);
        assert_eq!(sector.payload().len(), 254);
        assert_eq!(sector.payload()[0], 2);

        // Partial tail: data[1] - 1 payload bytes.
        sector.set_track_link(0);
        sector.set_sector_link(10);
        assert_eq!(sector.payload(), &sector.data[2..11]);

        // Full tail.
        sector.set_sector_link(0xFF);
        assert_eq!(sector.payload().len(), 254);

        // Degenerate tails decode as empty rather than panicking.
        sector.set_sector_link(0);
        assert!(sector.payload().is_empty());
        sector.set_sector_link(1);
        assert!(sector.payload().is_empty());
    }

    #[test]
    fn test_track_sector_counts() {
        assert_eq!(Track::new(1).sectors.len(), 21);
        assert_eq!(Track::new(18).sectors.len(), 19);
        assert_eq!(Track::new(31).sectors.len(), 17);
        assert_eq!(Track::new(35).total_sectors(), 17);
    }
}
