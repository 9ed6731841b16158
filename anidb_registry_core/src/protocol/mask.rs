//! Typed field masks for commands that request partial data
//!
//! A mask is a fixed number of bytes where every bit selects one optional reply
//! field. Bits are named constants in the [`fmask`] and [`amask`] tables; the
//! wire form is produced by [`render_hex`] for every mask-bearing command.

use std::fmt;

/// One named bit of an `N`-byte mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaskBit<const N: usize> {
    byte: usize,
    bit: u8,
}

impl<const N: usize> MaskBit<N> {
    /// Name a bit by byte index (0 is the leftmost byte on the wire) and bit
    /// position (7 is the most significant).
    ///
    /// Out-of-range positions fail const evaluation.
    pub const fn new(byte: usize, bit: u8) -> Self {
        assert!(byte < N, "mask byte index out of range");
        assert!(bit < 8, "mask bit position out of range");
        Self { byte, bit }
    }

    pub const fn byte(&self) -> usize {
        self.byte
    }

    pub const fn value(&self) -> u8 {
        1 << self.bit
    }
}

/// An `N`-byte field mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldMask<const N: usize>([u8; N]);

impl<const N: usize> FieldMask<N> {
    pub const fn empty() -> Self {
        Self([0; N])
    }

    pub const fn from_bytes(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    /// Build a mask from a list of bits
    pub const fn of(bits: &[MaskBit<N>]) -> Self {
        let mut bytes = [0u8; N];
        let mut i = 0;
        while i < bits.len() {
            bytes[bits[i].byte] |= bits[i].value();
            i += 1;
        }
        Self(bytes)
    }

    pub const fn with(mut self, bit: MaskBit<N>) -> Self {
        self.0[bit.byte] |= bit.value();
        self
    }

    pub fn insert(&mut self, bit: MaskBit<N>) {
        self.0[bit.byte] |= bit.value();
    }

    pub fn contains(&self, bit: MaskBit<N>) -> bool {
        self.0[bit.byte] & bit.value() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn bytes(&self) -> &[u8; N] {
        &self.0
    }

    /// Number of reply fields this mask selects
    pub fn field_count(&self) -> usize {
        self.0.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn render(&self) -> String {
        render_hex(&self.0)
    }
}

impl<const N: usize> Default for FieldMask<N> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<const N: usize> fmt::Display for FieldMask<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Render mask bytes as uppercase, zero-padded hex pairs in byte order
pub fn render_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // Writing to a String cannot fail
        let _ = write!(out, "{byte:02X}");
    }
    out
}

/// File field mask (`fmask`) of the FILE command, 5 bytes
pub mod fmask {
    use super::{FieldMask, MaskBit};

    pub type FileMask = FieldMask<5>;
    type Bit = MaskBit<5>;

    // Byte 1
    pub const AID: Bit = Bit::new(0, 6);
    pub const EID: Bit = Bit::new(0, 5);
    pub const GID: Bit = Bit::new(0, 4);
    pub const MYLIST_ID: Bit = Bit::new(0, 3);
    pub const OTHER_EPISODES: Bit = Bit::new(0, 2);
    pub const IS_DEPRECATED: Bit = Bit::new(0, 1);
    pub const STATE: Bit = Bit::new(0, 0);

    // Byte 2
    pub const SIZE: Bit = Bit::new(1, 7);
    pub const ED2K: Bit = Bit::new(1, 6);
    pub const MD5: Bit = Bit::new(1, 5);
    pub const SHA1: Bit = Bit::new(1, 4);
    pub const CRC32: Bit = Bit::new(1, 3);
    pub const VIDEO_COLOUR_DEPTH: Bit = Bit::new(1, 1);

    // Byte 3
    pub const QUALITY: Bit = Bit::new(2, 7);
    pub const SOURCE: Bit = Bit::new(2, 6);
    pub const AUDIO_CODECS: Bit = Bit::new(2, 5);
    pub const AUDIO_BITRATES: Bit = Bit::new(2, 4);
    pub const VIDEO_CODEC: Bit = Bit::new(2, 3);
    pub const VIDEO_BITRATE: Bit = Bit::new(2, 2);
    pub const VIDEO_RESOLUTION: Bit = Bit::new(2, 1);
    pub const FILE_TYPE: Bit = Bit::new(2, 0);

    // Byte 4
    pub const DUB_LANGUAGE: Bit = Bit::new(3, 7);
    pub const SUB_LANGUAGE: Bit = Bit::new(3, 6);
    pub const LENGTH: Bit = Bit::new(3, 5);
    pub const DESCRIPTION: Bit = Bit::new(3, 4);
    pub const AIRED_DATE: Bit = Bit::new(3, 3);
    pub const FILENAME: Bit = Bit::new(3, 0);

    // Byte 5
    pub const MYLIST_STATE: Bit = Bit::new(4, 7);
    pub const MYLIST_FILE_STATE: Bit = Bit::new(4, 6);
    pub const MYLIST_VIEWED: Bit = Bit::new(4, 5);
    pub const MYLIST_VIEW_DATE: Bit = Bit::new(4, 4);
    pub const MYLIST_STORAGE: Bit = Bit::new(4, 3);
    pub const MYLIST_SOURCE: Bit = Bit::new(4, 2);
    pub const MYLIST_OTHER: Bit = Bit::new(4, 1);

    /// The fields the FILE parser understands, in reply order after `fid`
    pub const CROSS_REFERENCE: FileMask = FileMask::of(&[
        AID,
        EID,
        GID,
        MYLIST_ID,
        OTHER_EPISODES,
        IS_DEPRECATED,
        STATE,
        QUALITY,
        SOURCE,
        DUB_LANGUAGE,
        SUB_LANGUAGE,
        DESCRIPTION,
        FILENAME,
        MYLIST_STATE,
        MYLIST_FILE_STATE,
        MYLIST_VIEWED,
        MYLIST_VIEW_DATE,
    ]);
}

/// Anime field mask (`amask`) of the FILE command, 4 bytes
pub mod amask {
    use super::{FieldMask, MaskBit};

    pub type AnimeMask = FieldMask<4>;
    type Bit = MaskBit<4>;

    // Byte 1
    pub const TOTAL_EPISODES: Bit = Bit::new(0, 7);
    pub const HIGHEST_EPISODE: Bit = Bit::new(0, 6);
    pub const YEAR: Bit = Bit::new(0, 5);
    pub const TYPE: Bit = Bit::new(0, 4);
    pub const RELATED_AIDS: Bit = Bit::new(0, 3);
    pub const RELATED_AID_TYPES: Bit = Bit::new(0, 2);

    // Byte 2
    pub const ROMAJI_NAME: Bit = Bit::new(1, 7);
    pub const KANJI_NAME: Bit = Bit::new(1, 6);
    pub const ENGLISH_NAME: Bit = Bit::new(1, 5);
    pub const OTHER_NAME: Bit = Bit::new(1, 4);
    pub const SHORT_NAMES: Bit = Bit::new(1, 3);
    pub const SYNONYMS: Bit = Bit::new(1, 2);

    // Byte 3
    pub const EPISODE_NUMBER: Bit = Bit::new(2, 7);
    pub const EPISODE_NAME: Bit = Bit::new(2, 6);
    pub const EPISODE_ROMAJI_NAME: Bit = Bit::new(2, 5);
    pub const EPISODE_KANJI_NAME: Bit = Bit::new(2, 4);
    pub const EPISODE_RATING: Bit = Bit::new(2, 3);
    pub const EPISODE_VOTES: Bit = Bit::new(2, 2);

    // Byte 4
    pub const GROUP_NAME: Bit = Bit::new(3, 7);
    pub const GROUP_SHORT_NAME: Bit = Bit::new(3, 6);
    pub const DATE_RECORD_UPDATED: Bit = Bit::new(3, 0);

    /// No anime data; the FILE lookup only needs cross-references
    pub const NONE: AnimeMask = AnimeMask::empty();
}
