use std::fmt;

/// Board square in file-major order: `(file - 1) * 9 + (rank - 1)`.
///
/// Files and ranks are both 1-based; rank 1 is written `a` in USI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Square(u8);

impl Square {
    pub const COUNT: usize = 81;

    pub fn new(file: u8, rank: u8) -> Option<Self> {
        if (1..=9).contains(&file) && (1..=9).contains(&rank) {
            Some(Self((file - 1) * 9 + (rank - 1)))
        } else {
            None
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        (usize::from(index) < Self::COUNT).then_some(Self(index))
    }

    /// Parses the two-character USI form, e.g. `7g`.
    pub fn from_usi(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let file = bytes[0].checked_sub(b'0')?;
        let rank = bytes[1].checked_sub(b'a')?.checked_add(1)?;
        Self::new(file, rank)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn file(self) -> u8 {
        self.0 / 9 + 1
    }

    #[inline]
    pub const fn rank(self) -> u8 {
        self.0 % 9 + 1
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file(), char::from(b'a' + self.rank() - 1))
    }
}
