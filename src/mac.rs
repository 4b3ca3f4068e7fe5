use crate::priv_prelude::*;

/// An ethernet hardware address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr {
    bytes: [u8; 6],
}

impl MacAddr {
    pub const fn new(bytes: [u8; 6]) -> MacAddr {
        MacAddr { bytes }
    }

    /// Reads an address out of the first six bytes of `bytes`. Returns `None` if there are fewer
    /// than six.
    pub fn from_slice(bytes: &[u8]) -> Option<MacAddr> {
        let bytes: [u8; 6] = bytes.get(..6)?.try_into().ok()?;
        Some(MacAddr { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.bytes
    }

    /// The destination address of an ethernet frame.
    pub fn dest_of(frame: &[u8]) -> Option<MacAddr> {
        MacAddr::from_slice(frame)
    }

    /// The source address of an ethernet frame.
    pub fn source_of(frame: &[u8]) -> Option<MacAddr> {
        MacAddr::from_slice(frame.get(6..)?)
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(bytes: [u8; 6]) -> MacAddr {
        MacAddr { bytes }
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let b = &self.bytes;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5],
        )
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MacAddr({})", self)
    }
}
