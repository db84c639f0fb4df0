//! PPP configuration option lists.
//!
//! A Configure-Request body is a concatenation of `(tag, total_len, value)`
//! entries where `total_len` counts both header bytes. The decoder rejects
//! the whole list on the first bounds violation; a malformed option list
//! invalidates its packet.

use bytes::BufMut;

use crate::errors::{Result, WireError};

/// Maximum value bytes in a single option. `total_len` is one byte and
/// covers the two header bytes.
pub const MAX_VALUE_LEN: usize = 253;

/// LCP option tags.
pub mod lcp {
    /// Maximum-Receive-Unit.
    pub const MRU: u8 = 1;
    /// Async-Control-Character-Map.
    pub const ASYNCMAP: u8 = 2;
    /// Magic-Number.
    pub const MAGIC: u8 = 5;
    /// Protocol-Field-Compression.
    pub const PFCOMP: u8 = 7;
    /// Address-and-Control-Field-Compression.
    pub const ACCOMP: u8 = 8;
}

/// IPCP option tags.
pub mod ipcp {
    /// IP-Compression-Protocol.
    pub const COMPRESSION: u8 = 2;
    /// IP-Address.
    pub const ADDRESS: u8 = 3;
}

/// IP6CP option tags.
pub mod ip6cp {
    /// Interface-Identifier.
    pub const INTERFACE_ID: u8 = 1;
}

/// Van Jacobson compressed TCP/IP, the only IP-Compression-Protocol value
/// recognised (recorded during negotiation, never applied to traffic).
pub const VJ_COMPRESSION: u16 = 0x002D;

/// A single `(tag, value)` configuration option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOption {
    /// Option tag.
    pub tag: u8,
    /// Option value, excluding the two header bytes.
    pub value: Vec<u8>,
}

impl ConfigOption {
    /// Option with no value bytes (a bare capability flag).
    #[must_use]
    pub fn flag(tag: u8) -> Self {
        Self { tag, value: Vec::new() }
    }

    /// Option carrying arbitrary value bytes.
    #[must_use]
    pub fn with_bytes(tag: u8, value: &[u8]) -> Self {
        Self { tag, value: value.to_vec() }
    }

    /// Option carrying a 16-bit big-endian value.
    #[must_use]
    pub fn with_u16(tag: u8, value: u16) -> Self {
        Self { tag, value: value.to_be_bytes().to_vec() }
    }

    /// Option carrying a 32-bit big-endian value.
    #[must_use]
    pub fn with_u32(tag: u8, value: u32) -> Self {
        Self { tag, value: value.to_be_bytes().to_vec() }
    }

    /// Value as big-endian `u16`, if it is exactly two bytes.
    #[must_use]
    pub fn as_u16(&self) -> Option<u16> {
        let bytes: [u8; 2] = self.value.as_slice().try_into().ok()?;
        Some(u16::from_be_bytes(bytes))
    }

    /// Value as big-endian `u32`, if it is exactly four bytes.
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        let bytes: [u8; 4] = self.value.as_slice().try_into().ok()?;
        Some(u32::from_be_bytes(bytes))
    }

    /// Encoded size including the two header bytes.
    #[must_use]
    pub fn wire_len(&self) -> usize {
        self.value.len() + 2
    }
}

/// Append the wire encoding of `options` to `dst`.
///
/// # Errors
///
/// [`WireError::OptionTooLong`] if any value exceeds [`MAX_VALUE_LEN`].
pub fn encode_options(options: &[ConfigOption], dst: &mut impl BufMut) -> Result<()> {
    for opt in options {
        if opt.value.len() > MAX_VALUE_LEN {
            return Err(WireError::OptionTooLong { len: opt.value.len() });
        }
        dst.put_u8(opt.tag);
        dst.put_u8(opt.wire_len() as u8);
        dst.put_slice(&opt.value);
    }
    Ok(())
}

/// Encoded size of `options`.
#[must_use]
pub fn encoded_len(options: &[ConfigOption]) -> usize {
    options.iter().map(ConfigOption::wire_len).sum()
}

/// Decode a whole option list.
///
/// # Errors
///
/// [`WireError::MalformedOptions`] at the first entry whose header does not
/// fit or whose claimed length is shorter than the header or runs past the
/// end of the buffer.
pub fn decode_options(bytes: &[u8]) -> Result<Vec<ConfigOption>> {
    let mut options = Vec::new();
    let mut p = 0;
    while p < bytes.len() {
        if p + 1 >= bytes.len() {
            return Err(WireError::MalformedOptions { offset: p });
        }
        let len = bytes[p + 1] as usize;
        if len < 2 || p + len > bytes.len() {
            return Err(WireError::MalformedOptions { offset: p });
        }
        options.push(ConfigOption { tag: bytes[p], value: bytes[p + 2..p + len].to_vec() });
        p += len;
    }
    Ok(options)
}
