//! OpenPGP packet framing and key ids

use provmirror_errors::{Error, SigningError};
use sha1::{Digest, Sha1};
use sha2::Sha256;

pub const PUBLIC_KEY_TAG: u8 = 6;

/// A packet with its body borrowed from the surrounding buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet<'a> {
    pub tag: u8,
    pub body: &'a [u8],
}

fn invalid(message: impl Into<String>) -> Error {
    SigningError::InvalidPacket(message.into()).into()
}

fn take(data: &[u8], offset: usize, len: usize) -> Result<&[u8], Error> {
    data.get(offset..offset.saturating_add(len))
        .ok_or_else(|| invalid("truncated packet"))
}

fn be_len(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .fold(0usize, |acc, b| (acc << 8) | usize::from(*b))
}

/// Parse the first packet of `data`
///
/// Both old and new header formats are accepted. Partial body lengths are
/// rejected since key material never uses them.
///
/// # Errors
///
/// Returns [`SigningError::InvalidPacket`] if the header is malformed or the
/// body runs past the end of `data`.
pub fn first_packet(data: &[u8]) -> Result<Packet<'_>, Error> {
    let header = *data.first().ok_or_else(|| invalid("empty packet stream"))?;
    if header & 0x80 == 0 {
        return Err(invalid(format!("bad packet header byte {header:#04x}")));
    }

    let (tag, offset, len) = if header & 0x40 != 0 {
        let tag = header & 0x3F;
        let first = take(data, 1, 1)?[0];
        match first {
            0..=191 => (tag, 2, usize::from(first)),
            192..=223 => {
                let second = take(data, 2, 1)?[0];
                (tag, 3, ((usize::from(first) - 192) << 8) + usize::from(second) + 192)
            }
            255 => (tag, 6, be_len(take(data, 2, 4)?)),
            _ => return Err(invalid("partial body length")),
        }
    } else {
        let tag = (header >> 2) & 0x0F;
        match header & 0x03 {
            0 => (tag, 2, be_len(take(data, 1, 1)?)),
            1 => (tag, 3, be_len(take(data, 1, 2)?)),
            2 => (tag, 5, be_len(take(data, 1, 4)?)),
            _ => (tag, 1, data.len().saturating_sub(1)),
        }
    };

    Ok(Packet {
        tag,
        body: take(data, offset, len)?,
    })
}

/// Key id of a public-key packet, as upper-case hex
///
/// Version 4 keys use the low 64 bits of the SHA-1 fingerprint; version 5
/// and 6 keys use the high 64 bits of the SHA-256 fingerprint.
///
/// # Errors
///
/// Returns an error if the packet is not a public key or its version is not
/// supported.
pub fn key_id(packet: &Packet<'_>) -> Result<String, Error> {
    if packet.tag != PUBLIC_KEY_TAG {
        return Err(invalid(format!(
            "expected public key packet, found tag {}",
            packet.tag
        )));
    }

    let body = packet.body;
    let version = *body.first().ok_or_else(|| invalid("empty public key packet"))?;

    let id = match version {
        4 => {
            let len = u16::try_from(body.len()).map_err(|_| invalid("public key packet too long"))?;
            let mut hasher = Sha1::new();
            hasher.update([0x99]);
            hasher.update(len.to_be_bytes());
            hasher.update(body);
            let fingerprint = hasher.finalize();
            hex::encode_upper(&fingerprint[fingerprint.len() - 8..])
        }
        5 | 6 => {
            let len = u32::try_from(body.len()).map_err(|_| invalid("public key packet too long"))?;
            let mut hasher = Sha256::new();
            hasher.update([if version == 5 { 0x9A } else { 0x9B }]);
            hasher.update(len.to_be_bytes());
            hasher.update(body);
            let fingerprint = hasher.finalize();
            hex::encode_upper(&fingerprint[..8])
        }
        other => return Err(SigningError::UnsupportedKeyVersion(other).into()),
    };

    Ok(id)
}
