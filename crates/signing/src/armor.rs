//! ASCII armor decoding

use base64::{engine::general_purpose::STANDARD, Engine as _};
use provmirror_errors::{Error, SigningError};

const BEGIN: &str = "-----BEGIN ";
const END: &str = "-----END ";
const DASHES: &str = "-----";

const CRC24_INIT: u32 = 0x00B7_04CE;
const CRC24_POLY: u32 = 0x0186_4CFB;

/// Decoded armor block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Armored {
    /// Text between `BEGIN ` and the trailing dashes, e.g. `PGP PUBLIC KEY BLOCK`
    pub label: String,
    pub headers: Vec<(String, String)>,
    pub data: Vec<u8>,
}

/// CRC-24 as used by the armor checksum line
#[must_use]
pub fn crc24(data: &[u8]) -> u32 {
    let mut crc = CRC24_INIT;
    for byte in data {
        crc ^= u32::from(*byte) << 16;
        for _ in 0..8 {
            crc <<= 1;
            if crc & 0x0100_0000 != 0 {
                crc ^= CRC24_POLY;
            }
        }
    }
    crc & 0x00FF_FFFF
}

/// Decode the first armor block in `text`
///
/// # Errors
///
/// Returns [`SigningError::InvalidArmor`] when the block is unterminated,
/// the body is not base64, or the checksum line does not match.
pub fn decode(text: &str) -> Result<Armored, Error> {
    let mut lines = text.lines().map(str::trim_end);

    let label = lines
        .by_ref()
        .find_map(|line| {
            line.strip_prefix(BEGIN)
                .and_then(|rest| rest.strip_suffix(DASHES))
        })
        .ok_or_else(|| SigningError::InvalidArmor("no armor header line".to_string()))?
        .to_string();
    let end_line = format!("{END}{label}{DASHES}");

    let mut headers = Vec::new();
    let mut body = String::new();
    let mut checksum = None;
    let mut in_headers = true;
    let mut terminated = false;

    for line in lines {
        if line == end_line {
            terminated = true;
            break;
        }
        if in_headers {
            if line.is_empty() {
                in_headers = false;
                continue;
            }
            if let Some((key, value)) = line.split_once(": ") {
                headers.push((key.to_string(), value.to_string()));
                continue;
            }
            // Some producers omit the blank separator when there are no headers
            in_headers = false;
        }
        if let Some(crc) = line.strip_prefix('=').filter(|c| c.len() == 4) {
            checksum = Some(crc.to_string());
            continue;
        }
        body.push_str(line.trim());
    }

    if !terminated {
        return Err(SigningError::InvalidArmor(format!("missing {end_line}")).into());
    }

    let data = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| SigningError::InvalidArmor(format!("bad base64 body: {e}")))?;

    if let Some(checksum) = checksum {
        let expected = STANDARD
            .decode(checksum.as_bytes())
            .map_err(|e| SigningError::InvalidArmor(format!("bad checksum line: {e}")))?;
        let actual = crc24(&data).to_be_bytes();
        if expected.as_slice() != &actual[1..] {
            return Err(SigningError::InvalidArmor("checksum mismatch".to_string()).into());
        }
    }

    Ok(Armored {
        label,
        headers,
        data,
    })
}
