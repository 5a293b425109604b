use std::fs;
use std::path::Path;

use crate::error::CodecError;
use crate::model::profile::Profile;

/// First four bytes of every profile file.
pub const MAGIC: [u8; 4] = *b"MPRF";

/// Newest profile format version this build can decode.
pub const FORMAT_VERSION: u16 = 1;

/// File extension used for durable profiles.
pub const PROFILE_EXTENSION: &str = "mprof";

/// Magic plus the little-endian version word.
const HEADER_LEN: usize = MAGIC.len() + 2;

/// Serializes a profile into its durable byte representation.
///
/// Layout: the [`MAGIC`] bytes, the format version as a little-endian `u16`,
/// then the postcard-encoded profile body. Future versions append fields at
/// the end of the body, which older decoders skip as trailing bytes.
///
/// # Errors
/// Fails only when the body cannot be serialized.
pub fn encode(profile: &Profile) -> Result<Vec<u8>, CodecError> {
    let body = postcard::to_stdvec(profile).map_err(CodecError::Encode)?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
    bytes.extend_from_slice(&MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Deserializes a profile from bytes produced by [`encode`].
///
/// The decoded profile is validated before it is returned: a byte stream
/// that fails the magic, version, body, or probability-sum checks is
/// rejected whole, never silently repaired and never returned partially
/// populated. Bytes trailing the known body are ignored, which is how old
/// decoders read profiles written by newer encoders of the same version
/// line.
///
/// # Errors
/// Fails with the [`CodecError`] variant naming the first check that did
/// not hold.
pub fn decode(bytes: &[u8]) -> Result<Profile, CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::Truncated);
    }
    if bytes[..MAGIC.len()] != MAGIC {
        return Err(CodecError::BadMagic);
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version > FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion {
            found: version,
            supported: FORMAT_VERSION,
        });
    }

    let (profile, _trailing) =
        postcard::take_from_bytes::<Profile>(&bytes[HEADER_LEN..]).map_err(CodecError::Body)?;
    profile.validate()?;
    Ok(profile)
}

/// Encodes a profile and writes it to a file.
///
/// # Errors
/// Fails on serialization or filesystem errors.
pub fn write_profile<P: AsRef<Path>>(profile: &Profile, path: P) -> Result<(), CodecError> {
    let bytes = encode(profile)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Reads a profile file and decodes it.
///
/// # Errors
/// Fails on filesystem errors and on every decode failure of [`decode`].
pub fn read_profile<P: AsRef<Path>>(path: P) -> Result<Profile, CodecError> {
    let bytes = fs::read(path)?;
    decode(&bytes)
}
