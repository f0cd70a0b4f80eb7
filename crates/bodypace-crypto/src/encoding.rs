//! Text encoding for binary values: URL-safe base64 without padding.
//!
//! Encrypted names double as local filenames, so the `/` and `+` of the
//! standard alphabet are not usable. Padded input is still accepted.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};

const ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub fn to_base64(bytes: &[u8]) -> String {
    ENGINE.encode(bytes)
}

pub fn from_base64(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    ENGINE.decode(text.trim())
}
