use base64::{
    Engine as _, alphabet,
    engine::{GeneralPurpose, GeneralPurposeConfig, general_purpose::STANDARD},
};

use crate::error::DecodeError;

// atob() ignores non-zero trailing bits, so the decoder does too.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Converts a base64url string (padding optional) into raw bytes.
///
/// The input is right-padded with `=` to a multiple of four, `-`/`_` are
/// mapped back to `+`/`/`, and the result is decoded with the standard
/// alphabet. The returned buffer is exactly as long as the decoded data.
pub fn url_base64_to_bytes(input: &str) -> Result<Vec<u8>, DecodeError> {
    let padding = (4 - input.len() % 4) % 4;
    let mut standard = String::with_capacity(input.len() + padding);
    for ch in input.chars() {
        standard.push(match ch {
            '-' => '+',
            '_' => '/',
            other => other,
        });
    }
    standard.extend(std::iter::repeat_n('=', padding));

    LENIENT_STANDARD
        .decode(standard.as_bytes())
        .map_err(|source| DecodeError::Base64 {
            input_len: input.len(),
            source,
        })
}

/// Standard, padded base64, the same text `btoa` produces for a byte string.
pub fn bytes_to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
