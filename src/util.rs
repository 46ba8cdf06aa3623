use base64ct::{Base64UrlUnpadded, Encoding};

use crate::Result;

/// Encode bytes as base64url without padding, the encoding used for every
/// thumbprint, coordinate and JWS segment in the protocol.
pub(crate) fn b64_encode(data: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(data)
}

pub(crate) fn b64_decode(data: &str) -> Result<Vec<u8>> {
    Base64UrlUnpadded::decode_vec(data).map_err(Into::into)
}
