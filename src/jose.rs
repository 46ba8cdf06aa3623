use josekit::jwk::Jwk;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use crate::util::b64_encode;
use crate::{Error, Result};

/// The only curve the protocol speaks.
pub const CURVE: &str = "P-521";

/// Hash algorithms a client may use when referring to a key by thumbprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThpHashAlg {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl ThpHashAlg {
    /// Every key is indexed under all of these so a lookup works no matter
    /// which hash the client picked.
    pub const ALL: [ThpHashAlg; 5] = [
        ThpHashAlg::Sha1,
        ThpHashAlg::Sha224,
        ThpHashAlg::Sha256,
        ThpHashAlg::Sha384,
        ThpHashAlg::Sha512,
    ];

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "sha1" => Ok(Self::Sha1),
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            other => Err(Error::Algorithm(other.into(), "thumbprint hash")),
        }
    }
}

/// Intended operation of a stored key, derived from `alg` + `key_ops`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyUse {
    /// `ES512` with `key_ops` covering `sign` and `verify`.
    Sign,
    /// `ECMR` with `key_ops` covering `deriveKey`.
    Exchange,
}

/// An ordered list of JWKs, as found in advertisement payloads and on disk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JwkSet {
    keys: Vec<Jwk>,
}

impl JwkSet {
    pub(crate) fn new(keys: Vec<Jwk>) -> Self {
        Self { keys }
    }

    /// Parse bytes that hold either a JWK set (`{"keys":[...]}`) or a single
    /// bare JWK object.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(data)?;
        if value.get("keys").is_some() {
            Ok(serde_json::from_value(value)?)
        } else {
            let jwk: Jwk = serde_json::from_value(value)?;
            Ok(Self { keys: vec![jwk] })
        }
    }

    pub fn keys(&self) -> &[Jwk] {
        &self.keys
    }

    pub fn into_keys(self) -> Vec<Jwk> {
        self.keys
    }
}

/// Whether the key's `key_ops` covers every requested operation.
pub(crate) fn key_valid_for_use(jwk: &Jwk, ops: &[&str]) -> bool {
    let Some(key_ops) = jwk.key_operations() else {
        return false;
    };
    ops.iter()
        .all(|op| key_ops.iter().any(|o| o.eq_ignore_ascii_case(op)))
}

/// Classify a key as signing or exchange material, rejecting anything the
/// store does not handle: non-EC keys, foreign curves and `alg`/`key_ops`
/// combinations that match neither profile.
pub(crate) fn classify(jwk: &Jwk) -> Result<KeyUse> {
    if jwk.key_type() != "EC" {
        return Err(Error::KeyType(jwk.key_type().into()));
    }
    let crv = get_param(jwk, "crv")?;
    if crv.as_str() != Some(CURVE) {
        return Err(Error::Curve(crv.to_string().into()));
    }
    match jwk.algorithm() {
        Some("ES512") if key_valid_for_use(jwk, &["sign", "verify"]) => Ok(KeyUse::Sign),
        Some("ECMR") if key_valid_for_use(jwk, &["deriveKey"]) => Ok(KeyUse::Exchange),
        alg => Err(Error::Algorithm(alg.unwrap_or("none").into(), "tang key")),
    }
}

/// Jwk thumbprint as described in RFC 7638 section 3.1.
pub fn make_thumbprint(jwk: &Jwk, alg: ThpHashAlg) -> Result<String> {
    if jwk.key_type() != "EC" {
        return Err(Error::KeyType(jwk.key_type().into()));
    }

    // The required members in lexicographic order, nothing else.
    let to_hash = json!({
        "crv": get_param(jwk, "crv")?,
        "kty": jwk.key_type(),
        "x": get_param(jwk, "x")?,
        "y": get_param(jwk, "y")?,
    })
    .to_string();

    Ok(match alg {
        ThpHashAlg::Sha1 => b64_encode(&Sha1::digest(to_hash.as_bytes())),
        ThpHashAlg::Sha224 => b64_encode(&Sha224::digest(to_hash.as_bytes())),
        ThpHashAlg::Sha256 => b64_encode(&Sha256::digest(to_hash.as_bytes())),
        ThpHashAlg::Sha384 => b64_encode(&Sha384::digest(to_hash.as_bytes())),
        ThpHashAlg::Sha512 => b64_encode(&Sha512::digest(to_hash.as_bytes())),
    })
}

/// The public face of a key: coordinate and classification parameters only,
/// never `d`.
pub(crate) fn public_projection(jwk: &Jwk) -> Result<Jwk> {
    let mut map = serde_json::Map::new();
    for name in ["alg", "crv", "key_ops", "kty", "x", "y"] {
        if let Some(value) = jwk.parameter(name) {
            map.insert(name.to_owned(), value.clone());
        }
    }
    for required in ["kty", "crv", "x", "y"] {
        if !map.contains_key(required) {
            return Err(Error::JsonMissingKey(required.into()));
        }
    }
    Jwk::from_map(map).map_err(Into::into)
}

/// Get a parameter from the JWK
pub(crate) fn get_param<'a>(jwk: &'a Jwk, key: &str) -> Result<&'a Value> {
    jwk.parameter(key)
        .ok_or_else(|| Error::JsonMissingKey(key.into()))
}

#[cfg(test)]
#[path = "jose_tests.rs"]
pub(crate) mod tests;
