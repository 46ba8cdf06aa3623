//! Server side of the ECMR exchange.
//!
//! The client sends a blinded public point `R`; the server answers with
//! `d * R` where `d` is the private scalar of the selected exchange key. The
//! client later unblinds the result, so the server never sees the secret.

use josekit::jwk::Jwk;
use p521::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use p521::{AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint, SecretKey};
use serde_json::{json, Value};

use crate::jose::{self, CURVE};
use crate::util::{b64_decode, b64_encode};
use crate::{Error, Result};

/// Byte width of a P-521 field element.
const FIELD_LEN: usize = 66;

/// Checks the shape of the key presented by the client: `key_ops` (when
/// given) must allow derivation, and the key must be EC with `alg` ECMR.
pub(crate) fn validate_client_key(jwk: &Jwk) -> Result<()> {
    if jwk.key_operations().is_some() && !jose::key_valid_for_use(jwk, &["deriveKey"]) {
        return Err(Error::MissingKeyOp("deriveKey".into()));
    }
    if jwk.key_type() != "EC" {
        return Err(Error::KeyType(jwk.key_type().into()));
    }
    match jwk.algorithm() {
        Some("ECMR") => Ok(()),
        alg => Err(Error::Algorithm(alg.unwrap_or("none").into(), "key exchange")),
    }
}

/// Multiply the client's point by the server key's private scalar and wrap
/// the product back up as a public ECMR JWK.
///
/// P-521 has cofactor 1, so beyond the on-curve check in [`to_affine_point`]
/// no subgroup handling is needed.
pub(crate) fn exchange(server: &Jwk, client: &Jwk) -> Result<Jwk> {
    validate_client_key(client)?;

    let crv = param_str(client, "crv")?;
    if crv != CURVE {
        return Err(Error::Curve(crv.into()));
    }

    let point = to_affine_point(client)?;
    let secret = to_secret_key(server)?;
    let product = (ProjectivePoint::from(point) * *secret.to_nonzero_scalar()).to_affine();
    point_to_jwk(&product)
}

pub(crate) fn to_affine_point(jwk: &Jwk) -> Result<AffinePoint> {
    let x = field_bytes(param_str(jwk, "x")?, "x")?;
    let y = field_bytes(param_str(jwk, "y")?, "y")?;
    let encoded = EncodedPoint::from_affine_coordinates(&x, &y, false);
    Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded)).ok_or(Error::NotOnCurve)
}

pub(crate) fn to_secret_key(jwk: &Jwk) -> Result<SecretKey> {
    let d = field_bytes(param_str(jwk, "d")?, "d")?;
    SecretKey::from_bytes(&d).map_err(|_| Error::Coordinate("d"))
}

/// Decode a base64url field element, left-padding short values to the full
/// 66 bytes.
fn field_bytes(value: &str, name: &'static str) -> Result<FieldBytes> {
    let raw = b64_decode(value)?;
    if raw.len() > FIELD_LEN {
        return Err(Error::Coordinate(name));
    }
    let mut buf = [0u8; FIELD_LEN];
    buf[FIELD_LEN - raw.len()..].copy_from_slice(&raw);
    Ok(FieldBytes::clone_from_slice(&buf))
}

fn param_str<'a>(jwk: &'a Jwk, name: &'static str) -> Result<&'a str> {
    match jose::get_param(jwk, name)? {
        Value::String(s) => Ok(s),
        other => Err(Error::JsonKeyType(other.to_string().into())),
    }
}

fn point_to_jwk(point: &AffinePoint) -> Result<Jwk> {
    let encoded = point.to_encoded_point(false);
    let (Some(x), Some(y)) = (encoded.x(), encoded.y()) else {
        // the point at infinity has no affine coordinates
        return Err(Error::NotOnCurve);
    };
    let mut map = serde_json::Map::new();
    map.insert("alg".to_owned(), Value::String("ECMR".to_owned()));
    map.insert("crv".to_owned(), Value::String(CURVE.to_owned()));
    map.insert("key_ops".to_owned(), json!(["deriveKey"]));
    map.insert("kty".to_owned(), Value::String("EC".to_owned()));
    map.insert("x".to_owned(), Value::String(b64_encode(x)));
    map.insert("y".to_owned(), Value::String(b64_encode(y)));
    Jwk::from_map(map).map_err(Into::into)
}

#[cfg(test)]
#[path = "key_exchange_tests.rs"]
mod tests;
