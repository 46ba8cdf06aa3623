//! The two key profiles a tang deployment uses, both on P-521.

use std::fs;
use std::path::{Path, PathBuf};

use josekit::jwk::alg::ec::EcCurve;
use josekit::jwk::Jwk;

use crate::jose::{make_thumbprint, ThpHashAlg};
use crate::Result;

/// Generate a fresh advertisement signing key (`ES512`).
pub fn generate_signing_key() -> Result<Jwk> {
    let mut jwk = Jwk::generate_ec_key(EcCurve::P521)?;
    jwk.set_algorithm("ES512");
    jwk.set_key_operations(vec!["verify", "sign"]);
    Ok(jwk)
}

/// Generate a fresh exchange key (`ECMR`).
pub fn generate_exchange_key() -> Result<Jwk> {
    let mut jwk = Jwk::generate_ec_key(EcCurve::P521)?;
    jwk.set_algorithm("ECMR");
    jwk.set_key_operations(vec!["deriveKey"]);
    Ok(jwk)
}

/// Persist a key as `<name>.jwk` under `dir`, defaulting the name to the
/// key's SHA-256 thumbprint. A name starting with `.` makes the key
/// non-advertised on the next load.
pub fn write_key(dir: &Path, name: Option<&str>, jwk: &Jwk) -> Result<PathBuf> {
    let name = match name {
        Some(name) => name.to_owned(),
        None => make_thumbprint(jwk, ThpHashAlg::Sha256)?,
    };
    let path = dir.join(format!("{name}.jwk"));
    fs::write(&path, serde_json::to_vec(jwk)?)?;
    Ok(path)
}
