//! The key set a tang server is built around: every `.jwk` loaded from disk,
//! indexed by thumbprint under all supported hashes, with the signed
//! advertisements precomputed so request handlers only ever borrow bytes.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use josekit::jwk::Jwk;
use josekit::jws::{JwsSigner, ES512};
use serde::Serialize;

use crate::jose::{self, JwkSet, KeyUse, ThpHashAlg};
use crate::key_exchange;
use crate::util::b64_encode;
use crate::{Error, Result};

/// `cty` value carried in every advertisement signature header.
const ADV_CONTENT_TYPE: &str = "jwk-set+json";

/// A single loaded key together with its advertisement state.
pub struct TangKey {
    jwk: Jwk,
    key_use: KeyUse,
    advertised: bool,
    /// Signed advertisement to serve when this key is requested by
    /// thumbprint. Only signing keys carry one.
    advertisement: Option<Vec<u8>>,
}

impl TangKey {
    pub fn jwk(&self) -> &Jwk {
        &self.jwk
    }

    pub fn key_use(&self) -> KeyUse {
        self.key_use
    }

    pub fn advertised(&self) -> bool {
        self.advertised
    }

    pub fn advertisement(&self) -> Option<&[u8]> {
        self.advertisement.as_deref()
    }
}

/// All keys handled by a tang server.
///
/// The set is write-once: it is populated and its advertisements computed
/// before it is shared with any request handler, and never mutated after.
#[derive(Default)]
pub struct KeySet {
    keys: Vec<TangKey>,
    /// base64url thumbprint -> position in `keys`, under every hash in
    /// [`ThpHashAlg::ALL`].
    by_thumbprint: HashMap<String, usize>,
    default_advertisement: Vec<u8>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read keys from a directory of `*.jwk` files or from a single file
    /// holding a JWK or JWK set, then compute the advertisements.
    ///
    /// File names starting with `.` mark their keys as non-advertised.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_paths(&[path])
    }

    /// [`Self::load`] over several files and/or directories.
    pub fn load_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut set = Self::new();
        for path in paths {
            set.read_path(path.as_ref())?;
        }
        set.recompute_advertisements()?;
        Ok(set)
    }

    fn read_path(&mut self, path: &Path) -> Result<()> {
        if path.is_dir() {
            self.read_dir(path)
        } else {
            self.read_file(path)
        }
    }

    fn read_dir(&mut self, dir: &Path) -> Result<()> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            names.push(entry?.file_name());
        }
        // readdir order is platform noise; sort for a stable insertion order
        names.sort();

        for name in names {
            let Some(name) = name.to_str() else { continue };
            if !name.ends_with(".jwk") {
                continue;
            }
            let path = dir.join(name);
            if !path.is_file() {
                continue;
            }
            self.read_file(&path)?;
        }
        Ok(())
    }

    fn read_file(&mut self, path: &Path) -> Result<()> {
        let data = fs::read(path)?;
        let advertised = path
            .file_name()
            .map_or(true, |name| !name.to_string_lossy().starts_with('.'));
        for jwk in JwkSet::parse(&data)?.into_keys() {
            self.append(jwk, advertised)?;
        }
        Ok(())
    }

    /// Append a key and index it under every supported thumbprint hash.
    /// Advertisements are not recalculated.
    pub fn append(&mut self, jwk: Jwk, advertised: bool) -> Result<()> {
        let key_use = jose::classify(&jwk)?;
        let index = self.keys.len();
        for alg in ThpHashAlg::ALL {
            let thp = jose::make_thumbprint(&jwk, alg)?;
            self.by_thumbprint.insert(thp, index);
        }
        self.keys.push(TangKey {
            jwk,
            key_use,
            advertised,
            advertisement: None,
        });
        Ok(())
    }

    pub fn lookup(&self, thp: &str) -> Option<&TangKey> {
        self.by_thumbprint.get(thp).map(|&index| &self.keys[index])
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The JWS served at `/adv`.
    pub fn default_advertisement(&self) -> &[u8] {
        &self.default_advertisement
    }

    /// Recompute the default advertisement and the per-key variant stored on
    /// each signing key.
    ///
    /// The payload is the public JWK set of all advertised keys in insertion
    /// order, signed once per advertised signing key. Hidden signing keys get
    /// their own advertisement with themselves added to the signer set so a
    /// client that asks for them by thumbprint can still validate it.
    pub fn recompute_advertisements(&mut self) -> Result<()> {
        let mut advertised_public = Vec::new();
        let mut sign_indices = Vec::new();
        for (index, key) in self.keys.iter().enumerate() {
            if key.advertised {
                advertised_public.push(jose::public_projection(&key.jwk)?);
            }
            if key.key_use == KeyUse::Sign && key.advertised {
                sign_indices.push(index);
            }
        }

        if advertised_public.is_empty() {
            return Err(Error::NoAdvertisedKeys);
        }
        if sign_indices.is_empty() {
            return Err(Error::NoSignKeys);
        }

        let payload = serde_json::to_vec(&JwkSet::new(advertised_public))?;

        let signers: Vec<&Jwk> = sign_indices.iter().map(|&i| &self.keys[i].jwk).collect();
        self.default_advertisement = sign_payload(&payload, &signers)?;

        let mut advertisements = Vec::new();
        for (index, key) in self.keys.iter().enumerate() {
            if key.key_use != KeyUse::Sign {
                continue;
            }
            let advertisement = if key.advertised {
                self.default_advertisement.clone()
            } else {
                let mut signers: Vec<&Jwk> =
                    sign_indices.iter().map(|&i| &self.keys[i].jwk).collect();
                signers.push(&key.jwk);
                sign_payload(&payload, &signers)?
            };
            advertisements.push((index, advertisement));
        }
        for (index, advertisement) in advertisements {
            self.keys[index].advertisement = Some(advertisement);
        }

        Ok(())
    }

    /// Server-side recovery of the ECMR exchange: parse the request body as a
    /// JWK and answer with the serialized product key.
    pub fn recover(&self, thp: &str, data: &[u8]) -> Result<Vec<u8>> {
        let client: Jwk = serde_json::from_slice(data)?;
        let recovered = self.recover_key(thp, &client)?;
        Ok(serde_json::to_vec(&recovered)?)
    }

    pub fn recover_key(&self, thp: &str, client: &Jwk) -> Result<Jwk> {
        // The client material is checked before the thumbprint is touched so
        // a malformed request gets the same answer whether or not the key
        // exists.
        key_exchange::validate_client_key(client)?;

        let key = self
            .lookup(thp)
            .ok_or_else(|| Error::KeyNotFound(thp.into()))?;
        if key.key_use != KeyUse::Exchange {
            return Err(Error::KeyNotFound(thp.into()));
        }
        key_exchange::exchange(&key.jwk, client)
    }
}

#[derive(Serialize)]
struct AdvSignature {
    protected: String,
    signature: String,
}

/// General JSON serialization of a JWS, one signature per signing key.
#[derive(Serialize)]
struct Advertisement {
    payload: String,
    signatures: Vec<AdvSignature>,
}

fn sign_payload(payload: &[u8], sign_keys: &[&Jwk]) -> Result<Vec<u8>> {
    let encoded_payload = b64_encode(payload);

    let mut signatures = Vec::with_capacity(sign_keys.len());
    for key in sign_keys {
        let alg = key
            .algorithm()
            .ok_or(Error::Algorithm("none".into(), "signing key"))?;
        let header = serde_json::json!({ "alg": alg, "cty": ADV_CONTENT_TYPE });
        let protected = b64_encode(header.to_string().as_bytes());

        // RFC 7515 signing input: BASE64URL(header) || '.' || BASE64URL(payload)
        let signing_input = format!("{protected}.{encoded_payload}");
        let signer = ES512.signer_from_jwk(key)?;
        let signature = signer.sign(signing_input.as_bytes())?;

        signatures.push(AdvSignature {
            protected,
            signature: b64_encode(&signature),
        });
    }

    let advertisement = Advertisement {
        payload: encoded_payload,
        signatures,
    };
    Ok(serde_json::to_vec(&advertisement)?)
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;
