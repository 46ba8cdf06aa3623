//! A tang server: advertises EC public keys signed by its signing keys and
//! performs blinded ECMR key recovery for clevis-style clients, over HTTP or
//! over the reverse (dial-out) handshake.

mod error;
mod jose;
mod key_exchange;
mod keygen;
mod keys;
mod reverse;
mod server;
mod util;

pub use error::{Error, Result};
pub use jose::{make_thumbprint, JwkSet, KeyUse, ThpHashAlg};
pub use keygen::{generate_exchange_key, generate_signing_key, write_key};
pub use keys::{KeySet, TangKey};
pub use reverse::reverse_handshake;
pub use server::{router, serve, ServerConfig, MAX_RECOVERY_BODY};
