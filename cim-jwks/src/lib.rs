//! Signing-key lifecycle for the authorization server: key pair generation,
//! key material encoding and JSON Web Key construction.

mod algorithm;
mod codec;
pub mod config;
pub mod generator;
mod jwk;
mod key;
mod manager;
mod record;
mod registry;
pub mod rotation;

pub use algorithm::KeyAlgorithm;
pub use codec::KeyMaterialCodec;
pub use config::{load, AppConfig};
pub use generator::KeyPairGenerator;
pub use jwk::{JsonWebKeySet, JwkBuilder};
pub use key::{KeyPair, PrivateKeyHandle, PublicKeyHandle};
pub use manager::KeyManager;
pub use record::{GeneratedKeyRecord, KeyStatus};
pub use registry::{KeyPairGeneratorRegistry, RegistryBuilder};
