use std::collections::HashMap;

use tracing::info;

use cim_slo::{errors, Result};

use crate::{
    config::AppConfig,
    generator::{EcKeyPairGenerator, KeyPairGenerator, RsaKeyPairGenerator},
    KeyAlgorithm,
};

/// Generators keyed by algorithm, assembled once at startup.
#[derive(Debug)]
pub struct KeyPairGeneratorRegistry {
    generators: HashMap<KeyAlgorithm, Box<dyn KeyPairGenerator>>,
    default: KeyAlgorithm,
}

impl KeyPairGeneratorRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Registers every supported algorithm and marks the configured one as
    /// the default.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let default = config.default_algorithm.parse::<KeyAlgorithm>()?;
        let mut builder = Self::builder();
        for algorithm in KeyAlgorithm::ALL {
            let generator: Box<dyn KeyPairGenerator> = match algorithm {
                KeyAlgorithm::Ec => Box::new(EcKeyPairGenerator::new()),
                KeyAlgorithm::Rsa => {
                    Box::new(RsaKeyPairGenerator::new(config.rsa_bits)?)
                }
            };
            builder = builder.register_boxed(generator, algorithm == default);
        }
        builder.build()
    }

    pub fn resolve(
        &self,
        algorithm: KeyAlgorithm,
    ) -> Result<&dyn KeyPairGenerator> {
        self.generators
            .get(&algorithm)
            .map(|generator| generator.as_ref())
            .ok_or_else(|| errors::unsupported_algorithm(&algorithm))
    }

    pub fn default_generator(&self) -> &dyn KeyPairGenerator {
        // presence checked in RegistryBuilder::build
        self.generators[&self.default].as_ref()
    }

    pub fn default_algorithm(&self) -> KeyAlgorithm {
        self.default
    }

    pub fn algorithms(&self) -> Vec<KeyAlgorithm> {
        let mut algorithms: Vec<_> = self.generators.keys().copied().collect();
        algorithms.sort_by_key(|algorithm| algorithm.as_str());
        algorithms
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    generators: Vec<(Box<dyn KeyPairGenerator>, bool)>,
}

impl RegistryBuilder {
    pub fn register<G>(self, generator: G) -> Self
    where
        G: KeyPairGenerator + 'static,
    {
        self.register_boxed(Box::new(generator), false)
    }

    pub fn register_default<G>(self, generator: G) -> Self
    where
        G: KeyPairGenerator + 'static,
    {
        self.register_boxed(Box::new(generator), true)
    }

    pub fn register_boxed(
        mut self,
        generator: Box<dyn KeyPairGenerator>,
        is_default: bool,
    ) -> Self {
        self.generators.push((generator, is_default));
        self
    }

    pub fn build(self) -> Result<KeyPairGeneratorRegistry> {
        let defaults: Vec<KeyAlgorithm> = self
            .generators
            .iter()
            .filter(|(_, is_default)| *is_default)
            .map(|(generator, _)| generator.algorithm())
            .collect();
        let default = match defaults.as_slice() {
            [algorithm] => *algorithm,
            [] => {
                return Err(errors::config("no key pair generator marked default"))
            }
            _ => {
                return Err(errors::config(&format!(
                    "more than one key pair generator marked default: {:?}",
                    defaults
                )))
            }
        };

        let mut generators = HashMap::with_capacity(self.generators.len());
        for (generator, _) in self.generators {
            let algorithm = generator.algorithm();
            if generators.insert(algorithm, generator).is_some() {
                return Err(errors::config(&format!(
                    "key pair generator for {} registered twice",
                    algorithm
                )));
            }
        }
        info!(%default, "key pair generator registry assembled");
        Ok(KeyPairGeneratorRegistry {
            generators,
            default,
        })
    }
}

#[cfg(test)]
mod tests {
    use cim_slo::errors::Code;

    use super::*;

    #[test]
    fn resolve_registered() {
        let registry = KeyPairGeneratorRegistry::builder()
            .register_default(EcKeyPairGenerator::new())
            .register(RsaKeyPairGenerator::new(2048).unwrap())
            .build()
            .unwrap();

        for algorithm in KeyAlgorithm::ALL {
            assert_eq!(registry.resolve(algorithm).unwrap().algorithm(), algorithm);
        }
        assert_eq!(registry.default_generator().algorithm(), KeyAlgorithm::Ec);
        assert_eq!(registry.default_algorithm(), KeyAlgorithm::Ec);
        assert_eq!(registry.algorithms(), vec![KeyAlgorithm::Ec, KeyAlgorithm::Rsa]);
    }

    #[test]
    fn resolve_unregistered() {
        let registry = KeyPairGeneratorRegistry::builder()
            .register_default(EcKeyPairGenerator::new())
            .build()
            .unwrap();

        let err = registry.resolve(KeyAlgorithm::Rsa).unwrap_err();
        assert!(matches!(err.kind(), Code::UnsupportedAlgorithm(tag) if tag == "RSA"));
    }

    #[test]
    fn exactly_one_default() {
        let err = KeyPairGeneratorRegistry::builder()
            .register(EcKeyPairGenerator::new())
            .build()
            .unwrap_err();
        assert!(matches!(err.kind(), Code::Config(_)));

        let err = KeyPairGeneratorRegistry::builder()
            .register_default(EcKeyPairGenerator::new())
            .register_default(RsaKeyPairGenerator::new(2048).unwrap())
            .build()
            .unwrap_err();
        assert!(matches!(err.kind(), Code::Config(_)));

        let err = KeyPairGeneratorRegistry::builder().build().unwrap_err();
        assert!(matches!(err.kind(), Code::Config(_)));
    }

    #[test]
    fn duplicate_algorithm() {
        let err = KeyPairGeneratorRegistry::builder()
            .register_default(EcKeyPairGenerator::new())
            .register(EcKeyPairGenerator::new())
            .build()
            .unwrap_err();
        assert!(matches!(err.kind(), Code::Config(_)));
    }

    #[test]
    fn from_config() {
        let config = AppConfig {
            default_algorithm: String::from("rsa"),
            ..AppConfig::default()
        };
        let registry = KeyPairGeneratorRegistry::from_config(&config).unwrap();
        assert_eq!(registry.default_generator().algorithm(), KeyAlgorithm::Rsa);

        let config = AppConfig {
            default_algorithm: String::from("OKP"),
            ..AppConfig::default()
        };
        let err = KeyPairGeneratorRegistry::from_config(&config).unwrap_err();
        assert!(matches!(err.kind(), Code::UnsupportedAlgorithm(_)));

        let config = AppConfig {
            rsa_bits: 1024,
            ..AppConfig::default()
        };
        let err = KeyPairGeneratorRegistry::from_config(&config).unwrap_err();
        assert!(matches!(err.kind(), Code::Config(_)));
    }
}
