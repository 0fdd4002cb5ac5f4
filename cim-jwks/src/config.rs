use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

#[derive(Parser, Debug, Clone, Deserialize)]
#[command(name = "jwks")]
#[command(author, version, about, long_about = None)]
pub struct AppConfig {
    #[clap(long)]
    #[arg(short = 'c')]
    #[serde(default)]
    pub config: Option<String>,
    #[clap(long, env)]
    #[arg(default_value_t = String::from("cim_jwks=info,jwks=info"))]
    #[serde(default = "default_rust_log")]
    pub rust_log: String,
    /// Key algorithm new signing keys are generated with, EC or RSA.
    #[clap(long, env)]
    #[arg(default_value_t = String::from("EC"))]
    #[serde(default = "default_algorithm")]
    pub default_algorithm: String,
    #[clap(long, env)]
    #[arg(default_value_t = 2048)]
    #[serde(default = "default_rsa_bits")]
    pub rsa_bits: usize,
    /// Seconds an active signing key is used before it is rotated.
    #[clap(long, env)]
    #[arg(default_value_t = 6 * 60 * 60)]
    #[serde(default = "default_rotation_frequency")]
    pub rotation_frequency: i64,
    /// File the generated key record is written to. The record holds the
    /// private key. Without this option it is printed to stdout together
    /// with the public key set.
    #[clap(long, env)]
    #[serde(default)]
    pub record_out: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            rust_log: default_rust_log(),
            default_algorithm: default_algorithm(),
            rsa_bits: default_rsa_bits(),
            rotation_frequency: default_rotation_frequency(),
            record_out: None,
        }
    }
}

fn default_rust_log() -> String {
    String::from("cim_jwks=info,jwks=info")
}

fn default_algorithm() -> String {
    String::from("EC")
}

fn default_rsa_bits() -> usize {
    2048
}

fn default_rotation_frequency() -> i64 {
    6 * 60 * 60
}

pub fn load(cfg: &str) -> Result<AppConfig> {
    let content =
        fs::read_to_string(cfg).context("could not read config file")?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    toml::from_str(content).context("could not parse config file")
}
