use std::{env, fs, io};

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cim_jwks::{
    load, rotation::RotationStrategy, AppConfig, KeyManager,
    KeyPairGeneratorRegistry,
};

fn main() -> Result<()> {
    let args = env::args().collect::<Vec<_>>();
    let config =
        if args.len() == 3 && (args[1] == "-c" || args[1] == "--config") {
            load(&args[2])?
        } else {
            AppConfig::parse()
        };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.rust_log))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    debug!("{:#?}", &config);
    run(config)
}

fn run(config: AppConfig) -> Result<()> {
    // without a working generator the server cannot sign anything
    let registry = KeyPairGeneratorRegistry::from_config(&config)
        .context("could not assemble the key pair generators")?;
    let strategy = RotationStrategy::try_from(&config)
        .context("invalid rotation frequency")?;
    let manager = KeyManager::new(registry);

    let record = manager
        .generate()
        .context("could not generate the initial signing key")?;
    let key_set = manager
        .key_set(std::slice::from_ref(&record))
        .context("could not build the public key set")?;
    let next_rotation = strategy
        .next_rotation(&record)
        .context("could not schedule the next rotation")?;
    info!(kid = %record.key_id, %next_rotation, "signing key ready");

    let mut output = json!({
        "keyId": record.key_id,
        "nextRotation": next_rotation,
        "jwks": key_set,
    });
    match &config.record_out {
        Some(path) => {
            let content = serde_json::to_string_pretty(&record)
                .context("could not serialize the key record")?;
            fs::write(path, content)
                .with_context(|| format!("could not write {}", path))?;
            info!(kid = %record.key_id, path = %path, "key record written");
        }
        None => {
            warn!(
                kid = %record.key_id,
                "printing the key record with its private key, use --record-out to keep it off stdout"
            );
            output["record"] = json!(record);
        }
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&output)
            .context("could not serialize the key set")?
    );
    Ok(())
}
