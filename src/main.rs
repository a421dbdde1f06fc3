mod config;
mod errors;
mod ip_addressing;
mod models;
mod shared_utils;
mod structured_config;
mod utils;

use std::collections::BTreeMap;

use anyhow::{bail, Context};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use models::FabricModel;
use shared_utils::SharedUtils;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fabric_designs=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cfg = Config::load();
    tracing::info!("Fabric model: {}", cfg.fabric_model);

    let model = load_fabric_model(&cfg.fabric_model)?;
    tracing::info!(
        "Loaded {} devices and {} peer facts",
        model.devices.len(),
        model.peer_facts.len()
    );

    let (structured_configs, failed) = build_all(&model, cfg.device.as_deref())?;

    let output = if cfg.output_pretty {
        serde_json::to_string_pretty(&structured_configs)?
    } else {
        serde_json::to_string(&structured_configs)?
    };
    println!("{}", output);

    if !failed.is_empty() {
        bail!("{} device(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

fn load_fabric_model(path: &str) -> anyhow::Result<FabricModel> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fabric model {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse fabric model {}", path))
}

/// Structured config of every selected device. A failing device is logged and
/// left out of the output; its name is returned in the failure list.
fn build_all(
    model: &FabricModel,
    device: Option<&str>,
) -> anyhow::Result<(BTreeMap<String, Value>, Vec<String>)> {
    if let Some(device) = device {
        if !model.devices.contains_key(device) {
            bail!("Device {} not found in the fabric model", device);
        }
    }

    let mut structured_configs = BTreeMap::new();
    let mut failed = Vec::new();
    for (name, switch) in &model.devices {
        if device.is_some_and(|d| d != name) {
            continue;
        }
        let shared = SharedUtils::new(switch, &model.hostvars, &model.peer_facts);
        match structured_config::build(&shared).with_context(|| format!("device {}", name)) {
            Ok(structured_config) => {
                structured_configs.insert(name.clone(), structured_config);
            }
            Err(e) => {
                tracing::warn!("{:#}", e);
                failed.push(name.clone());
            }
        }
    }
    Ok((structured_configs, failed))
}
