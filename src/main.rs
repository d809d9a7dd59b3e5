use anyhow::Context as _;
use clap::Parser;
use std::fs::File;
use std::io::Read as _;
use std::path::PathBuf;
use std::sync::Arc;

mod action;
mod config;
mod manager;
mod messages;
mod mqtt;
mod ping;
mod switch;
mod wol;

#[derive(Parser, Debug)]
#[command(version, about = "Wake-on-LAN switch bridge for Home Assistant")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();

    let mut file = File::open(&args.config)
        .with_context(|| format!("opening {}", args.config.display()))?;
    let mut config_contents = String::new();
    file.read_to_string(&mut config_contents)?;

    let config: config::AppConfig = toml::de::from_str(&config_contents)
        .with_context(|| format!("parsing {}", args.config.display()))?;

    let target_os = ping::TargetOs::current();
    let wake: Arc<dyn wol::WakeSender> = Arc::new(wol::UdpWakeSender);
    let actions: Arc<dyn action::ActionRunner> = Arc::new(action::ProcessActionRunner);

    let switches: Vec<switch::WolSwitch> = config
        .switches
        .iter()
        .map(|sc| switch::WolSwitch::new(sc.clone(), target_os, wake.clone(), actions.clone()))
        .collect();
    log::info!("Configured {} switch(es)", switches.len());

    let (mqtt_client, eventloop) = mqtt::MqttClient::new(&config.mqtt);

    let core = manager::Manager::new(
        switches,
        mqtt_client,
        eventloop,
        config.poll.unwrap_or_default(),
    );
    core.run_loop().await?;

    Ok(())
}
