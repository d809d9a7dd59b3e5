use mac_address::MacAddress;
use serde_derive::Deserialize;
use std::net::Ipv4Addr;

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub switches: Vec<SwitchConfig>,
    pub poll: Option<PollConfig>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub publisher_id: Option<String>,
    pub topic_path: Option<String>,
    pub keep_alive_seconds: Option<u64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SwitchConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub mac_address: MacAddress,
    /// Address pinged to infer power state. Without it the switch never
    /// reads as on.
    pub host: Option<String>,
    /// Destination of the magic packet. Defaults to the limited broadcast.
    pub broadcast_address: Option<Ipv4Addr>,
    pub turn_off: Option<Vec<CommandStep>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CommandStep {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct PollConfig {
    pub interval_seconds: Option<u64>,
}

fn default_name() -> String {
    "Wake on LAN".to_string()
}
