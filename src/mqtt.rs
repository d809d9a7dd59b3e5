use std::time::Duration;

use log::{debug, error, info};
use rumqttc::{MqttOptions, QoS, SubscribeFilter};
use serde_derive::Serialize;
use tokio::sync::broadcast;

use crate::config;
use crate::messages::{PowerState, SwitchCommand};

#[derive(Debug, Clone)]
pub struct MqttClient {
    client: rumqttc::AsyncClient,
    publisher_id: String,
    topic_path: String,
}

/// Home Assistant MQTT discovery payload for a switch entity.
#[derive(Debug, Serialize)]
struct SwitchDiscoveryPayload {
    name: String,
    unique_id: String,
    command_topic: String,
    state_topic: String,
    payload_on: &'static str,
    payload_off: &'static str,
    optimistic: bool,
}

impl MqttClient {
    pub fn new(config: &config::MqttConfig) -> (Self, rumqttc::EventLoop) {
        let publisher_id = config
            .publisher_id
            .as_ref()
            .unwrap_or(&"wol-switch-rs".to_string())
            .to_string();

        let mut mqttoptions = MqttOptions::new(
            publisher_id.clone(),
            config.host.clone(),
            config.port.unwrap_or(1883),
        );

        mqttoptions.set_keep_alive(Duration::from_secs(config.keep_alive_seconds.unwrap_or(5)));

        if let (Some(username), Some(password)) =
            (config.username.as_ref(), config.password.as_ref())
        {
            mqttoptions.set_credentials(username.clone(), password.clone());
        }

        let (client, eventloop) = rumqttc::AsyncClient::new(mqttoptions, 10);

        (
            MqttClient {
                client,
                publisher_id,
                topic_path: config.topic_path.clone().unwrap_or("wol".to_string()),
            },
            eventloop,
        )
    }

    fn command_topic(&self, slug: &str) -> String {
        format!("{}/{}/set", self.topic_path, slug)
    }

    fn state_topic(&self, slug: &str) -> String {
        format!("{}/{}/state", self.topic_path, slug)
    }

    pub async fn subscribe(&self, slugs: &[String]) -> Result<(), rumqttc::ClientError> {
        let filters = slugs
            .iter()
            .map(|slug| SubscribeFilter::new(self.command_topic(slug), QoS::AtMostOnce))
            .collect::<Vec<_>>();
        self.client.subscribe_many(filters).await?;

        Ok(())
    }

    /// Maps an incoming publish to a switch command. Anything outside the
    /// `<topic_path>/<slug>/set` shape with an ON/OFF payload is ignored.
    fn parse_command(&self, topic: &str, payload: &[u8]) -> Option<SwitchCommand> {
        let slug = topic
            .strip_prefix(&format!("{}/", self.topic_path))?
            .strip_suffix("/set")?;
        let desired = PowerState::from_payload(std::str::from_utf8(payload).ok()?)?;
        Some(SwitchCommand {
            switch: slug.to_string(),
            desired,
        })
    }

    pub async fn event_loop(
        &self,
        eventloop: &mut rumqttc::EventLoop,
        slugs: &[String],
        tx: broadcast::Sender<SwitchCommand>,
    ) {
        loop {
            match eventloop.poll().await {
                Ok(notification) => match notification {
                    rumqttc::Event::Incoming(rumqttc::Packet::Publish(p)) => {
                        debug!("Received MQTT message on topic {}: {:?}", p.topic, p.payload);

                        match self.parse_command(&p.topic, &p.payload) {
                            Some(command) => {
                                if let Err(err) = tx.send(command) {
                                    error!("Error announcing command: {:?}", err);
                                }
                            }
                            None => debug!("Ignoring message on topic {}", p.topic),
                        }
                    }
                    rumqttc::Event::Incoming(rumqttc::Packet::SubAck(_)) => {
                        debug!("Subscription acknowledged");
                    }
                    rumqttc::Event::Incoming(rumqttc::Packet::ConnAck(_)) => {
                        debug!("Connection acknowledged");
                        if let Err(err) = self.subscribe(slugs).await {
                            error!("Error subscribing to MQTT topics: {:?}", err);
                        }
                    }
                    _ => {}
                },
                Err(e) => {
                    error!("Error polling MQTT event loop: {:?}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    /// Publishes the retained Home Assistant discovery config for one switch.
    pub async fn announce_switch(
        &self,
        name: &str,
        slug: &str,
    ) -> Result<(), rumqttc::ClientError> {
        info!("Announcing switch {} for discovery", name);
        let payload = SwitchDiscoveryPayload {
            name: name.to_string(),
            unique_id: format!("{}_{}", self.publisher_id, slug),
            command_topic: self.command_topic(slug),
            state_topic: self.state_topic(slug),
            payload_on: PowerState::On.payload(),
            payload_off: PowerState::Off.payload(),
            optimistic: false,
        };
        self.client
            .publish(
                format!("homeassistant/switch/{}/{}/config", self.publisher_id, slug),
                QoS::AtLeastOnce,
                true,
                serde_json::to_string(&payload).unwrap(),
            )
            .await
    }

    pub async fn publish_state(
        &self,
        slug: &str,
        state: PowerState,
    ) -> Result<(), rumqttc::ClientError> {
        debug!("Publishing {} state for {}", state.payload(), slug);
        self.client
            .publish(self.state_topic(slug), QoS::AtMostOnce, true, state.payload())
            .await
    }

    pub async fn disconnect(&self) -> Result<(), rumqttc::ClientError> {
        debug!("Disconnecting MQTT client");
        self.client.disconnect().await
    }
}

/// Topic-safe entity slug: lowercased, non-alphanumeric characters replaced
/// with underscores.
pub fn entity_slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MqttConfig;

    fn client() -> MqttClient {
        let config = MqttConfig {
            host: "localhost".to_string(),
            port: None,
            username: None,
            password: None,
            publisher_id: None,
            topic_path: None,
            keep_alive_seconds: None,
        };
        MqttClient::new(&config).0
    }

    #[test]
    fn test_entity_slug() {
        let name = "Test's Device 123";
        assert_eq!(entity_slug(name), "test_s_device_123");
    }

    #[test]
    fn test_topic_shapes() {
        let client = client();
        assert_eq!(client.command_topic("office_pc"), "wol/office_pc/set");
        assert_eq!(client.state_topic("office_pc"), "wol/office_pc/state");
    }

    #[test]
    fn test_parse_command() {
        let client = client();

        let command = client.parse_command("wol/office_pc/set", b"ON").unwrap();
        assert_eq!(command.switch, "office_pc");
        assert_eq!(command.desired, PowerState::On);

        let command = client.parse_command("wol/office_pc/set", b"off").unwrap();
        assert_eq!(command.desired, PowerState::Off);
    }

    #[test]
    fn test_parse_command_rejects_junk() {
        let client = client();
        assert!(client.parse_command("wol/office_pc/state", b"ON").is_none());
        assert!(client.parse_command("other/office_pc/set", b"ON").is_none());
        assert!(client.parse_command("wol/office_pc/set", b"toggle").is_none());
        assert!(client.parse_command("wol/office_pc/set", &[0xFF, 0xFE]).is_none());
    }

    #[test]
    fn test_discovery_payload_shape() {
        let payload = SwitchDiscoveryPayload {
            name: "Office PC".to_string(),
            unique_id: "wol-switch-rs_office_pc".to_string(),
            command_topic: "wol/office_pc/set".to_string(),
            state_topic: "wol/office_pc/state".to_string(),
            payload_on: "ON",
            payload_off: "OFF",
            optimistic: false,
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&payload).unwrap()).unwrap();
        assert_eq!(json["name"], "Office PC");
        assert_eq!(json["command_topic"], "wol/office_pc/set");
        assert_eq!(json["state_topic"], "wol/office_pc/state");
        assert_eq!(json["payload_on"], "ON");
        assert_eq!(json["optimistic"], false);
    }
}
