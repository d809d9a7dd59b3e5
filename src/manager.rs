use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::broadcast;

use crate::config::PollConfig;
use crate::messages::{PowerState, SwitchCommand};
use crate::mqtt::{self, MqttClient};
use crate::switch::WolSwitch;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

pub struct Manager {
    switches: Vec<WolSwitch>,
    mqtt_client: MqttClient,
    mqtt_event_loop: rumqttc::EventLoop,
    poll_interval: Duration,
}

impl Manager {
    pub fn new(
        switches: Vec<WolSwitch>,
        mqtt_client: MqttClient,
        mqtt_event_loop: rumqttc::EventLoop,
        poll: PollConfig,
    ) -> Self {
        Manager {
            switches,
            mqtt_client,
            mqtt_event_loop,
            // interval() panics on a zero period
            poll_interval: Duration::from_secs(
                poll.interval_seconds.unwrap_or(DEFAULT_POLL_INTERVAL_SECS).max(1),
            ),
        }
    }

    pub async fn run_loop(self) -> anyhow::Result<()> {
        let Manager {
            mut switches,
            mqtt_client,
            mut mqtt_event_loop,
            poll_interval,
        } = self;

        let slugs: Vec<String> = switches
            .iter()
            .map(|sw| mqtt::entity_slug(sw.name()))
            .collect();

        for (sw, slug) in switches.iter().zip(&slugs) {
            mqtt_client.announce_switch(sw.name(), slug).await?;
        }
        mqtt_client.subscribe(&slugs).await?;

        let (tx, mut rx) = broadcast::channel(10);

        // Feed incoming command messages into the poll loop
        {
            let client = mqtt_client.clone();
            let slugs = slugs.clone();
            tokio::task::spawn(async move {
                client.event_loop(&mut mqtt_event_loop, &slugs, tx).await;
            });
        }

        let mut interval = tokio::time::interval(poll_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    for (sw, slug) in switches.iter_mut().zip(&slugs) {
                        sw.update().await;
                        let state = PowerState::from_is_on(sw.is_on());
                        if let Err(err) = mqtt_client.publish_state(slug, state).await {
                            error!("Error publishing state for {}: {:?}", sw.name(), err);
                        }
                    }
                }
                command = rx.recv() => match command {
                    Ok(command) => Self::dispatch(&switches, &slugs, command).await,
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Command channel closed");
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Command channel lagged, skipped {} command(s)", skipped);
                    }
                },
            }
        }

        info!("Exiting manager event loop");
        mqtt_client.disconnect().await?;

        Ok(())
    }

    async fn dispatch(switches: &[WolSwitch], slugs: &[String], command: SwitchCommand) {
        let Some(index) = slugs.iter().position(|slug| *slug == command.switch) else {
            warn!("Received command for unknown switch {}", command.switch);
            return;
        };
        let sw = &switches[index];
        match command.desired {
            PowerState::On => {
                info!("Turning on {}", sw.name());
                sw.turn_on();
            }
            PowerState::Off => {
                info!("Turning off {}", sw.name());
                if let Err(err) = sw.turn_off().await {
                    error!("Off action for {} failed: {:?}", sw.name(), err);
                }
            }
        }
    }
}
