use std::sync::Arc;

use log::{debug, warn};

use crate::action::ActionRunner;
use crate::config::SwitchConfig;
use crate::ping::{self, TargetOs};
use crate::wol::WakeSender;

/// A wake-on-LAN switch: powers a LAN device on with a magic packet, powers
/// it off through an optional user-configured action, and infers on/off
/// state by pinging the device's host.
pub struct WolSwitch {
    config: SwitchConfig,
    target_os: TargetOs,
    wake: Arc<dyn WakeSender>,
    actions: Arc<dyn ActionRunner>,
    is_on: bool,
}

impl WolSwitch {
    pub fn new(
        config: SwitchConfig,
        target_os: TargetOs,
        wake: Arc<dyn WakeSender>,
        actions: Arc<dyn ActionRunner>,
    ) -> Self {
        WolSwitch {
            config,
            target_os,
            wake,
            actions,
            is_on: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Last observed liveness state. Only `update` changes it.
    pub fn is_on(&self) -> bool {
        self.is_on
    }

    /// Sends one magic packet, to the configured broadcast address when set.
    /// Fire-and-forget: a send failure is logged, not surfaced.
    pub fn turn_on(&self) {
        if let Err(err) = self
            .wake
            .send(&self.config.mac_address, self.config.broadcast_address)
        {
            warn!("{}: failed to send magic packet: {err}", self.config.name);
        }
    }

    /// Runs the configured off action to completion, propagating its error.
    /// Without an action this is a no-op.
    pub async fn turn_off(&self) -> anyhow::Result<()> {
        match &self.config.turn_off {
            Some(steps) => self.actions.run(steps).await,
            None => Ok(()),
        }
    }

    /// Pings the configured host once and records whether it answered. With
    /// no host there is nothing to probe and the state stays off.
    pub async fn update(&mut self) {
        self.is_on = match &self.config.host {
            Some(host) => ping::probe(self.target_os, host).await,
            None => false,
        };
        debug!("{}: is_on={}", self.config.name, self.is_on);
    }
}
