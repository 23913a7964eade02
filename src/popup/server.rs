//! Event loop wrapper that owns a [`SessionRegistry`] and feeds it from a channel.
//!
//! Transports (console, game server bridge) and the refresh timers all post
//! [`RegistryEvent`]s through senders obtained from [`MenuServer::event_sender`]. Events are
//! dispatched one at a time on the task that drives the server, so the registry never needs
//! interior locking.

use anyhow::Result;
use log::{debug, info, trace};
use tokio::sync::mpsc;

use super::hooks::{ChannelRefreshScheduler, MenuDisplay, UserDirectory};
use super::registry::{CommandDisposition, RegistryEvent, RegistrySettings, SessionRegistry};
use super::resources::StringTable;
use crate::config::Config;

pub struct MenuServer {
    config: Config,
    registry: SessionRegistry,
    event_tx: mpsc::UnboundedSender<RegistryEvent>,
    event_rx: mpsc::UnboundedReceiver<RegistryEvent>,
}

impl MenuServer {
    /// Build a server from configuration. Refresh timers post back into this server's own
    /// event channel.
    pub fn new(
        config: Config,
        display: impl MenuDisplay + 'static,
        directory: impl UserDirectory + 'static,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let settings = RegistrySettings::from_config(&config.menu);
        let strings = StringTable::from_config(&settings.default_language, &config.strings);
        let registry = SessionRegistry::new(settings, display, directory)
            .with_localizer(strings)
            .with_scheduler(ChannelRefreshScheduler::new(event_tx.clone()));
        MenuServer {
            config,
            registry,
            event_tx,
            event_rx,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn event_sender(&self) -> mpsc::UnboundedSender<RegistryEvent> {
        self.event_tx.clone()
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Direct access for menu setup and for transports running on the server's task.
    pub fn registry_mut(&mut self) -> &mut SessionRegistry {
        &mut self.registry
    }

    /// Handle one event. Returns `false` once a shutdown was requested.
    pub fn dispatch(&mut self, event: RegistryEvent) -> bool {
        debug!("dispatching {:?}", event);
        if event == RegistryEvent::Shutdown {
            info!("menu server shutdown requested");
            return false;
        }
        if self.registry.handle_event(event) == CommandDisposition::PassThrough {
            trace!("event not consumed by the menu engine");
        }
        true
    }

    /// Dispatch everything already queued without waiting. Returns how many events ran.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.event_rx.try_recv() {
            handled += 1;
            if !self.dispatch(event) {
                break;
            }
        }
        handled
    }

    /// Dispatch events until a shutdown event arrives or every sender is gone.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "menu server running (refresh={}s, default language={})",
            self.config.menu.refresh_seconds, self.config.menu.default_language
        );
        while let Some(event) = self.event_rx.recv().await {
            if !self.dispatch(event) {
                break;
            }
        }
        info!("menu server stopped");
        Ok(())
    }
}
