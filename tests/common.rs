//! Test utilities & fixtures.
//! Builds registries wired to in-memory collaborators and records callback invocations.
#![allow(dead_code)] // each test binary uses a different subset

use std::sync::{Arc, Mutex};

use radiomenu::popup::{
    ChannelDisplay, DisplayFrame, RegistrySettings, ResponseParams, SessionRegistry,
    StaticDirectory, UserProfile,
};
use tokio::sync::mpsc::UnboundedReceiver;

pub struct Harness {
    pub registry: SessionRegistry,
    pub frames: UnboundedReceiver<DisplayFrame>,
    pub users: StaticDirectory,
}

/// Registry whose directory knows every id as an English speaking human.
pub fn harness() -> Harness {
    harness_with(RegistrySettings::default())
}

pub fn harness_with(settings: RegistrySettings) -> Harness {
    let (display, frames) = ChannelDisplay::channel();
    let users = StaticDirectory::accept_all(UserProfile {
        language: Some("en".into()),
        automated: false,
    });
    let registry = SessionRegistry::new(settings, display, users.clone());
    Harness {
        registry,
        frames,
        users,
    }
}

impl Harness {
    /// All frames emitted since the last drain.
    pub fn drain(&mut self) -> Vec<DisplayFrame> {
        let mut out = Vec::new();
        while let Ok(frame) = self.frames.try_recv() {
            out.push(frame);
        }
        out
    }

    /// Text of the most recent render for `user`, draining the channel.
    pub fn last_text(&mut self, user: u32) -> Option<String> {
        self.drain()
            .into_iter()
            .filter_map(|f| match f {
                DisplayFrame::Render { user: u, text, .. } if u == user => Some(text),
                _ => None,
            })
            .last()
    }

    pub fn set_language(&self, user: u32, language: &str) {
        self.users.insert(
            user,
            UserProfile {
                language: Some(language.into()),
                automated: false,
            },
        );
    }
}

/// Shared log of the params every recorded callback saw.
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<ResponseParams>>>,
}

impl Recorder {
    pub fn record(&self, params: &ResponseParams) {
        self.calls.lock().unwrap().push(params.clone());
    }

    pub fn calls(&self) -> Vec<ResponseParams> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}
