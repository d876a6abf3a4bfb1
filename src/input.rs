// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Key-to-pad dispatch.
//!
//! The router has an explicit attach/detach lifecycle: editing surfaces
//! detach it while they are open so typing into an editor never fires pads,
//! and re-attach it on close.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, span, trace, Level};

use crate::playback::PlaybackScheduler;
use crate::registry::PadRegistry;

/// Routes key-down events to pad triggers.
pub struct InputRouter {
    scheduler: Arc<PlaybackScheduler>,
    registry: Arc<RwLock<PadRegistry>>,
    attached: AtomicBool,
}

impl InputRouter {
    /// Creates a detached router; call [`InputRouter::attach`] to start
    /// routing.
    pub fn new(
        scheduler: Arc<PlaybackScheduler>,
        registry: Arc<RwLock<PadRegistry>>,
    ) -> InputRouter {
        InputRouter {
            scheduler,
            registry,
            attached: AtomicBool::new(false),
        }
    }

    /// Starts routing key events.
    pub fn attach(&self) {
        self.attached.store(true, Ordering::Relaxed);
    }

    /// Stops routing key events, e.g. while an edit session is open.
    pub fn detach(&self) {
        self.attached.store(false, Ordering::Relaxed);
    }

    /// Returns true while the router is attached.
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Relaxed)
    }

    /// Routes one key-down event. Ignored entirely while detached. The pad
    /// list is scanned in order and the first case-insensitive key match
    /// wins; no match is a no-op.
    pub fn on_key(&self, key: char) {
        if !self.is_attached() {
            return;
        }

        let key = key.to_ascii_uppercase();
        let pad_id = self
            .registry
            .read()
            .pads()
            .iter()
            .find(|pad| pad.matches_key(key))
            .map(|pad| pad.id().to_string());

        match pad_id {
            Some(pad_id) => self.scheduler.trigger_pad(&pad_id),
            None => trace!(key = %key, "No pad bound to key"),
        }
    }
}

const QUIT: &str = "quit";

/// The interactive keyboard driver: routes each input line's first character
/// through the router until `quit` or end of input.
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Reads one line and routes it. Returns false when monitoring should
    /// stop.
    fn monitor_io<R, W>(router: &InputRouter, mut reader: R, mut writer: W) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(writer, "Pad key (or {}): ", QUIT)?;
        writer.flush()?;

        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }

        let input = input.trim();
        if input.eq_ignore_ascii_case(QUIT) {
            return Ok(false);
        }
        if let Some(key) = input.chars().next() {
            router.on_key(key);
        }
        Ok(true)
    }

    /// Monitors stdin for pad keys on a blocking task.
    pub fn monitor_events(&self, router: Arc<InputRouter>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&router, io::stdin().lock(), io::stdout())? {}
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityTracker;
    use crate::audio::{mock, AudioEngine};
    use crate::config;
    use crate::pads::PadUpdate;
    use std::io::BufReader;
    use tempfile::tempdir;

    fn test_router() -> (Arc<InputRouter>, Arc<AudioEngine>) {
        let device = mock::Device::get("mock", &config::Audio::default());
        let engine = Arc::new(AudioEngine::new(Arc::new(device)));
        let store = tempdir().unwrap();
        let registry = Arc::new(RwLock::new(PadRegistry::open(store.path())));
        let scheduler = Arc::new(PlaybackScheduler::new(
            engine.clone(),
            registry.clone(),
            ActivityTracker::new(),
        ));
        (
            Arc::new(InputRouter::new(scheduler, registry)),
            engine,
        )
    }

    #[tokio::test]
    async fn test_keys_route_to_pads_case_insensitively() {
        let (router, engine) = test_router();
        router.attach();

        // 'q' is bound to the Clap pad (key 'Q').
        router.on_key('q');
        assert_eq!(engine.mixer().active_voice_count(), 1);

        router.on_key('Q');
        assert_eq!(engine.mixer().active_voice_count(), 2);
    }

    #[tokio::test]
    async fn test_unbound_keys_are_ignored() {
        let (router, engine) = test_router();
        router.attach();

        router.on_key('Z');
        assert_eq!(engine.mixer().active_voice_count(), 0);
    }

    #[tokio::test]
    async fn test_detached_router_ignores_everything() {
        let (router, engine) = test_router();
        assert!(!router.is_attached());

        router.on_key('Q');
        assert_eq!(engine.mixer().active_voice_count(), 0);

        router.attach();
        router.on_key('Q');
        assert_eq!(engine.mixer().active_voice_count(), 1);

        router.detach();
        router.on_key('Q');
        assert_eq!(engine.mixer().active_voice_count(), 1);
    }

    #[tokio::test]
    async fn test_first_matching_pad_wins() {
        let device = mock::Device::get("mock", &config::Audio::default());
        let engine = Arc::new(AudioEngine::new(Arc::new(device)));
        let store = tempdir().unwrap();
        let registry = Arc::new(RwLock::new(PadRegistry::open(store.path())));

        // Bind two pads to the same key; key uniqueness is not enforced.
        registry
            .write()
            .update(
                &engine,
                "2",
                PadUpdate {
                    key: Some('1'),
                    ..Default::default()
                },
            )
            .unwrap();

        let activity = ActivityTracker::new();
        let scheduler = Arc::new(PlaybackScheduler::new(
            engine.clone(),
            registry.clone(),
            activity.clone(),
        ));
        let router = InputRouter::new(scheduler, registry);
        router.attach();

        router.on_key('1');
        // Pad "1" comes first in list order, so it wins over pad "2".
        assert!(activity.is_active("1"));
        assert!(!activity.is_active("2"));
    }

    #[tokio::test]
    async fn test_driver_monitor_io() {
        let (router, engine) = test_router();
        router.attach();

        let mut output: Vec<u8> = Vec::new();

        // A bound key triggers and keeps monitoring.
        let keep_going =
            Driver::monitor_io(&router, BufReader::new("q\n".as_bytes()), &mut output).unwrap();
        assert!(keep_going);
        assert_eq!(engine.mixer().active_voice_count(), 1);

        // Quit stops monitoring without triggering.
        let keep_going =
            Driver::monitor_io(&router, BufReader::new("quit\n".as_bytes()), &mut output)
                .unwrap();
        assert!(!keep_going);
        assert_eq!(engine.mixer().active_voice_count(), 1);

        // End of input stops monitoring.
        let keep_going =
            Driver::monitor_io(&router, BufReader::new("".as_bytes()), &mut output).unwrap();
        assert!(!keep_going);
    }
}
