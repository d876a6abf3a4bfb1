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

//! The transient "active" flag behind the pad pulse.
//!
//! Every trigger marks its pad active for a fixed window, independent of how
//! long the sound actually plays. Each mark schedules its own removal timer;
//! the earliest pending timer clears the flag, even when a later trigger is
//! conceptually still fresh. That is long-standing observed behavior and is
//! kept as-is.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

/// How long a pad stays flagged active after a trigger.
pub const ACTIVE_PULSE: Duration = Duration::from_millis(150);

/// Tracks which pads are currently flagged active. Purely presentational;
/// has no effect on audio.
#[derive(Clone, Default)]
pub struct ActivityTracker {
    active: Arc<Mutex<HashSet<String>>>,
}

impl ActivityTracker {
    /// Creates a new tracker with nothing active.
    pub fn new() -> ActivityTracker {
        ActivityTracker::default()
    }

    /// Flags the pad active and schedules an unconditional removal after the
    /// pulse window. Must be called from within a tokio runtime.
    pub fn mark(&self, pad_id: &str) {
        self.active.lock().insert(pad_id.to_string());
        trace!(pad = pad_id, "Pad active");

        let active = Arc::clone(&self.active);
        let pad_id = pad_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(ACTIVE_PULSE).await;
            active.lock().remove(&pad_id);
            trace!(pad = %pad_id, "Pad inactive");
        });
    }

    /// Returns true while the pad is flagged active.
    pub fn is_active(&self, pad_id: &str) -> bool {
        self.active.lock().contains(pad_id)
    }

    /// A snapshot of the currently active pad ids.
    pub fn snapshot(&self) -> HashSet<String> {
        self.active.lock().clone()
    }
}
