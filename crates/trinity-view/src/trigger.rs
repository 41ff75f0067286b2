// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

/// Pixels before the sentinel at which the next page is requested.
pub const DEFAULT_TRIGGER_MARGIN: u32 = 200;

/// Edge detector for "the sentinel is within `margin` of the viewport".
///
/// Fires once per entry into the margin. A host that reports the same
/// position repeatedly, or several times during one scroll, gets one
/// signal until the sentinel leaves the margin again. A disarmed trigger
/// never fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProximityTrigger {
    margin: u32,
    armed: bool,
    inside: bool,
}

impl Default for ProximityTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_TRIGGER_MARGIN)
    }
}

impl ProximityTrigger {
    pub fn new(margin: u32) -> Self {
        Self {
            margin,
            armed: true,
            inside: false,
        }
    }

    pub fn margin(&self) -> u32 {
        self.margin
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// `distance` is how far the sentinel sits below the bottom of the
    /// viewport; negative once it has scrolled into view.
    pub fn observe(&mut self, distance: i64) -> bool {
        let within = distance <= i64::from(self.margin);
        let fired = self.armed && within && !self.inside;
        self.inside = within;
        fired
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Re-enable after a reset. The next observation inside the margin
    /// fires even if the sentinel never left it.
    pub fn rearm(&mut self) {
        self.armed = true;
        self.inside = false;
    }
}
