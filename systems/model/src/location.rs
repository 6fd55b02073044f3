use settler_ai_core::{Resource, Thing, Tracker};

/// Per-node state kept by the world model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    tracker: Tracker,
    pub(crate) visible: bool,
    pub(crate) visited_by_scout: bool,
    pub(crate) military_influence: i32,
}

impl Default for Location {
    fn default() -> Self {
        let mut tracker = Tracker::new();
        tracker[Resource::Water] = 1;
        Self {
            tracker,
            visible: false,
            visited_by_scout: false,
            military_influence: 0,
        }
    }
}

impl Location {
    /// Local counters of the node.
    #[must_use]
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Local counter of one thing.
    #[must_use]
    pub fn value(&self, thing: impl Into<Thing>) -> i32 {
        self.tracker[thing.into()]
    }

    pub(crate) fn value_mut(&mut self, thing: impl Into<Thing>) -> &mut i32 {
        &mut self.tracker[thing.into()]
    }

    /// Whether the node was visible during the last refresh.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether a geologist has surveyed the node.
    #[must_use]
    pub const fn visited_by_scout(&self) -> bool {
        self.visited_by_scout
    }

    /// Number of military buildings, headquarters or harbors within reach.
    #[must_use]
    pub const fn military_influence(&self) -> i32 {
        self.military_influence
    }

    /// Clears the local counters, keeping ground water.
    pub(crate) fn reset(&mut self) {
        let water = self.tracker[Resource::Water];
        self.tracker.clear();
        self.tracker[Resource::Water] = water;
    }
}
