use std::collections::{BTreeMap, BTreeSet};

/// Input state handed to every per-tick callback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputData {
    held: BTreeMap<String, f32>,
    just_pressed: BTreeSet<String>,
    just_released: BTreeSet<String>,
}

impl InputData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pressed(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.just_pressed.insert(key.clone());
        self.held.insert(key, 0.0);
        self
    }

    pub fn with_held(mut self, key: impl Into<String>, hold_time: f32) -> Self {
        self.held.insert(key.into(), hold_time.max(0.0));
        self
    }

    pub fn with_released(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.held.remove(&key);
        self.just_released.insert(key);
        self
    }

    pub fn is_pressed(&self, key: &str) -> bool {
        self.held.contains_key(key)
    }

    pub fn is_just_pressed(&self, key: &str) -> bool {
        self.just_pressed.contains(key)
    }

    pub fn is_just_released(&self, key: &str) -> bool {
        self.just_released.contains(key)
    }

    pub fn hold_time(&self, key: &str) -> f32 {
        self.held.get(key).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty() && self.just_pressed.is_empty() && self.just_released.is_empty()
    }

    pub fn pressed_keys(&self) -> impl Iterator<Item = &str> {
        self.held.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyEvent {
    Pressed(String),
    Released(String),
}

/// Folds raw key events into per-tick [`InputData`] snapshots.
#[derive(Debug, Default)]
pub struct InputTracker {
    held: BTreeMap<String, f32>,
    events: Vec<KeyEvent>,
}

impl InputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: KeyEvent) {
        self.events.push(event);
    }

    pub fn press(&mut self, key: impl Into<String>) {
        self.push(KeyEvent::Pressed(key.into()));
    }

    pub fn release(&mut self, key: impl Into<String>) {
        self.push(KeyEvent::Released(key.into()));
    }

    pub fn snapshot(&mut self, delta: f32) -> InputData {
        for hold in self.held.values_mut() {
            *hold += delta;
        }
        let mut data = InputData::default();
        for event in self.events.drain(..) {
            match event {
                KeyEvent::Pressed(key) => {
                    if !self.held.contains_key(&key) {
                        data.just_pressed.insert(key.clone());
                        self.held.insert(key, 0.0);
                    }
                }
                KeyEvent::Released(key) => {
                    if self.held.remove(&key).is_some() {
                        data.just_released.insert(key);
                    }
                }
            }
        }
        data.held = self.held.clone();
        data
    }
}
