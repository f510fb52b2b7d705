use std::sync::{Mutex, PoisonError};

/// Single-slot cell holding the prefix for the next free-text event.
///
/// Written by the step-result hook and read by the free-text hook. Reading
/// does not clear the slot: the same prefix applies to every later free-text
/// event until the next step result overwrites it.
#[derive(Debug, Default)]
pub struct PrefixCarry {
    slot: Mutex<Option<String>>,
}

impl PrefixCarry {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored prefix, including clearing it with `None`.
    pub fn set(&self, prefix: Option<String>) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = prefix;
    }

    /// Returns the stored prefix without consuming it.
    pub fn get(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Prepends the stored prefix to `text`. An empty prefix counts as absent.
    pub fn apply(&self, text: &str) -> String {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_deref() {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}{text}"),
            _ => text.to_owned(),
        }
    }
}
