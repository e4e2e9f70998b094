//! Per-persona cancellation slots.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

use crate::types::Persona;

/// Handle for one installed generation slot.
#[derive(Debug, Clone)]
pub struct SlotHandle {
    pub token: CancellationToken,
    generation: u64,
}

/// One cancellation slot per persona.
///
/// Installing a slot replaces any existing one for that persona and cancels
/// the replaced handle, so at most one generation stays live per persona.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    slots: Mutex<HashMap<Persona, SlotHandle>>,
    generations: AtomicU64,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a fresh handle, returning the replaced one (if any).
    pub fn replace(&self, persona: Persona) -> (SlotHandle, Option<SlotHandle>) {
        let handle = SlotHandle {
            token: CancellationToken::new(),
            generation: self.generations.fetch_add(1, Ordering::SeqCst),
        };
        let previous = self.slots.lock().unwrap().insert(persona, handle.clone());
        (handle, previous)
    }

    /// Install a fresh slot, cancelling any generation it replaces.
    pub fn install(&self, persona: Persona) -> SlotHandle {
        let (handle, previous) = self.replace(persona);
        if let Some(previous) = previous {
            previous.token.cancel();
        }
        handle
    }

    /// Remove the slot on completion or error — only when it still holds the
    /// same handle, so a finished run never evicts its replacement.
    pub fn finish(&self, persona: Persona, handle: &SlotHandle) {
        let mut slots = self.slots.lock().unwrap();
        if slots
            .get(&persona)
            .is_some_and(|current| current.generation == handle.generation)
        {
            slots.remove(&persona);
        }
    }

    /// Cancel the persona's active generation. No-op when absent.
    pub fn cancel(&self, persona: Persona) {
        if let Some(handle) = self.slots.lock().unwrap().remove(&persona) {
            handle.token.cancel();
        }
    }

    /// Whether the persona currently holds a slot.
    pub fn is_active(&self, persona: Persona) -> bool {
        self.slots.lock().unwrap().contains_key(&persona)
    }
}
