// src/keys.rs

//! Keybinding resolution: key names to keycodes, once, at startup.

use crate::job::{KeyBinding, KeyCallback};
use crate::platform::{DisplayBackend, Keycode};
use log::{debug, error};

/// Keycodes paired with their callbacks, in binding order.
#[derive(Default)]
pub struct KeyTable {
    entries: Vec<(Keycode, KeyCallback)>,
}

impl KeyTable {
    /// Resolves each binding's key name through the display.
    ///
    /// A name the display cannot resolve is reported and skipped; the other
    /// bindings still work.
    pub fn resolve<D: DisplayBackend + ?Sized>(display: &mut D, bindings: &[KeyBinding]) -> Self {
        let mut entries = Vec::with_capacity(bindings.len());
        for binding in bindings {
            match display.keycode_for(&binding.keystring) {
                Some(keycode) => {
                    debug!("Keybinding {:?} => keycode {}", binding.keystring, keycode);
                    entries.push((keycode, binding.callback.clone()));
                }
                None => error!("No keysym for \"{}\"", binding.keystring),
            }
        }
        KeyTable { entries }
    }

    /// The first callback bound to `keycode`.
    pub fn lookup(&self, keycode: Keycode) -> Option<&KeyCallback> {
        self.entries
            .iter()
            .find(|(bound, _)| *bound == keycode)
            .map(|(_, callback)| callback)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobState, KeyAction};
    use crate::platform::backends::mock::{journal, MockDisplay};
    use test_log::test;

    fn bindings() -> Vec<KeyBinding> {
        vec![
            KeyBinding::new("q", |_| KeyAction::Terminate),
            KeyBinding::new("NoSuchKey", |_| KeyAction::Continue),
            KeyBinding::new("plus", |job: &mut JobState| {
                job.zoom *= 2.0;
                KeyAction::Continue
            }),
        ]
    }

    #[test]
    fn unresolvable_names_are_skipped() {
        let mut display = MockDisplay::new(journal()).with_key("q", 24).with_key("plus", 21);
        let table = KeyTable::resolve(&mut display, &bindings());
        assert_eq!(table.len(), 2);
        assert!(table.lookup(24).is_some());
        assert!(table.lookup(21).is_some());
        assert!(table.lookup(99).is_none());
    }

    #[test]
    fn lookup_returns_the_bound_callback() {
        let mut display = MockDisplay::new(journal()).with_key("q", 24).with_key("plus", 21);
        let table = KeyTable::resolve(&mut display, &bindings());

        let mut job = JobState::default();
        let plus = table.lookup(21).unwrap();
        assert_eq!(plus(&mut job), KeyAction::Continue);
        assert_eq!(job.zoom, 2.0);

        let quit = table.lookup(24).unwrap();
        assert_eq!(quit(&mut job), KeyAction::Terminate);
    }

    #[test]
    fn no_bindings_gives_an_empty_table() {
        let mut display = MockDisplay::new(journal());
        assert!(KeyTable::resolve(&mut display, &[]).is_empty());
    }
}
