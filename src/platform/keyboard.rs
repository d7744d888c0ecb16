use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use log::warn;
use std::thread;
use std::time::Duration;

use super::{Chord, InputSynthesizer};
use crate::error::PlatformError;

/// [`InputSynthesizer`] over enigo. A fresh connection is opened per chord;
/// enigo connections are not `Send` on every platform.
#[derive(Debug, Default)]
pub struct EnigoKeyboard;

impl EnigoKeyboard {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "macos")]
const COMMAND_KEY: Key = Key::Meta;
#[cfg(not(target_os = "macos"))]
const COMMAND_KEY: Key = Key::Control;

impl InputSynthesizer for EnigoKeyboard {
    fn send_chord(&self, chord: Chord, key_gap: Duration) -> Result<(), PlatformError> {
        let mut enigo = Enigo::new(&Settings::default()).map_err(|e| {
            PlatformError::InputSynthesisFailed(format!(
                "Failed to initialize keyboard simulation: {}",
                e
            ))
        })?;

        enigo
            .key(COMMAND_KEY, Direction::Press)
            .map_err(|e| PlatformError::InputSynthesisFailed(format!("Failed to press modifier: {}", e)))?;

        let letter = Key::Unicode(chord.letter());
        let tapped = (|| {
            thread::sleep(key_gap);
            enigo.key(letter, Direction::Press)?;
            thread::sleep(key_gap);
            enigo.key(letter, Direction::Release)?;
            thread::sleep(key_gap);
            Ok::<(), enigo::InputError>(())
        })();

        // Release the modifier even when the tap failed so no key stays held.
        let released = enigo.key(COMMAND_KEY, Direction::Release);

        tapped.map_err(|e| {
            PlatformError::InputSynthesisFailed(format!("Failed to send {:?} chord: {}", chord, e))
        })?;
        if let Err(e) = released {
            warn!("Failed to release modifier after {:?}: {}", chord, e);
            return Err(PlatformError::InputSynthesisFailed(format!(
                "Failed to release modifier: {}",
                e
            )));
        }
        Ok(())
    }
}
