use crate::model::ScannedCode;

/// A raw key press as delivered by the keyboard-wedge scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Char(char),
    Enter,
    /// Any other key (modifiers, arrows, function keys).
    Other,
}

/// Accumulates digit key presses and emits a code on every terminator.
#[derive(Debug, Default)]
pub struct ScanInputDecoder {
    pending: String,
}

impl ScanInputDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one key. Returns a code when the key is the terminator, even if
    /// no digits were buffered.
    pub fn push(&mut self, key: KeyEvent) -> Option<ScannedCode> {
        match key {
            KeyEvent::Enter => Some(ScannedCode::new(std::mem::take(&mut self.pending))),
            KeyEvent::Char(c) if c.is_ascii_digit() => {
                self.pending.push(c);
                None
            }
            KeyEvent::Char(_) | KeyEvent::Other => None,
        }
    }

    /// Feeds a batch of keys and collects every emitted code in order.
    pub fn feed<I>(&mut self, keys: I) -> Vec<ScannedCode>
    where
        I: IntoIterator<Item = KeyEvent>,
    {
        keys.into_iter().filter_map(|key| self.push(key)).collect()
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }
}
