use super::keymap::{self, KeyStroke};
use super::{NativeInput, NativeKey};
use crate::AutomationError;
use rdev::{simulate, EventType, Key};
use std::time::Duration;
use tracing::{debug, warn};

// Gap between the press and release of a single key; some targets drop events sent back to back
const KEY_EVENT_GAP: Duration = Duration::from_millis(10);

#[cfg(target_os = "macos")]
const SELECT_ALL_MODIFIER: Key = Key::MetaLeft;
#[cfg(not(target_os = "macos"))]
const SELECT_ALL_MODIFIER: Key = Key::ControlLeft;

/// Keystrokes through `rdev`, focus detection through `xcap`
#[derive(Debug, Default)]
pub struct OsInput;

impl OsInput {
    pub fn new() -> Self {
        Self
    }

    async fn send(event: EventType) -> Result<(), AutomationError> {
        simulate(&event).map_err(|_| {
            AutomationError::PlatformError(format!("Failed to synthesize {event:?}"))
        })?;
        tokio::time::sleep(KEY_EVENT_GAP).await;
        Ok(())
    }

    async fn tap(key: Key) -> Result<(), AutomationError> {
        Self::send(EventType::KeyPress(key)).await?;
        Self::send(EventType::KeyRelease(key)).await
    }

    /// Tap `key` while `modifier` is held. The modifier is always released.
    async fn chord(modifier: Key, key: Key) -> Result<(), AutomationError> {
        Self::send(EventType::KeyPress(modifier)).await?;
        let typed = Self::tap(key).await;
        let released = Self::send(EventType::KeyRelease(modifier)).await;
        typed.and(released)
    }

    async fn stroke(stroke: KeyStroke) -> Result<(), AutomationError> {
        let key = physical_key(stroke.base).ok_or_else(|| {
            AutomationError::PlatformError(format!("No key for {:?}", stroke.base))
        })?;
        if stroke.shift {
            Self::chord(Key::ShiftLeft, key).await
        } else {
            Self::tap(key).await
        }
    }
}

#[async_trait::async_trait]
impl NativeInput for OsInput {
    async fn type_text(&self, text: &str, interval: Duration) -> Result<(), AutomationError> {
        let strokes = keymap::strokes_for(text).map_err(|c| {
            AutomationError::PlatformError(format!(
                "Character {c:?} cannot be typed with the US keyboard map"
            ))
        })?;
        debug!(chars = strokes.len(), "Typing into the focused window");
        for stroke in strokes {
            Self::stroke(stroke).await?;
            tokio::time::sleep(interval).await;
        }
        Ok(())
    }

    fn has_active_window(&self) -> bool {
        match xcap::Window::all() {
            Ok(windows) => windows.iter().any(|w| w.is_focused().unwrap_or(false)),
            Err(e) => {
                warn!("Failed to enumerate windows: {}", e);
                false
            }
        }
    }

    async fn press_key(&self, key: NativeKey) -> Result<(), AutomationError> {
        debug!(%key, "Pressing key");
        match key {
            NativeKey::Enter => Self::tap(Key::Return).await,
            NativeKey::Tab => Self::tap(Key::Tab).await,
            NativeKey::SelectAll => Self::chord(SELECT_ALL_MODIFIER, Key::KeyA).await,
        }
    }
}

fn physical_key(base: char) -> Option<Key> {
    let key = match base {
        'a' => Key::KeyA,
        'b' => Key::KeyB,
        'c' => Key::KeyC,
        'd' => Key::KeyD,
        'e' => Key::KeyE,
        'f' => Key::KeyF,
        'g' => Key::KeyG,
        'h' => Key::KeyH,
        'i' => Key::KeyI,
        'j' => Key::KeyJ,
        'k' => Key::KeyK,
        'l' => Key::KeyL,
        'm' => Key::KeyM,
        'n' => Key::KeyN,
        'o' => Key::KeyO,
        'p' => Key::KeyP,
        'q' => Key::KeyQ,
        'r' => Key::KeyR,
        's' => Key::KeyS,
        't' => Key::KeyT,
        'u' => Key::KeyU,
        'v' => Key::KeyV,
        'w' => Key::KeyW,
        'x' => Key::KeyX,
        'y' => Key::KeyY,
        'z' => Key::KeyZ,
        '0' => Key::Num0,
        '1' => Key::Num1,
        '2' => Key::Num2,
        '3' => Key::Num3,
        '4' => Key::Num4,
        '5' => Key::Num5,
        '6' => Key::Num6,
        '7' => Key::Num7,
        '8' => Key::Num8,
        '9' => Key::Num9,
        ' ' => Key::Space,
        '-' => Key::Minus,
        '=' => Key::Equal,
        '[' => Key::LeftBracket,
        ']' => Key::RightBracket,
        '\\' => Key::BackSlash,
        ';' => Key::SemiColon,
        '\'' => Key::Quote,
        ',' => Key::Comma,
        '.' => Key::Dot,
        '/' => Key::Slash,
        '`' => Key::BackQuote,
        _ => return None,
    };
    Some(key)
}
