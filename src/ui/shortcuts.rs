use imgui::Ui;
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Keyboard shortcut manager for the kiosk window
pub struct ShortcutManager {
    shortcuts: Vec<Shortcut>,
}

#[derive(Clone)]
pub struct Shortcut {
    pub key: PhysicalKey,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub action: KioskAction,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KioskAction {
    ExitFullscreen,
    ToggleFullscreen,
    ToggleOverlay,
    ToggleHelp,
    Stop,
    Quit,
}

impl ShortcutManager {
    pub fn new() -> Self {
        let mut manager = Self {
            shortcuts: Vec::new(),
        };
        manager.register_defaults();
        manager
    }

    fn register_defaults(&mut self) {
        // Presentation
        self.register(KeyCode::Escape, false, KioskAction::ExitFullscreen, "Exit fullscreen");
        self.register(KeyCode::F11, false, KioskAction::ToggleFullscreen, "Toggle fullscreen");
        self.register(KeyCode::KeyO, true, KioskAction::ToggleOverlay, "Toggle now-playing overlay");
        self.register(KeyCode::F1, false, KioskAction::ToggleHelp, "Show shortcuts");

        // Session
        self.register(KeyCode::KeyS, true, KioskAction::Stop, "Stop playback");
        self.register(KeyCode::KeyQ, true, KioskAction::Quit, "Quit");
    }

    fn register(&mut self, code: KeyCode, ctrl: bool, action: KioskAction, description: &str) {
        self.shortcuts.push(Shortcut {
            key: PhysicalKey::Code(code),
            ctrl,
            shift: false,
            alt: false,
            action,
            description: description.to_string(),
        });
    }

    /// Process a key event and return the matching action (if any)
    pub fn process_event(&self, event: &KeyEvent, ctrl: bool, shift: bool, alt: bool) -> Option<KioskAction> {
        if event.state != ElementState::Pressed || event.repeat {
            return None;
        }
        self.lookup(event.physical_key, ctrl, shift, alt)
    }

    pub fn lookup(&self, key: PhysicalKey, ctrl: bool, shift: bool, alt: bool) -> Option<KioskAction> {
        self.shortcuts
            .iter()
            .find(|s| s.key == key && s.ctrl == ctrl && s.shift == shift && s.alt == alt)
            .map(|s| s.action)
    }

    /// Render the shortcut list as a small overlay
    pub fn render_help(&self, ui: &Ui, is_open: &mut bool) {
        ui.window("Keyboard Shortcuts")
            .size([320.0, 200.0], imgui::Condition::FirstUseEver)
            .position([40.0, 80.0], imgui::Condition::FirstUseEver)
            .opened(is_open)
            .build(|| {
                for shortcut in &self.shortcuts {
                    ui.text(format!("  {:10} - {}", shortcut_label(shortcut), shortcut.description));
                }
            });
    }
}

fn shortcut_label(shortcut: &Shortcut) -> String {
    let mut label = String::new();
    if shortcut.ctrl {
        label.push_str("Ctrl+");
    }
    if shortcut.shift {
        label.push_str("Shift+");
    }
    if shortcut.alt {
        label.push_str("Alt+");
    }
    label.push_str(&key_to_string(shortcut.key));
    label
}

fn key_to_string(key: PhysicalKey) -> String {
    match key {
        PhysicalKey::Code(code) => match code {
            KeyCode::Escape => "Esc".to_string(),
            KeyCode::F1 => "F1".to_string(),
            KeyCode::F11 => "F11".to_string(),
            KeyCode::KeyO => "O".to_string(),
            KeyCode::KeyQ => "Q".to_string(),
            KeyCode::KeyS => "S".to_string(),
            _ => format!("{:?}", code),
        },
        _ => "?".to_string(),
    }
}

impl Default for ShortcutManager {
    fn default() -> Self {
        Self::new()
    }
}
