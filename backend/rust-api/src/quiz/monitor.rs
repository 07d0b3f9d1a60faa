use std::time::Duration;

use serde::{Deserialize, Serialize};
// Banner expiry tracks the tokio clock, not wall time.
use tokio::time::Instant;

/// Policy violations the host environment can report. Each detection maps
/// to exactly one warning; no class depends on any other having fired first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    FocusLoss,
    FullscreenExit,
    ContextMenu,
    DevTools,
    Clipboard,
    WindowSwitch,
}

impl ViolationKind {
    /// Human-readable reason shown in the warning banner.
    pub fn reason(&self) -> &'static str {
        match self {
            ViolationKind::FocusLoss => "Switching tabs is not allowed during the quiz",
            ViolationKind::FullscreenExit => {
                "Exiting fullscreen mode is not allowed during the quiz"
            }
            ViolationKind::ContextMenu => "Right-clicking is not allowed during the quiz",
            ViolationKind::DevTools => "Developer tools are not allowed during the quiz",
            ViolationKind::Clipboard => "Copy/Paste is not allowed during the quiz",
            ViolationKind::WindowSwitch => "Switching windows is not allowed during the quiz",
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            ViolationKind::FocusLoss => "focus_loss",
            ViolationKind::FullscreenExit => "fullscreen_exit",
            ViolationKind::ContextMenu => "context_menu",
            ViolationKind::DevTools => "dev_tools",
            ViolationKind::Clipboard => "clipboard",
            ViolationKind::WindowSwitch => "window_switch",
        }
    }
}

/// Modifier state accompanying a key event.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyModifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

/// Classify a key event against the restricted-combination policy.
/// Key names follow the DOM `KeyboardEvent.key` convention the signals
/// originate from, including its case-sensitivity: shifted combinations
/// report uppercase letters, plain ones lowercase.
pub fn classify_key(key: &str, mods: KeyModifiers) -> Option<ViolationKind> {
    let primary = mods.ctrl || mods.meta;

    if key == "F12" || (primary && mods.shift && matches!(key, "I" | "J" | "C")) {
        return Some(ViolationKind::DevTools);
    }
    if primary && matches!(key, "c" | "v") {
        return Some(ViolationKind::Clipboard);
    }
    if mods.alt && key == "Tab" {
        return Some(ViolationKind::WindowSwitch);
    }
    None
}

/// A single emitted warning. Sequence numbers are 1-based and match the
/// attempt's warning counter at emission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub sequence: u32,
    pub kind: ViolationKind,
    pub reason: &'static str,
}

impl Warning {
    pub fn banner_message(&self, max_warnings: u32) -> String {
        format!(
            "Warning {}/{}: {}",
            self.sequence, max_warnings, self.reason
        )
    }
}

/// Bookkeeping for the auto-hiding warning banner. A new warning replaces
/// whatever is currently visible and restarts the countdown.
#[derive(Debug, Default)]
pub struct WarningBanner {
    current: Option<(Warning, Instant)>,
}

impl WarningBanner {
    pub fn show(&mut self, warning: Warning, now: Instant, visible_for: Duration) {
        self.current = Some((warning, now + visible_for));
    }

    pub fn visible(&self, now: Instant) -> Option<&Warning> {
        match &self.current {
            Some((warning, until)) if now < *until => Some(warning),
            _ => None,
        }
    }
}
