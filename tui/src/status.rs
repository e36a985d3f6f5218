//! Status and mode state shown in the bottom overlay.
//!
//! All of this is host-owned data: the renderer never mutates it except
//! through explicit patches, and nothing outside the overlay builder reads
//! it. Patches use `None` for "leave unchanged"; the double-`Option` fields
//! on [`StatusPatch`] distinguish clearing a line from leaving it alone.

use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalMode {
    Auto,
    #[default]
    Ask,
}

impl ApprovalMode {
    pub(crate) fn toggled(self) -> Self {
        match self {
            ApprovalMode::Auto => ApprovalMode::Ask,
            ApprovalMode::Ask => ApprovalMode::Auto,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ThinkingMode {
    #[default]
    Quick,
    Deep,
}

/// Independent mode flags rendered on the toggle line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ToggleState {
    pub verify: bool,
    pub auto_continue: bool,
    pub approval: ApprovalMode,
    pub dual_rl: bool,
    pub thinking: ThinkingMode,
    pub debug: bool,
}

/// Partial update for [`ToggleState`]; `None` fields are unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TogglePatch {
    pub verify: Option<bool>,
    pub auto_continue: Option<bool>,
    pub approval: Option<ApprovalMode>,
    pub dual_rl: Option<bool>,
    pub thinking: Option<ThinkingMode>,
    pub debug: Option<bool>,
}

impl ToggleState {
    pub(crate) fn apply(&mut self, patch: TogglePatch) {
        if let Some(verify) = patch.verify {
            self.verify = verify;
        }
        if let Some(auto_continue) = patch.auto_continue {
            self.auto_continue = auto_continue;
        }
        if let Some(approval) = patch.approval {
            self.approval = approval;
        }
        if let Some(dual_rl) = patch.dual_rl {
            self.dual_rl = dual_rl;
        }
        if let Some(thinking) = patch.thinking {
            self.thinking = thinking;
        }
        if let Some(debug) = patch.debug {
            self.debug = debug;
        }
    }
}

/// The three-slot status line. `override_line` temporarily replaces `main`
/// when set; `streaming` is shown on the activity line while a long-running
/// operation is in flight and doubles as the busy signal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusBundle {
    pub main: Option<String>,
    pub override_line: Option<String>,
    pub streaming: Option<String>,
}

impl StatusBundle {
    /// The line actually shown in the status row.
    pub(crate) fn effective(&self) -> Option<&str> {
        self.override_line.as_deref().or(self.main.as_deref())
    }

    pub(crate) fn is_streaming(&self) -> bool {
        self.streaming.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub(crate) fn apply(&mut self, patch: StatusPatch) {
        if let Some(main) = patch.main {
            self.main = main;
        }
        if let Some(override_line) = patch.override_line {
            self.override_line = override_line;
        }
        if let Some(streaming) = patch.streaming {
            self.streaming = streaming;
        }
    }
}

/// Partial update for [`StatusBundle`]. Outer `None` leaves the slot
/// unchanged; `Some(None)` clears it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusPatch {
    pub main: Option<Option<String>>,
    pub override_line: Option<Option<String>>,
    pub streaming: Option<Option<String>>,
}

/// Ordered key/value pairs for the model/context line. Insertion order is
/// display order; updating an existing key keeps its position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct StatusMeta {
    entries: Vec<(String, String)>,
}

impl StatusMeta {
    pub(crate) fn apply(&mut self, patch: Vec<(String, Option<String>)>) {
        for (key, value) in patch {
            match value {
                Some(value) => {
                    if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
                        entry.1 = value;
                    } else {
                        self.entries.push((key, value));
                    }
                }
                None => self.entries.retain(|(k, _)| *k != key),
            }
        }
    }

    pub(crate) fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
