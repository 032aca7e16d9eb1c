//! Interaction surface: turns pointer and keyboard input into commands.
//!
//! Input interpretation is pure. It reads the current tool mode and bindings
//! and yields at most one [`Command`]; the annotator executes every command
//! through a single dispatch function, so keyboard and pointer paths never
//! diverge.

use std::fmt;
use std::str::FromStr;

use crate::geometry::Point;
use crate::keybindings::{KeyAction, KeyBindings, Modifiers};
use crate::model::{HealthLabel, RegionId, UnknownLabel};
use crate::undo::EditAction;

/// What a click on a region does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolMode {
    Label(HealthLabel),
    Erase,
}

impl Default for ToolMode {
    fn default() -> Self {
        ToolMode::Label(HealthLabel::Good)
    }
}

impl ToolMode {
    /// All modes in toolbar order.
    pub fn all() -> [ToolMode; 4] {
        [
            ToolMode::Label(HealthLabel::Good),
            ToolMode::Label(HealthLabel::Moderate),
            ToolMode::Label(HealthLabel::Bad),
            ToolMode::Erase,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolMode::Label(label) => label.as_str(),
            ToolMode::Erase => "erase",
        }
    }

    /// The edit a click on `region_id` performs in this mode.
    pub fn action_for(&self, region_id: RegionId) -> EditAction {
        match self {
            ToolMode::Label(label) => EditAction::Apply {
                region_id,
                label: *label,
            },
            ToolMode::Erase => EditAction::Erase { region_id },
        }
    }
}

impl fmt::Display for ToolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolMode {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("erase") {
            return Ok(ToolMode::Erase);
        }
        s.parse::<HealthLabel>().map(ToolMode::Label)
    }
}

/// Raw input from the host UI.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// The host already resolved the click to a region (e.g. an SVG polygon).
    RegionClicked(RegionId),
    /// Click in viewport coordinates; resolved by hit testing.
    PointerDown(Point),
    /// Pointer moved, in viewport coordinates.
    PointerMoved(Point),
    PointerEntered(RegionId),
    PointerLeft(RegionId),
    Key {
        key: char,
        modifiers: Modifiers,
        /// Focus is in a text field; shortcuts must not fire.
        in_text_input: bool,
    },
    /// Toolbar button.
    ToolSelected(ToolMode),
    /// Drag gesture delta in viewport pixels.
    Drag { dx: f32, dy: f32 },
    /// Wheel or pinch: positive `delta` zooms in.
    Wheel { anchor: Point, delta: f32 },
    /// Click in minimap coordinates.
    MinimapClicked(Point),
}

/// Everything the annotator can be asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Edit(EditAction),
    SetTool(ToolMode),
    /// Transient highlight; `None` clears it. Never recorded in history.
    Hover(Option<RegionId>),
    /// Resolve a viewport point to a region, then click it.
    ClickAt(Point),
    /// Resolve a viewport point to a region, then hover it.
    HoverAt(Point),
    ZoomIn,
    ZoomOut,
    ResetView,
    PanBy { dx: f32, dy: f32 },
    ZoomAt { anchor: Point, factor: f32 },
    SetTransform { x: f32, y: f32, scale: f32 },
    /// Center the viewport on an image-space point.
    CenterOn(Point),
    /// Center the viewport on the image point under a minimap point.
    CenterOnMinimap(Point),
}

/// Map a key action to the command it triggers.
fn key_command(action: KeyAction) -> Command {
    match action {
        KeyAction::SelectCategory(label) => Command::SetTool(ToolMode::Label(label)),
        KeyAction::SelectErase => Command::SetTool(ToolMode::Erase),
        KeyAction::Undo => Command::Edit(EditAction::Undo),
        KeyAction::Redo => Command::Edit(EditAction::Redo),
        KeyAction::ZoomIn => Command::ZoomIn,
        KeyAction::ZoomOut => Command::ZoomOut,
        KeyAction::ResetView => Command::ResetView,
    }
}

/// Translate one input event into a command, given the current tool mode
/// and hover target.
pub fn interpret(
    event: InputEvent,
    mode: ToolMode,
    hovered: Option<&RegionId>,
    bindings: &KeyBindings,
    zoom_factor: f32,
) -> Option<Command> {
    match event {
        InputEvent::RegionClicked(id) => Some(Command::Edit(mode.action_for(id))),
        InputEvent::PointerDown(p) => Some(Command::ClickAt(p)),
        InputEvent::PointerMoved(p) => Some(Command::HoverAt(p)),
        InputEvent::PointerEntered(id) => Some(Command::Hover(Some(id))),
        InputEvent::PointerLeft(id) => {
            // A late leave for a region we already moved off must not clear
            // the new highlight.
            if hovered == Some(&id) {
                Some(Command::Hover(None))
            } else {
                None
            }
        }
        InputEvent::Key {
            key,
            modifiers,
            in_text_input,
        } => {
            if in_text_input {
                log::trace!("Ignoring key '{}' while typing", key);
                return None;
            }
            bindings.action_for_key(key, modifiers).map(key_command)
        }
        InputEvent::ToolSelected(mode) => Some(Command::SetTool(mode)),
        InputEvent::Drag { dx, dy } => Some(Command::PanBy { dx, dy }),
        InputEvent::Wheel { anchor, delta } => {
            if delta == 0.0 || !delta.is_finite() {
                return None;
            }
            let factor = if delta > 0.0 {
                zoom_factor
            } else {
                1.0 / zoom_factor
            };
            Some(Command::ZoomAt { anchor, factor })
        }
        InputEvent::MinimapClicked(p) => Some(Command::CenterOnMinimap(p)),
    }
}
