//! Line-oriented command driver for the native build.
//!
//! Each input line is one command; see [`HELP`]. The driver owns an
//! [`Annotator`] and reports results and notifications as text.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::annotator::{Annotator, Severity};
use crate::constants::zoom::PAN_STEP;
use crate::export::export_filename;
use crate::geometry::Point;
use crate::interaction::{Command, InputEvent, ToolMode};
use crate::keybindings::Modifiers;
use crate::undo::EditAction;

pub const HELP: &str = "\
commands:
  click <region>           label/erase a region with the current mode
  at <x> <y>               click at a viewport position
  hover <x> <y>            move the pointer to a viewport position
  key <char> [shift]       press a key
  mode <good|moderate|bad|erase>
  undo | redo
  zoom <in|out|reset|FACTOR>   FACTOR zooms about the view center
  pan <dx> <dy> | pan <left|right|up|down>
  center <x> <y>           center the view on an image point
  minimap <x> <y>          click the minimap
  counts                   label counts
  view                     transform and minimap rectangle
  svg                      overlay as SVG
  export [path]            write {image_id}_labels.json
  reload                   re-fetch labels
  open <session id>        switch session
  quit";

/// One parsed driver command.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCommand {
    Input(InputEvent),
    Dispatch(Command),
    ZoomBy(f32),
    Counts,
    View,
    Svg,
    Export(Option<PathBuf>),
    Reload,
    Open(String),
    Help,
    Quit,
}

fn number(arg: Option<&str>, name: &str) -> Result<f32, String> {
    let arg = arg.ok_or_else(|| format!("missing {}", name))?;
    arg.parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("invalid {} '{}'", name, arg))
}

fn point(args: &[&str]) -> Result<Point, String> {
    Ok(Point::new(
        number(args.first().copied(), "x")?,
        number(args.get(1).copied(), "y")?,
    ))
}

/// Parse one input line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<DriverCommand>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match verb.to_ascii_lowercase().as_str() {
        "click" => {
            let id = args.first().ok_or("missing region id")?;
            DriverCommand::Input(InputEvent::RegionClicked((*id).into()))
        }
        "at" => DriverCommand::Input(InputEvent::PointerDown(point(&args)?)),
        "hover" => DriverCommand::Input(InputEvent::PointerMoved(point(&args)?)),
        "key" => {
            let key = args
                .first()
                .and_then(|k| k.chars().next())
                .ok_or("missing key")?;
            let shift = args.get(1).is_some_and(|m| m.eq_ignore_ascii_case("shift"));
            DriverCommand::Input(InputEvent::Key {
                key,
                modifiers: Modifiers {
                    shift,
                    ..Modifiers::NONE
                },
                in_text_input: false,
            })
        }
        "mode" => {
            let mode = args.first().ok_or("missing mode")?;
            let mode: ToolMode = mode.parse().map_err(|e| format!("{}", e))?;
            DriverCommand::Input(InputEvent::ToolSelected(mode))
        }
        "undo" => DriverCommand::Dispatch(Command::Edit(EditAction::Undo)),
        "redo" => DriverCommand::Dispatch(Command::Edit(EditAction::Redo)),
        "zoom" => match args.first().copied() {
            Some("in") => DriverCommand::Dispatch(Command::ZoomIn),
            Some("out") => DriverCommand::Dispatch(Command::ZoomOut),
            Some("reset") => DriverCommand::Dispatch(Command::ResetView),
            other => DriverCommand::ZoomBy(number(other, "factor")?),
        },
        "pan" => {
            let (dx, dy) = match args.first().copied() {
                Some("left") => (PAN_STEP, 0.0),
                Some("right") => (-PAN_STEP, 0.0),
                Some("up") => (0.0, PAN_STEP),
                Some("down") => (0.0, -PAN_STEP),
                _ => {
                    let p = point(&args)?;
                    (p.x, p.y)
                }
            };
            DriverCommand::Dispatch(Command::PanBy { dx, dy })
        }
        "center" => DriverCommand::Dispatch(Command::CenterOn(point(&args)?)),
        "minimap" => DriverCommand::Input(InputEvent::MinimapClicked(point(&args)?)),
        "counts" => DriverCommand::Counts,
        "view" => DriverCommand::View,
        "svg" => DriverCommand::Svg,
        "export" => DriverCommand::Export(args.first().map(PathBuf::from)),
        "reload" => DriverCommand::Reload,
        "open" => DriverCommand::Open(args.join(" ")),
        "help" | "?" => DriverCommand::Help,
        "quit" | "exit" => DriverCommand::Quit,
        other => return Err(format!("unknown command '{}'", other)),
    };
    Ok(Some(command))
}

/// Runs driver commands against an annotator.
pub struct Driver {
    annotator: Annotator,
    export_dir: PathBuf,
}

impl Driver {
    pub fn new(annotator: Annotator, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            annotator,
            export_dir: export_dir.into(),
        }
    }

    pub fn annotator(&self) -> &Annotator {
        &self.annotator
    }

    pub fn annotator_mut(&mut self) -> &mut Annotator {
        &mut self.annotator
    }

    /// Execute one command. Returns the text to print, or `None` on quit.
    pub fn execute(&mut self, command: DriverCommand) -> Option<String> {
        let mut out = String::new();
        match command {
            DriverCommand::Input(event) => self.annotator.handle_input(event),
            DriverCommand::Dispatch(command) => self.annotator.dispatch(command),
            DriverCommand::ZoomBy(factor) => {
                let anchor = self.annotator.viewport().container_size().center();
                self.annotator.dispatch(Command::ZoomAt { anchor, factor });
            }
            DriverCommand::Counts => {
                let c = self.annotator.counts();
                let _ = write!(
                    out,
                    "good={} moderate={} bad={} unlabeled={} total={}",
                    c.good, c.moderate, c.bad, c.unlabeled, c.total
                );
            }
            DriverCommand::View => {
                let t = self.annotator.transform();
                let _ = write!(
                    out,
                    "scale={:.4} translate=({:.1}, {:.1})",
                    t.scale, t.translate_x, t.translate_y
                );
                if let Some(m) = self.annotator.minimap_view() {
                    let _ = write!(
                        out,
                        " minimap=({:.1}, {:.1}, {:.1}x{:.1})",
                        m.visible.x, m.visible.y, m.visible.width, m.visible.height
                    );
                }
            }
            DriverCommand::Svg => out.push_str(&self.annotator.overlay_svg()),
            DriverCommand::Export(path) => match self.export(path.as_deref()) {
                Ok(path) => {
                    let _ = write!(out, "exported {}", path.display());
                }
                Err(e) => {
                    let _ = write!(out, "export failed: {}", e);
                }
            },
            DriverCommand::Reload => self.annotator.reload_labels(),
            DriverCommand::Open(id) => self.annotator.open_session(&id),
            DriverCommand::Help => out.push_str(HELP),
            DriverCommand::Quit => return None,
        }

        self.annotator.poll();
        for note in self.annotator.take_notifications() {
            if !out.is_empty() {
                out.push('\n');
            }
            let tag = match note.severity {
                Severity::Info => "info",
                Severity::Warning => "warning",
                Severity::Error => "error",
            };
            let _ = write!(out, "[{}] {}", tag, note.message);
        }
        Some(out)
    }

    fn export(&self, path: Option<&Path>) -> Result<PathBuf, crate::error::ExportError> {
        let export = self.annotator.export()?;
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => self.export_dir.join(export_filename(&export.image_id)),
        };
        export.write_to(&path)?;
        Ok(path)
    }

    /// Send pending writes and apply their completions.
    pub fn shutdown(&mut self) {
        let sent = self.annotator.flush();
        if sent > 0 {
            log::info!("Flushed {} pending label writes", sent);
        }
        self.annotator.poll();
        for note in self.annotator.take_notifications() {
            log::warn!("{}", note.message);
        }
    }
}
