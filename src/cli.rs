//! Interactive REPL for driving the on-screen layout by hand

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use crate::config::AppConfig;
use crate::input::gamepad::{EmulatedGamepad, GamepadSnapshot, MemorySource, Navigator};
use crate::input::touch::PointerId;
use crate::ui::{VirtualGamepadUi, WidgetId};

const HELP: &str = "\
commands:
  down <widget> <pointer> [x y]   pointer down on ls, rs, a, b, x, y or menu
  move <pointer> <x> <y>          pointer moved
  up <pointer>                    pointer lifted
  cancel <pointer>                pointer cancelled
  tick [ms]                       advance the clock, fire auto-releases
  poll                            poll controllers
  show                            widget states
  quit                            leave";

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Down {
        widget: WidgetId,
        pointer: PointerId,
        x: f32,
        y: f32,
    },
    Move {
        pointer: PointerId,
        x: f32,
        y: f32,
    },
    Up(PointerId),
    Cancel(PointerId),
    Tick(u64),
    Poll,
    Show,
    Help,
    Quit,
}

fn parse_pointer(token: Option<&str>) -> Result<PointerId> {
    match token {
        Some(t) if t.eq_ignore_ascii_case("mouse") => Ok(PointerId::Mouse),
        Some(t) => Ok(PointerId::Touch(
            t.parse().with_context(|| format!("invalid pointer '{}'", t))?,
        )),
        None => bail!("missing pointer (touch id or 'mouse')"),
    }
}

fn parse_coord(token: Option<&str>, name: &str) -> Result<f32> {
    let token = token.with_context(|| format!("missing {}", name))?;
    token
        .parse()
        .with_context(|| format!("invalid {} '{}'", name, token))
}

/// Parse one REPL line
pub fn parse_command(line: &str) -> Result<ReplCommand> {
    let mut tokens = line.split_whitespace();
    let Some(verb) = tokens.next() else {
        bail!("empty command");
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "down" => {
            let widget: WidgetId = tokens.next().context("missing widget")?.parse()?;
            let pointer = parse_pointer(tokens.next())?;
            let (x, y) = match tokens.next() {
                Some(x) => (parse_coord(Some(x), "x")?, parse_coord(tokens.next(), "y")?),
                None => (0.0, 0.0),
            };
            ReplCommand::Down { widget, pointer, x, y }
        }
        "move" => ReplCommand::Move {
            pointer: parse_pointer(tokens.next())?,
            x: parse_coord(tokens.next(), "x")?,
            y: parse_coord(tokens.next(), "y")?,
        },
        "up" => ReplCommand::Up(parse_pointer(tokens.next())?),
        "cancel" => ReplCommand::Cancel(parse_pointer(tokens.next())?),
        "tick" => ReplCommand::Tick(match tokens.next() {
            Some(ms) => ms.parse().with_context(|| format!("invalid duration '{}'", ms))?,
            None => 0,
        }),
        "poll" => ReplCommand::Poll,
        "show" => ReplCommand::Show,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => bail!("unknown command '{}' (try 'help')", other),
    };
    Ok(command)
}

/// Layout plus an in-memory host, driven by REPL commands
pub struct Session {
    ui: VirtualGamepadUi,
    navigator: Navigator,
    start: Instant,
    clock_ms: u64,
}

impl Session {
    pub fn new(config: &AppConfig) -> Self {
        let navigator = Navigator::new(MemorySource::new());
        let engine = EmulatedGamepad::new(navigator.clone());
        Self {
            ui: VirtualGamepadUi::from_config(engine, config),
            navigator,
            start: Instant::now(),
            clock_ms: 0,
        }
    }

    fn now(&self) -> Instant {
        self.start + Duration::from_millis(self.clock_ms)
    }

    /// Run a command; returns the text to print
    pub fn execute(&mut self, command: &ReplCommand) -> String {
        match command {
            ReplCommand::Down { widget, pointer, x, y } => {
                let now = self.now();
                let accepted = self.ui.pointer_down(*widget, *pointer, *x, *y, now);
                format!("{} {} {}", widget, pointer, if accepted { "engaged" } else { "ignored" })
            }
            ReplCommand::Move { pointer, x, y } => {
                let updated = self.ui.pointer_move(*pointer, *x, *y);
                format!("{} {}", pointer, if updated { "moved" } else { "no update" })
            }
            ReplCommand::Up(pointer) => released(self.ui.pointer_up(*pointer)),
            ReplCommand::Cancel(pointer) => released(self.ui.pointer_cancel(*pointer)),
            ReplCommand::Tick(ms) => {
                self.clock_ms += ms;
                let now = self.now();
                let fired = self.ui.tick(now);
                format!("t={}ms {}", self.clock_ms, released(fired))
            }
            ReplCommand::Poll => self
                .navigator
                .get_gamepads()
                .iter()
                .enumerate()
                .map(|(slot, device)| match device {
                    Some(device) => format_device(slot, device),
                    None => format!("[{}] {}", slot, "empty".dimmed()),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            ReplCommand::Show => WidgetId::ALL
                .iter()
                .filter_map(|id| self.ui.state(*id).map(|state| (id, state)))
                .map(|(id, state)| {
                    format!(
                        "{:>4} {} value={:.2} x={:+.2} y={:+.2} owner={}",
                        id.to_string().yellow(),
                        if state.is_pressed { "●".green() } else { "○".dimmed() },
                        state.value,
                        state.x,
                        state.y,
                        state.raw_identifier()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
            ReplCommand::Help => HELP.to_string(),
            ReplCommand::Quit => String::new(),
        }
    }
}

fn released(widgets: Vec<WidgetId>) -> String {
    if widgets.is_empty() {
        "nothing released".to_string()
    } else {
        let names: Vec<_> = widgets.iter().map(|w| w.name()).collect();
        format!("released {}", names.join(", "))
    }
}

fn format_device(slot: usize, device: &GamepadSnapshot) -> String {
    let pressed: Vec<String> = device.pressed_buttons().map(|i| i.to_string()).collect();
    let axes: Vec<String> = device.axes.iter().map(|a| format!("{:+.2}", a)).collect();
    format!(
        "[{}] {} axes=[{}] pressed=[{}]",
        slot,
        device.id.cyan(),
        axes.join(", "),
        pressed.join(", ").green()
    )
}

pub async fn run_repl(config: &AppConfig) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut session = Session::new(config);

    println!("{}", "=== Virtual Gamepad REPL ===".bold().cyan());
    println!("{}", "Type 'help' for commands".dimmed());

    loop {
        match rl.readline("gamepad> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                if let Err(e) = rl.add_history_entry(line.as_str()) {
                    debug!("History entry dropped: {}", e);
                }
                match parse_command(&line) {
                    Ok(ReplCommand::Quit) => break,
                    Ok(command) => println!("{}", session.execute(&command)),
                    Err(e) => println!("{} {:#}", "error:".red(), e),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("down ls 1 10 20").unwrap(),
            ReplCommand::Down {
                widget: WidgetId::LeftStick,
                pointer: PointerId::Touch(1),
                x: 10.0,
                y: 20.0
            }
        );
        assert_eq!(
            parse_command("down menu mouse").unwrap(),
            ReplCommand::Down {
                widget: WidgetId::Menu,
                pointer: PointerId::Mouse,
                x: 0.0,
                y: 0.0
            }
        );
        assert_eq!(parse_command("UP 3").unwrap(), ReplCommand::Up(PointerId::Touch(3)));
        assert_eq!(parse_command("tick").unwrap(), ReplCommand::Tick(0));
        assert_eq!(parse_command("tick 300").unwrap(), ReplCommand::Tick(300));
        assert_eq!(parse_command("exit").unwrap(), ReplCommand::Quit);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("").is_err());
        assert!(parse_command("down start 1").is_err());
        assert!(parse_command("move 1 10").is_err());
        assert!(parse_command("up finger").is_err());
        assert!(parse_command("jump").is_err());
    }

    #[test]
    fn test_session_round_trip() {
        colored::control::set_override(false);
        let mut session = Session::new(&AppConfig::default());

        let out = session.execute(&parse_command("down a 1").unwrap());
        assert_eq!(out, "a touch:1 engaged");

        let out = session.execute(&ReplCommand::Poll);
        assert!(out.contains("pressed=[0]"), "{}", out);

        let out = session.execute(&ReplCommand::Tick(300));
        assert_eq!(out, "t=300ms released a");

        let out = session.execute(&ReplCommand::Up(PointerId::Touch(1)));
        assert_eq!(out, "nothing released");
    }
}
