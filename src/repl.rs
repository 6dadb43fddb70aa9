//! Interactive shell
//!
//! Line-oriented command loop over the controller's operation set. Plain
//! stdin, no line editing; history is kept in the Turnkit history file.

use std::io::{BufRead, Write};
use std::time::Duration;

use turnkit::{CommandError, CommandHistory, Direction, Result, SendOutcome, TurntableController};

const PROMPT: &str = "turntable> ";

pub async fn run(controller: &TurntableController, default_speed: f64) -> anyhow::Result<()> {
    let mut history = match CommandHistory::default_path() {
        Some(path) => CommandHistory::load(path),
        None => CommandHistory::new(),
    };

    println!("Interactive mode - MakerBot Digitizer (Horus 0.2)");
    println!("Type 'help' for the command list, 'exit' to quit.");

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("{}", PROMPT);
        std::io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF (Ctrl+D)
            println!();
            break;
        }
        let input = line.trim().to_string();
        if input.is_empty() {
            continue;
        }
        history.push(&input);

        match dispatch(controller, &mut history, &input, default_speed).await {
            Ok(Outcome::Continue) => {}
            Ok(Outcome::Exit) => break,
            Err(e) => {
                println!("Error: {}", e);
                if e.is_command_error() {
                    println!("Type 'help' for usage.");
                }
            }
        }
    }

    if let Err(e) = history.save() {
        tracing::warn!(error = %e, "could not save command history");
    }
    Ok(())
}

enum Outcome {
    Continue,
    Exit,
}

async fn dispatch(
    controller: &TurntableController,
    history: &mut CommandHistory,
    input: &str,
    default_speed: f64,
) -> Result<Outcome> {
    let mut parts = input.split_whitespace();
    let word = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts.next();

    match word.as_str() {
        "exit" | "quit" => return Ok(Outcome::Exit),
        "help" | "h" | "?" => print_help(),
        "history" => print_history(history),
        "clear_history" => {
            history.clear()?;
            println!("Command history cleared");
        }
        "enable" => report(controller.enable_motor().await?),
        "disable" | "stop" => report(controller.disable_motor().await?),
        "reset" => report(controller.reset_position().await?),
        "home" => report(controller.home().await?),
        "speed" => {
            let speed: f64 = parse_arg("speed", arg)?;
            report(controller.set_speed(speed).await?);
        }
        "abs_pos" => {
            let position: f64 = parse_arg("position", arg)?;
            report(controller.rotate_to_absolute(position).await?);
        }
        "position" => {
            let position: f64 = parse_arg("position", arg)?;
            report(controller.rotate_to(position, default_speed).await?);
        }
        "turns" => {
            let turns: f64 = parse_arg("turns", arg)?;
            let direction = match parts.next() {
                None | Some("ccw") => Direction::CounterClockwise,
                Some("cw") => Direction::Clockwise,
                Some(other) => {
                    return Err(CommandError::InvalidArgument {
                        what: "direction".to_string(),
                        value: other.to_string(),
                    }
                    .into())
                }
            };
            report(
                controller
                    .rotate_relative(turns, default_speed, direction)
                    .await?,
            );
        }
        "sync" => {
            let position: f64 = parse_arg("position", arg)?;
            controller.sync_position(position);
            println!("Tracked position synced to {}", position);
        }
        "estop" => {
            controller.emergency_stop().await?;
            println!("Emergency stop issued");
        }
        "status" => {
            println!("Tracked position: {} deg", controller.position());
            println!("Motor state: {}", controller.motor_state());
            report(controller.get_status().await?);
        }
        "settings" => report(controller.get_settings().await?),
        "info" => report(controller.get_build_info().await?),
        "parser" => report(controller.get_parser_state().await?),
        "unlock" => report(controller.unlock_alarm().await?),
        "reset_ctrl" => report(controller.soft_reset().await?),
        "start" => report(controller.cycle_start().await?),
        "monitor" => {
            let seconds: u64 = parse_arg("duration", arg)?;
            println!("Monitoring for {} seconds...", seconds);
            controller.start_monitor(Some(Duration::from_secs(seconds)), |line| {
                println!("[{}] {}", line.received_at.format("%H:%M:%S"), line.text);
            });
            controller.wait_monitor().await;
            println!("Monitoring finished");
        }
        "flush" => {
            controller.flush_input().await?;
            println!("Input buffer flushed");
        }
        // Anything unrecognized goes to the device verbatim.
        _ => {
            println!("Sending raw command: '{}'", input);
            report(controller.send_raw(input).await?);
        }
    }

    Ok(Outcome::Continue)
}

fn parse_arg<T: std::str::FromStr>(what: &str, arg: Option<&str>) -> Result<T> {
    let raw = arg.ok_or_else(|| CommandError::InvalidArgument {
        what: what.to_string(),
        value: "<missing>".to_string(),
    })?;
    raw.parse().map_err(|_| {
        CommandError::InvalidArgument {
            what: what.to_string(),
            value: raw.to_string(),
        }
        .into()
    })
}

fn report(outcome: SendOutcome) {
    if outcome.is_silent() {
        println!("ok (no response)");
    } else {
        for line in outcome.lines() {
            println!("  <- {}", line);
        }
    }
}

fn print_history(history: &CommandHistory) {
    if history.is_empty() {
        println!("No commands in history");
        return;
    }
    let total = history.len();
    let shown = total.min(20);
    for (i, entry) in history.recent(shown).enumerate() {
        println!("{:3}: {}", total - shown + i + 1, entry);
    }
}

fn print_help() {
    println!(
        "\nMotor control:
  enable           - enable the motor (M17)
  disable / stop   - disable the motor (M18)
  reset            - zero the position (G50)
  home             - enable + zero
  estop            - feed hold, then disable

Motion:
  speed X          - set speed to X deg/s (G1 F)
  abs_pos X        - rotate to absolute X deg (G1 X)
  position X       - set default speed, then rotate to X deg
  turns N [cw|ccw] - rotate N full turns from the tracked position
  sync X           - set the tracked position to X without moving

Status and system:
  status           - device status (?) plus the tracked position
  settings         - settings dump ($$)
  info             - firmware build info ($I)
  parser           - parser state ($G)
  unlock           - clear alarm ($X)
  reset_ctrl       - firmware soft reset (Ctrl-X)
  start            - cycle start (~)

Diagnostics:
  monitor N        - watch device output for N seconds
  flush            - drain the input buffer
  history          - show recent commands
  clear_history    - forget the command history

Anything else is sent to the device as a raw command.
Positive angles are counter-clockwise. Disable the motor after use.\n"
    );
}
