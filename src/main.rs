use clap::Parser;
use turnkit::{init_logging, Config, SendOutcome, TurntableController};

mod repl;

/// Serial controller for the MakerBot Digitizer turntable (Horus 0.2).
///
/// Positive angles rotate counter-clockwise; positions are absolute and may
/// be negative. Always disable the motor after use, it overheats if left
/// holding.
#[derive(Parser, Debug)]
#[command(name = "turnkit", version, about)]
struct Args {
    /// Serial port of the turntable
    #[arg(long)]
    port: Option<String>,

    /// Baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// Send a single raw G-code/GRBL command and exit
    #[arg(long)]
    command: Option<String>,

    /// Rotate to an absolute position in degrees and exit
    #[arg(long, allow_negative_numbers = true)]
    position: Option<f64>,

    /// Rotation speed in degrees per second
    #[arg(long)]
    speed: Option<f64>,

    /// Start the interactive shell
    #[arg(long, short)]
    interactive: bool,

    /// List candidate serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    let args = Args::parse();

    if args.list_ports {
        for port in turnkit::list_ports()? {
            println!("{}  {}", port.port_name, port.description);
        }
        return Ok(());
    }

    let config = Config::load_default();
    let port = args.port.clone().unwrap_or_else(|| config.connection.port.clone());
    let baud = args.baud.unwrap_or(config.connection.baud_rate);
    let speed = args.speed.unwrap_or(config.motion.default_speed_dps);

    let controller = TurntableController::new();
    controller.set_auto_disable(config.motion.auto_disable());

    if let Err(e) = controller.connect(&port, baud).await {
        eprintln!("Connection failed: {}", e);
        std::process::exit(1);
    }
    println!("Connected to {} at {} baud", port, baud);

    let result = run(&controller, &args, speed).await;

    controller.disconnect().await;
    result
}

async fn run(controller: &TurntableController, args: &Args, speed: f64) -> anyhow::Result<()> {
    if let Some(position) = args.position {
        report(controller.rotate_to(position, speed).await);
    } else if let Some(command) = &args.command {
        report(controller.send_raw(command).await);
    } else if args.interactive {
        repl::run(controller, speed).await?;
    } else {
        println!("Nothing to do. Try --command, --position, or --interactive.");
    }
    Ok(())
}

/// Print an exchange outcome for the one-shot modes.
fn report(result: turnkit::Result<SendOutcome>) {
    match result {
        Ok(outcome) if outcome.is_silent() => println!("ok (no response)"),
        Ok(outcome) => {
            for line in outcome.lines() {
                println!("{}", line);
            }
        }
        Err(e) => eprintln!("Error: {}", e),
    }
}
