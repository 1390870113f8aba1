use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    process,
    sync::mpsc,
    thread,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use log::LevelFilter;

use chip::{
    chip8::ChipSet,
    config::{Config, Quirks},
    definitions::display,
    devices::{DisplayCommands, KeyMapper, SoundCommands},
    logger,
    resources::{Rom, RomArchives},
    run, share,
    timer::Worker,
    Runner,
};

struct CliArgs {
    rom_path: Option<PathBuf>,
    archive: Option<PathBuf>,
    name: Option<String>,
    config: Config,
    log_path: Option<PathBuf>,
    log_level: LevelFilter,
}

fn usage() {
    eprintln!("Usage: chip8-vm [<rom>] [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --archive <zip>          Load the rom from a zip archive");
    eprintln!("  --name <entry>           Name of the rom inside the archive");
    eprintln!("  --hz <n>                 Instructions per second [default: 360]");
    eprintln!("  --cycles-per-tick <n>    Instructions per timer decrement [default: 10]");
    eprintln!("  --seed <n>               Seed for the random number generator");
    eprintln!("  --shift-quirk            8XY6 and 8XYE store the shifted bit in VF");
    eprintln!("  --tick-while-blocked     Timers keep running while waiting for a key");
    eprintln!("  --log <file>             Write the log into the file instead of stderr");
    eprintln!("  --log-level <level>      off, error, warn, info, debug or trace [default: warn]");
    eprintln!();
    eprintln!("Keys are read from stdin, one line per keyboard state:");
    eprintln!("  1234 / qwer / asdf / zxcv, an empty line releases all keys, 'quit' stops.");
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i)
        .map(String::as_str)
        .with_context(|| format!("missing value for {}", flag))
}

fn parse_args() -> Result<CliArgs> {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        rom_path: None,
        archive: None,
        name: None,
        config: Config::default(),
        log_path: None,
        log_level: LevelFilter::Warn,
    };
    let mut quirks = Quirks::default();

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--archive" => {
                i += 1;
                cli.archive = Some(PathBuf::from(value(&args, i, flag)?));
            }
            "--name" => {
                i += 1;
                cli.name = Some(value(&args, i, flag)?.to_string());
            }
            "--hz" => {
                i += 1;
                let hz = value(&args, i, flag)?
                    .parse()
                    .context("--hz expects a number")?;
                cli.config = cli.config.with_cpu_hertz(hz);
            }
            "--cycles-per-tick" => {
                i += 1;
                let cycles = value(&args, i, flag)?
                    .parse()
                    .context("--cycles-per-tick expects a number")?;
                cli.config = cli.config.with_cycles_per_timer_tick(cycles);
            }
            "--seed" => {
                i += 1;
                let seed = value(&args, i, flag)?
                    .parse()
                    .context("--seed expects a number")?;
                cli.config = cli.config.with_rng_seed(seed);
            }
            "--shift-quirk" => quirks.shift_sets_flag = true,
            "--tick-while-blocked" => quirks.timers_tick_while_blocked = true,
            "--log" => {
                i += 1;
                cli.log_path = Some(PathBuf::from(value(&args, i, flag)?));
            }
            "--log-level" => {
                i += 1;
                cli.log_level = value(&args, i, flag)?
                    .parse()
                    .context("unknown log level")?;
            }
            "--help" | "-h" => {
                usage();
                process::exit(0);
            }
            other if other.starts_with("--") => bail!("unknown argument: {}", other),
            other => {
                if cli.rom_path.is_some() {
                    bail!("only a single rom can be run");
                }
                cli.rom_path = Some(PathBuf::from(other));
            }
        }
        i += 1;
    }

    cli.config = cli.config.with_quirks(quirks);
    Ok(cli)
}

fn load_rom(cli: &CliArgs) -> Result<Rom> {
    match (&cli.archive, &cli.rom_path) {
        (Some(archive), None) => {
            let mut archive = RomArchives::open(archive)
                .with_context(|| format!("unable to open {}", archive.display()))?;
            let name = match &cli.name {
                Some(name) => name,
                None => {
                    let names = archive.file_names().join(", ");
                    bail!("--name is required, available roms: {}", names);
                }
            };
            Ok(archive.get_file_data(name)?)
        }
        (None, Some(path)) => {
            Rom::from_path(path).with_context(|| format!("unable to load {}", path.display()))
        }
        (Some(_), Some(_)) => bail!("either a rom path or an archive can be given"),
        (None, None) => {
            usage();
            bail!("no rom given");
        }
    }
}

/// Renders the framebuffer as text.
struct TerminalDisplay {
    out: io::Stdout,
}

impl DisplayCommands for TerminalDisplay {
    fn display(&mut self, pixels: &[Vec<bool>]) {
        let mut frame = String::with_capacity((display::WIDTH + 1) * display::HEIGHT + 8);
        // move the cursor home instead of scrolling
        frame.push_str("\x1B[H");
        for row in pixels {
            frame.extend(row.iter().map(|p| if *p { '█' } else { ' ' }));
            frame.push('\n');
        }
        let mut out = self.out.lock();
        if let Err(err) = out.write_all(frame.as_bytes()).and_then(|_| out.flush()) {
            log::warn!("unable to draw the frame: {}", err);
        }
    }
}

/// Rings the terminal bell.
struct Bell;

impl SoundCommands for Bell {
    fn beep(&mut self) {
        let mut out = io::stdout();
        let _ = out.write_all(b"\x07").and_then(|_| out.flush());
    }
}

enum Input {
    Keys([bool; 16]),
    Quit,
}

/// Reads keyboard states from stdin until `quit` or the end of input.
fn spawn_input() -> mpsc::Receiver<Input> {
    let (send, recv) = mpsc::channel();
    thread::spawn(move || {
        let mapper = KeyMapper::new();
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    log::error!("unable to read the input: {}", err);
                    break;
                }
            };
            let line = line.trim();
            if line == "quit" {
                break;
            }
            if send.send(Input::Keys(mapper.keyboard(line.chars()))).is_err() {
                return;
            }
        }
        let _ = send.send(Input::Quit);
    });
    recv
}

fn main() -> Result<()> {
    let cli = parse_args()?;
    logger::init(cli.log_path.as_deref(), cli.log_level)?;

    let rom = load_rom(&cli)?;
    let mut chip = ChipSet::with_config(cli.config);
    chip.load(&rom);

    // clear the terminal once, every frame is drawn from the top left
    print!("\x1B[2J");

    let display = TerminalDisplay { out: io::stdout() };
    let runner: Runner<Worker> = run(share(chip), display, Bell);
    let input = spawn_input();

    let res = loop {
        if let Some(err) = runner.wait_timeout(Duration::from_millis(10)) {
            break Err(err);
        }
        match input.try_recv() {
            Ok(Input::Keys(keys)) => runner.chip().lock().set_keyboard(&keys),
            Ok(Input::Quit) | Err(mpsc::TryRecvError::Disconnected) => break Ok(()),
            Err(mpsc::TryRecvError::Empty) => {}
        }
    };

    runner.stop();
    logger::flush();

    res.context("the program stopped")
}
