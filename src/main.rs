mod debug_report;

use datalayer::{DataLayer, Dispatcher, Page, catalogs, scenario};
use env_logger::{Builder, Env, Target};
use std::io::{self, IsTerminal, Read};

fn main() {
    Builder::from_env(Env::default().default_filter_or("warn")).target(Target::Stderr).init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(&config) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(config: &CliConfig) -> datalayer::Result<()> {
    let steps = scenario::parse(&config.script)?;

    let sink = DataLayer::new();
    let mut page = Page::new(catalogs::form_page());
    let dispatcher = page.install(Dispatcher::new(catalogs::all(), sink.clone()).with_clock(page.clock()));
    let started_at = page.now_ms();

    let reports = scenario::run(&mut page, &steps)?;

    if config.json {
        println!("{}", sink.to_json()?);
    } else {
        let stats = dispatcher.borrow().stats().clone();
        debug_report::print_run(started_at, &reports, &sink.records(), &stats, config.color);
    }
    Ok(())
}

struct CliConfig {
    script: String,
    color: bool,
    json: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut script: Option<String> = None;
    let mut color = io::stdout().is_terminal();
    let mut json = false;
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("datalayer {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--json" => json = true,
            "--scenario" | "-s" => {
                let path = args.next().ok_or_else(|| "error: --scenario expects a file".to_string())?;
                set_script(read_scenario(&path)?, &mut script)?;
            }
            "--" => {
                let rest = args.collect::<Vec<_>>();
                if !rest.is_empty() {
                    set_script(steps_from_args(&rest), &mut script)?;
                }
                break;
            }
            _ if arg.starts_with("--scenario=") => {
                let path = arg.trim_start_matches("--scenario=");
                set_script(read_scenario(path)?, &mut script)?;
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                let rest = std::iter::once(arg).chain(args).collect::<Vec<_>>();
                set_script(steps_from_args(&rest), &mut script)?;
                break;
            }
        }
    }

    let script = match script {
        Some(value) => value,
        None => read_stdin()?,
    };

    if script.trim().is_empty() {
        return Err(format!("error: no scenario provided\n\n{}", help_text()));
    }

    Ok(CliConfig { script, color, json })
}

fn set_script(value: String, script: &mut Option<String>) -> Result<(), String> {
    if script.is_some() {
        return Err("error: scenario provided multiple times".to_string());
    }
    *script = Some(value);
    Ok(())
}

/// `click #submit ; wait 100` -> one step per line.
fn steps_from_args(args: &[String]) -> String {
    args.join(" ").split(';').map(str::trim).collect::<Vec<_>>().join("\n")
}

fn read_scenario(path: &str) -> Result<String, String> {
    if path == "-" {
        return read_stdin();
    }
    std::fs::read_to_string(path).map_err(|err| format!("error: failed to read scenario '{path}': {err}"))
}

fn read_stdin() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer)
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "datalayer {version}

Replays user interactions against the bundled demo contact form and shows the
dataLayer records the delegated dispatcher emits.

Usage:
  datalayer [OPTIONS] [--] <step> [; <step>...]
  datalayer [OPTIONS] --scenario <file>

Steps:
  click <selector>             focus <selector>          blur
  type <selector> \"text\"       check <selector>          uncheck <selector>
  select <selector> <index>    submit <selector>
  window-blur                  window-focus              wait <ms|Ns>

Options:
  -s, --scenario <file>      Read steps from a file, one per line ('-' for stdin).
                             Without steps or a file, stdin is read.
  --json                     Print the dataLayer as JSON instead of the report.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Logging:
  RUST_LOG=datalayer=debug   Trace resolution, vetoes and suppressed refocus.

Exit codes:
  0  Success.
  1  Scenario error (bad step, unknown selector).
  2  Invalid arguments or missing input.
",
        version = env!("CARGO_PKG_VERSION"),
    )
}
