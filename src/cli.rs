use std::env;
use std::path::PathBuf;

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq)]
pub struct CliOptions {
    pub config: Option<PathBuf>,
    pub preset: Option<String>,
    /// Number of ticks, `None` to run until the process is stopped.
    pub ticks: Option<usize>,
    pub period_ms: u64,
    pub seed: u64,
    pub dropout: f64,
    pub telemetry_in: Option<PathBuf>,
    pub telemetry_out: Option<PathBuf>,
    pub log_json: bool,
}

/// Outcome of argument parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    Run(CliOptions),
    Help,
}

const DEFAULT_TICKS: usize = 60;
const DEFAULT_PERIOD_MS: u64 = 1000;
const DEFAULT_SEED: u64 = 42;

pub fn parse_args() -> Result<CliCommand, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(&args)
}

pub fn parse_args_from(args: &[String]) -> Result<CliCommand, String> {
    let mut i = 0usize;
    let mut config = None;
    let mut preset = None;
    let mut ticks = None;
    let mut period_ms = None;
    let mut seed = None;
    let mut dropout = None;
    let mut telemetry_in = None;
    let mut telemetry_out = None;
    let mut log_json = false;

    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --config (expected a .csv, .json or .toml path)",
                )?;
                if config.replace(PathBuf::from(path)).is_some() {
                    return Err("--config provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name =
                    args.next_or_err(i, "missing value for --preset (expected a preset name)")?;
                if preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--ticks" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --ticks (expected a count)")?;
                let n = parse_number::<usize>(raw, "--ticks", "an unsigned integer")?;
                if ticks.replace(n).is_some() {
                    return Err("--ticks provided more than once".to_string());
                }
            }
            "--period-ms" => {
                i += 1;
                let raw =
                    args.next_or_err(i, "missing value for --period-ms (expected milliseconds)")?;
                let ms = parse_number::<u64>(raw, "--period-ms", "an unsigned integer")?;
                if period_ms.replace(ms).is_some() {
                    return Err("--period-ms provided more than once".to_string());
                }
            }
            "--seed" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --seed (expected a u64)")?;
                let value = parse_number::<u64>(raw, "--seed", "a u64")?;
                if seed.replace(value).is_some() {
                    return Err("--seed provided more than once".to_string());
                }
            }
            "--dropout" => {
                i += 1;
                let raw =
                    args.next_or_err(i, "missing value for --dropout (expected a probability)")?;
                let p = parse_number::<f64>(raw, "--dropout", "a number")?;
                if !(0.0..=1.0).contains(&p) {
                    return Err(format!("--dropout value \"{raw}\" must be in [0, 1]"));
                }
                if dropout.replace(p).is_some() {
                    return Err("--dropout provided more than once".to_string());
                }
            }
            "--telemetry-in" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --telemetry-in (expected a CSV recording)",
                )?;
                if telemetry_in.replace(PathBuf::from(path)).is_some() {
                    return Err("--telemetry-in provided more than once".to_string());
                }
            }
            "--telemetry-out" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --telemetry-out (expected a file path)",
                )?;
                if telemetry_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--telemetry-out provided more than once".to_string());
                }
            }
            "--log-json" => log_json = true,
            "--help" | "-h" => return Ok(CliCommand::Help),
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if config.is_some() && preset.is_some() {
        return Err(
            "arguments `--config` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }
    if config.is_none() && preset.is_none() {
        preset = Some("baseline".to_string());
    }
    if telemetry_in.is_some() && dropout.is_some() {
        return Err("`--dropout` only applies to the simulated feed".to_string());
    }

    if ticks == Some(0) && telemetry_out.is_some() {
        return Err(
            "`--telemetry-out` needs a bounded run; `--ticks 0` runs until stopped".to_string(),
        );
    }

    let ticks = match ticks {
        Some(0) => None,
        Some(n) => Some(n),
        None => Some(DEFAULT_TICKS),
    };

    Ok(CliCommand::Run(CliOptions {
        config,
        preset,
        ticks,
        period_ms: period_ms.unwrap_or(DEFAULT_PERIOD_MS),
        seed: seed.unwrap_or(DEFAULT_SEED),
        dropout: dropout.unwrap_or(0.0),
        telemetry_in,
        telemetry_out,
        log_json,
    }))
}

fn parse_number<T: std::str::FromStr>(raw: &str, flag: &str, expected: &str) -> Result<T, String> {
    raw.parse::<T>()
        .map_err(|_| format!("{flag} value \"{raw}\" is not {expected}"))
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("bess-vreg: feeder voltage regulation with a grid-tied battery");
    eprintln!();
    eprintln!("Usage: bess-vreg [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>          Load parameters from a .csv, .json or .toml file");
    eprintln!("  --preset <name>          Use a built-in parameter preset (baseline)");
    eprintln!("  --ticks <n>              Number of control ticks (default 60, 0 = run until stopped)");
    eprintln!("  --period-ms <ms>         Tick period (default 1000, 0 = no wait)");
    eprintln!("  --seed <u64>             Seed for the simulated feed");
    eprintln!("  --dropout <p>            Probability of a simulated telemetry dropout");
    eprintln!("  --telemetry-in <path>    Replay a v_meas,soc,p_meas CSV instead of simulating");
    eprintln!("  --telemetry-out <path>   Export tick records to CSV");
    eprintln!("  --log-json               Emit logs as JSON lines");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If neither --config nor --preset is given, the baseline preset is used.");
}
