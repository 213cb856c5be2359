use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use dmxpro_protocol::{Frame, WidgetParameters};
use dmxpro_widget::test_harness::{run_simulator, SimulatorConfig, TestHarness};
use dmxpro_widget::{
    CliSettings, Event, MemorySerial, Processor, ProcessorState, ProcessorStats, SerialPort,
    WidgetConfig, WidgetServer,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("dmxpro-widget")
        .version(dmxpro_widget::VERSION)
        .about("DMX USB Pro widget emulator")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to dmxpro.toml (default: discovered from the working directory)"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log at debug level unless RUST_LOG is set"),
        )
        .arg(
            Arg::new("serial")
                .long("serial")
                .global(true)
                .value_parser(parse_u32)
                .help("Widget serial number (decimal or 0x-prefixed hex)"),
        )
        .arg(
            Arg::new("channels")
                .long("channels")
                .global(true)
                .value_parser(value_parser!(u16).range(1..=512))
                .help("Universe size"),
        )
        .subcommand(
            Command::new("decode")
                .about("Feed hex bytes to a widget and show what it does")
                .arg(Arg::new("hex").required(true).num_args(1..).help("Host bytes as hex"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("encode")
                .about("Print a host request frame as hex")
                .subcommand_required(true)
                .subcommand(
                    Command::new("send-dmx")
                        .about("Output DMX data")
                        .arg(
                            Arg::new("set")
                                .long("set")
                                .required(true)
                                .help("Channel assignments, e.g. 1=255,2=128"),
                        )
                        .arg(
                            Arg::new("start-code")
                                .long("start-code")
                                .default_value("0")
                                .value_parser(value_parser!(u8))
                                .help("DMX start code"),
                        ),
                )
                .subcommand(
                    Command::new("get-parameters")
                        .about("Request widget parameters")
                        .arg(
                            Arg::new("user-size")
                                .long("user-size")
                                .default_value("0")
                                .value_parser(value_parser!(u16))
                                .help("User configuration bytes to request"),
                        ),
                )
                .subcommand(
                    Command::new("store-parameters")
                        .about("Store widget parameters")
                        .arg(
                            Arg::new("break-time")
                                .long("break-time")
                                .default_value("9")
                                .value_parser(value_parser!(u8)),
                        )
                        .arg(
                            Arg::new("mab")
                                .long("mab")
                                .default_value("1")
                                .value_parser(value_parser!(u8)),
                        )
                        .arg(
                            Arg::new("rate")
                                .long("rate")
                                .default_value("40")
                                .value_parser(value_parser!(u8)),
                        ),
                )
                .subcommand(Command::new("get-serial").about("Request the serial number")),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run the host traffic simulator")
                .arg(
                    Arg::new("operations")
                        .long("ops")
                        .default_value("10000")
                        .value_parser(value_parser!(u64))
                        .help("Number of host operations to simulate"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop simulation on first violation"),
                ),
        )
        .subcommand(
            Command::new("certify")
                .about("Run the simulator across many seeds")
                .arg(
                    Arg::new("seeds")
                        .long("seeds")
                        .default_value("10")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("operations")
                        .long("ops")
                        .default_value("10000")
                        .value_parser(value_parser!(u64)),
                ),
        )
        .subcommand(
            Command::new("serve")
                .about("Expose the widget on a TCP socket")
                .arg(Arg::new("host").long("host").help("Bind address"))
                .arg(
                    Arg::new("port")
                        .long("port")
                        .value_parser(value_parser!(u16))
                        .help("Bind port"),
                ),
        )
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();

    let filter = if matches.get_flag("verbose") && std::env::var_os("RUST_LOG").is_none() {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match run(&matches).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(2);
        }
    }
}

async fn run(matches: &ArgMatches) -> Result<i32> {
    let (name, args) = matches.subcommand().context("missing subcommand")?;
    let config = load_config(matches, args)?;

    match name {
        "decode" => decode(&config, args),
        "encode" => {
            println!("{}", hex::encode(build_frame(args)?.encode()?));
            Ok(0)
        }
        "simulate" => {
            let sim = SimulatorConfig {
                seed: get::<u64>(args, "seed")?,
                total_operations: get::<u64>(args, "operations")?,
                stop_on_first_violation: args.get_flag("stop-on-violation"),
                ..simulator_config(&config)
            };
            let report = run_simulator(sim);
            println!("{}", report.generate_text());
            Ok(i32::from(!report.passed()))
        }
        "certify" => {
            let report = TestHarness::run_certification(
                &simulator_config(&config),
                get::<u64>(args, "seeds")?,
                get::<u64>(args, "operations")?,
            );
            println!("Certification Report:");
            println!("  Universe Size: {}", report.max_channels);
            println!("  Seeds: {}", report.seeds_tested);
            println!("  Operations: {}", report.total_operations);
            println!("  Violations: {}", report.total_violations);
            println!("  Passed: {}", report.passed);
            Ok(i32::from(!report.passed))
        }
        "serve" => {
            let server = WidgetServer::bind(&config).await?;
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "failed to listen for ctrl-c");
                    std::future::pending::<()>().await;
                }
            };
            let server = server.run_until(shutdown).await?;
            let stats = server.processor().stats();
            println!("Frames accepted: {}", stats.frames_accepted);
            println!("Frames rejected: {}", stats.frames_rejected());
            Ok(0)
        }
        other => bail!("unknown subcommand {other}"),
    }
}

fn load_config(global: &ArgMatches, args: &ArgMatches) -> Result<WidgetConfig> {
    let settings = CliSettings {
        serial_number: global.get_one::<u32>("serial").copied(),
        max_channels: global.get_one::<u16>("channels").copied(),
        host: args
            .try_get_one::<String>("host")
            .ok()
            .flatten()
            .cloned(),
        port: args.try_get_one::<u16>("port").ok().flatten().copied(),
    };
    let path = global.get_one::<PathBuf>("config");
    Ok(WidgetConfig::load_with(path.map(PathBuf::as_path), &settings)?)
}

/// Widget shape for simulator runs
fn simulator_config(config: &WidgetConfig) -> SimulatorConfig {
    SimulatorConfig {
        max_channels: config.max_channels,
        serial_number: config.serial_number,
        ..Default::default()
    }
}

/// What a widget did with a burst of host bytes
#[derive(Debug)]
struct DecodeSummary {
    events: Vec<Event>,
    replies: Vec<Frame>,
    channels: Vec<(u16, u8)>,
    parameters: WidgetParameters,
    state: ProcessorState,
    stats: ProcessorStats,
    unconsumed: usize,
}

impl DecodeSummary {
    fn to_json(&self) -> serde_json::Value {
        let replies: Vec<_> = self
            .replies
            .iter()
            .map(|frame| {
                serde_json::json!({
                    "label": frame.label(),
                    "payload": hex::encode(frame.payload()),
                })
            })
            .collect();
        serde_json::json!({
            "events": self.events,
            "replies": replies,
            "channels": self.channels,
            "parameters": self.parameters,
            "state": self.state,
            "stats": self.stats,
        })
    }

    fn print(&self) {
        println!("Events:");
        if self.events.is_empty() {
            println!("  (none)");
        }
        for event in &self.events {
            println!("  {event}");
        }
        println!("Replies:");
        if self.replies.is_empty() {
            println!("  (none)");
        }
        for frame in &self.replies {
            println!("  {} [{}]", frame.label(), hex::encode(frame.payload()));
        }
        println!("Active channels: {}", self.channels.len());
        for (channel, value) in &self.channels {
            println!("  {channel:>3} = {value}");
        }
        println!("State: {}", self.state);
        if self.unconsumed > 0 {
            println!("Unconsumed bytes: {}", self.unconsumed);
        }
    }
}

fn decode(config: &WidgetConfig, args: &ArgMatches) -> Result<i32> {
    let parts: Vec<&str> = args
        .get_many::<String>("hex")
        .context("missing hex input")?
        .map(String::as_str)
        .collect();
    let summary = decode_bytes(config, &parse_hex(&parts)?)?;

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&summary.to_json())?);
    } else {
        summary.print();
    }
    Ok(0)
}

/// Join hex words, ignoring whitespace and `:` separators
fn parse_hex(parts: &[&str]) -> Result<Vec<u8>> {
    let text: String = parts
        .iter()
        .flat_map(|part| part.chars())
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    hex::decode(&text).context("input is not valid hex")
}

fn decode_bytes(config: &WidgetConfig, bytes: &[u8]) -> Result<DecodeSummary> {
    let mut processor = Processor::with_config(MemorySerial::with_input(bytes), config);
    let events = processor.process_available();
    let output = processor.port_mut().take_output();
    let replies = Frame::parse_all(&output).context("widget produced a malformed reply")?;

    Ok(DecodeSummary {
        events,
        replies,
        channels: processor.universe().active_channels().collect(),
        parameters: *processor.parameters(),
        state: processor.state(),
        stats: processor.stats(),
        unconsumed: processor.port().available(),
    })
}

/// Host frame for an `encode` subcommand
fn build_frame(args: &ArgMatches) -> Result<Frame> {
    let frame = match args.subcommand() {
        Some(("send-dmx", sub)) => {
            let assignments = parse_assignments(&get::<String>(sub, "set")?)?;
            Frame::send_dmx(get::<u8>(sub, "start-code")?, &channel_vector(&assignments))
        }
        Some(("get-parameters", sub)) => Frame::get_widget_parameters(get::<u16>(sub, "user-size")?),
        Some(("store-parameters", sub)) => {
            let params = WidgetParameters::new(
                get::<u8>(sub, "break-time")?,
                get::<u8>(sub, "mab")?,
                get::<u8>(sub, "rate")?,
            );
            Frame::store_widget_parameters(&params, &[])
        }
        Some(("get-serial", _)) => Frame::get_widget_serial(),
        _ => bail!("unknown frame kind"),
    };
    Ok(frame)
}

/// Channel 1 first, zero-filled up to the highest assigned channel
fn channel_vector(assignments: &[(u16, u8)]) -> Vec<u8> {
    let width = assignments.iter().map(|(ch, _)| usize::from(*ch)).max().unwrap_or(0);
    let mut channels = vec![0u8; width];
    for &(channel, value) in assignments {
        if let Some(slot) = usize::from(channel).checked_sub(1).and_then(|i| channels.get_mut(i)) {
            *slot = value;
        }
    }
    channels
}

fn get<T: Clone + Send + Sync + 'static>(args: &ArgMatches, name: &str) -> Result<T> {
    args.get_one::<T>(name)
        .cloned()
        .with_context(|| format!("missing --{name}"))
}

fn parse_u32(value: &str) -> Result<u32, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid number {value:?}: {e}"))
}

/// Parse `1=255,2=128` into `(channel, value)` pairs
fn parse_assignments(text: &str) -> Result<Vec<(u16, u8)>> {
    text.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| -> Result<(u16, u8)> {
            let (channel, value) = part
                .split_once('=')
                .with_context(|| format!("expected CHANNEL=VALUE, got {part:?}"))?;
            let channel: u16 = channel.trim().parse().with_context(|| format!("bad channel in {part:?}"))?;
            let value: u8 = value.trim().parse().with_context(|| format!("bad value in {part:?}"))?;
            if channel == 0 || usize::from(channel) > dmxpro_protocol::MAX_PAYLOAD - 1 {
                bail!("channel {channel} out of range");
            }
            Ok((channel, value))
        })
        .collect()
}
