//! BMP client CLI binary.
//!
//! Drives the BMP service from the shell. Results are printed as JSON on
//! stdout so they can be piped between steps.
//!
//! # Commands
//!
//! - `init` - Fetch a device and its initial session
//! - `sensor` - Submit sensor data continuing a session
//! - `sessionless` - Submit sensor data without a prior init
//! - `feedback` - Report whether a report was valid
//!
//! ```text
//! bmp init -p android > init.json
//! bmp sensor -p android --session init.json --language en > sensor.json
//! bmp feedback --report-data "$(jq -r .reportData sensor.json)"
//! ```

use std::io::{self, Read};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use bmp::{
    client::LOCAL_HOST, with_app_version, with_app_version_code, with_dci_script, with_language,
    with_mocked_dci_script, with_option, with_params, Android, BmpOption, Client, Config, Ios,
    IosInitQuery, Platform, PlatformKind, ReportData, SessionState, VERSION,
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "bmp")]
#[command(version = VERSION)]
#[command(about = "BMP client - device fingerprinting and behavior mitigation service", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/bmp/config.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Service base URL
    #[arg(long, global = true)]
    host: Option<String>,

    /// API key
    #[arg(short = 'k', long, env = "BMP_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Use the local/staging host
    #[arg(long, global = true)]
    local: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a device and its initial session
    Init {
        /// Platform: android, ios
        #[arg(short, long, default_value = "android")]
        platform: String,

        /// Exact iOS version (ios only)
        #[arg(long)]
        ios_version: Option<String>,

        /// Minimum iOS version (ios only)
        #[arg(long)]
        min_ios_version: Option<String>,

        /// Maximum iOS version (ios only)
        #[arg(long)]
        max_ios_version: Option<String>,

        /// Device model (ios only)
        #[arg(long)]
        model: Option<String>,
    },

    /// Submit sensor data continuing a session
    Sensor {
        /// Platform: android, ios
        #[arg(short, long, default_value = "android")]
        platform: String,

        /// Session JSON file (or - for stdin); saved `init`/`sensor` output is unwrapped
        #[arg(short, long)]
        session: String,

        #[command(flatten)]
        sensor: SensorArgs,
    },

    /// Submit sensor data without a prior init
    Sessionless {
        /// Platform: android, ios
        #[arg(short, long, default_value = "android")]
        platform: String,

        /// Extra request fields as a JSON object
        #[arg(long)]
        fields: Option<String>,

        #[command(flatten)]
        sensor: SensorArgs,
    },

    /// Report whether a report was valid
    Feedback {
        /// Report data returned by a sensor call
        #[arg(short, long)]
        report_data: String,

        /// Mark the report as invalid
        #[arg(long)]
        invalid: bool,
    },
}

#[derive(Args)]
struct SensorArgs {
    /// BMP version (default: from config)
    #[arg(long)]
    bmp_version: Option<String>,

    /// Application package (default: from config)
    #[arg(long)]
    app_package: Option<String>,

    /// Language
    #[arg(long)]
    language: Option<String>,

    /// App version
    #[arg(long)]
    app_version: Option<String>,

    /// App version code
    #[arg(long)]
    app_version_code: Option<String>,

    /// DCI script file
    #[arg(long, conflicts_with = "mock_dci")]
    dci_script: Option<PathBuf>,

    /// Use the service's mocked DCI script
    #[arg(long)]
    mock_dci: bool,

    /// Params file
    #[arg(long)]
    params: Option<PathBuf>,

    /// Extra field (KEY=VALUE, VALUE parsed as JSON when possible); applied last, in order
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE")]
    options: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let config = load_config(&cli)?;
    let client = Client::from_config(&config)?;
    tracing::debug!(host = client.host(), "BMP client ready");

    let runtime = tokio::runtime::Runtime::new()?;
    let output = runtime.block_on(run(&client, &config, cli.command))?;

    println!("{output}");
    Ok(())
}

async fn run(client: &Client, config: &Config, command: Commands) -> anyhow::Result<String> {
    match command {
        Commands::Init {
            platform,
            ios_version,
            min_ios_version,
            max_ios_version,
            model,
        } => match parse_platform(&platform)? {
            PlatformKind::Android => init::<Android>(client, &()).await,
            PlatformKind::Ios => {
                let query = IosInitQuery {
                    ios_version: ios_version.unwrap_or_default(),
                    min_ios_version: min_ios_version.unwrap_or_default(),
                    max_ios_version: max_ios_version.unwrap_or_default(),
                    model: model.unwrap_or_default(),
                };
                init::<Ios>(client, &query).await
            },
        },

        Commands::Sensor {
            platform,
            session,
            sensor,
        } => {
            let session = read_session(&session)?;
            let (version, package) = version_and_package(config, &sensor);
            let options = sensor_options(&sensor)?;
            match parse_platform(&platform)? {
                PlatformKind::Android => {
                    sensor_call::<Android>(client, &version, &package, &session, options).await
                },
                PlatformKind::Ios => {
                    sensor_call::<Ios>(client, &version, &package, &session, options).await
                },
            }
        },

        Commands::Sessionless {
            platform,
            fields,
            sensor,
        } => {
            let fields = fields.as_deref().map(parse_fields).transpose()?;
            let (version, package) = version_and_package(config, &sensor);
            let options = sensor_options(&sensor)?;
            match parse_platform(&platform)? {
                PlatformKind::Android => {
                    sessionless::<Android>(client, &version, &package, fields, options).await
                },
                PlatformKind::Ios => {
                    sessionless::<Ios>(client, &version, &package, fields, options).await
                },
            }
        },

        Commands::Feedback {
            report_data,
            invalid,
        } => {
            client
                .bmp_feedback(!invalid, &ReportData::from(report_data))
                .await?;
            render(&json!({"ok": true}))
        },
    }
}

async fn init<P: Platform>(client: &Client, query: &P::InitQuery) -> anyhow::Result<String> {
    let (device, session) = client.bmp_init::<P>(query).await?;
    render(&InitOutput {
        platform: P::NAME,
        identifier: session.string_field(P::IDENTIFIER_KEY),
        start_millis: session.start_millis(),
        device,
        session,
    })
}

async fn sensor_call<P: Platform>(
    client: &Client,
    version: &str,
    package: &str,
    session: &SessionState,
    options: Vec<BmpOption>,
) -> anyhow::Result<String> {
    let outcome = client
        .bmp_sensor::<P>(version, package, session, options)
        .await?;
    render(&SensorOutput {
        sensor: outcome.sensor,
        device: None::<()>,
        session: outcome.session,
        report_data: outcome.report_data,
    })
}

async fn sessionless<P: Platform>(
    client: &Client,
    version: &str,
    package: &str,
    fields: Option<Map<String, Value>>,
    options: Vec<BmpOption>,
) -> anyhow::Result<String> {
    let outcome = client
        .bmp_sensor_sessionless::<P>(version, package, fields, options)
        .await?;
    render(&SensorOutput {
        sensor: outcome.sensor,
        device: Some(outcome.device),
        session: outcome.session,
        report_data: outcome.report_data,
    })
}

// Output types keep the session as raw text so saved output can be fed back

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InitOutput<D> {
    platform: &'static str,
    identifier: String,
    start_millis: i64,
    device: D,
    session: SessionState,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SensorOutput<D> {
    sensor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<D>,
    session: SessionState,
    report_data: ReportData,
}

fn render(output: &impl Serialize) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(output)?)
}

// Helper functions

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let file_config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => match Config::default_path().filter(|p| p.exists()) {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        },
    };

    let mut config = file_config.merge(Config::from_env());

    if cli.local {
        config.host = LOCAL_HOST.to_string();
    }
    if let Some(host) = &cli.host {
        config.host.clone_from(host);
    }
    if let Some(api_key) = &cli.api_key {
        config.api_key = Some(api_key.clone());
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }

    Ok(config)
}

fn parse_platform(platform: &str) -> anyhow::Result<PlatformKind> {
    PlatformKind::from_str(platform)
        .map_err(|_| anyhow::anyhow!("Invalid platform: {platform}. Use: android, ios"))
}

fn version_and_package(config: &Config, args: &SensorArgs) -> (String, String) {
    (
        args.bmp_version
            .clone()
            .unwrap_or_else(|| config.bmp_version.clone()),
        args.app_package
            .clone()
            .unwrap_or_else(|| config.app_package.clone()),
    )
}

fn sensor_options(args: &SensorArgs) -> anyhow::Result<Vec<BmpOption>> {
    let mut options = Vec::new();

    if let Some(language) = &args.language {
        options.push(with_language(language.clone()));
    }
    if let Some(version) = &args.app_version {
        options.push(with_app_version(version.clone()));
    }
    if let Some(code) = &args.app_version_code {
        options.push(with_app_version_code(code.clone()));
    }
    if let Some(path) = &args.dci_script {
        let script = std::fs::read(path)
            .with_context(|| format!("Failed to read DCI script {}", path.display()))?;
        options.push(with_dci_script(&script));
    }
    if args.mock_dci {
        options.push(with_mocked_dci_script());
    }
    if let Some(path) = &args.params {
        let params = std::fs::read(path)
            .with_context(|| format!("Failed to read params {}", path.display()))?;
        options.push(with_params(&params));
    }
    for raw in &args.options {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Invalid option {raw}. Use: KEY=VALUE"))?;
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::from(value));
        options.push(with_option(key, value));
    }

    Ok(options)
}

fn parse_fields(raw: &str) -> anyhow::Result<Map<String, Value>> {
    match serde_json::from_str(raw).context("Invalid --fields JSON")? {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("--fields must be a JSON object"),
    }
}

fn read_session(source: &str) -> anyhow::Result<SessionState> {
    let content = if source == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read session file {source}"))?
    };

    parse_session(&content)
}

/// Output keys that mark a file as `init`/`sensor`/`sessionless` output.
const OUTPUT_KEYS: [&str; 3] = ["sensor", "device", "reportData"];

#[derive(Deserialize)]
struct SavedOutput {
    session: SessionState,
}

/// Accept either a raw session or a saved command output wrapping one.
///
/// A top-level `session` object is only unwrapped when the file also carries
/// one of the output keys; otherwise the whole file is the session.
fn parse_session(content: &str) -> anyhow::Result<SessionState> {
    let value: Value = serde_json::from_str(content).context("Session is not valid JSON")?;
    let Value::Object(map) = &value else {
        anyhow::bail!("Session must be a JSON object");
    };

    let is_output = map.get("session").is_some_and(Value::is_object)
        && OUTPUT_KEYS.iter().any(|key| map.contains_key(*key));
    if is_output {
        let saved: SavedOutput = serde_json::from_str(content)?;
        return Ok(saved.session);
    }

    Ok(serde_json::from_str(content)?)
}
