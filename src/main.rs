use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use mercury_rs::{
    init_logger, poll, render, AccessLevel, ArrayNumber, OutputFormat, PollConfig,
    ProtocolFamily,
};

#[derive(Clone, Copy, ValueEnum)]
enum Proto {
    M206,
    M236,
}

#[derive(Clone, Copy, ValueEnum)]
enum User {
    User,
    Admin,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "mercury-cli")]
#[command(about = "Mercury energy meter data receiver")]
struct Cli {
    /// Mercury protocol family
    #[arg(long, value_enum, default_value = "m206")]
    proto: Proto,

    /// Device serial number (repeat for a batch)
    #[arg(long, required = true)]
    serial: Vec<u32>,

    /// RS485-TCP/IP bridge host
    #[arg(long)]
    host: String,

    /// RS485-TCP/IP bridge port
    #[arg(long, default_value_t = 50)]
    port: u16,

    /// Device access level (m236 proto)
    #[arg(long, value_enum, default_value = "user")]
    user: User,

    /// Device password (m236 proto; defaults to the access level's
    /// vendor default)
    #[arg(long = "pass")]
    pass: Option<String>,

    /// Energy array number: 0 since reset, 1 current year, 2 previous year,
    /// 3 month, 4 current day, 5 previous day, 6 per-phase, 9-13 snapshots
    /// at the start of each of those periods
    #[arg(long = "array-number", default_value_t = 0)]
    array_number: u8,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    format: Format,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    let cli = Cli::parse();

    let Some(array) = ArrayNumber::from_code(cli.array_number) else {
        bail!("invalid array number {} (valid: 0-6, 9-13)", cli.array_number);
    };

    let mut config = PollConfig::new(
        match cli.proto {
            Proto::M206 => ProtocolFamily::Simple,
            Proto::M236 => ProtocolFamily::Authenticated,
        },
        &cli.host,
    );
    config.port = cli.port;
    config.access_level = match cli.user {
        User::User => AccessLevel::User,
        User::Admin => AccessLevel::Admin,
    };
    config.password = cli.pass;
    config.array = array;

    let batch = poll(&cli.serial, &config).await;

    // Per-device failures are part of the rendered batch, not a process
    // failure.
    print!("{}", render(
        &batch,
        match cli.format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
        },
    ));
    Ok(())
}
