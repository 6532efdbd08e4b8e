use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use carebridge::dispatch::Dispatcher;
use carebridge::error::BridgeError;
use carebridge::inference::clinical::ClinicalModel;
use carebridge::payload;

#[derive(Parser)]
#[command(
    name = "carebridge",
    version,
    about = "JSON bridge into the clinical inference and workflow engines"
)]
struct Cli {
    /// Capability package to address (pybrain or pyheart)
    #[arg(short, long)]
    package: String,

    /// Action within the package's allow-list
    #[arg(short, long)]
    action: String,

    /// Inline JSON payload; read from stdin when omitted
    #[arg(long)]
    payload: Option<String>,

    /// Seconds to wait for a workflow instance to finish
    #[arg(short, long, default_value_t = 5.0)]
    timeout: f64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr and stay off unless RUST_LOG asks for them, so the
    // one-line JSON contract on both streams holds.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli).await {
        Ok(response) => {
            println!("{response}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.to_json());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<String, BridgeError> {
    let payload = payload::load(cli.payload.as_deref())?;

    // One inference engine for the life of the process, shared by every
    // pybrain action.
    let dispatcher = Dispatcher::new(Arc::new(ClinicalModel::new()));

    let response = dispatcher
        .dispatch(
            &cli.package,
            &cli.action,
            &payload,
            Duration::from_secs_f64(cli.timeout),
        )
        .await?;
    Ok(response.to_string())
}
