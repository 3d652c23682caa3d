use clap::Parser;
use miette::{IntoDiagnostic, Result};
use ogone_flow::application::engine::PaymentEngine;
use ogone_flow::config::Configuration;
use ogone_flow::domain::payment::PaymentResult;
use ogone_flow::domain::ports::Collaborators;
use ogone_flow::domain::signature::SIGNATURE_FIELD;
use ogone_flow::infrastructure::in_memory::InMemoryPlatform;
use ogone_flow::infrastructure::scripted_gateway::ScriptedGateway;
use ogone_flow::interfaces::csv::feedback_reader::FeedbackReader;
use ogone_flow::interfaces::csv::order_reader::OrderReader;
use ogone_flow::interfaces::csv::order_writer::OrderWriter;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Replays recorded gateway feedback through the webhook listener.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Feedback CSV file, one webhook payload per row
    input: PathBuf,

    /// Orders CSV file the replay starts from
    #[arg(long)]
    orders: PathBuf,

    /// Merchant settings (JSON). Defaults to test mode.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sign rows that carry no SHASIGN with the configured SHA-OUT passphrase
    #[arg(long)]
    sign_unsigned: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Configuration::from_json_file(path).into_diagnostic()?,
        None => Configuration::default(),
    };
    let signer = config.sha_out_composer();

    let platform = Arc::new(InMemoryPlatform::new());
    let file = File::open(&cli.orders).into_diagnostic()?;
    for order in OrderReader::new(file).orders() {
        match order {
            Ok(order) => platform.insert_order(order).await,
            Err(e) => error!(error = %e, "Error reading order"),
        }
    }

    let gateway = Arc::new(ScriptedGateway::new());
    let engine = PaymentEngine::new(
        config,
        Collaborators::from_platform(platform.clone()),
        gateway.clone(),
    );

    // Process feedback
    let file = File::open(&cli.input).into_diagnostic()?;
    for (row, payload) in FeedbackReader::new(file).payloads().enumerate() {
        let mut payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                error!(row, error = %e, "Error reading feedback");
                continue;
            }
        };

        if cli.sign_unsigned && !payload.has(SIGNATURE_FIELD) {
            let signature = signer.sign(&payload);
            payload.insert(SIGNATURE_FIELD, signature);
        }

        // status queries during the replay answer with the row being replayed
        if let Some(order_id) = payload.get("orderID") {
            gateway
                .set_status(order_id, PaymentResult::from_params(&payload))
                .await;
        }

        let status = engine.webhook_listener(&payload).await;
        if status.is_success() {
            info!(row, %status, "Feedback accepted");
        } else {
            warn!(row, %status, "Feedback rejected");
        }
    }

    // Output final ledger
    let stdout = io::stdout();
    let mut writer = OrderWriter::new(stdout.lock());
    writer
        .write_orders(platform.orders().await)
        .into_diagnostic()?;

    Ok(())
}
