use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use planilha_processor::config::Config;
use planilha_processor::logging;
use planilha_processor::pipeline::{self, Mode};
use planilha_processor::server;

#[derive(Parser)]
#[command(name = "planilha_processor")]
#[command(about = "Audit-status processor for contract spreadsheets")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP upload/processing server
    Serve {
        /// Port to listen on (overrides config.toml)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Process a single spreadsheet file and write the result to disk
    Process {
        /// Input spreadsheet (.xlsx)
        #[arg(long)]
        input: PathBuf,
        /// Partition to keep: audited or not-audited
        #[arg(long)]
        mode: String,
        /// Output path (defaults to planilha_processada_<mode>.xlsx)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let config = Config::load()?;
            let port = port.unwrap_or(config.server.port);

            println!("🔄 Starting planilha processor on port {port}...");
            server::start_server(port).await?;
        }
        Commands::Process { input, mode, output } => {
            let mode = Mode::from_token(&mode)?;

            info!(input = %input.display(), mode = mode.token(), "processing file");
            let bytes = std::fs::read(&input)?;
            let (workbook_bytes, summary) = pipeline::process_workbook(&bytes, mode)?;

            let output_path = output.unwrap_or_else(|| PathBuf::from(mode.output_filename()));
            std::fs::write(&output_path, workbook_bytes)?;

            println!("\n📊 Resultado ({}):", mode.token());
            println!("   Total de linhas: {}", summary.total);
            println!("   Contratos únicos: {}", summary.unique);
            println!("   Contratos duplicados: {}", summary.duplicated);
            println!("   Arquivo gerado: {}", output_path.display());
        }
    }

    Ok(())
}
