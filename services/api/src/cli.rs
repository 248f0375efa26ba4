use crate::screen::{run_check_thresholds, run_screen, CheckThresholdsArgs, ScreenArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use loan_filtering::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Loan Filtering",
    about = "Screen loan applications through eKYC, bureau, cluster and LTV checks",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Screen a single application from a JSON file and print the decision
    Screen(ScreenArgs),
    /// Load the published thresholds for a line of business and summarise them
    CheckThresholds(CheckThresholdsArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Screen(args) => run_screen(args).await,
        Command::CheckThresholds(args) => run_check_thresholds(args).await,
    }
}
