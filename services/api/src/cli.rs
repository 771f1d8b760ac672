use crate::demo::{run_demo, run_evaluation_report, DemoArgs, EvaluationReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use staff_review::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Staff Review",
    about = "Run the staff performance evaluation service and its tooling from the command line",
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
    /// Inspect evaluation sheets offline
    Evaluation {
        #[command(subcommand)]
        command: EvaluationCommand,
    },
    /// Run an in-memory evaluation cycle from opening to history
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum EvaluationCommand {
    /// Score a CSV evaluation sheet and print aggregates and status
    Report(EvaluationReportArgs),
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
        Command::Evaluation {
            command: EvaluationCommand::Report(args),
        } => run_evaluation_report(args),
        Command::Demo(args) => run_demo(args),
    }
}
