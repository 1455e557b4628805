use crate::commands::{
    run_faq, run_loan_evaluation, run_shortlist, FaqArgs, LoanEvaluateArgs, ShortlistArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use helpdesk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Admissions Helpdesk",
    about = "Run the admissions helpdesk service or its agents from the command line",
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
    /// OCR a result sheet, validate it and run the shortlisting agent
    Shortlist(ShortlistArgs),
    /// Student loan eligibility checks
    Loan {
        #[command(subcommand)]
        command: LoanCommand,
    },
    /// Ask the admissions or loan FAQ
    Faq(FaqArgs),
}

#[derive(Subcommand, Debug)]
enum LoanCommand {
    /// Simulate an eligibility decision without touching the budget
    Evaluate(LoanEvaluateArgs),
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
        Command::Shortlist(args) => run_shortlist(args).await,
        Command::Loan {
            command: LoanCommand::Evaluate(args),
        } => run_loan_evaluation(args),
        Command::Faq(args) => run_faq(args).await,
    }
}
