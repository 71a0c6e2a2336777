use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use loan_portal::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Loan Intake Portal",
    about = "Run the mortgage application intake service or walk through its workflow",
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
    /// Walk an in-memory portfolio through submission, review and bulk updates
    Demo(DemoArgs),
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
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_demo_options() {
        let cli = Cli::try_parse_from([
            "loan-portal-api",
            "demo",
            "--bulk-size",
            "4",
            "--audit-csv",
            "audit.csv",
        ])
        .expect("arguments parse");

        match cli.command {
            Some(Command::Demo(args)) => {
                assert_eq!(args.bulk_size, 4);
                assert_eq!(
                    args.audit_csv.as_deref(),
                    Some(std::path::Path::new("audit.csv"))
                );
            }
            other => panic!("expected demo command, got {other:?}"),
        }
    }

    #[test]
    fn defaults_to_serving() {
        let cli = Cli::try_parse_from(["loan-portal-api"]).expect("arguments parse");
        assert!(cli.command.is_none());
    }
}
