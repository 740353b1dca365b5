use clap::Parser;
use log::{debug, error};
use crane_api::{Cli, Result, init_logger, run};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger(cli.verbose, cli.quiet)?;
    debug!("Parsed arguments: {:?}", cli);

    run(cli).await.inspect_err(|e| error!("{e}"))
}
