pub mod init;
pub mod status;
pub mod watch;

use clap::{Parser, Subcommand};

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Configuration initialization")]
    Init(init::InitArgs),
    #[command(about = "Watch keyboard and mouse activity and remind about breaks")]
    Watch,
    #[command(about = "Show the break timers as last saved")]
    Status,
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help(true))]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub async fn menu() -> anyhow::Result<()> {
        let cli = Self::parse();
        match cli.command {
            Commands::Init(args) => init::cmd(args),
            Commands::Watch => watch::cmd().await,
            Commands::Status => status::cmd(),
        }
    }
}
