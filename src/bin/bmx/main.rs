mod configure;
mod login;
mod print;
mod utils;
mod write;

use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;

#[derive(Parser)]
#[clap(version, about = "Okta to AWS credential broker")]
struct Opts {
    #[clap(subcommand)]
    sub_command: SubCommand,

    /// Enable debug logging
    #[clap(short, long, global = true)]
    verbose: bool,
}

#[derive(Parser)]
enum SubCommand {
    /// Print temporary AWS credentials to stdout
    Print(print::Print),
    /// Write temporary AWS credentials to ~/.aws/credentials
    Write(write::Write),
    /// Authenticate against Okta and refresh the cached session
    Login(login::Login),
    /// Save default settings to ~/.bmx/config
    Configure(configure::Configure),
}

#[tokio::main]
async fn main() {
    let opt: Opts = Opts::parse();

    let level = match opt.verbose {
        true => LevelFilter::Debug,
        false => LevelFilter::Warn,
    };
    let _ = SimpleLogger::new().with_level(level).init();

    let result = match opt.sub_command {
        SubCommand::Print(cmd) => cmd.run().await,
        SubCommand::Write(cmd) => cmd.run().await,
        SubCommand::Login(cmd) => cmd.run().await,
        SubCommand::Configure(cmd) => cmd.run(),
    };

    // one short user-facing message per failure, never a backtrace
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
