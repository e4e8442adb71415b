use clap::{Parser, Subcommand};

mod cli;

use cli::build::{cmd_build, BuildArgs};
use cli::inspect::{cmd_inspect, InspectArgs};

#[derive(Parser)]
#[command(
    name = "dkshc",
    version,
    about = "Shader back-end: slot assignment, code finishing and DKSH modules"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a TGSI program into a DKSH module
    Build(BuildArgs),
    /// Print the contents of a DKSH module
    Inspect(InspectArgs),
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Build(args) => cmd_build(args),
        Command::Inspect(args) => cmd_inspect(args),
    }
}
