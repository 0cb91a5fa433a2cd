use clap::Parser;
use cpw_reconciler::cli::{args::Args, commands};
use std::process;

fn main() {
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        let shutdown_signal = async {
            if tokio::signal::ctrl_c().await.is_err() {
                // No handler available; never resolve so the command runs to completion
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            result = commands::run(args) => result,
            _ = shutdown_signal => {
                eprintln!("\nReceived CTRL+C, shutting down...");
                Err(anyhow::anyhow!("Interrupted by user"))
            }
        }
    });

    if let Err(error) = result {
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("CPW Reconciler - planning export categorization");
    println!("===============================================");
    println!();
    println!("Cleans the Project Financial Plan export, archives it by date and");
    println!("splits the latest archive into one CPW workbook per category.");
    println!();
    println!("USAGE:");
    println!("    cpw <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    clean         Clean the raw planning export and archive it (first run)");
    println!("    categorize    Write one workbook per category from the latest archive");
    println!("    run           Clean, then categorize");
    println!("    init-config   Write the default configuration file");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <PATH>   Configuration file");
    println!("        --root <PATH>     Root folder of the document store");
    println!("    -v, --verbose         Debug logging");
    println!("    -q, --quiet           Warnings and errors only");
    println!();
    println!("EXAMPLES:");
    println!("    cpw run --root /mnt/share/CPW");
    println!("    cpw categorize --run-date 2024-03-15");
    println!();
    println!("For detailed help on any command, use:");
    println!("    cpw <COMMAND> --help");
}
