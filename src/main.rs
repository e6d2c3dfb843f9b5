// ontapce - ONTAP volume, snapshot, clone and mirror operations
use clap::Parser;
use ontapce::cli::args::{Args, USAGE_HINT};
use ontapce::cli::commands::execute_command;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    if let Err(e) = execute_command(args).await {
        // the reader went away, nothing left to tell it
        if e.is_broken_pipe() {
            std::process::exit(0);
        }

        if e.is_usage_error() {
            eprintln!("{}", e);
            eprintln!("{}", USAGE_HINT);
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(e.exit_code());
    }
}
