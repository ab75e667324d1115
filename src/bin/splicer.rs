use clap::Parser;
use splicer::cli::{Args, Cli};
use splicer::infrastructure::init_file_logging;
use splicer::{init_logging, LogConfig};
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let guard = match &args.log_dir {
        Some(dir) => init_file_logging(dir),
        None => init_logging(LogConfig::from_verbosity(args.verbose).with_format(args.log_format)),
    };

    info!("splicer starting");

    let code = match Cli::new(args).run() {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "splicer failed");
            eprintln!("Error: {}", e);
            1
        }
    };

    if code != 0 {
        drop(guard);
        std::process::exit(code);
    }
    Ok(())
}
