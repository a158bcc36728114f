use directories::ProjectDirs;
use flexi_logger::Logger;
use log::{debug, error};

use artquery::cli::Cli;
use artquery::config::Config;

fn main() {
    let config = match ProjectDirs::from("", "", "artquery") {
        Some(project_dirs) => Config::load_config(&project_dirs),
        None => {
            eprintln!("Could not determine the data directory. Using default configuration.");
            Config::default()
        }
    };
    let config = Config::init(config);

    // Keep the handle alive for the life of the process
    let _logger = match Logger::try_with_str(config.logging.log_spec()).and_then(|l| l.start()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };
    debug!("Command-line args: {:?}", std::env::args_os().collect::<Vec<_>>());

    if let Err(err) = Cli::handle_command_line() {
        error!("{:?}", err);
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
