use std::process::ExitCode;

use clap::Parser;

use colorbook::cli::{self, CliArgs};
use colorbook::logger;
use colorbook::settings::Settings;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Initialize session log (overwrites previous session log)
    logger::init();

    let settings = Settings::load();
    // First launch: write the defaults out so they can be edited
    if Settings::settings_path().is_some_and(|p| !p.exists()) {
        settings.save();
    }

    cli::run(args, &settings)
}
