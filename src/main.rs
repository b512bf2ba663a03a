use anyhow::{self, Context};
use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::append::Append;
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;

use symbasis::interfaces::cli::{log_heading, Cli};
use symbasis::interfaces::input::Input;
use symbasis::interfaces::InputHandle;
use symbasis::io::read_symbasis_yaml;

/// Sets up a console logger for diagnostics and a plain logger for the `symbasis-output` target,
/// which writes to `cli.output` if given.
fn configure_logging(cli: &Cli) -> Result<(), anyhow::Error> {
    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {h({l:<5})} {t} - {m}{n}")))
        .build();
    let output: Box<dyn Append> = match cli.output.as_ref() {
        Some(path) => Box::new(
            FileAppender::builder()
                .encoder(Box::new(PatternEncoder::new("{m}{n}")))
                .append(false)
                .build(path)
                .with_context(|| format!("Unable to create output file `{}`", path.display()))?,
        ),
        None => Box::new(
            ConsoleAppender::builder()
                .encoder(Box::new(PatternEncoder::new("{m}{n}")))
                .build(),
        ),
    };
    let config = Config::builder()
        .appender(Appender::builder().build("console", Box::new(console)))
        .appender(Appender::builder().build("output", output))
        .logger(
            Logger::builder()
                .appender("output")
                .additive(false)
                .build("symbasis-output", LevelFilter::Info),
        )
        .build(Root::builder().appender("console").build(level))?;
    log4rs::init_config(config)?;
    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    configure_logging(&cli)?;
    log_heading();

    let input = read_symbasis_yaml::<Input, _>(&cli.config)
        .with_context(|| format!("Unable to read input file `{}`", cli.config.display()))?;
    input.handle()
}
