mod cli;

use clap::Parser;
use simplelog::{ColorChoice, Config as LogConfig, TermLogger, TerminalMode};

use cli::Cli;
use harnessgen::analyze_and_emit;

fn main() {
  let cli = Cli::parse();

  TermLogger::init(cli.log_filter(), LogConfig::default(), TerminalMode::Mixed, ColorChoice::Auto)
    .expect("logger already initialized");

  let analysis = cli.analysis_options();
  let harness = cli.harness_options();

  let outcomes = match analyze_and_emit(&cli.source, cli.function.as_deref(), &analysis, &harness) {
    Ok(outcomes) => outcomes,
    Err(err) => {
      log::error!("{err}");
      std::process::exit(1);
    }
  };

  let mut had_failure = false;
  for outcome in outcomes {
    match outcome.result {
      Ok(path) => log::info!("wrote harness for `{}` to {}", outcome.function, path.display()),
      Err(err) => {
        had_failure = true;
        log::warn!("skipping `{}`: {err}", outcome.function);
      }
    }
  }

  if had_failure {
    std::process::exit(1);
  }
}
