use crate::prelude::*;
use clap::Parser;

mod error;
mod extract;
mod prelude;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Extract annotations and the text they cover from PDF files, as org-mode notes or JSON"
)]
pub struct App {
    #[clap(flatten)]
    options: extract::Options,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(long, env = "PDFANNOTS_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

fn main() -> Result<()> {
    let app = App::parse();

    let default_filter = if app.global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    color_eyre::install()?;

    crate::extract::run(app.options, app.global)
}
