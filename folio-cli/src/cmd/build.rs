use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use folio_core::{BuildReport, PageOutcome, SiteBuilder};

use crate::config::FolioConfig;

pub fn add_build_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("source")
                .short('s')
                .long("source")
                .value_name("DIR")
                .help("Source directory containing index.html, assets/ and data/"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory for the rendered site"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file")
                .default_value("./folio.toml"),
        )
        .arg(
            Arg::new("data_url")
                .long("data-url")
                .value_name("URL")
                .help("Fetch data/site.json from this base URL instead of the source directory"),
        )
        .arg(
            Arg::new("release")
                .long("release")
                .help("Compress the stylesheet and minify HTML output")
                .action(ArgAction::SetTrue),
        )
}

pub fn make_subcommand() -> Command {
    add_build_args(Command::new("build"))
        .about("Render the page and copy its assets into the output directory")
        .arg(
            Arg::new("strict")
                .long("strict")
                .help("Exit with an error if the site data could not be loaded")
                .action(ArgAction::SetTrue),
        )
}

/// Builds once with the given configuration.
pub async fn run_build(config: &FolioConfig, live_reload: bool) -> Result<BuildReport> {
    let build = config.build_config();

    let mut builder = SiteBuilder::new()
        .source_dir(&build.source)
        .output_dir(&build.output)
        .config(config.site.clone())
        .data_url(build.data_url.clone())
        .release(build.release);
    if live_reload {
        builder = builder.live_reload(build.host.clone(), build.port);
    }

    let report = builder.build()?.render_all().await?;
    if let PageOutcome::Error(e) = &report.outcome {
        log::warn!("Page rendered with the error banner: {e}");
    }

    Ok(report)
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    let config = FolioConfig::load(args)?;
    let report = run_build(&config, false).await?;

    if config.build.strict && !report.outcome.is_done() {
        anyhow::bail!("Site data could not be loaded");
    }

    log::info!("Site built in {}", report.output_dir.display());

    Ok(())
}
