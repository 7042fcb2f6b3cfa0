use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use folio_dev_server::{DevServer, DevServerConfig};
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::cmd::build::{add_build_args, run_build};
use crate::config::FolioConfig;

pub fn make_subcommand() -> Command {
    add_build_args(Command::new("serve"))
        .about("Build, serve the output and rebuild on changes")
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Port to serve on")
                .value_parser(value_parser!(u16)),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Host to bind to"),
        )
        .arg(
            Arg::new("open")
                .long("open")
                .help("Open browser automatically")
                .action(ArgAction::SetTrue),
        )
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    let config = FolioConfig::load(args)?;
    let build = config.build_config();

    run_build(&config, true).await?;

    let server = DevServer::new(DevServerConfig {
        host: build.host.clone(),
        port: build.port,
        root: PathBuf::from(&build.output),
        open: build.open,
        ignore: vec![".git".to_string(), ".tmp".to_string()],
    });
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            log::error!("Dev server error: {e:#}");
        }
    });

    let watcher_config = config.clone();
    let watcher_handle = tokio::spawn(async move {
        if let Err(e) = watch_sources(watcher_config).await {
            log::error!("Source watcher error: {e:#}");
        }
    });

    let _ = tokio::try_join!(server_handle, watcher_handle)?;

    Ok(())
}

fn is_source_change(path: &Path, source_dir: &Path, config_file: &Path) -> bool {
    let canonical = |p: &Path| p.canonicalize().unwrap_or_else(|_| p.to_path_buf());
    let path = canonical(path);
    path.starts_with(canonical(source_dir)) || path == canonical(config_file)
}

async fn watch_sources(config: FolioConfig) -> Result<()> {
    let build = config.build_config();
    let source_dir = PathBuf::from(&build.source);
    let config_file = PathBuf::from(&build.config);

    let (tx, mut rx) = tokio::sync::mpsc::channel(100);

    let mut debouncer = new_debouncer(Duration::from_millis(500), move |res: DebounceEventResult| {
        if let Ok(events) = res {
            for event in events {
                let _ = tx.blocking_send(event.path);
            }
        }
    })?;

    debouncer
        .watcher()
        .watch(&source_dir, notify::RecursiveMode::Recursive)?;
    log::info!("Watching source directory: {}", source_dir.display());

    if config_file.exists() {
        debouncer
            .watcher()
            .watch(&config_file, notify::RecursiveMode::NonRecursive)?;
        log::info!("Watching config file: {}", config_file.display());
    }

    while let Some(path) = rx.recv().await {
        if !is_source_change(&path, &source_dir, &config_file) {
            continue;
        }
        log::info!("Source changed: {}", path.display());

        // Config edits only take effect on restart; the page and data are reread every time
        match run_build(&config, true).await {
            Ok(_) => log::info!("Site rebuilt"),
            Err(e) => log::error!("Build error: {e:#}"),
        }
    }

    Ok(())
}
