use std::path::PathBuf;

use hdmap_editor_lib::command::execute_json_batch;
use hdmap_editor_lib::config::EditorSettings;
use hdmap_editor_lib::harness::EditorHarness;
use hdmap_editor_lib::persistence::{fetch_map, flush_dirty, PersistenceClient};

#[derive(Debug, Default)]
struct Args {
    map: Option<PathBuf>,
    commands: Option<PathBuf>,
    out: Option<PathBuf>,
    settings: Option<PathBuf>,
    save_settings: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hdmap_editor=info".into()),
        )
        .init();

    let args = parse_args();
    let settings = match &args.settings {
        Some(path) => match EditorSettings::load_from(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!("{e}");
                std::process::exit(2);
            }
        },
        None => EditorSettings::load(),
    };

    if let Some(path) = &args.save_settings {
        if let Err(e) = settings.save_to(path) {
            tracing::error!("{e}");
            std::process::exit(2);
        }
    }

    if let Err(e) = run(args, settings) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

/// `--map <file> --commands <file> --out <file> --settings <file> --save-settings <file>`,
/// all optional
fn parse_args() -> Args {
    let argv: Vec<String> = std::env::args().collect();
    let mut args = Args::default();
    let mut i = 1;
    while i < argv.len() {
        let value = argv.get(i + 1).map(PathBuf::from);
        match argv[i].as_str() {
            "--map" => args.map = value,
            "--commands" => args.commands = value,
            "--out" => args.out = value,
            "--settings" => args.settings = value,
            "--save-settings" => args.save_settings = value,
            other => {
                tracing::warn!("Ignoring unknown argument {other}");
                i += 1;
                continue;
            }
        }
        i += 2;
    }
    args
}

fn run(args: Args, settings: EditorSettings) -> Result<(), String> {
    let prefix = settings.persistence.namespace.clone();
    let backend = match &settings.persistence.base_url {
        Some(url) => {
            let runtime = tokio::runtime::Runtime::new()
                .map_err(|e| format!("Failed to start async runtime: {e}"))?;
            Some((PersistenceClient::new(url.clone()), runtime))
        }
        None => None,
    };

    let mut harness = EditorHarness::new(settings);

    if let Some(path) = &args.map {
        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read map file {}: {e}", path.display()))?;
        harness.load_map_json(&json)?;
        tracing::info!("Loaded map from {}", path.display());
    } else if let Some((client, runtime)) = &backend {
        let map = runtime.block_on(fetch_map(client, &prefix))?;
        harness.load_map(map);
        tracing::info!("Fetched map from {}", client.base_url());
    }

    if let Some(path) = &args.commands {
        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read commands file {}: {e}", path.display()))?;
        let responses = execute_json_batch(&mut harness, &json)?;
        let failed = responses.iter().filter(|r| !r.success).count();
        for (i, response) in responses.iter().enumerate() {
            if let Some(error) = &response.error {
                tracing::warn!("Command #{i} failed: {error}");
            }
        }
        tracing::info!("Executed {} command(s), {} failed", responses.len(), failed);
    }

    if let Some((client, runtime)) = &backend {
        runtime.block_on(flush_dirty(client, &harness.ctx));
    }

    let json = harness.export_map_json()?;
    match &args.out {
        Some(path) => std::fs::write(path, json)
            .map_err(|e| format!("Failed to write {}: {e}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
