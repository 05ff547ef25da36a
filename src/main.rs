use std::{path::PathBuf, sync::Arc};

use clap::Parser;

use config::Settings;
use llm::{gemini::GeminiBackend, ModelBackend};
use sys::store::CredentialStore;

mod component;
mod config;
mod debug_tool;
mod error;
mod llm;
mod sys;

#[derive(Debug, clap::Parser)]
struct Args {
    /// settings file (toml)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// credential store, overrides `store_path`
    #[arg(long)]
    store: Option<PathBuf>,

    /// skip login; nothing is persisted
    #[arg(long)]
    guest: bool,

    /// offline echo model instead of Gemini
    #[arg(long)]
    debug_llm: bool,

    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logger(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    if let Some(path) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| anyhow::anyhow!("open log file `{}` err:{e}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!(".env not loaded: {e} (using system environment)");
    }
    let cli = Args::parse();
    init_logger(cli.log_file.as_ref())?;

    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => {
            let mut settings = Settings::default();
            settings.fill_default_value();
            settings
        }
    };
    if let Some(store) = cli.store {
        settings.store_path = store;
    }
    if settings.env_api_key().is_none() {
        log::warn!("{} is not set; enter a key in the sidebar", settings.api_key_env);
    }

    let store = if cli.guest {
        log::info!("guest session, nothing is persisted");
        None
    } else {
        let store = CredentialStore::open(&settings.store_path)?;
        log::info!("credential store at {}", store.path().display());
        Some(store)
    };

    let backend: Arc<dyn ModelBackend> = if cli.debug_llm {
        Arc::new(debug_tool::EchoBackend)
    } else {
        Arc::new(GeminiBackend::new(settings.base_url.clone()))
    };

    let ctx = component::Context::new(settings, store, backend);
    let app = component::App::new(ctx);

    let res = app.run_loop();

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}
