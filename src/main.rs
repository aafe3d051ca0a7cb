//! redis-admin - Main Entry Point
//!
//! Lists stored connection profiles, or prints the key info of one key:
//! `redis-admin <profile-id> <key>`.

use redis_admin::config::{AppSettings, LogSettings};
use redis_admin::constants::LOG_FILE_PREFIX;
use redis_admin::helpers::get_or_create_config_dir;
use redis_admin::services::{BrowserService, RedisClientProvider};
use redis_admin::storage::DatabaseService;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Console logging plus an optional daily log file in the config directory
fn init_logging(settings: &LogSettings) -> anyhow::Result<Option<WorkerGuard>> {
    // RUST_LOG takes precedence over the configured level
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let (file_layer, guard) = if settings.file {
        let appender = tracing_appender::rolling::daily(get_or_create_config_dir()?, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (
            Some(fmt::layer().with_ansi(false).with_writer(writer)),
            Some(guard),
        )
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = AppSettings::load()?;
    let _guard = init_logging(&settings.log)?;

    tracing::info!("Starting redis-admin...");

    let databases = DatabaseService::from_settings(&settings)?;
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.as_slice() {
        [] => {
            let profiles = databases.list().await?;
            if profiles.is_empty() {
                println!("No stored databases");
            }
            for profile in profiles {
                println!(
                    "{}\t{}\t{}:{}\t{}",
                    profile.id,
                    profile.name,
                    profile.host,
                    profile.port,
                    profile.connection_type.as_str()
                );
            }
        }
        [database_id, key] => {
            let provider = Arc::new(RedisClientProvider::new(databases));
            let browser = BrowserService::new(provider.clone(), &settings.browser);

            let info = browser
                .get_key_info_auto(database_id, key.as_bytes())
                .await?;

            let mut json = serde_json::to_value(&info)?;
            json["name"] = String::from_utf8_lossy(&info.name).into_owned().into();
            println!("{}", serde_json::to_string_pretty(&json)?);

            provider.remove(database_id).await?;
        }
        _ => anyhow::bail!("usage: redis-admin [<profile-id> <key>]"),
    }

    Ok(())
}
