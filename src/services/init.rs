//! Startup wiring: the SQLite pool (with schema migrations) and the
//! optional classifier artifact.

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use url::Url;

use crate::config::Config;
use crate::services::classifier::{Classifier, RandomForest};

/// Database URL with userinfo and query string removed, safe for logs.
pub fn redact_db_url(db_url: &str) -> String {
    match Url::parse(db_url) {
        Ok(mut url) if !url.cannot_be_a_base() => {
            // Both setters only fail on cannot-be-a-base URLs, excluded above.
            let _ = url.set_password(None);
            let _ = url.set_username("");
            url.set_query(None);
            url.to_string()
        }
        _ => match db_url.rsplit_once('@') {
            Some((_, rest)) => format!("(redacted)@{}", rest),
            None => "(redacted)".to_string(),
        },
    }
}

/// Filesystem location behind a `sqlite://` URL (a bare path is accepted too).
fn sqlite_file(db_url: &str) -> &Path {
    Path::new(
        db_url
            .strip_prefix("sqlite://")
            .or_else(|| db_url.strip_prefix("sqlite:"))
            .unwrap_or(db_url),
    )
}

/// Open the pool, creating the database file and its directory on first run,
/// then bring the schema up to date.
pub async fn init_db(config: &Config) -> Result<sqlx::SqlitePool> {
    let file = sqlite_file(&config.database.url);
    let fresh = !file.exists();

    if let Some(dir) = file.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create database directory {}", dir.display()))?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(file)
                .create_if_missing(true),
        )
        .await
        .with_context(|| format!("Cannot open {}", redact_db_url(&config.database.url)))?;

    tracing::info!(
        "{} database {} (pool of {})",
        if fresh { "Created" } else { "Opened" },
        redact_db_url(&config.database.url),
        config.database.max_connections
    );

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::debug!("Database schema is up to date");

    Ok(pool)
}

/// Load the classifier artifact from `config.model.path`.
///
/// A missing or unreadable artifact does not stop the server: `/predict`
/// reports the model as unavailable until one is trained and the service restarted.
pub fn load_classifier(config: &Config) -> Option<Arc<dyn Classifier>> {
    let path = &config.model.path;

    if !Path::new(path).exists() {
        tracing::warn!("Model file not found at {}! Train the model first.", path);
        return None;
    }

    match RandomForest::load(path) {
        Ok(forest) => {
            tracing::info!(
                "AI model loaded from {} ({} trees)",
                path,
                forest.trees.len()
            );
            Some(Arc::new(forest))
        }
        Err(e) => {
            tracing::error!("Failed to load model from {}: {}", path, e);
            None
        }
    }
}
