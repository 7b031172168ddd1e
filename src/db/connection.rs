use crate::error::{Error, Result};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection};
use std::str::FromStr;
use std::time::Duration;
use tracing::log::LevelFilter;
use tracing::{debug, info, warn};

/// Mask password in database URL for display
pub fn mask_url_password(url: &str) -> String {
    let Some((protocol, rest)) = url.split_once("://") else {
        return url.to_string();
    };

    if let Some(at_pos) = rest.rfind('@') {
        let user_info = &rest[..at_pos];
        let host_and_path = &rest[at_pos + 1..];

        if let Some((username, _)) = user_info.split_once(':') {
            return format!("{}://{}:***@{}", protocol, username, host_and_path);
        }
    }

    url.to_string()
}

/// Retry policy for opening the provider's connection
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay: Duration::from_millis(200),
        }
    }
}

/// Open one dedicated connection, retrying transient failures.
///
/// Slow statement logging is switched off since change-scripts routinely
/// run longer than sqlx's threshold and would otherwise be logged in full.
pub async fn connect_with_retry(url: &str, config: &ConnectionConfig) -> Result<PgConnection> {
    let options = PgConnectOptions::from_str(url)
        .map_err(|e| {
            Error::Configuration(format!(
                "Invalid database URL {}: {}",
                mask_url_password(url),
                e
            ))
        })?
        .log_slow_statements(LevelFilter::Off, Duration::from_secs(0));

    let mut attempt = 0;
    loop {
        match PgConnection::connect_with(&options).await {
            Ok(conn) => {
                if attempt > 0 {
                    info!(
                        "Connected to {} (after {} retr{})",
                        mask_url_password(url),
                        attempt,
                        if attempt == 1 { "y" } else { "ies" }
                    );
                } else {
                    debug!("Connected to {}", mask_url_password(url));
                }
                return Ok(conn);
            }
            Err(e) if attempt < config.max_retries => {
                if attempt == 0 {
                    warn!("Database {} not ready, retrying: {}", mask_url_password(url), e);
                }
                attempt += 1;
                tokio::time::sleep(config.retry_delay).await;
            }
            Err(e) => return Err(Error::Database(e)),
        }
    }
}
