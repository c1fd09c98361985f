use std::{env, net::SocketAddr, path::PathBuf, str::FromStr};

use super::env::{
    AppConfig, ConfigError, DirectoryConfig, GmailConfig, LoggingConfig, ModelConfig,
    SenderCredentials, ServerConfig, SmtpConfig,
};

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let server = ServerConfig {
            bind_addr: parse_or("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 5000)))?,
        };

        let model = ModelConfig {
            model_path: path_or("MODEL_PATH", "model/spam_model.json"),
            vectorizer_path: path_or("VECTORIZER_PATH", "model/vectorizer.json"),
        };

        let sender = match (non_empty("SENDER_EMAIL"), non_empty("SENDER_PASS")) {
            (Some(email), Some(password)) => Some(SenderCredentials { email, password }),
            (Some(_), None) => return Err(ConfigError::Missing("SENDER_PASS")),
            (None, Some(_)) => return Err(ConfigError::Missing("SENDER_EMAIL")),
            (None, None) => None,
        };
        let smtp = SmtpConfig {
            host: non_empty("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            port: parse_or("SMTP_PORT", 587)?,
            sender,
        };

        let gmail = GmailConfig {
            client_secrets_path: path_or("GMAIL_CLIENT_SECRETS", "credentials.json"),
            token_filename: non_empty("GMAIL_TOKEN_FILE")
                .unwrap_or_else(|| "token.json".to_string()),
            max_results: parse_or("SCAN_MAX_RESULTS", 10)?,
        };
        if gmail.max_results == 0 {
            return Err(ConfigError::Invalid {
                key: "SCAN_MAX_RESULTS",
                value: "0".to_string(),
            });
        }

        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        Ok(Self {
            server,
            model,
            smtp,
            gmail,
            directories,
            logging,
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn path_or(key: &str, default: &str) -> PathBuf {
    PathBuf::from(non_empty(key).unwrap_or_else(|| default.to_string()))
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty(key) {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
