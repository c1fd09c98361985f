pub mod env;
mod loader;

pub use env::{
    AppConfig, DirectoryConfig, GmailConfig, ModelConfig, SenderCredentials, SmtpConfig,
};
pub use loader::load_config;
