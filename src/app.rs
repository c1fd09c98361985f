use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use reqwest::Client;

use crate::{
    config::AppConfig,
    http::{self, AppState},
    infrastructure::{
        directories::ResolvedPaths,
        notifier::build_notifier,
        shutdown::Shutdown,
    },
    mail::{
        authorize::run_consent_flow,
        credentials::{ClientSecrets, TokenStore},
        CredentialManager, GmailMailSource,
    },
    model::SpamModel,
    pipeline::{ClassificationService, ScanAggregator},
};

pub struct SpamScannerApp {
    config: Arc<AppConfig>,
    state: Arc<AppState>,
    shutdown: Shutdown,
}

fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(format!("spam-scanner/{}", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to build HTTP client")
}

impl SpamScannerApp {
    pub fn initialize(config: AppConfig, paths: ResolvedPaths, shutdown: Shutdown) -> Result<Self> {
        let config = Arc::new(config);

        let model = SpamModel::load(&config.model).context("failed to load spam model")?;
        let classifier = ClassificationService::new(Arc::new(model));
        let scanner = ScanAggregator::new(classifier.clone());

        let http_client = http_client()?;
        let credentials = Arc::new(CredentialManager::new(
            TokenStore::new(paths.token_path.clone()),
            config.gmail.client_secrets_path.clone(),
            http_client.clone(),
        ));
        let mail_source = Arc::new(GmailMailSource::new(http_client, credentials));

        let notifier = build_notifier(&config.smtp).context("failed to configure SMTP")?;

        let state = Arc::new(AppState {
            classifier,
            scanner,
            mail_source,
            notifier,
            scan_limit: config.gmail.max_results,
        });

        Ok(Self {
            config,
            state,
            shutdown,
        })
    }

    pub async fn run(self) -> Result<()> {
        let SpamScannerApp {
            config,
            state,
            shutdown,
        } = self;

        tracing::info!("spam scanner starting");
        http::serve(config.server.bind_addr, state, shutdown.subscribe())
            .await
            .context("HTTP server failed")?;
        tracing::info!("spam scanner stopped");
        Ok(())
    }
}

/// Interactive one-time consent; writes the token the server will use.
pub async fn authorize(config: &AppConfig, paths: &ResolvedPaths) -> Result<()> {
    let secrets = ClientSecrets::load(&config.gmail.client_secrets_path)?;
    let store = TokenStore::new(paths.token_path.clone());
    run_consent_flow(&secrets, &http_client()?, &store).await?;
    println!("Gmail access granted; token saved to {}", store.path().display());
    Ok(())
}
