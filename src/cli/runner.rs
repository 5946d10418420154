//! CLI runner - executes commands

use crate::changelog::{ChangelogPoller, CheckpointStore, PollOptions, WatchedResource};
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{load_settings, Settings};
use crate::error::{Error, Result, ResultExt};
use crate::http::{ApiRequest, PennylaneClient};
use crate::options::{load_options, OptionSource};
use crate::types::{AuthType, JsonObject, JsonValue};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

/// Options for the `watch` command
#[derive(Debug, Clone, Default)]
pub struct WatchArgs {
    pub since: Option<String>,
    pub interval: Option<u64>,
    pub page_size: Option<u32>,
    pub max_items: Option<usize>,
    pub status: Option<String>,
    pub customer_id: Option<String>,
    pub supplier_id: Option<String>,
    pub checkpoint_file: Option<PathBuf>,
    pub once: bool,
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let settings = self.load_settings()?;

        match &self.cli.command {
            Commands::Check => self.check(&settings).await,
            Commands::Get { path, query } => self.get(&settings, path, query).await,
            Commands::List {
                endpoint,
                query,
                max_items,
            } => self.list(&settings, endpoint, query, *max_items).await,
            Commands::Upload {
                endpoint,
                file,
                file_name,
                fields,
            } => {
                self.upload(&settings, endpoint, file, file_name.as_deref(), fields)
                    .await
            }
            Commands::Options { source } => self.options(&settings, *source).await,
            Commands::Watch {
                resource,
                since,
                interval,
                page_size,
                max_items,
                status,
                customer_id,
                supplier_id,
                checkpoint_file,
                once,
            } => {
                let args = WatchArgs {
                    since: since.clone(),
                    interval: *interval,
                    page_size: *page_size,
                    max_items: *max_items,
                    status: status.clone(),
                    customer_id: customer_id.clone(),
                    supplier_id: supplier_id.clone(),
                    checkpoint_file: checkpoint_file.clone(),
                    once: *once,
                };
                self.watch(&settings, *resource, args).await
            }
        }
    }

    /// Load the settings file, then apply command-line overrides
    fn load_settings(&self) -> Result<Settings> {
        let settings = match &self.cli.settings {
            Some(path) => load_settings(path)?,
            None => Settings::default(),
        };
        Ok(apply_overrides(settings, &self.cli))
    }

    /// Check the credentials
    async fn check(&self, settings: &Settings) -> Result<()> {
        let client = self.client(settings)?;
        info!("Checking connection to {}", client.base_url());

        match client.get("/me").await {
            Ok(response) => self.output(&json!({
                "type": "CONNECTION_STATUS",
                "connectionStatus": {
                    "status": "SUCCEEDED",
                    "message": "Connection successful",
                    "me": response.data
                }
            })),
            Err(e) => self.output(&json!({
                "type": "CONNECTION_STATUS",
                "connectionStatus": {
                    "status": "FAILED",
                    "message": format!("Connection failed: {e}")
                }
            })),
        }
        Ok(())
    }

    /// GET one endpoint
    async fn get(&self, settings: &Settings, path: &str, query: &[(String, String)]) -> Result<()> {
        let client = self.client(settings)?;
        let request = ApiRequest::get(path).queries(query.iter().cloned().collect());
        let response = client.request(request).await?;
        self.output(&response.data);
        Ok(())
    }

    /// Fetch every page of a listing
    async fn list(
        &self,
        settings: &Settings,
        endpoint: &str,
        query: &[(String, String)],
        max_items: Option<usize>,
    ) -> Result<()> {
        let client = self.client(settings)?;
        let items: Vec<JsonValue> = client
            .get_all_pages(endpoint, &to_params(query), max_items)
            .await?;

        info!("Fetched {} item(s) from {}", items.len(), endpoint);
        match self.cli.format {
            OutputFormat::Json => items.iter().for_each(|item| self.output(item)),
            OutputFormat::Pretty => self.output(&JsonValue::Array(items)),
        }
        Ok(())
    }

    /// Upload a file
    async fn upload(
        &self,
        settings: &Settings,
        endpoint: &str,
        file: &Path,
        file_name: Option<&str>,
        fields: &[(String, String)],
    ) -> Result<()> {
        let client = self.client(settings)?;
        let content = tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read '{}'", file.display()))?;

        let file_name = match file_name {
            Some(name) => name.to_string(),
            None => file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| Error::config(format!("'{}' has no file name", file.display())))?,
        };

        let data = client
            .upload_file(endpoint, &content, &file_name, &to_params(fields))
            .await?;
        self.output(&data);
        Ok(())
    }

    /// List selectable options
    async fn options(&self, settings: &Settings, source: OptionSource) -> Result<()> {
        let client = self.client(settings)?;
        let options = load_options(&client, source).await?;
        self.output(&serde_json::to_value(options)?);
        Ok(())
    }

    /// Watch a changelog until interrupted
    async fn watch(
        &self,
        settings: &Settings,
        resource: WatchedResource,
        args: WatchArgs,
    ) -> Result<()> {
        let client = self.client(settings)?;
        let watch = &settings.watch;

        let mut options = PollOptions::default()
            .page_size(args.page_size.unwrap_or(watch.page_size))
            .max_items(args.max_items.unwrap_or(watch.max_items))
            .interval(Duration::from_secs(
                args.interval.unwrap_or(watch.interval_seconds),
            ));
        options.since = args.since;
        options.status = args.status;
        options.customer_id = args.customer_id;
        options.supplier_id = args.supplier_id;

        let mut poller = ChangelogPoller::new(client, resource, options)?;
        if let Some(path) = args.checkpoint_file.or_else(|| watch.checkpoint_file.clone()) {
            poller = poller
                .with_checkpoints(CheckpointStore::from_file(path)?)
                .await;
        }

        if args.once {
            for change in poller.poll_once().await? {
                self.output(&change);
            }
            return Ok(());
        }

        let (sender, mut receiver) = mpsc::channel(256);
        let handle = poller.spawn(sender);

        loop {
            tokio::select! {
                change = receiver.recv() => match change {
                    Some(change) => self.output(&change),
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping watcher for {}", resource);
                    break;
                }
            }
        }

        handle.abort();
        Ok(())
    }

    fn client(&self, settings: &Settings) -> Result<PennylaneClient> {
        settings.client()
    }

    /// Output a value
    fn output(&self, value: &JsonValue) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(value).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
            }
        }
    }
}

/// Overlay command-line credentials and transport flags on the settings
fn apply_overrides(mut settings: Settings, cli: &Cli) -> Settings {
    let credentials = &mut settings.credentials;

    if let Some(token) = &cli.api_token {
        credentials.auth_type = AuthType::Token;
        credentials.api_token = Some(token.clone());
    }
    if let Some(token) = &cli.access_token {
        credentials.auth_type = AuthType::Oauth2;
        credentials.access_token = Some(token.clone());
    }
    if let Some(company_id) = &cli.company_id {
        credentials.company_id = Some(company_id.clone());
        credentials.oauth_company_id = Some(company_id.clone());
    }
    if let Some(environment) = cli.environment {
        credentials.environment = environment;
    }
    if let Some(host) = &cli.api_host {
        settings.http.api_host = host.clone();
    }
    if let Some(rps) = cli.rate_limit {
        settings.http.requests_per_second = rps;
    }
    settings
}

/// Turn `key=value` pairs into query or form parameters
fn to_params(pairs: &[(String, String)]) -> JsonObject {
    pairs
        .iter()
        .map(|(key, value)| (key.clone(), JsonValue::from(value.as_str())))
        .collect()
}
