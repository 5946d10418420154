//! Changelog poller
//!
//! Repeatedly fetches `/changelogs/{resource}` since the last seen change
//! and forwards each change, annotated with where and when it was picked up.

use super::store::CheckpointStore;
use super::types::{format_timestamp, PollOptions, WatchedResource};
use crate::error::Result;
use crate::http::PennylaneClient;
use crate::types::{scalar_to_string, JsonObject, JsonValue};
use chrono::Utc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Pacing used while polling
pub const POLL_REQUESTS_PER_SECOND: u32 = 2;

/// Field carrying the watched resource on emitted changes
pub const TRIGGER_RESOURCE_FIELD: &str = "_triggerResource";

/// Field carrying the pick-up time on emitted changes
pub const TRIGGER_TIMESTAMP_FIELD: &str = "_triggerTimestamp";

/// Polls the changelog of one resource
#[derive(Debug)]
pub struct ChangelogPoller {
    client: PennylaneClient,
    resource: WatchedResource,
    options: PollOptions,
    since: String,
    store: Option<CheckpointStore>,
}

impl ChangelogPoller {
    /// Create a poller; lowers the client's pacing to 2 requests/s
    pub fn new(
        mut client: PennylaneClient,
        resource: WatchedResource,
        options: PollOptions,
    ) -> Result<Self> {
        let since = options.initial_since()?;
        client.set_rate_limit(POLL_REQUESTS_PER_SECOND);

        Ok(Self {
            client,
            resource,
            options,
            since,
            store: None,
        })
    }

    /// Persist progress in a checkpoint store
    ///
    /// A checkpoint already recorded for this resource replaces the
    /// configured starting timestamp.
    pub async fn with_checkpoints(mut self, store: CheckpointStore) -> Self {
        if let Some(since) = store.get(self.resource.as_str()).await {
            debug!("Resuming {} changelog from checkpoint {}", self.resource, since);
            self.since = since;
        }
        self.store = Some(store);
        self
    }

    /// The watched resource
    pub fn resource(&self) -> WatchedResource {
        self.resource
    }

    /// Timestamp the next poll starts from
    pub fn since(&self) -> &str {
        &self.since
    }

    /// The underlying client
    pub fn client(&self) -> &PennylaneClient {
        &self.client
    }

    /// Fetch all changes since the last poll
    pub async fn poll_once(&mut self) -> Result<Vec<JsonValue>> {
        let params = self.query_params();
        let changes: Vec<JsonValue> = self
            .client
            .get_all_pages(&self.resource.endpoint(), &params, Some(self.options.max_items))
            .await?;

        let latest = changes
            .last()
            .and_then(|change| change.get("updated_at"))
            .and_then(scalar_to_string);
        if let Some(latest) = latest {
            self.advance(latest).await;
        }

        debug!("Polled {} change(s) for {}", changes.len(), self.resource);

        let triggered_at = format_timestamp(Utc::now());
        Ok(changes
            .into_iter()
            .map(|change| annotate(change, self.resource, &triggered_at))
            .collect())
    }

    /// Poll immediately, then every interval, sending changes to `sender`
    ///
    /// Poll failures are logged and polling continues. The task ends when
    /// the receiver is dropped or the handle is aborted.
    pub fn spawn(mut self, sender: mpsc::Sender<JsonValue>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = self.options.interval.max(Duration::from_millis(1));
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                "Watching {} changelog every {:?} since {}",
                self.resource, period, self.since
            );

            loop {
                ticker.tick().await;

                let changes = match self.poll_once().await {
                    Ok(changes) => changes,
                    Err(e) => {
                        error!("Changelog poll for {} failed: {}", self.resource, e);
                        continue;
                    }
                };

                for change in changes {
                    if sender.send(change).await.is_err() {
                        debug!("Receiver for {} changes dropped, stopping", self.resource);
                        return;
                    }
                }
            }
        })
    }

    fn query_params(&self) -> JsonObject {
        let mut params = JsonObject::new();
        params.insert("since".to_string(), JsonValue::from(self.since.clone()));
        params.insert("limit".to_string(), JsonValue::from(self.options.page_size));

        let filters = [
            ("status", &self.options.status),
            ("customer_id", &self.options.customer_id),
            ("supplier_id", &self.options.supplier_id),
        ];
        for (key, value) in filters {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                params.insert(key.to_string(), JsonValue::from(value));
            }
        }
        params
    }

    async fn advance(&mut self, latest: String) {
        if let Some(store) = &self.store {
            if let Err(e) = store.set(self.resource.as_str(), latest.clone()).await {
                warn!("Failed to save checkpoint for {}: {}", self.resource, e);
            }
        }
        self.since = latest;
    }
}

/// Tag a change with the watched resource and pick-up time
fn annotate(change: JsonValue, resource: WatchedResource, triggered_at: &str) -> JsonValue {
    let mut object = match change {
        JsonValue::Object(object) => object,
        other => {
            let mut object = JsonObject::new();
            object.insert("value".to_string(), other);
            object
        }
    };
    object.insert(
        TRIGGER_RESOURCE_FIELD.to_string(),
        JsonValue::from(resource.as_str()),
    );
    object.insert(
        TRIGGER_TIMESTAMP_FIELD.to_string(),
        JsonValue::from(triggered_at),
    );
    JsonValue::Object(object)
}
