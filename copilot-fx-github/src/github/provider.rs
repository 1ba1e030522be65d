use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use derive_more::Display;
use log::{debug, error, info, trace, warn};
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::{Client, Response};
use url::Url;

use copilot_fx_core::core::config::GithubProperties;
use copilot_fx_core::core::metrics::{self, DailyMetrics, MetricsError, MetricsProvider};
use copilot_fx_core::core::storage::Storage;

use crate::github::models::*;

const ACCEPT_HEADER_VALUE: &str = "application/vnd.github+json";
const API_VERSION_HEADER_KEY: &str = "X-GitHub-Api-Version";
const ENTRY_DATE_FORMAT: &str = "%Y-%m-%d";
const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// The GitHub implementation of the usage metrics provider.
///
/// It retrieves the organization usage metrics with a single GET request and normalizes the
/// nested editor/model/language payload into flat [DailyMetrics] records. The normalized batch
/// is persisted as a timestamped `metrics_<timestamp>.json` snapshot within the data directory.
#[derive(Debug, Display)]
#[display(fmt = "GitHub usage metrics provider of {}", "properties.organization()")]
pub struct GithubUsageProvider {
    properties: GithubProperties,
    storage: Storage,
    client: Client,
}

impl GithubUsageProvider {
    /// Create a new provider for the given properties, storing snapshots in the given data directory.
    pub fn new(properties: GithubProperties, data_path: &str) -> Self {
        let client = Self::create_new_client(&properties);

        Self {
            properties,
            storage: Storage::from(data_path),
            client,
        }
    }

    fn create_new_client(properties: &GithubProperties) -> Client {
        let mut headers = HeaderMap::new();

        headers.insert(ACCEPT, ACCEPT_HEADER_VALUE.parse().unwrap());
        headers.insert(API_VERSION_HEADER_KEY, properties.api_version().parse().unwrap());

        Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .unwrap()
    }

    fn usage_url(&self) -> metrics::Result<Url> {
        let url = format!(
            "{}/orgs/{}{}",
            self.properties.api_url(),
            self.properties.organization(),
            self.properties.usage_path()
        );

        Url::parse(url.as_str()).map_err(|e| MetricsError::Fetch {
            status: 0,
            body: format!("invalid usage metrics url, {}", e),
        })
    }

    /// Normalize the raw usage entries into daily metric records.
    ///
    /// Entries without a usable date are skipped. Missing nested sections contribute zero to
    /// their counters. The output order follows the input entry order.
    fn process_entries(entries: Vec<UsageEntry>) -> Vec<DailyMetrics> {
        let mut records: Vec<DailyMetrics> = Vec::with_capacity(entries.len());

        trace!("Normalizing a total of {} usage entries", entries.len());
        for entry in entries {
            let day = match entry
                .date
                .as_deref()
                .and_then(|e| NaiveDate::parse_from_str(e, ENTRY_DATE_FORMAT).ok())
            {
                Some(e) => e,
                None => {
                    warn!("Skipping usage entry without a usable date, {:?}", entry.date);
                    continue;
                }
            };

            let mut record = DailyMetrics::empty(day);
            record.total_active_users = entry.total_active_users;

            if let Some(completions) = entry.copilot_ide_code_completions {
                for editor in completions.editors {
                    for model in editor.models {
                        for language in model.languages {
                            record.total_suggestions_count += language.total_code_suggestions;
                            record.total_acceptances_count += language.total_code_acceptances;
                            record.total_lines_suggested += language.total_code_lines_suggested;
                            record.total_lines_accepted += language.total_code_lines_accepted;
                        }
                    }
                }
            }

            if let Some(chat) = entry.copilot_ide_chat {
                for editor in chat.editors {
                    for model in editor.models {
                        record.total_chat_turns += model.total_chats;
                        record.total_chat_acceptances +=
                            model.total_chat_insertion_events + model.total_chat_copy_events;
                        record.total_active_chat_users += model.total_engaged_users;
                    }
                }
            }

            records.push(record);
        }

        records
    }

    async fn handle_usage_response(response: Response) -> metrics::Result<Vec<UsageEntry>> {
        let status = response.status();

        if status.is_success() {
            trace!("Received usage metrics response, decoding JSON...");
            response.json::<Vec<UsageEntry>>().await.map_err(|e| MetricsError::Fetch {
                status: status.as_u16(),
                body: format!("failed to decode the usage payload, {}", e),
            })
        } else {
            let body = response.text().await.unwrap_or_default();
            error!("Received status {} for the usage metrics request with body {}", status, body);

            Err(MetricsError::Fetch {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl MetricsProvider for GithubUsageProvider {
    async fn fetch(&self) -> metrics::Result<PathBuf> {
        let url = self.usage_url()?;

        debug!("Retrieving usage metrics from {}", &url);
        let response = self
            .client
            .get(url)
            .bearer_auth(self.properties.api_token())
            .send()
            .await
            .map_err(|e| {
                error!("Failed to retrieve usage metrics, {}", e);
                MetricsError::Fetch {
                    status: 0,
                    body: e.to_string(),
                }
            })?;

        let entries = Self::handle_usage_response(response).await?;
        let records = Self::process_entries(entries);
        debug!("Normalized a total of {} usage records", records.len());

        let filename = format!("metrics_{}.json", Local::now().format(SNAPSHOT_TIMESTAMP_FORMAT));
        let path = self
            .storage
            .options()
            .make_dirs(true)
            .serializer(filename.as_str())
            .write(&records)
            .map_err(|e| MetricsError::Processing(e.to_string()))?;

        info!("Usage metrics have been saved to {:?}", path);
        Ok(path)
    }
}
