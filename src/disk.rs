use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::DiskConfig;

/// Failure kinds of the two-step Yandex Disk upload protocol.
#[derive(Debug, Error)]
pub enum DiskError {
    #[error("creating folder '{path}' failed: {status}: {body}")]
    FolderCreate {
        path: String,
        status: StatusCode,
        body: String,
    },
    #[error("no upload link for '{path}': {status}: {body}")]
    UploadLocation {
        path: String,
        status: StatusCode,
        body: String,
    },
    #[error("byte transfer for '{path}' failed: {status}: {body}")]
    Write {
        path: String,
        status: StatusCode,
        body: String,
    },
    #[error("disk request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct UploadLink {
    href: String,
}

/// Minimal Yandex Disk REST client: create folders, upload bytes.
pub struct DiskClient {
    http: reqwest::Client,
    config: DiskConfig,
}

impl DiskClient {
    pub fn new(config: DiskConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn auth_header(&self) -> String {
        format!("OAuth {}", self.config.oauth_token)
    }

    /// Create every prefix of `folder` from the root down. 201 (created)
    /// and 409 (already exists) are success; anything else aborts.
    pub async fn ensure_folders(&self, folder: &str) -> Result<(), DiskError> {
        let url = format!("{}/resources", self.config.base_url);
        for prefix in folder_prefixes(folder) {
            let resp = self
                .http
                .put(&url)
                .header("Authorization", self.auth_header())
                .query(&[("path", prefix.as_str())])
                .send()
                .await?;

            let status = resp.status();
            if status != StatusCode::CREATED && status != StatusCode::CONFLICT {
                let body = resp.text().await.unwrap_or_default();
                return Err(DiskError::FolderCreate {
                    path: prefix,
                    status,
                    body,
                });
            }
        }
        Ok(())
    }

    /// Upload `data` to `path`, creating its parent folders first. The
    /// bytes are only sent once every parent folder exists and the API
    /// handed out an upload URL for the path.
    pub async fn upload_bytes(&self, path: &str, data: Vec<u8>) -> Result<(), DiskError> {
        if let Some(parent) = parent_folder(path) {
            self.ensure_folders(parent).await?;
        }

        let href = self.upload_url(path).await?;

        debug!("Streaming {} byte(s) to {}", data.len(), path);
        let resp = self.http.put(&href).body(data).send().await?;
        let status = resp.status();
        if status != StatusCode::CREATED && status != StatusCode::ACCEPTED {
            let body = resp.text().await.unwrap_or_default();
            return Err(DiskError::Write {
                path: path.to_string(),
                status,
                body,
            });
        }
        Ok(())
    }

    /// Ask the API where to PUT the bytes for `path`.
    async fn upload_url(&self, path: &str) -> Result<String, DiskError> {
        let url = format!("{}/resources/upload", self.config.base_url);
        let overwrite = if self.config.overwrite { "true" } else { "false" };
        let resp = self
            .http
            .get(&url)
            .header("Authorization", self.auth_header())
            .query(&[("path", path), ("overwrite", overwrite)])
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(DiskError::UploadLocation {
                path: path.to_string(),
                status,
                body,
            });
        }

        let link: UploadLink = resp.json().await?;
        Ok(link.href)
    }
}

/// "a/b/c" -> ["a", "a/b", "a/b/c"]
fn folder_prefixes(folder: &str) -> Vec<String> {
    let mut prefixes = Vec::new();
    let mut acc = String::new();
    for part in folder.split('/').filter(|p| !p.is_empty()) {
        if !acc.is_empty() {
            acc.push('/');
        }
        acc.push_str(part);
        prefixes.push(acc.clone());
    }
    prefixes
}

fn parent_folder(path: &str) -> Option<&str> {
    path.rsplit_once('/')
        .map(|(parent, _)| parent)
        .filter(|p| !p.is_empty())
}
