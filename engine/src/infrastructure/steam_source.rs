//! Steam-backed remote content source
//!
//! Versions come from two places: the server build id is read from SteamCMD's
//! `app_info_print` output, and package versions are the `time_updated`
//! stamps reported by the Steam Web API for workshop items. Fetching
//! delegates the actual download to SteamCMD; workshop items are then synced
//! into the server's Mods directory.

use crate::domain::ports::RemoteContentSource;
use crate::domain::value_objects::{Subject, SubjectKind};
use crate::domain::{DomainError, Result};
use crate::infrastructure::config::RemoteConfig;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

const WORKSHOP_DETAILS_URL: &str =
    "https://api.steampowered.com/ISteamRemoteStorage/GetPublishedFileDetails/v1/";

static BUILD_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""buildid"\s+"(\d+)""#).expect("valid regex"));

pub struct SteamRemoteSource {
    config: RemoteConfig,
}

impl SteamRemoteSource {
    pub fn new(config: RemoteConfig) -> Self {
        Self { config }
    }

    fn steamcmd_path(&self) -> PathBuf {
        let binary = if cfg!(windows) { "steamcmd.exe" } else { "steamcmd" };
        Path::new(&self.config.steamcmd_dir).join(binary)
    }

    fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.config.steamcmd_timeout_sec)
    }

    /// Run SteamCMD with the given script arguments and capture its output.
    async fn run_steamcmd(&self, args: Vec<String>) -> std::result::Result<String, String> {
        let path = self.steamcmd_path();
        if !path.exists() {
            return Err(format!("steamcmd not found at {}", path.display()));
        }

        debug!(args = ?args, "running steamcmd");
        let result = timeout(
            self.tool_timeout(),
            Command::new(&path)
                .args(&args)
                .current_dir(&self.config.steamcmd_dir)
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                if output.status.success() {
                    Ok(stdout)
                } else {
                    Err(format!("steamcmd exited with {}: {}", output.status, tail(&stdout)))
                }
            }
            Ok(Err(e)) => Err(format!("failed to run steamcmd: {}", e)),
            Err(_) => Err(format!(
                "steamcmd timed out after {}s",
                self.tool_timeout().as_secs()
            )),
        }
    }

    async fn query_build_id(&self, subject: &Subject) -> Result<String> {
        let output = self
            .run_steamcmd(vec![
                "+login".to_string(),
                self.config.steam_user.clone(),
                "+app_info_update".to_string(),
                "1".to_string(),
                "+app_info_print".to_string(),
                self.config.app_id.clone(),
                "+quit".to_string(),
            ])
            .await
            .map_err(|message| DomainError::TransientRemote {
                subject: subject.id.clone(),
                message,
            })?;

        parse_build_id(&output).ok_or_else(|| DomainError::PersistentRemote {
            subject: subject.id.clone(),
            message: "no buildid in steamcmd app_info output".to_string(),
        })
    }

    /// Ask the Steam Web API when a workshop item was last updated.
    async fn query_workshop_updated(&self, subject: &Subject) -> Result<String> {
        let item_id = subject.id.as_str().to_string();
        let request_timeout = Duration::from_secs(self.config.request_timeout_sec);

        let response = tokio::task::spawn_blocking(move || {
            let agent = ureq::AgentBuilder::new().timeout(request_timeout).build();
            agent
                .post(WORKSHOP_DETAILS_URL)
                .send_form(&[("itemcount", "1"), ("publishedfileids[0]", &item_id)])
                .map_err(|e| e.to_string())
                .and_then(|resp| {
                    resp.into_json::<serde_json::Value>().map_err(|e| e.to_string())
                })
        })
        .await
        .map_err(|e| DomainError::TransientRemote {
            subject: subject.id.clone(),
            message: format!("workshop lookup task failed: {}", e),
        })?
        .map_err(|message| DomainError::TransientRemote {
            subject: subject.id.clone(),
            message,
        })?;

        parse_time_updated(&response).ok_or_else(|| DomainError::PersistentRemote {
            subject: subject.id.clone(),
            message: "no time_updated in workshop details".to_string(),
        })
    }

    async fn fetch_server(&self, subject: &Subject) -> Result<()> {
        let output = self
            .run_steamcmd(vec![
                "+login".to_string(),
                self.config.steam_user.clone(),
                "+force_install_dir".to_string(),
                self.config.install_dir.clone(),
                "+app_update".to_string(),
                self.config.app_id.clone(),
                "validate".to_string(),
                "+quit".to_string(),
            ])
            .await
            .map_err(|message| DomainError::ApplyFailure {
                subject: subject.id.clone(),
                message,
            })?;

        if output.contains("Success! App") || output.contains("fully installed") {
            info!(subject = %subject.id, "server build installed");
            Ok(())
        } else {
            Err(DomainError::ApplyFailure {
                subject: subject.id.clone(),
                message: format!("steamcmd did not report success: {}", tail(&output)),
            })
        }
    }

    async fn fetch_package(&self, subject: &Subject) -> Result<()> {
        self.run_steamcmd(vec![
            "+force_install_dir".to_string(),
            self.config.install_dir.clone(),
            "+login".to_string(),
            self.config.steam_user.clone(),
            "+workshop_download_item".to_string(),
            self.config.workshop_app_id.clone(),
            subject.id.as_str().to_string(),
            "+quit".to_string(),
        ])
        .await
        .map_err(|message| DomainError::ApplyFailure {
            subject: subject.id.clone(),
            message,
        })?;

        // Downloaded items land under the workshop content tree; copy them
        // into the directory the server actually loads mods from.
        let item_dir = Path::new(&self.config.install_dir)
            .join("steamapps")
            .join("workshop")
            .join("content")
            .join(&self.config.workshop_app_id)
            .join(subject.id.as_str());
        let mods_dir = PathBuf::from(&self.config.mods_dir);
        let subject_id = subject.id.clone();

        tokio::task::spawn_blocking(move || sync_workshop_item(&item_dir, &mods_dir))
            .await
            .map_err(|e| DomainError::ApplyFailure {
                subject: subject_id.clone(),
                message: format!("mod sync task failed: {}", e),
            })?
            .map_err(|message| DomainError::ApplyFailure {
                subject: subject_id,
                message,
            })?;

        info!(subject = %subject.id, "workshop item installed");
        Ok(())
    }
}

#[async_trait]
impl RemoteContentSource for SteamRemoteSource {
    async fn query_version(&self, subject: &Subject) -> Result<String> {
        match subject.kind {
            SubjectKind::ServerBuild => self.query_build_id(subject).await,
            SubjectKind::Package => self.query_workshop_updated(subject).await,
        }
    }

    async fn fetch(&self, subject: &Subject) -> Result<()> {
        match subject.kind {
            SubjectKind::ServerBuild => self.fetch_server(subject).await,
            SubjectKind::Package => self.fetch_package(subject).await,
        }
    }
}

fn parse_build_id(output: &str) -> Option<String> {
    BUILD_ID_RE
        .captures(output)
        .map(|captures| captures[1].to_string())
}

fn parse_time_updated(response: &serde_json::Value) -> Option<String> {
    let stamp = &response["response"]["publishedfiledetails"][0]["time_updated"];
    if let Some(n) = stamp.as_u64() {
        return Some(n.to_string());
    }
    stamp.as_str().map(|s| s.to_string())
}

/// Copy every mod folder inside a downloaded workshop item into the mods
/// directory, replacing files in place.
fn sync_workshop_item(item_dir: &Path, mods_dir: &Path) -> std::result::Result<(), String> {
    if !item_dir.is_dir() {
        return Err(format!(
            "downloaded item directory missing: {}",
            item_dir.display()
        ));
    }
    std::fs::create_dir_all(mods_dir)
        .map_err(|e| format!("cannot create {}: {}", mods_dir.display(), e))?;

    let entries = std::fs::read_dir(item_dir)
        .map_err(|e| format!("cannot read {}: {}", item_dir.display(), e))?;
    let mut copied = 0usize;
    for entry in entries {
        let entry = entry.map_err(|e| e.to_string())?;
        let source = entry.path();
        if !source.is_dir() {
            continue;
        }
        let dest = mods_dir.join(entry.file_name());
        copy_dir_recursive(&source, &dest)?;
        debug!(from = %source.display(), to = %dest.display(), "mod folder synced");
        copied += 1;
    }
    if copied == 0 {
        warn!(item = %item_dir.display(), "workshop item contained no mod folders");
    }
    Ok(())
}

fn copy_dir_recursive(source: &Path, dest: &Path) -> std::result::Result<(), String> {
    std::fs::create_dir_all(dest).map_err(|e| format!("cannot create {}: {}", dest.display(), e))?;
    let entries =
        std::fs::read_dir(source).map_err(|e| format!("cannot read {}: {}", source.display(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| e.to_string())?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        if from.is_dir() {
            copy_dir_recursive(&from, &to)?;
        } else {
            std::fs::copy(&from, &to)
                .map_err(|e| format!("cannot copy {} to {}: {}", from.display(), to.display(), e))?;
        }
    }
    Ok(())
}

fn tail(output: &str) -> String {
    let trimmed = output.trim_end();
    match trimmed.char_indices().nth_back(500) {
        Some((idx, _)) => trimmed[idx..].to_string(),
        None => trimmed.to_string(),
    }
}
