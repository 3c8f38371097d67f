//! GitHub releases REST client
//!
//! Only the three calls the pipeline needs: look up a release by tag, create a
//! release, upload an asset to the release's upload endpoint.

use crate::core::error::PublishError;
use crate::release::assets::UploadAsset;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// Request body for release creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRelease {
  pub tag_name: String,
  pub name: String,
  pub draft: bool,
  pub prerelease: bool,
}

/// A release object on the hosting platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseRecord {
  pub id: u64,
  pub tag: String,
  pub title: String,
  pub draft: bool,
  pub prerelease: bool,
  /// Upload endpoint with any URI template suffix removed
  pub upload_url: String,
  pub html_url: String,
  /// Names of assets already attached when the record was fetched
  pub existing_assets: Vec<String>,
}

/// Acknowledgement of an uploaded asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReceipt {
  pub id: u64,
  pub name: String,
  #[serde(default)]
  pub browser_download_url: String,
  #[serde(default)]
  pub size: u64,
}

/// Remote release operations
pub trait ReleaseApi {
  /// Release attached to `tag`, if any
  fn find_release(&self, tag: &str) -> Result<Option<ReleaseRecord>, PublishError>;

  fn create_release(&self, release: &NewRelease) -> Result<ReleaseRecord, PublishError>;

  fn upload_asset(&self, record: &ReleaseRecord, asset: &UploadAsset) -> Result<AssetReceipt, PublishError>;
}

#[derive(Debug, Deserialize)]
struct ReleasePayload {
  id: u64,
  tag_name: String,
  #[serde(default)]
  name: Option<String>,
  #[serde(default)]
  draft: bool,
  #[serde(default)]
  prerelease: bool,
  upload_url: String,
  #[serde(default)]
  html_url: String,
  #[serde(default)]
  assets: Vec<AssetPayload>,
}

#[derive(Debug, Deserialize)]
struct AssetPayload {
  name: String,
}

impl From<ReleasePayload> for ReleaseRecord {
  fn from(payload: ReleasePayload) -> Self {
    Self {
      id: payload.id,
      title: payload.name.unwrap_or_else(|| payload.tag_name.clone()),
      tag: payload.tag_name,
      draft: payload.draft,
      prerelease: payload.prerelease,
      upload_url: strip_uri_template(&payload.upload_url),
      html_url: payload.html_url,
      existing_assets: payload.assets.into_iter().map(|a| a.name).collect(),
    }
  }
}

/// `https://uploads.github.com/.../assets{?name,label}` → `https://uploads.github.com/.../assets`
fn strip_uri_template(url: &str) -> String {
  match url.find('{') {
    Some(idx) => url[..idx].to_string(),
    None => url.to_string(),
  }
}

/// Blocking GitHub REST client
pub struct GitHubClient {
  client: Client,
  api_url: String,
  repository: String,
}

impl GitHubClient {
  pub fn new(api_url: &str, repository: &str, token: &str, timeout: Duration) -> Result<Self, PublishError> {
    let mut headers = HeaderMap::new();
    let auth = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| PublishError::Transport {
      operation: "configure client".to_string(),
      reason: "token contains invalid header characters".to_string(),
    })?;
    headers.insert(AUTHORIZATION, auth);
    headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
    headers.insert("x-github-api-version", HeaderValue::from_static("2022-11-28"));
    headers.insert(
      USER_AGENT,
      HeaderValue::from_static(concat!("cargo-ship/", env!("CARGO_PKG_VERSION"))),
    );

    let client = Client::builder()
      .timeout(timeout)
      .default_headers(headers)
      .build()
      .map_err(|e| PublishError::Transport {
        operation: "configure client".to_string(),
        reason: e.to_string(),
      })?;

    Ok(Self {
      client,
      api_url: api_url.trim_end_matches('/').to_string(),
      repository: repository.to_string(),
    })
  }

  fn releases_url(&self) -> String {
    format!("{}/repos/{}/releases", self.api_url, self.repository)
  }
}

fn transport(operation: &str, err: reqwest::Error) -> PublishError {
  PublishError::Transport {
    operation: operation.to_string(),
    reason: err.to_string(),
  }
}

/// Turn a non-success response into an API error, keeping GitHub's message
fn api_error(operation: &str, response: Response) -> PublishError {
  let status = response.status().as_u16();
  let body = response.text().unwrap_or_default();
  let message = serde_json::from_str::<serde_json::Value>(&body)
    .ok()
    .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
    .unwrap_or(body);
  PublishError::Api {
    operation: operation.to_string(),
    status,
    message,
  }
}

fn decode<T: serde::de::DeserializeOwned>(operation: &str, response: Response) -> Result<T, PublishError> {
  response.json::<T>().map_err(|e| PublishError::Transport {
    operation: operation.to_string(),
    reason: format!("unexpected response body: {}", e),
  })
}

impl ReleaseApi for GitHubClient {
  fn find_release(&self, tag: &str) -> Result<Option<ReleaseRecord>, PublishError> {
    const OP: &str = "look up release";
    let url = format!("{}/tags/{}", self.releases_url(), tag);
    tracing::debug!(%url, "GET release by tag");

    let response = self.client.get(&url).send().map_err(|e| transport(OP, e))?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
      return Ok(None);
    }
    if !response.status().is_success() {
      return Err(api_error(OP, response));
    }
    let payload: ReleasePayload = decode(OP, response)?;
    Ok(Some(payload.into()))
  }

  fn create_release(&self, release: &NewRelease) -> Result<ReleaseRecord, PublishError> {
    const OP: &str = "create release";
    let url = self.releases_url();
    tracing::debug!(%url, tag = %release.tag_name, "POST release");

    let response = self
      .client
      .post(&url)
      .json(release)
      .send()
      .map_err(|e| transport(OP, e))?;
    if !response.status().is_success() {
      return Err(api_error(OP, response));
    }
    let payload: ReleasePayload = decode(OP, response)?;
    Ok(payload.into())
  }

  fn upload_asset(&self, record: &ReleaseRecord, asset: &UploadAsset) -> Result<AssetReceipt, PublishError> {
    const OP: &str = "upload asset";
    let bytes = fs::read(&asset.path).map_err(|e| PublishError::AssetUnreadable {
      path: asset.path.clone(),
      reason: e.to_string(),
    })?;
    tracing::debug!(url = %record.upload_url, name = %asset.name, bytes = bytes.len(), "POST asset");

    let response = self
      .client
      .post(&record.upload_url)
      .query(&[("name", asset.name.as_str())])
      .header(CONTENT_TYPE, asset.content_type.as_str())
      .body(bytes)
      .send()
      .map_err(|e| transport(OP, e))?;
    if !response.status().is_success() {
      return Err(api_error(OP, response));
    }
    decode(OP, response)
  }
}
