//! Publishing a release: create the record, then attach every asset
//!
//! Uploads are sequential and fail-fast. A failed upload leaves the release and the
//! assets already attached in place; the error names what is missing so the run can
//! be repeated with `on_existing = "reuse"`.

use crate::core::config::ExistingRelease;
use crate::core::error::PublishError;
use crate::release::assets::UploadAsset;
use crate::release::github::{AssetReceipt, NewRelease, ReleaseApi, ReleaseRecord};
use crate::release::retry::RetryPolicy;

/// Outcome of uploading one asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
  Uploaded(AssetReceipt),
  /// Reused release already had an asset with this name
  AlreadyPresent(String),
}

pub struct ReleasePublisher<'a> {
  api: &'a dyn ReleaseApi,
  on_existing: ExistingRelease,
  create_policy: RetryPolicy,
  upload_policy: RetryPolicy,
}

impl<'a> ReleasePublisher<'a> {
  pub fn new(
    api: &'a dyn ReleaseApi,
    on_existing: ExistingRelease,
    create_policy: RetryPolicy,
    upload_policy: RetryPolicy,
  ) -> Self {
    Self {
      api,
      on_existing,
      create_policy,
      upload_policy,
    }
  }

  /// Create a non-draft, non-prerelease release for `tag`
  ///
  /// Checks for an existing release first. This narrows the window for two runs
  /// creating releases for the same tag but cannot close it.
  pub fn create_release(&self, tag: &str, title: &str) -> Result<ReleaseRecord, PublishError> {
    if let Some(existing) = self.api.find_release(tag)? {
      return match self.on_existing {
        ExistingRelease::Fail => Err(PublishError::ReleaseExists {
          tag: tag.to_string(),
          url: existing.html_url,
        }),
        ExistingRelease::Reuse => {
          tracing::info!(
            tag,
            id = existing.id,
            assets = existing.existing_assets.len(),
            "reusing existing release"
          );
          Ok(existing)
        }
      };
    }

    let request = NewRelease {
      tag_name: tag.to_string(),
      name: title.to_string(),
      draft: false,
      prerelease: false,
    };
    let record = self
      .create_policy
      .run("create release", |_| self.api.create_release(&request))?;
    tracing::info!(tag, id = record.id, url = %record.html_url, "release created");
    Ok(record)
  }

  /// Upload one asset against the record's endpoint
  pub fn upload_asset(&self, record: &ReleaseRecord, asset: &UploadAsset) -> Result<UploadOutcome, PublishError> {
    if record.existing_assets.iter().any(|n| n == &asset.name) {
      tracing::info!(name = %asset.name, "asset already attached, skipping");
      return Ok(UploadOutcome::AlreadyPresent(asset.name.clone()));
    }

    let receipt = self
      .upload_policy
      .run("upload asset", |_| self.api.upload_asset(record, asset))?;
    tracing::info!(name = %receipt.name, size = receipt.size, "asset uploaded");
    Ok(UploadOutcome::Uploaded(receipt))
  }

  /// Upload every asset in order, stopping at the first failure
  ///
  /// `on_uploaded` runs after each successful asset. A failure is returned as
  /// `PartialPublish`, listing what made it and what did not.
  pub fn upload_all<F>(
    &self,
    record: &ReleaseRecord,
    assets: &[UploadAsset],
    mut on_uploaded: F,
  ) -> Result<Vec<String>, PublishError>
  where
    F: FnMut(&UploadOutcome),
  {
    let mut done = Vec::with_capacity(assets.len());

    for (idx, asset) in assets.iter().enumerate() {
      match self.upload_asset(record, asset) {
        Ok(outcome) => {
          on_uploaded(&outcome);
          done.push(asset.name.clone());
        }
        Err(cause) => {
          return Err(PublishError::PartialPublish {
            tag: record.tag.clone(),
            url: record.html_url.clone(),
            uploaded: done,
            missing: assets[idx..].iter().map(|a| a.name.clone()).collect(),
            cause: Box::new(cause),
          });
        }
      }
    }

    Ok(done)
  }
}

#[cfg(test)]
pub(crate) mod fake {
  //! In-memory `ReleaseApi` for pipeline tests

  use super::*;
  use std::cell::RefCell;

  #[derive(Debug, Clone, PartialEq, Eq)]
  pub enum ApiCall {
    Find(String),
    Create(NewRelease),
    Upload(String),
  }

  #[derive(Default)]
  pub struct FakeApi {
    pub existing: Option<ReleaseRecord>,
    /// Asset names whose upload fails with HTTP 500
    pub failing_uploads: Vec<String>,
    /// Upcoming upload calls that fail with a transport error
    pub flaky_uploads: RefCell<u32>,
    pub reject_create: bool,
    pub calls: RefCell<Vec<ApiCall>>,
  }

  impl FakeApi {
    pub fn created(&self) -> usize {
      self
        .calls
        .borrow()
        .iter()
        .filter(|c| matches!(c, ApiCall::Create(_)))
        .count()
    }

    pub fn uploads(&self) -> Vec<String> {
      self
        .calls
        .borrow()
        .iter()
        .filter_map(|c| match c {
          ApiCall::Upload(name) => Some(name.clone()),
          _ => None,
        })
        .collect()
    }
  }

  pub fn record(tag: &str, title: &str, existing_assets: Vec<String>) -> ReleaseRecord {
    ReleaseRecord {
      id: 1,
      tag: tag.to_string(),
      title: title.to_string(),
      draft: false,
      prerelease: false,
      upload_url: "https://uploads.example.test/releases/1/assets".to_string(),
      html_url: format!("https://example.test/releases/{}", tag),
      existing_assets,
    }
  }

  impl ReleaseApi for FakeApi {
    fn find_release(&self, tag: &str) -> Result<Option<ReleaseRecord>, PublishError> {
      self.calls.borrow_mut().push(ApiCall::Find(tag.to_string()));
      Ok(self.existing.clone())
    }

    fn create_release(&self, release: &NewRelease) -> Result<ReleaseRecord, PublishError> {
      self.calls.borrow_mut().push(ApiCall::Create(release.clone()));
      if self.reject_create {
        return Err(PublishError::Api {
          operation: "create release".to_string(),
          status: 422,
          message: "Validation Failed".to_string(),
        });
      }
      Ok(record(&release.tag_name, &release.name, Vec::new()))
    }

    fn upload_asset(&self, _record: &ReleaseRecord, asset: &UploadAsset) -> Result<AssetReceipt, PublishError> {
      self.calls.borrow_mut().push(ApiCall::Upload(asset.name.clone()));
      let mut flaky = self.flaky_uploads.borrow_mut();
      if *flaky > 0 {
        *flaky -= 1;
        return Err(PublishError::Transport {
          operation: "upload asset".to_string(),
          reason: "connection reset".to_string(),
        });
      }
      if self.failing_uploads.contains(&asset.name) {
        return Err(PublishError::Api {
          operation: "upload asset".to_string(),
          status: 500,
          message: "Server Error".to_string(),
        });
      }
      Ok(AssetReceipt {
        id: 1,
        name: asset.name.clone(),
        browser_download_url: String::new(),
        size: 0,
      })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::fake::{ApiCall, FakeApi, record};
  use super::*;
  use crate::release::assets::OCTET_STREAM;
  use std::cell::RefCell;
  use std::path::PathBuf;

  fn assets() -> Vec<UploadAsset> {
    ["tool-1.2.3", "tool-1.2.3-1.x86_64.rpm", "tool_1.2.3_amd64.deb"]
      .iter()
      .map(|n| UploadAsset {
        path: PathBuf::from(n),
        name: n.to_string(),
        content_type: OCTET_STREAM.to_string(),
      })
      .collect()
  }

  fn publisher(api: &FakeApi, on_existing: ExistingRelease) -> ReleasePublisher<'_> {
    ReleasePublisher::new(api, on_existing, RetryPolicy::default(), RetryPolicy::default())
  }

  fn fast_retry(attempts: u32) -> RetryPolicy {
    RetryPolicy {
      max_attempts: attempts,
      initial_backoff_ms: 0,
      max_backoff_ms: 0,
      multiplier: 1.0,
    }
  }

  #[test]
  fn test_create_release_is_public() {
    let api = FakeApi::default();
    let record = publisher(&api, ExistingRelease::Fail)
      .create_release("1.2.3", "Release 1.2.3")
      .unwrap();
    assert_eq!(record.title, "Release 1.2.3");
    assert_eq!(
      api.calls.borrow()[1],
      ApiCall::Create(NewRelease {
        tag_name: "1.2.3".to_string(),
        name: "Release 1.2.3".to_string(),
        draft: false,
        prerelease: false,
      })
    );
  }

  #[test]
  fn test_existing_release_fails_by_default() {
    let api = FakeApi {
      existing: Some(record("1.2.3", "Release 1.2.3", Vec::new())),
      ..Default::default()
    };
    let err = publisher(&api, ExistingRelease::Fail)
      .create_release("1.2.3", "Release 1.2.3")
      .unwrap_err();
    assert!(matches!(err, PublishError::ReleaseExists { .. }));
    assert_eq!(api.created(), 0);
  }

  #[test]
  fn test_reuse_skips_attached_assets() {
    let api = FakeApi {
      existing: Some(record("1.2.3", "Release 1.2.3", vec!["tool-1.2.3".to_string()])),
      ..Default::default()
    };
    let publisher = publisher(&api, ExistingRelease::Reuse);
    let record = publisher.create_release("1.2.3", "Release 1.2.3").unwrap();
    let done = publisher.upload_all(&record, &assets(), |_| {}).unwrap();

    assert_eq!(done.len(), 3);
    assert_eq!(api.created(), 0);
    assert_eq!(api.uploads(), vec!["tool-1.2.3-1.x86_64.rpm", "tool_1.2.3_amd64.deb"]);
  }

  #[test]
  fn test_upload_failure_stops_remaining_uploads() {
    let api = FakeApi {
      failing_uploads: vec!["tool-1.2.3-1.x86_64.rpm".to_string()],
      ..Default::default()
    };
    let publisher = publisher(&api, ExistingRelease::Fail);
    let record = publisher.create_release("1.2.3", "Release 1.2.3").unwrap();
    let err = publisher.upload_all(&record, &assets(), |_| {}).unwrap_err();

    match err {
      PublishError::PartialPublish { uploaded, missing, .. } => {
        assert_eq!(uploaded, vec!["tool-1.2.3"]);
        assert_eq!(missing, vec!["tool-1.2.3-1.x86_64.rpm", "tool_1.2.3_amd64.deb"]);
      }
      other => panic!("unexpected error: {:?}", other),
    }
    // deb never attempted, rpm attempted exactly once
    assert_eq!(api.uploads(), vec!["tool-1.2.3", "tool-1.2.3-1.x86_64.rpm"]);
  }

  #[test]
  fn test_configured_retry_recovers_transient_upload() {
    let api = FakeApi {
      flaky_uploads: RefCell::new(2),
      ..Default::default()
    };
    let publisher = ReleasePublisher::new(&api, ExistingRelease::Fail, RetryPolicy::default(), fast_retry(3));
    let record = publisher.create_release("1.2.3", "Release 1.2.3").unwrap();
    let done = publisher.upload_all(&record, &assets()[..1], |_| {}).unwrap();

    assert_eq!(done, vec!["tool-1.2.3"]);
    assert_eq!(api.uploads().len(), 3);
  }

  #[test]
  fn test_rejected_create_is_not_retried() {
    let api = FakeApi {
      reject_create: true,
      ..Default::default()
    };
    let publisher = ReleasePublisher::new(&api, ExistingRelease::Fail, fast_retry(3), RetryPolicy::default());
    assert!(publisher.create_release("1.2.3", "Release 1.2.3").is_err());
    assert_eq!(api.created(), 1);
  }
}
