use crate::core::error::ShipResult;
use cargo_metadata::{MetadataCommand, Package};
use std::path::{Path, PathBuf};

/// Root package facts used to fill gaps in ship.toml
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageDefaults {
  pub name: Option<String>,
  pub maintainer: Option<String>,
  pub description: Option<String>,
  pub manifest_path: Option<PathBuf>,
}

/// Workspace introspection using cargo_metadata
#[derive(Clone)]
pub struct WorkspaceMetadata {
  metadata: cargo_metadata::Metadata,
}

impl WorkspaceMetadata {
  pub fn load(workspace_root: &Path) -> ShipResult<Self> {
    let metadata = MetadataCommand::new()
      .manifest_path(workspace_root.join("Cargo.toml"))
      .no_deps()
      .exec()?;
    Ok(Self { metadata })
  }

  /// Root package, or the only workspace member when there is no root package
  pub fn root_package(&self) -> Option<&Package> {
    self.metadata.root_package().or_else(|| {
      let members = self.metadata.workspace_packages();
      match members.as_slice() {
        [only] => Some(*only),
        _ => None,
      }
    })
  }

  pub fn get_package(&self, name: &str) -> Option<&Package> {
    self
      .metadata
      .workspace_packages()
      .into_iter()
      .find(|pkg| pkg.name.as_str() == name)
  }

  pub fn workspace_root(&self) -> &Path {
    self.metadata.workspace_root.as_std_path()
  }

  /// Cargo's target directory, honouring `CARGO_TARGET_DIR` and `build.target-dir`
  pub fn target_directory(&self) -> &Path {
    self.metadata.target_directory.as_std_path()
  }

  /// Defaults for the package named `name`, or for the root package
  pub fn package_defaults(&self, name: Option<&str>) -> PackageDefaults {
    let package = match name {
      Some(name) => self.get_package(name).or_else(|| self.root_package()),
      None => self.root_package(),
    };
    let Some(package) = package else {
      return PackageDefaults::default();
    };

    PackageDefaults {
      name: Some(package.name.to_string()),
      maintainer: package.authors.first().cloned(),
      description: package.description.clone(),
      manifest_path: Some(package.manifest_path.clone().into_std_path_buf()),
    }
  }
}
