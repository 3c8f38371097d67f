//! Debian and RPM packaging via `cargo deb` and `cargo generate-rpm`
//!
//! Both plugins read their static metadata from the tool's Cargo.toml. The packager
//! writes that metadata first (lossless, unrelated keys untouched), then runs the
//! plugins against the already built binary. The version and output path of each
//! package are always passed on the command line so the manifest's own version
//! never leaks into a package name.

use crate::cargo::runner::{CommandRunner, Invocation};
use crate::core::error::{PackageError, ShipResult};
use crate::release::assets::{Architecture, BuildArtifact, PackageArtifact, PackageFormat, ReleaseLayout};
use crate::release::version::ReleaseTag;
use std::fs;
use std::path::{Path, PathBuf};
use toml_edit::{Array, DocumentMut, InlineTable, Item, Table, value};

const STDERR_TAIL: usize = 40;

/// Static package metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
  pub tool: String,
  pub maintainer: Option<String>,
  pub description: Option<String>,
  pub architecture: Architecture,
  /// Cargo.toml of the packaged crate
  pub manifest: PathBuf,
  pub target: Option<String>,
}

pub struct Packager<'a> {
  runner: &'a dyn CommandRunner,
  spec: PackageSpec,
}

impl<'a> Packager<'a> {
  pub fn new(runner: &'a dyn CommandRunner, spec: PackageSpec) -> Self {
    Self { runner, spec }
  }

  fn crate_dir(&self) -> PathBuf {
    self
      .spec
      .manifest
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_else(|| PathBuf::from("."))
  }

  /// Build the deb, then the rpm
  pub fn package(
    &self,
    artifact: &BuildArtifact,
    tag: &ReleaseTag,
    layout: &ReleaseLayout,
  ) -> ShipResult<Vec<PackageArtifact>> {
    if sync_manifest(&self.spec.manifest, &self.spec)? {
      tracing::info!(manifest = %self.spec.manifest.display(), "package metadata written");
    }

    tracing::debug!(binary = %artifact.binary_path.display(), "packaging");
    let version = package_version(tag);

    let deb = self.run_format(PackageFormat::Deb, &self.deb_invocation(&version, &layout.deb_path))?;
    let deb = self.expect_output(deb, &layout.deb_path, &layout.deb_name)?;

    let rpm = self.run_format(PackageFormat::Rpm, &self.rpm_invocation(&version, &layout.rpm_path))?;
    let rpm = self.expect_output(rpm, &layout.rpm_path, &layout.rpm_name)?;

    Ok(vec![deb, rpm])
  }

  pub fn deb_invocation(&self, version: &str, output: &Path) -> Invocation {
    let mut inv = Invocation::new("cargo", &self.crate_dir()).args([
      "deb",
      "--no-build",
      "--deb-version",
      version,
      "--output",
    ]);
    inv = inv.arg(output.to_string_lossy());
    if let Some(target) = &self.spec.target {
      inv = inv.args(["--target", target.as_str()]);
    }
    inv
  }

  pub fn rpm_invocation(&self, version: &str, output: &Path) -> Invocation {
    let mut inv = Invocation::new("cargo", &self.crate_dir())
      .args(["generate-rpm", "--arch", self.spec.architecture.rpm_arch()])
      .arg("--set-metadata")
      .arg(format!("version = \"{}\"", version))
      .arg("--output")
      .arg(output.to_string_lossy());
    if let Some(target) = &self.spec.target {
      inv = inv.args(["--target", target.as_str()]);
    }
    inv
  }

  fn run_format(&self, format: PackageFormat, inv: &Invocation) -> ShipResult<PackageFormat> {
    tracing::info!(command = %inv, "packaging {}", format);
    let output = self.runner.run(inv).map_err(|e| PackageError::Spawn {
      format: format.to_string(),
      reason: e.to_string(),
    })?;

    if !output.success {
      return Err(
        PackageError::Failed {
          format: format.to_string(),
          code: output.code,
          stderr: output.stderr_tail(STDERR_TAIL),
        }
        .into(),
      );
    }
    Ok(format)
  }

  fn expect_output(&self, format: PackageFormat, path: &Path, name: &str) -> ShipResult<PackageArtifact> {
    if !path.is_file() {
      return Err(
        PackageError::MissingOutput {
          format: format.to_string(),
          path: path.to_path_buf(),
        }
        .into(),
      );
    }
    tracing::info!(path = %path.display(), "{} package ready", format);
    Ok(PackageArtifact {
      format,
      path: path.to_path_buf(),
      asset_name: name.to_string(),
    })
  }
}

/// Version written into the packages; a leading `v` is dropped since neither dpkg
/// nor rpm accept it
pub fn package_version(tag: &ReleaseTag) -> String {
  let v = tag.version();
  match v.strip_prefix('v') {
    Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest.to_string(),
    _ => v.to_string(),
  }
}

/// Write deb and rpm metadata into `manifest`; returns whether the file changed
pub fn sync_manifest(manifest: &Path, spec: &PackageSpec) -> Result<bool, PackageError> {
  let manifest_err = |reason: String| PackageError::Manifest {
    path: manifest.to_path_buf(),
    reason,
  };

  let content = fs::read_to_string(manifest).map_err(|e| manifest_err(e.to_string()))?;
  let mut doc: DocumentMut = content.parse().map_err(|e: toml_edit::TomlError| manifest_err(e.to_string()))?;

  let package = doc
    .get_mut("package")
    .and_then(Item::as_table_mut)
    .ok_or_else(|| manifest_err("no [package] section".to_string()))?;

  let metadata = subtable(package, "metadata").ok_or_else(|| manifest_err("package.metadata is not a table".to_string()))?;
  let source = format!("target/release/{}", spec.tool);

  {
    let deb = subtable(metadata, "deb").ok_or_else(|| manifest_err("package.metadata.deb is not a table".to_string()))?;
    if let Some(maintainer) = &spec.maintainer {
      deb["maintainer"] = value(maintainer.as_str());
    }
    if let Some(description) = &spec.description {
      deb["extended-description"] = value(description.as_str());
    }
    let mut entry = Array::new();
    entry.push(source.as_str());
    entry.push("usr/bin/");
    entry.push("755");
    let mut assets = Array::new();
    assets.push(entry);
    deb["assets"] = value(assets);
  }

  {
    let rpm = subtable(metadata, "generate-rpm")
      .ok_or_else(|| manifest_err("package.metadata.generate-rpm is not a table".to_string()))?;
    let mut entry = InlineTable::new();
    entry.insert("source", source.as_str().into());
    entry.insert("dest", format!("/usr/bin/{}", spec.tool).into());
    entry.insert("mode", "755".into());
    let mut assets = Array::new();
    assets.push(entry);
    rpm["assets"] = value(assets);
  }

  let updated = doc.to_string();
  if updated == content {
    return Ok(false);
  }
  fs::write(manifest, updated).map_err(|e| manifest_err(e.to_string()))?;
  Ok(true)
}

/// Get or create `parent.<key>` as an implicit table
fn subtable<'t>(parent: &'t mut Table, key: &str) -> Option<&'t mut Table> {
  if !parent.contains_key(key) {
    let mut table = Table::new();
    table.set_implicit(true);
    parent.insert(key, Item::Table(table));
  }
  parent.get_mut(key).and_then(Item::as_table_mut)
}
