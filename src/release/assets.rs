//! Deterministic artifact naming and on-disk layout
//!
//! Every name here is a pure function of the tool name, the resolved tag and the
//! architecture. Two runs for the same tag always agree.

use crate::release::version::ReleaseTag;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Content type used for every uploaded asset
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Package architecture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Architecture {
  #[default]
  #[serde(rename = "x86_64")]
  X86_64,
  #[serde(rename = "aarch64")]
  Aarch64,
}

impl Architecture {
  /// Architecture label used in RPM file names
  pub fn rpm_arch(self) -> &'static str {
    match self {
      Architecture::X86_64 => "x86_64",
      Architecture::Aarch64 => "aarch64",
    }
  }

  /// Architecture label used in Debian file names
  pub fn deb_arch(self) -> &'static str {
    match self {
      Architecture::X86_64 => "amd64",
      Architecture::Aarch64 => "arm64",
    }
  }
}

/// Native package formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageFormat {
  Deb,
  Rpm,
}

impl fmt::Display for PackageFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PackageFormat::Deb => write!(f, "deb"),
      PackageFormat::Rpm => write!(f, "rpm"),
    }
  }
}

/// Kinds of artifact attached to a release, in upload order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
  Binary,
  Package(PackageFormat),
}

impl ArtifactKind {
  /// Fixed upload order: binary, rpm, deb
  pub const UPLOAD_ORDER: [ArtifactKind; 3] = [
    ArtifactKind::Binary,
    ArtifactKind::Package(PackageFormat::Rpm),
    ArtifactKind::Package(PackageFormat::Deb),
  ];
}

/// Asset name for an artifact kind
pub fn asset_name(tool: &str, tag: &ReleaseTag, arch: Architecture, kind: ArtifactKind) -> String {
  let version = tag.version();
  match kind {
    ArtifactKind::Binary => format!("{}-{}", tool, version),
    ArtifactKind::Package(PackageFormat::Rpm) => format!("{}-{}-1.{}.rpm", tool, version, arch.rpm_arch()),
    ArtifactKind::Package(PackageFormat::Deb) => format!("{}_{}_{}.deb", tool, version, arch.deb_arch()),
  }
}

/// Release title from a `{version}` template
pub fn release_title(template: &str, tag: &ReleaseTag) -> String {
  template.replace("{version}", tag.version())
}

/// Where every artifact of one run lives on disk, and what it is called remotely
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseLayout {
  pub binary_path: PathBuf,
  pub binary_name: String,
  pub deb_path: PathBuf,
  pub deb_name: String,
  pub rpm_path: PathBuf,
  pub rpm_name: String,
}

impl ReleaseLayout {
  /// Compute the layout for a tag
  ///
  /// `target` is the explicit target triple, if any; cargo then nests its output
  /// one level deeper.
  pub fn new(target_dir: &Path, target: Option<&str>, tool: &str, tag: &ReleaseTag, arch: Architecture) -> Self {
    let profile_dir = match target {
      Some(triple) => target_dir.join(triple).join("release"),
      None => target_dir.join("release"),
    };
    let binary_file = if cfg!(windows) {
      format!("{}.exe", tool)
    } else {
      tool.to_string()
    };

    let deb_name = asset_name(tool, tag, arch, ArtifactKind::Package(PackageFormat::Deb));
    let rpm_name = asset_name(tool, tag, arch, ArtifactKind::Package(PackageFormat::Rpm));

    Self {
      binary_path: profile_dir.join(binary_file),
      binary_name: asset_name(tool, tag, arch, ArtifactKind::Binary),
      deb_path: target_dir.join("debian").join(&deb_name),
      deb_name,
      rpm_path: target_dir.join("generate-rpm").join(&rpm_name),
      rpm_name,
    }
  }

  /// Path and asset name for a kind
  pub fn entry(&self, kind: ArtifactKind) -> (&Path, &str) {
    match kind {
      ArtifactKind::Binary => (&self.binary_path, &self.binary_name),
      ArtifactKind::Package(PackageFormat::Deb) => (&self.deb_path, &self.deb_name),
      ArtifactKind::Package(PackageFormat::Rpm) => (&self.rpm_path, &self.rpm_name),
    }
  }
}

/// Output of the build stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildArtifact {
  pub binary_path: PathBuf,
  pub target_triple: String,
}

/// Output of the packaging stage, one per format
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageArtifact {
  pub format: PackageFormat,
  pub path: PathBuf,
  pub asset_name: String,
}

/// One file to attach to the release
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadAsset {
  pub path: PathBuf,
  pub name: String,
  pub content_type: String,
}

/// Upload list for a run, in the fixed order binary, rpm, deb
pub fn upload_assets(build: &BuildArtifact, layout: &ReleaseLayout, packages: &[PackageArtifact]) -> Vec<UploadAsset> {
  ArtifactKind::UPLOAD_ORDER
    .iter()
    .filter_map(|kind| match kind {
      ArtifactKind::Binary => Some(UploadAsset {
        path: build.binary_path.clone(),
        name: layout.binary_name.clone(),
        content_type: OCTET_STREAM.to_string(),
      }),
      ArtifactKind::Package(format) => packages.iter().find(|p| p.format == *format).map(|p| UploadAsset {
        path: p.path.clone(),
        name: p.asset_name.clone(),
        content_type: OCTET_STREAM.to_string(),
      }),
    })
    .collect()
}
