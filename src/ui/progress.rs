//! Progress indicators for the release pipeline
//!
//! Uses `linya` for a single allocation-free bar advanced on every transition

use crate::pipeline::{PipelineObserver, PipelineState};
use linya::{Bar, Progress};

/// Transitions a successful run goes through
pub const STAGE_STEPS: usize = 10;

/// Progress bar driven by pipeline transitions
pub struct StageProgress {
  progress: Progress,
  bar: Bar,
  position: usize,
}

impl StageProgress {
  /// Create a new progress bar for a pipeline run
  pub fn new(label: impl Into<String>) -> Self {
    let mut progress = Progress::new();
    let bar = progress.bar(STAGE_STEPS, label.into());
    Self {
      progress,
      bar,
      position: 0,
    }
  }

  /// Set progress to a specific value
  fn set(&mut self, pos: usize) {
    self.position = pos.min(STAGE_STEPS);
    self.progress.set_and_draw(&self.bar, self.position);
  }
}

/// Bar position reached once `state` is entered
pub fn step_of(state: PipelineState) -> Option<usize> {
  match state {
    PipelineState::Idle => Some(0),
    PipelineState::VersionResolved => Some(1),
    PipelineState::CacheRestored => Some(2),
    PipelineState::PluginsInstalled | PipelineState::PluginsSkipped => Some(3),
    PipelineState::Built => Some(4),
    PipelineState::Packaged => Some(5),
    PipelineState::ReleaseCreated => Some(6),
    PipelineState::AssetsUploaded(n) => Some(6 + n),
    PipelineState::Done => Some(STAGE_STEPS),
    PipelineState::Failed(_) => None,
  }
}

impl PipelineObserver for StageProgress {
  fn on_transition(&mut self, _from: PipelineState, to: PipelineState) {
    // a failed run leaves the bar where it stopped
    if let Some(step) = step_of(to) {
      self.set(step);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pipeline::stage::Stage;

  #[test]
  fn test_steps_cover_successful_run() {
    let run = [
      PipelineState::VersionResolved,
      PipelineState::CacheRestored,
      PipelineState::PluginsSkipped,
      PipelineState::Built,
      PipelineState::Packaged,
      PipelineState::ReleaseCreated,
      PipelineState::AssetsUploaded(1),
      PipelineState::AssetsUploaded(2),
      PipelineState::AssetsUploaded(3),
      PipelineState::Done,
    ];
    let steps: Vec<usize> = run.iter().filter_map(|s| step_of(*s)).collect();
    assert_eq!(steps, (1..=STAGE_STEPS).collect::<Vec<_>>());
    assert_eq!(step_of(PipelineState::Failed(Stage::Build)), None);
  }
}
