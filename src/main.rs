mod cache;
mod cargo;
mod commands;
mod core;
mod pipeline;
mod release;
mod ui;

use clap::{Parser, Subcommand};
use crate::core::context::{PipelineEnv, ShipContext};
use crate::core::error::{ShipError, print_error};
use tracing_subscriber::EnvFilter;

/// Build, package and publish a Rust binary from a release tag
#[derive(Parser)]
#[command(name = "cargo")]
#[command(bin_name = "cargo")]
#[command(styles = get_styles())]
enum CargoCli {
  Ship(ShipCli),
}

#[derive(Parser)]
#[command(name = "ship")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct ShipCli {
  /// Verbose logging (same as RUST_LOG=cargo_ship=debug)
  #[arg(long, global = true)]
  debug: bool,

  #[command(subcommand)]
  command: Commands,
}

/// Inputs a CI runner provides for the triggering tag
#[derive(clap::Args)]
struct RefArgs {
  /// Triggering reference, e.g. refs/tags/1.2.3
  #[arg(long = "ref", env = "GITHUB_REF")]
  git_ref: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
  // ============================================================================
  // Release
  // ============================================================================
  /// Run the full release pipeline for a tag
  Run {
    #[command(flatten)]
    reference: RefArgs,
    /// API token with permission to create releases
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Repository as owner/name
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,
    /// API base URL [default: https://api.github.com]
    #[arg(long, env = "GITHUB_API_URL")]
    api_url: Option<String>,
    /// Runner OS label used in the cache key
    #[arg(long, env = "RUNNER_OS")]
    os: Option<String>,
    /// Skip toolchain cache restore and save
    #[arg(long)]
    no_cache: bool,
  },

  // ============================================================================
  // Inspection
  // ============================================================================
  /// Show the version, title and assets a run would publish
  Plan {
    #[command(flatten)]
    reference: RefArgs,
    /// Output plan in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Print the version a reference resolves to
  Version {
    /// Reference such as refs/tags/1.2.3
    reference: String,
  },

  /// Print the toolchain cache key for this workspace
  CacheKey {
    /// Runner OS label (default: host OS)
    #[arg(long, env = "RUNNER_OS")]
    os: Option<String>,
    /// Output key in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Check toolchain, packaging plugins and configuration
  Doctor {
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },
}

fn get_styles() -> clap::builder::Styles {
  let accent = anstyle::Color::Ansi(anstyle::AnsiColor::Cyan);
  clap::builder::Styles::styled()
    .usage(anstyle::Style::new().bold().underline().fg_color(Some(accent)))
    .header(anstyle::Style::new().bold().underline().fg_color(Some(accent)))
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(anstyle::Style::new().bold().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

/// Logs go to stderr so `--json` output on stdout stays parseable
fn init_tracing(debug: bool) {
  let filter = if debug {
    EnvFilter::new("cargo_ship=debug,info")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

fn main() {
  let CargoCli::Ship(cli) = CargoCli::parse();
  init_tracing(cli.debug);

  let workspace_root = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => handle_error(e.into()),
  };

  let result = match cli.command {
    Commands::Run {
      reference,
      token,
      repository,
      api_url,
      os,
      no_cache,
    } => {
      let env = PipelineEnv {
        git_ref: reference.git_ref,
        token,
        repository,
        api_url,
        os,
        ..Default::default()
      }
      .with_process_dirs();
      ShipContext::build(&workspace_root).and_then(|ctx| commands::run_pipeline(&ctx, &env, no_cache))
    }
    Commands::Plan { reference, json } => {
      let env = PipelineEnv {
        git_ref: reference.git_ref,
        ..Default::default()
      };
      ShipContext::build(&workspace_root).and_then(|ctx| commands::run_plan(&ctx, &env, json))
    }
    Commands::Version { reference } => commands::run_version(&reference),
    Commands::CacheKey { os, json } => {
      ShipContext::build(&workspace_root).and_then(|ctx| commands::run_cache_key(&ctx, os, json))
    }
    Commands::Doctor { json } => commands::run_doctor(json),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: ShipError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
