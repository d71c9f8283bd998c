//! TF-012: CLI subcommands: init, validate, plan, emit, schema, completions.

use crate::core::types::{Manifest, ResourceKind, TopologyConfig};
use crate::core::{emitter, parser};
use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    name = "topoforge",
    version,
    about = "Three-tier cloud topology generator: one config in, an ordered resource manifest out"
)]
pub struct Cli {
    /// Debug logging on stderr (overrides TOPOFORGE_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Starter configuration for `init`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    /// Two availability zones, load-balanced frontend and backend
    WebApp,
    /// One availability zone, one instance per tier
    SingleAz,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter topology.yaml
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Starter layout
        #[arg(long, value_enum, default_value_t = Profile::WebApp)]
        profile: Profile,
    },

    /// Validate topology.yaml without building anything
    Validate {
        /// Path to topology.yaml
        #[arg(short, long, default_value = "topology.yaml")]
        file: PathBuf,
    },

    /// Show the ordered resource declarations
    Plan {
        /// Path to topology.yaml
        #[arg(short, long, default_value = "topology.yaml")]
        file: PathBuf,

        /// Only show one resource kind (e.g., subnet, instance)
        #[arg(short, long)]
        kind: Option<ResourceKind>,
    },

    /// Render the full manifest
    Emit {
        /// Path to topology.yaml
        #[arg(short, long, default_value = "topology.yaml")]
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Yaml)]
        format: Format,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the JSON Schema of topology.yaml
    Schema,

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init { path, profile } => cmd_init(&path, profile),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Plan { file, kind } => cmd_plan(&file, kind),
        Commands::Emit {
            file,
            format,
            output,
        } => cmd_emit(&file, format, output.as_deref()),
        Commands::Schema => {
            println!("{}", schema_json()?);
            Ok(())
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "topoforge", &mut std::io::stdout());
            Ok(())
        }
    }
}

const WEB_APP_TEMPLATE: &str = r#"version: "1.0"
project:
  name: my-web-app
  environment: production

params:
  owner: platform

tags:
  Project: "{{project.name}}"
  Environment: "{{project.environment}}"
  Owner: "{{params.owner}}"

network:
  cidr_block: 10.0.0.0/16
  availability_zones: [ap-southeast-1a, ap-southeast-1b]
  public_subnets: [10.0.1.0/24, 10.0.2.0/24]
  private_subnets: [10.0.10.0/24, 10.0.11.0/24]

compute:
  key_name: my-ssh-key

frontend:
  instance_type: t2.micro
  ami: ami-0c55b159cbfafe1f0

backend:
  instance_type: t2.micro
  ami: ami-0c55b159cbfafe1f0
  port: 3000
  health_check_path: /health

database:
  instance_type: t2.micro
  ami: ami-0c55b159cbfafe1f0
"#;

const SINGLE_AZ_TEMPLATE: &str = r#"version: "1.0"
project:
  name: my-app
  environment: dev

tags:
  Environment: "{{project.environment}}"
  ManagedBy: topoforge

network:
  cidr_block: 10.0.0.0/16
  availability_zones: [ap-south-1a]
  public_subnets: [10.0.1.0/24]
  private_subnets: [10.0.2.0/24]

compute:
  key_name: your-key-pair-name

frontend:
  instance_type: t2.micro
  ami: ami-0f5ee92e2d63afc18

backend:
  instance_type: t2.micro
  ami: ami-0f5ee92e2d63afc18

database:
  instance_type: t2.micro
  ami: ami-0f5ee92e2d63afc18
"#;

fn template(profile: Profile) -> &'static str {
    match profile {
        Profile::WebApp => WEB_APP_TEMPLATE,
        Profile::SingleAz => SINGLE_AZ_TEMPLATE,
    }
}

fn cmd_init(path: &Path, profile: Profile) -> Result<()> {
    let config_path = path.join("topology.yaml");
    if config_path.exists() {
        bail!("{} already exists", config_path.display());
    }
    std::fs::create_dir_all(path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    std::fs::write(&config_path, template(profile))
        .with_context(|| format!("cannot write {}", config_path.display()))?;

    info!(path = %config_path.display(), ?profile, "initialized");
    println!("Initialized topoforge project at {}", path.display());
    println!("  Created: {}", config_path.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<()> {
    let config = parser::parse_config_file(file)?;
    let errors = parser::validate_config(&config);

    if errors.is_empty() {
        println!(
            "OK: {} ({}, {} availability zone(s))",
            config.project.name,
            config.project.environment,
            config.network.availability_zones.len()
        );
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        bail!("{} validation error(s)", errors.len())
    }
}

/// Parse, validate, build, and emit a config file.
fn load_manifest(file: &Path) -> Result<Manifest> {
    let config = parser::load_config_file(file)
        .with_context(|| format!("invalid configuration {}", file.display()))?;
    let manifest = emitter::generate(&config)?;
    debug!(file = %file.display(), fingerprint = %manifest.fingerprint, "loaded");
    Ok(manifest)
}

fn cmd_plan(file: &Path, kind: Option<ResourceKind>) -> Result<()> {
    let manifest = load_manifest(file)?;
    print!("{}", render_plan(&manifest, kind));
    Ok(())
}

/// Plan text: one line per declaration, then per-kind totals.
fn render_plan(manifest: &Manifest, kind: Option<ResourceKind>) -> String {
    let mut out = String::new();
    let shown: Vec<_> = manifest
        .declarations
        .iter()
        .filter(|d| kind.is_none_or(|k| d.kind == k))
        .collect();

    let _ = writeln!(
        out,
        "Planning: {} ({}), {} resources",
        manifest.name,
        manifest.environment,
        shown.len()
    );
    let _ = writeln!(out);
    for decl in &shown {
        let _ = writeln!(out, "  + {}", emitter::describe_declaration(decl));
    }
    let _ = writeln!(out);

    let totals: Vec<String> = manifest
        .summary
        .iter()
        .filter(|(k, _)| kind.is_none_or(|want| **k == want))
        .map(|(k, n)| format!("{}={}", k, n))
        .collect();
    let _ = writeln!(out, "Plan: {} to add. {}", shown.len(), totals.join(" "));
    let _ = writeln!(out, "Fingerprint: {}", manifest.fingerprint);
    out
}

fn cmd_emit(file: &Path, format: Format, output: Option<&Path>) -> Result<()> {
    let manifest = load_manifest(file)?;
    let rendered = match format {
        Format::Yaml => emitter::render_yaml(&manifest)?,
        Format::Json => emitter::render_json(&manifest)?,
    };

    match output {
        Some(path) => {
            write_atomic(path, &rendered)?;
            info!(path = %path.display(), declarations = manifest.declarations.len(), "manifest written");
            eprintln!(
                "Wrote {} declarations to {}",
                manifest.declarations.len(),
                path.display()
            );
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

/// Write a file atomically (write to temp, then rename).
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    let written = std::fs::write(&tmp_path, content)
        .with_context(|| format!("cannot write {}", tmp_path.display()))
        .and_then(|()| {
            std::fs::rename(&tmp_path, path).with_context(|| {
                format!("cannot rename {} to {}", tmp_path.display(), path.display())
            })
        });
    if written.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    written
}

fn schema_json() -> Result<String> {
    let schema = schemars::schema_for!(TopologyConfig);
    Ok(serde_json::to_string_pretty(&schema)?)
}
