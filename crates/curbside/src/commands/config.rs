//! Config command - configuration management.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::style;

use curbside_config::CurbsideConfig;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show which config files are checked and their precedence
    Path,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./curbside.toml) instead of user config
        #[arg(long)]
        local: bool,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(ctx),
        ConfigCommand::Init { local } => cmd_init(local, ctx),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let config = &loaded.config;

    if ctx.json_output {
        let resolved = CurbsideConfig {
            cache: Some(config.cache()),
            session: Some(config.session()),
            logging: Some(config.logging()),
        };
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }

    println!("{}\n", style("# Curbside Configuration").bold());

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }

    let cache = config.cache();
    println!("Cache:");
    println!("  max_size:         {}", cache.max_size);
    println!("  default_ttl:      {}s", cache.default_ttl_secs);
    println!(
        "  cleanup:          {} (every {}s)",
        if cache.enable_cleanup_task { "on" } else { "off" },
        cache.cleanup_interval_secs
    );
    println!();

    let session = config.session();
    println!("Session:");
    println!("  timeout:          {}s", session.timeout_secs);
    println!("  warning_lead:     {}s", session.warning_lead_secs);
    println!("  activity_throttle: {}s", session.activity_throttle_secs);
    println!("  check_interval:   {}s", session.check_interval_secs);
    println!("  storage_key:      {}", session.storage_key);
    println!("  login_path:       {}", session.login_path);
    println!();

    if !loaded.warnings.is_empty() {
        println!("Warnings:");
        for w in &loaded.warnings {
            println!("  ⚠ {}", w);
        }
        println!();
    }

    if ctx.verbose {
        println!("---\nRaw config:\n");
        if let Ok(toml_str) = config.to_toml() {
            println!("{}", toml_str);
        }
    }

    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    let mut paths = Vec::new();
    if let Some(dir) = &ctx.config_dir {
        paths.push(dir.join("config.toml"));
    }
    paths.push(curbside_config::project_config_path(None));

    if ctx.json_output {
        let entries: Vec<_> = paths
            .iter()
            .map(|p| serde_json::json!({ "path": p.display().to_string(), "exists": p.is_file() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("Config file search order (later overrides earlier):\n");
    for path in &paths {
        let status = if path.is_file() {
            "✓ found"
        } else {
            "· not found"
        };
        println!("  {} {}", status, path.display());
    }
    println!();

    if !paths.iter().any(|p| p.is_file()) {
        println!("No config files found. Run 'curbside config init' to create one.");
    }

    Ok(())
}

fn cmd_init(local: bool, ctx: &Context) -> Result<()> {
    let path = if local {
        curbside_config::project_config_path(None)
    } else {
        ctx.require_config_dir()?.join("config.toml")
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    curbside_config::save_config(&CurbsideConfig::with_defaults(), &path)?;
    println!("Created {}", path.display());
    Ok(())
}
