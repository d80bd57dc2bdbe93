use super::Context;
use crate::output::print_json;
use clap::Subcommand;
use speclift_core::config::WarnLevel;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,

    /// Validate the config for common mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(ctx: &Context, subcmd: ConfigSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(ctx),
        ConfigSubcommand::Validate => validate(ctx),
    }
}

fn show(ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.config()?;
    if ctx.json {
        return print_json(&config);
    }
    println!("Project:   {}", config.project.name);
    println!("State dir: {}", config.state_root(&ctx.root).display());
    println!("Pipeline:");
    for stage in &config.pipeline.stages {
        println!("  {stage}");
    }
    Ok(())
}

fn validate(ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.config()?;
    let warnings = config.validate();
    let errors = warnings
        .iter()
        .filter(|w| w.level == WarnLevel::Error)
        .count();

    if ctx.json {
        print_json(&warnings)?;
    } else if warnings.is_empty() {
        println!("config ok");
    } else {
        for w in &warnings {
            let tag = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("{tag}: {}", w.message);
        }
    }

    if errors > 0 {
        anyhow::bail!("{errors} config error(s)");
    }
    Ok(())
}
