pub mod diff;
pub mod list;
pub mod synth;
pub mod validate;

use anyhow::Context;
use cdk_workshop_config::Settings;
use cdk_workshop_stack::{App, Environment, StackProps, workshop};
use colored::Colorize;
use std::path::PathBuf;

/// Stack properties derived from resolved settings
pub fn stack_props(settings: &Settings) -> StackProps {
    let env = if settings.account.is_some() || settings.region.is_some() {
        Some(Environment::new(
            settings.account.clone(),
            settings.region.clone(),
        ))
    } else {
        None
    };

    StackProps {
        stack_name: settings.stack_name.clone(),
        env,
        description: settings.description.clone(),
        tags: settings.tags.clone(),
        termination_protection: settings.termination_protection,
    }
}

/// Resolve settings and build the app
pub fn load_app() -> anyhow::Result<(Settings, App)> {
    let settings = cdk_workshop_config::resolve().context("Failed to load cdk.json")?;
    let app = workshop::app(stack_props(&settings)).context("Failed to define the stack")?;
    Ok((settings, app))
}

/// Output directory: CLI flag first, then settings
pub fn output_dir(settings: &Settings, output: Option<PathBuf>) -> PathBuf {
    output.unwrap_or_else(|| settings.output_dir.clone())
}

/// Show which config file was loaded
pub fn print_config_source(settings: &Settings) {
    match &settings.source {
        Some(path) => eprintln!("📄 Config: {}", path.display().to_string().cyan()),
        None => eprintln!("{}", "📄 No cdk.json found, using defaults".dimmed()),
    }
}
