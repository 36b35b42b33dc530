/*!
 * Fieldtrack Init Command - First-Run Onboarding Wizard
 *
 * This module provides an interactive setup wizard that:
 * 1. Checks that this host can reach a network
 * 2. Interviews the operator about the tracking profile and backend
 * 3. Picks where samples come from on this host
 * 4. Persists configuration to ~/.fieldtrack/fieldtrack.toml
 */

use crate::config::{PermissionMode, SourceConfig, TrackerConfig};
use crate::reachability::{InterfaceProbe, ReachabilityProbe};
use anyhow::Result;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use fieldtrack_core_interface::Accuracy;
use std::path::{Path, PathBuf};

/// Run the interactive initialization wizard
pub fn run_init_wizard() -> Result<()> {
    print_welcome();

    // 1. Check for existing configuration
    let config_path = TrackerConfig::default_path()?;
    if config_path.exists()
        && !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Existing configuration found. Overwrite?")
            .default(false)
            .interact()?
    {
        println!("\n{}", style("Configuration unchanged.").cyan());
        return Ok(());
    }

    // 2. Reachability check (informational only)
    println!("\n{}", style("Checking network interfaces...").cyan());
    if InterfaceProbe::new().is_connected() {
        println!("  {} Routable network address found", style("✓").green().bold());
    } else {
        println!(
            "  {} No routable address; samples will be skipped until the host is online",
            style("Warning:").yellow()
        );
    }

    // 3. Tracking profile
    println!("\n{}", style("Tracking Profile").cyan().bold());
    let profiles = &[
        "Field staff (high accuracy, every 5 s)",
        "Vehicle fleet (best accuracy, only after 50 m of movement)",
        "Battery saver (low accuracy, every minute)",
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("How will this device be tracked?")
        .default(0)
        .items(profiles)
        .interact()?;

    let mut config = match selection {
        1 => create_fleet_config(),
        2 => create_battery_saver_config(),
        _ => create_field_staff_config(),
    };

    // 4. Backend
    println!("\n{}", style("Telemetry Backend").cyan().bold());
    config.base_url = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Backend base URL")
        .default(config.base_url.clone())
        .validate_with(|input: &String| -> std::result::Result<(), String> {
            reqwest::Url::parse(input)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()?;

    let token: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Bearer token (leave empty for none)")
        .allow_empty(true)
        .interact_text()?;
    config.auth_token = normalize_token(&token);

    // 5. Location source
    println!("\n{}", style("Location Source").cyan().bold());
    let sources = &["Fixed position", "Replay a recorded route (JSON lines)"];
    let source = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Where do samples come from on this host?")
        .default(0)
        .items(sources)
        .interact()?;

    config.source = if source == 1 {
        let path: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Route file")
            .interact_text()?;
        SourceConfig::Replay {
            path: PathBuf::from(path),
        }
    } else {
        let latitude: f64 = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Latitude")
            .validate_with(|v: &f64| check_range(*v, 90.0))
            .interact_text()?;
        let longitude: f64 = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Longitude")
            .validate_with(|v: &f64| check_range(*v, 180.0))
            .interact_text()?;
        SourceConfig::Static {
            latitude,
            longitude,
            accuracy: 10.0,
            speed: 0.0,
        }
    };

    // 6. Consent
    let unattended = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Is this host unattended (grant location permissions automatically)?")
        .default(false)
        .interact()?;
    config.permissions = if unattended {
        PermissionMode::Granted
    } else {
        PermissionMode::Prompt
    };

    // 7. Persistence
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Generated configuration is invalid: {}", e))?;
    config
        .to_file(&config_path)
        .map_err(|e| anyhow::anyhow!("Failed to save configuration: {}", e))?;

    print_summary(&config_path, &config);

    Ok(())
}

/// Print welcome banner
fn print_welcome() {
    println!();
    println!(
        "{}",
        style("╔════════════════════════════════════════╗").cyan()
    );
    println!(
        "{}",
        style("║    📍 Welcome to Fieldtrack Setup      ║").cyan()
    );
    println!(
        "{}",
        style("╚════════════════════════════════════════╝").cyan()
    );
    println!();
    println!("This wizard will create a tracking configuration for this host.");
}

fn check_range(value: f64, limit: f64) -> std::result::Result<(), String> {
    if (-limit..=limit).contains(&value) {
        Ok(())
    } else {
        Err(format!("must be between -{} and {}", limit, limit))
    }
}

fn normalize_token(input: &str) -> Option<String> {
    let token = input.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Frequent high-accuracy fixes for people on foot
fn create_field_staff_config() -> TrackerConfig {
    TrackerConfig {
        accuracy: Accuracy::High,
        min_interval_ms: 5_000,
        distance_interval_m: 0.0,
        ..Default::default()
    }
}

/// Movement-gated fixes for vehicles that idle for long stretches
fn create_fleet_config() -> TrackerConfig {
    TrackerConfig {
        accuracy: Accuracy::Best,
        min_interval_ms: 5_000,
        distance_interval_m: 50.0,
        ..Default::default()
    }
}

fn create_battery_saver_config() -> TrackerConfig {
    TrackerConfig {
        accuracy: Accuracy::Low,
        min_interval_ms: 60_000,
        distance_interval_m: 0.0,
        ..Default::default()
    }
}

/// Print configuration summary
fn print_summary(config_path: &Path, config: &TrackerConfig) {
    println!();
    println!(
        "{}",
        style("╔════════════════════════════════════════╗").green()
    );
    println!(
        "{}",
        style("║    ✅ Configuration Saved              ║").green()
    );
    println!(
        "{}",
        style("╚════════════════════════════════════════╝").green()
    );
    println!();
    println!("  Location: {}", style(config_path.display()).cyan());
    println!();
    println!("  {}", style("Configuration Summary:").bold());
    println!("  ─────────────────────────");
    println!("  Accuracy:         {}", style(config.accuracy).yellow());
    println!(
        "  Interval:         {}",
        style(format!("{} ms", config.min_interval_ms)).yellow()
    );
    println!(
        "  Distance filter:  {}",
        style(format!("{} m", config.distance_interval_m)).yellow()
    );
    println!("  Backend:          {}", style(&config.base_url).yellow());
    println!(
        "  Permissions:      {}",
        style(format!("{:?}", config.permissions)).yellow()
    );
    println!();
    println!("  {}", style("Next Steps:").bold());
    println!(
        "  1. Review the configuration: cat {}",
        config_path.display()
    );
    println!("  2. Run 'fieldtrack track' to start reporting");
    println!();
}
