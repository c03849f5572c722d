//! `settings` command

use crate::commands::args::{SettingsAction, SettingsArgs, SettingsUpdate};
use crate::settings::{LoadOutcome, PersistentSettings, SettingsStore};
use crate::utils::AppResult;

/// Apply command-line changes to a settings record
pub fn apply_update(settings: &mut PersistentSettings, update: &SettingsUpdate) {
    if update.enable {
        settings.enable_settings = true;
    }
    if update.disable {
        settings.enable_settings = false;
    }
    if let Some(use_max) = update.use_max_image_size {
        settings.custom_video_mode.use_max_image_size = use_max;
    }
    if let Some(value) = update.brightness {
        settings.brightness.value = value;
    }
    if let Some(auto_mode) = update.brightness_auto {
        settings.brightness.auto_mode = auto_mode;
    }
    if let Some(value) = update.frame_rate {
        settings.frame_rate.value = value;
    }
    if let Some(auto_mode) = update.frame_rate_auto {
        settings.frame_rate.auto_mode = auto_mode;
    }
}

/// Run a settings action against `store` and return the resulting record
pub fn run_action(store: &SettingsStore, action: &SettingsAction) -> AppResult<PersistentSettings> {
    match store.load() {
        LoadOutcome::Loaded => {}
        LoadOutcome::Missing => {
            println!("No settings file at {}, using defaults", store.path().display())
        }
        LoadOutcome::Invalid(reason) => {
            println!("Ignoring unreadable settings file: {}", reason)
        }
    }

    match action {
        SettingsAction::Show => {}
        SettingsAction::Set(update) => {
            store.update(|settings| apply_update(settings, update));
            store.save()?;
            tracing::info!("Saved settings to {:?}", store.path());
        }
        SettingsAction::Reset => {
            store.reset();
            store.save()?;
            tracing::info!("Reset settings in {:?}", store.path());
        }
    }

    Ok(store.snapshot())
}

/// Entry point for `camstash settings`
pub fn settings(args: &SettingsArgs) -> AppResult<PersistentSettings> {
    let owned;
    let store = match &args.file {
        Some(path) => {
            owned = SettingsStore::new(path.clone());
            &owned
        }
        None => SettingsStore::instance(),
    };

    let settings = run_action(store, &args.action)?;
    print_settings(&settings);
    Ok(settings)
}

fn print_settings(settings: &PersistentSettings) {
    println!("Settings version: {}", settings.version());
    println!("Enabled: {}", settings.enable_settings);
    println!(
        "Use max image size: {}",
        settings.custom_video_mode.use_max_image_size
    );
    println!(
        "Brightness: {} (auto: {}, absolute: {})",
        settings.brightness.value, settings.brightness.auto_mode, settings.brightness.abs_control
    );
    println!(
        "Frame rate: {} (auto: {}, absolute: {})",
        settings.frame_rate.value, settings.frame_rate.auto_mode, settings.frame_rate.abs_control
    );
}
