#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod ui;

use std::{env, path::PathBuf};

use anyhow::Result;
use gpui::Application;
use pose_cam::{
    Config, PoseError,
    config::{CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE},
};

fn main() -> Result<()> {
    env_logger::init();

    let config_path = env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = Config::load_or_default(&config_path).map_err(PoseError::Config)?;
    log::info!(
        "camera {} / model {} / overlay {:?}",
        config.camera_index,
        config.model_path.display(),
        config.overlay
    );

    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(move |app| {
            gpui_component::init(app);

            if let Err(err) = ui::launch_ui(app, config.clone()) {
                log::error!("failed to launch ui: {err:?}");
            }
        });

    Ok(())
}
