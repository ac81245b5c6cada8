pub mod args;

mod app;
mod autostart;
mod endpoints;
mod errors;
mod logging;
mod panic_handler;
mod platform;
mod reconcile;
mod selection;
mod settings;
mod worker;

use std::{path::Path, sync::mpsc};

use color_eyre::eyre::{bail, Result};
use serde::Serialize;
use tracing::*;

use app::App;
use args::{
    AutostartAction, ListSubcommand, PinSubcommand, RunSubcommand, SubCommands, TopLevelCmd,
    UnpinSubcommand,
};
use autostart::Autostart;
use platform::{AudioPlatform, Direction};
use selection::DeviceListing;

pub use panic_handler::initialize_panic_handler;

#[cfg(target_os = "windows")]
pub fn run(args: TopLevelCmd) -> Result<()> {
    run_with(platform::CoreAudio, args)
}

#[cfg(not(target_os = "windows"))]
pub fn run(_args: TopLevelCmd) -> Result<()> {
    bail!("{} only supports Windows", autostart::APP_NAME)
}

#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn run_with<P>(platform: P, args: TopLevelCmd) -> Result<()>
where
    P: AudioPlatform + Clone + Send + 'static,
{
    let config_path = match args.config {
        Some(path) => path,
        None => settings::default_config_path()?,
    };
    let log_dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    let log_level = settings::Settings::load(&config_path)?.get_log_level();
    let _log_guard = logging::initialize_logging(&log_dir, log_level)?;
    debug!("Using settings at {}", config_path.display());

    let mut app = App::build(platform, config_path)?;

    match args
        .subcommand
        .unwrap_or(SubCommands::Run(RunSubcommand {}))
    {
        SubCommands::List(cmd) => print_devices(&app, &cmd)?,
        SubCommands::Pin(cmd) => pin(&mut app, cmd)?,
        SubCommands::Unpin(cmd) => unpin(&mut app, &cmd)?,
        SubCommands::AutoSwitch(cmd) => {
            app.set_auto_switch(cmd.state.enabled())?;
            println!("Auto switch is now {:?}", cmd.state);
        }
        SubCommands::Autostart(cmd) => {
            let autostart = Autostart::for_current_exe()?;
            match cmd.action {
                AutostartAction::Enable => autostart.set_enabled(true)?,
                AutostartAction::Disable => autostart.set_enabled(false)?,
                AutostartAction::Status => (),
            }
            app.mark_autostart_asked()?;
            let state = if autostart.is_enabled()? { "enabled" } else { "disabled" };
            println!("Autostart is {state}");
        }
        SubCommands::Run(_) => run_until_ctrl_c(&mut app)?,
    }

    Ok(())
}

#[derive(Serialize)]
struct DeviceLists {
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<Vec<DeviceListing>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    input: Option<Vec<DeviceListing>>,
}

fn print_devices<P>(app: &App<P>, cmd: &ListSubcommand) -> Result<()>
where
    P: AudioPlatform + Clone + Send + 'static,
{
    let listing_for = |wanted: bool, direction| -> Result<Option<Vec<DeviceListing>>> {
        Ok(if wanted {
            Some(app.device_listing(direction)?)
        } else {
            None
        })
    };
    let lists = DeviceLists {
        output: listing_for(cmd.wants_playback(), Direction::Render)?,
        input: listing_for(cmd.wants_recording(), Direction::Capture)?,
    };

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&lists)?);
        return Ok(());
    }

    for (direction, devices) in [
        (Direction::Render, &lists.output),
        (Direction::Capture, &lists.input),
    ] {
        let Some(devices) = devices else { continue };
        println!("{direction} devices:");
        if devices.is_empty() {
            println!("  (none active)");
        }
        for device in devices {
            let default = if device.is_default { '*' } else { ' ' };
            let pinned = if device.is_chosen { "[pinned] " } else { "" };
            println!("{default} {pinned}{}", device.name);
            println!("    {}", device.id);
        }
        println!();
    }
    println!("* = current Windows default");
    Ok(())
}

fn pin<P>(app: &mut App<P>, cmd: PinSubcommand) -> Result<()>
where
    P: AudioPlatform + Clone + Send + 'static,
{
    if cmd.output.is_none() && cmd.input.is_none() {
        bail!("Nothing to pin, pass --output and/or --input (see `list` for IDs)");
    }
    for (direction, id) in [
        (Direction::Render, cmd.output),
        (Direction::Capture, cmd.input),
    ] {
        let Some(id) = id else { continue };
        if id.trim().is_empty() {
            bail!("{direction} device ID can't be empty, use `unpin` instead");
        }
        app.select(direction, id.trim());
    }
    if !app.has_unsaved_changes() {
        println!("Already pinned, nothing to do");
        return Ok(());
    }
    if let Err(e) = app.commit() {
        // Whatever did apply is already saved
        app.reset_changes();
        return Err(e.into());
    }
    println!("Pinned");
    Ok(())
}

fn unpin<P>(app: &mut App<P>, cmd: &UnpinSubcommand) -> Result<()>
where
    P: AudioPlatform + Clone + Send + 'static,
{
    let both = !cmd.output && !cmd.input;
    if cmd.output || both {
        app.unpin(Direction::Render)?;
    }
    if cmd.input || both {
        app.unpin(Direction::Capture)?;
    }
    println!("Unpinned, current defaults were left alone");
    Ok(())
}

fn run_until_ctrl_c<P>(app: &mut App<P>) -> Result<()>
where
    P: AudioPlatform + Clone + Send + 'static,
{
    let (events_tx, events_rx) = mpsc::channel();
    panic_handler::initialize_ctrl_c_handler(events_tx.clone())?;

    match Autostart::for_current_exe() {
        Ok(autostart) if app.should_prompt_autostart(&autostart)? => {
            info!(
                "Tip: `{} autostart enable` starts this at login",
                env!("CARGO_PKG_NAME")
            );
            app.mark_autostart_asked()?;
        }
        Ok(_) => (),
        Err(e) => warn!("Couldn't check autostart: {e}"),
    }

    let pinned = app.selection().committed();
    if pinned.output_device_id.is_empty() && pinned.input_device_id.is_empty() {
        warn!("Nothing is pinned yet, see `pin` (waiting for the settings file to change)");
    }
    for direction in Direction::ALL {
        match app.current_default_id(direction) {
            Ok(id) if id.is_empty() => info!("No {direction} default right now"),
            Ok(id) => info!("Current {direction} default: {id}"),
            Err(e) => warn!("Couldn't read the {direction} default: {e}"),
        }
    }

    app.run(events_tx, events_rx)?;
    info!("Stopped");
    Ok(())
}
