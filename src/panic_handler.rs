use std::sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc::Sender,
    Arc,
};

use color_eyre::eyre::Result;
use tracing::*;

use crate::app::AppEvent;

// https://ratatui.rs/recipes/apps/better-panic/
pub fn initialize_panic_handler() -> Result<()> {
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default()
        .panic_section(format!(
            "This is a bug. Consider reporting it along with your log file ({}).",
            crate::logging::LOG_FILE_NAME
        ))
        .display_location_section(true)
        .display_env_section(true)
        .into_hooks();
    eyre_hook.install()?;
    std::panic::set_hook(Box::new(move |panic_info| {
        let msg = format!("{}", panic_hook.panic_report(panic_info));
        // Sessions live on the named worker and reconciler threads
        let thread = std::thread::current();
        error!(
            "Panic on thread {}! {}",
            thread.name().unwrap_or("<unnamed>"),
            strip_ansi_escapes::strip_str(&msg)
        );
        #[cfg(not(debug_assertions))]
        {
            eprintln!("{}", msg); // prints color-eyre stack trace to stderr
            use human_panic::{handle_dump, print_msg, Metadata};
            let meta = Metadata::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

            let file_path = handle_dump(&meta, panic_info);
            // prints human-panic message
            if print_msg(file_path.clone(), &meta).is_err() {
                eprintln!("human-panic: printing error message to console failed");
            }

            info!("Full panic dump at: {:?}", file_path);
        }

        #[cfg(debug_assertions)]
        {
            // Better Panic stacktrace that is only enabled when debugging.
            better_panic::Settings::auto()
                .most_recent_first(false)
                .lineno_suffix(true)
                .verbosity(better_panic::Verbosity::Full)
                .create_panic_handler()(panic_info);
        }

        std::process::exit(libc::EXIT_FAILURE);
    }));
    Ok(())
}

/// First Ctrl+C asks the app to stop (closing sessions on the way out), a second one doesn't ask.
pub fn initialize_ctrl_c_handler(events: Sender<AppEvent>) -> Result<()> {
    let presses = Arc::new(AtomicUsize::new(0));
    ctrlc::set_handler(move || {
        let prev = presses.fetch_add(1, Ordering::SeqCst);
        if prev == 0 {
            info!("Exiting via Ctrl+C");
            // If fails, the app is already on its way out.
            let _ = events.send(AppEvent::ExitRequested);
        } else {
            warn!("Forcibly exiting via Ctrl+C!");
            std::process::exit(libc::EXIT_FAILURE);
        }
    })?;
    Ok(())
}
