use autosound::args::TopLevelCmd;
use color_eyre::eyre::Result;

fn main() -> Result<()> {
    autosound::initialize_panic_handler()?;
    // Fails on consoles too old for ANSI, plain output is fine there
    let _ = enable_ansi_support::enable_ansi_support();

    let args: TopLevelCmd = argh::from_env();
    autosound::run(args)
}
