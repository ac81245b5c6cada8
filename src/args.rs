use std::{path::PathBuf, str::FromStr};

use argh::FromArgs;

#[derive(FromArgs, PartialEq, Debug)]
/// Keep Windows on the audio devices you picked
pub struct TopLevelCmd {
    #[argh(option, short = 'c')]
    /// path to the settings file (default: autosound.toml in the app directory)
    pub config: Option<PathBuf>,
    #[argh(subcommand)]
    pub subcommand: Option<SubCommands>,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
pub enum SubCommands {
    List(ListSubcommand),
    Pin(PinSubcommand),
    Unpin(UnpinSubcommand),
    AutoSwitch(AutoSwitchSubcommand),
    Autostart(AutostartSubcommand),
    Run(RunSubcommand),
}

#[derive(FromArgs, PartialEq, Debug)]
/// List active audio devices and their IDs
#[argh(subcommand, name = "list")]
pub struct ListSubcommand {
    #[argh(switch, short = 'p')]
    /// show playback devices
    pub playback: bool,
    #[argh(switch, short = 'r')]
    /// show recording devices
    pub recording: bool,
    #[argh(switch)]
    /// print as JSON
    pub json: bool,
}

impl ListSubcommand {
    /// Neither flag means both.
    pub fn wants_playback(&self) -> bool {
        self.playback || !self.recording
    }
    pub fn wants_recording(&self) -> bool {
        self.recording || !self.playback
    }
}

#[derive(FromArgs, PartialEq, Debug)]
/// Make devices the default for every role and keep them there
#[argh(subcommand, name = "pin")]
pub struct PinSubcommand {
    #[argh(option, short = 'o')]
    /// output device ID to pin
    pub output: Option<String>,
    #[argh(option, short = 'i')]
    /// input device ID to pin
    pub input: Option<String>,
}

#[derive(FromArgs, PartialEq, Debug)]
/// Stop enforcing a device (the current default is left as-is)
#[argh(subcommand, name = "unpin")]
pub struct UnpinSubcommand {
    #[argh(switch, short = 'o')]
    /// unpin the output device
    pub output: bool,
    #[argh(switch, short = 'i')]
    /// unpin the input device
    pub input: bool,
}

#[derive(FromArgs, PartialEq, Debug)]
/// Turn reverting external default changes on or off
#[argh(subcommand, name = "auto-switch")]
pub struct AutoSwitchSubcommand {
    #[argh(positional)]
    /// on or off
    pub state: Toggle,
}

#[derive(FromArgs, PartialEq, Debug)]
/// Launch in `run` mode at login
#[argh(subcommand, name = "autostart")]
pub struct AutostartSubcommand {
    #[argh(positional)]
    /// enable, disable, or status
    pub action: AutostartAction,
}

#[derive(FromArgs, PartialEq, Debug)]
/// Keep the pinned devices as defaults until Ctrl+C (the default command)
#[argh(subcommand, name = "run")]
pub struct RunSubcommand {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Toggle::On
    }
}

impl FromStr for Toggle {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "on" | "true" | "1" => Ok(Toggle::On),
            "off" | "false" | "0" => Ok(Toggle::Off),
            other => Err(format!("expected on or off, got \"{other}\"")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutostartAction {
    Enable,
    Disable,
    Status,
}

impl FromStr for AutostartAction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enable" => Ok(AutostartAction::Enable),
            "disable" => Ok(AutostartAction::Disable),
            "status" => Ok(AutostartAction::Status),
            other => Err(format!(
                "expected enable, disable, or status, got \"{other}\""
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<TopLevelCmd, argh::EarlyExit> {
        TopLevelCmd::from_args(&["autosound"], args)
    }

    #[test]
    fn no_subcommand_is_allowed() {
        let cmd = parse(&[]).unwrap();
        assert_eq!(cmd.subcommand, None);
        assert_eq!(cmd.config, None);
    }

    #[test]
    fn pin_takes_either_or_both() {
        let cmd = parse(&["-c", "here.toml", "pin", "--output", "{out}"]).unwrap();
        assert_eq!(cmd.config, Some(PathBuf::from("here.toml")));
        assert_eq!(
            cmd.subcommand,
            Some(SubCommands::Pin(PinSubcommand {
                output: Some(String::from("{out}")),
                input: None,
            }))
        );
    }

    #[test]
    fn list_defaults_to_both_directions() {
        let Some(SubCommands::List(list)) = parse(&["list"]).unwrap().subcommand else {
            panic!("Expected list");
        };
        assert!(list.wants_playback() && list.wants_recording());

        let Some(SubCommands::List(list)) = parse(&["list", "-r"]).unwrap().subcommand else {
            panic!("Expected list");
        };
        assert!(!list.wants_playback() && list.wants_recording());
    }

    #[test]
    fn toggles_and_actions_parse() {
        let Some(SubCommands::AutoSwitch(cmd)) =
            parse(&["auto-switch", "OFF"]).unwrap().subcommand
        else {
            panic!("Expected auto-switch");
        };
        assert!(!cmd.state.enabled());

        assert!(parse(&["auto-switch", "sometimes"]).is_err());
        assert!(parse(&["autostart", "status"]).is_ok());
        assert!(parse(&["autostart", "maybe"]).is_err());
    }
}
