//! Configuration setup command.
//!
//! Runs the interactive wizard, or writes the built-in defaults with
//! `--defaults`, or removes the configuration file with `--delete`.

use crate::{
    libs::{config::Config, messages::Message},
    msg_info, msg_success,
};
use anyhow::Result;
use clap::Args;
use std::fs;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Write the default configuration without prompting
    #[arg(long, conflicts_with = "delete")]
    defaults: bool,

    /// Remove the existing configuration file
    #[arg(short, long)]
    delete: bool,
}

pub fn cmd(init_args: InitArgs) -> Result<()> {
    let path = Config::path()?;

    if init_args.delete {
        if path.exists() {
            fs::remove_file(&path)?;
            msg_success!(Message::ConfigDeleted(path.display().to_string()));
        } else {
            msg_info!(Message::ConfigNotFound);
        }
        return Ok(());
    }

    if init_args.defaults {
        Config::defaults().save_to(&path)?;
        msg_success!(Message::ConfigDefaultsSaved(path.display().to_string()));
        return Ok(());
    }

    // The watcher picks the new file up on its next heartbeat.
    Config::init()?.save_to(&path)?;
    msg_success!(Message::ConfigSaved);
    Ok(())
}
