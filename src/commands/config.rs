use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use fitcoach::{
    OutputFmt,
    config::{Config, validate_entry},
    emit,
};

use crate::cli::ConfigCmd;

pub fn handle(cmd: ConfigCmd, config_path: &Path, fmt: OutputFmt) -> Result<()> {
    let mut cfg = Config::load(config_path)?;

    match cmd {
        ConfigCmd::List => {
            emit(fmt, &cfg.map, |map| {
                if map.is_empty() {
                    println!("{}", "(no config set)".dimmed());
                } else {
                    println!("{}", "Config:".cyan().bold());
                    for (k, v) in map {
                        println!("  {} = {}", k.green(), v);
                    }
                }
            })?;
        }

        ConfigCmd::Get { key } => match cfg.get(&key) {
            Some(val) => println!("{val}"),
            None => println!("{} key `{}` not found", "warning:".yellow().bold(), key),
        },

        ConfigCmd::Set { key, val } => {
            if let Err(e) = validate_entry(&key, &val) {
                println!("{} {}", "error:".red().bold(), e);
                return Ok(());
            }
            cfg.map.insert(key.clone(), val.clone());
            cfg.save(config_path)?;
            println!("{} set `{}` = `{}`", "info:".blue().bold(), key.green(), val);
        }

        ConfigCmd::Unset { key } => {
            if cfg.map.remove(&key).is_some() {
                cfg.save(config_path)?;
                println!("{} removed `{}`", "info:".blue().bold(), key.green());
            } else {
                println!("{} key `{}` not found", "warning:".yellow().bold(), key);
            }
        }
    }

    Ok(())
}
