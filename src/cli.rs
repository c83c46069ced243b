//! Command-line interface and REPL

use anyhow::{Context, Result};
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::collections::BTreeMap;

use mixer_bridge::{Mixer, MixerValue};

/// One REPL command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Get(Option<String>),
    Set(String, MixerValue),
    Scene(u32),
    Reload,
    Dump,
    Info,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Ok(None);
        };

        let command = match verb {
            "get" => Command::Get(parts.next().map(str::to_string)),
            "set" => {
                let address = parts.next().context("usage: set <address> <value>")?;
                let rest: Vec<&str> = parts.collect();
                if rest.is_empty() {
                    anyhow::bail!("usage: set <address> <value>");
                }
                Command::Set(address.to_string(), MixerValue::parse_loose(&rest.join(" ")))
            },
            "scene" => {
                let number = parts.next().context("usage: scene <number>")?;
                Command::Scene(
                    number
                        .parse()
                        .with_context(|| format!("invalid scene number: {}", number))?,
                )
            },
            "reload" => Command::Reload,
            "dump" => Command::Dump,
            "info" => Command::Info,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => anyhow::bail!("unknown command: {} (try 'help')", other),
        };
        Ok(Some(command))
    }
}

/// Print mirrored state sorted by address
pub fn print_state(state: impl IntoIterator<Item = (String, MixerValue)>) {
    let sorted: BTreeMap<String, MixerValue> = state.into_iter().collect();
    if sorted.is_empty() {
        println!("{}", "(no state)".dimmed());
    }
    for (address, value) in sorted {
        println!("  {} = {}", address.cyan(), value.to_string().green());
    }
}

fn print_help() {
    println!("\n{}", "Commands:".bold());
    println!("  {}                 show all mirrored state", "get".yellow());
    println!("  {}       show a field and everything below it", "get <address>".yellow());
    println!("  {} write a logical field", "set <address> <value>".yellow());
    println!("  {}          recall a scene and reload", "scene <n>".yellow());
    println!("  {}              request every mapped address again", "reload".yellow());
    println!("  {}                wire/logical address table", "dump".yellow());
    println!("  {}                console cardinalities", "info".yellow());
    println!("  {}                leave", "quit".yellow());
}

async fn execute(mixer: &Mixer, command: Command) -> Result<bool> {
    match command {
        Command::Get(address) => print_state(mixer.state(address.as_deref())),
        Command::Set(address, value) => {
            mixer.set_value(&address, value.clone()).await?;
            println!("{} {} <- {}", "✓".green(), address.cyan(), value);
        },
        Command::Scene(number) => {
            mixer.load_scene(number).await?;
            println!("{} scene {} loaded", "✓".green(), number);
        },
        Command::Reload => {
            mixer.reload().await?;
            println!("{} reload requested", "✓".green());
        },
        Command::Dump => {
            for row in mixer.dump_mapping() {
                println!("  {} -> {}", row.wire.yellow(), row.logical.cyan());
            }
        },
        Command::Info => println!("{}", serde_json::to_string_pretty(&mixer.info())?),
        Command::Help => print_help(),
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

pub async fn run_repl(mixer: &Mixer) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let prompt = format!("{}> ", mixer.profile().model.as_str().to_lowercase());

    println!(
        "{} {} ({})",
        "Connected to".bold(),
        mixer.name().unwrap_or_else(|| "mixer".to_string()).cyan(),
        mixer.profile().model
    );
    println!("Type {} for commands.", "help".yellow());

    loop {
        let line = match tokio::task::block_in_place(|| rl.readline(&prompt)) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let _ = rl.add_history_entry(line.as_str());

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{} {}", "✗".red(), e);
                continue;
            },
        };

        match execute(mixer, command).await {
            Ok(true) => {},
            Ok(false) => break,
            Err(e) => println!("{} {}", "✗".red(), e),
        }
    }

    Ok(())
}
