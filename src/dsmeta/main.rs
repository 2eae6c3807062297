use clap::Parser;
use colored::*;
use directories::ProjectDirs;
use dsmeta::api::{CmdMessage, CmdResult, ConfigAction, MessageLevel, MetaApi, OutputOptions};
use dsmeta::config::MetaConfig;
use dsmeta::error::{MetaError, Result};
use dsmeta::merge::MergeOptions;
use dsmeta::store::fs::FileStore;
use std::path::PathBuf;

mod args;
use args::{Cli, Commands, OutputArgs};

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_dir = resolve_config_dir(&cli)?;
    let config = MetaConfig::load(&config_dir)?;
    dsmeta::logging::init(&config.log_level, cli.verbose);

    let mut api = MetaApi::new(FileStore::new(), config, config_dir);

    let result = match cli.command {
        Commands::Check { path } => api.check(&path)?,
        Commands::Show { path, output } => api.show(&path, &output_options(output))?,
        Commands::Merge {
            paths,
            overwrite,
            by,
            output,
        } => {
            let mut options = MergeOptions::new(overwrite);
            if let Some(by) = by {
                options = options.with_requester(by.into_iter().collect());
            }
            api.merge(&paths, &options, &output_options(output))?
        }
        Commands::Filter { path, view, output } => api.view(&path, view, &output_options(output))?,
        Commands::Config { key, value } => return handle_config(&mut api, key, value),
    };
    print_result(&result);
    Ok(())
}

fn resolve_config_dir(cli: &Cli) -> Result<PathBuf> {
    if let Some(dir) = &cli.config_dir {
        return Ok(dir.clone());
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let project_dir = cwd.join(".dsmeta");
    if project_dir.is_dir() {
        return Ok(project_dir);
    }
    ProjectDirs::from("com", "dsmeta", "dsmeta")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| MetaError::Api("Could not determine config dir".into()))
}

fn output_options(args: OutputArgs) -> OutputOptions {
    OutputOptions {
        requester: args.requester.map(|uuids| uuids.into_iter().collect()),
        format: args.format,
        text_format: args.text,
        path: args.output,
    }
}

fn handle_config<S: dsmeta::store::DocumentStore>(
    api: &mut MetaApi<S>,
    key: Option<String>,
    value: Option<String>,
) -> Result<()> {
    let action = match (key, value) {
        (None, _) => ConfigAction::ShowAll,
        (Some(k), None) => ConfigAction::ShowKey(k),
        (Some(k), Some(v)) => ConfigAction::Set(k, v),
    };
    let show_all = matches!(action, ConfigAction::ShowAll);
    let result = api.config(action)?;

    if show_all {
        if let Some(config) = &result.config {
            for key in MetaConfig::KEYS {
                let value = config.get(key).unwrap_or_default();
                println!("{} = {}", key.bold(), value);
            }
        }
    }
    print_messages(&result.messages);
    Ok(())
}

fn print_result(result: &CmdResult) {
    if let Some(document) = &result.document {
        print!("{}", document);
        if !document.ends_with('\n') {
            println!();
        }
    }
    print_messages(&result.messages);
}

/// Messages go to stderr so documents on stdout stay pipeable.
fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => eprintln!("{}", message.content.dimmed()),
            MessageLevel::Success => eprintln!("{}", message.content.green()),
            MessageLevel::Warning => eprintln!("{}", message.content.yellow()),
            MessageLevel::Error => eprintln!("{}", message.content.red()),
        }
    }
}
