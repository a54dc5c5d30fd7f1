use crate::RANDOM_SEED_PLACEHOLDER;
use crate::error::spawn::SpawnError;

use common::ErrorLocation;

use std::mem::take;
use std::panic::Location;
use std::path::Path;
use std::process::Stdio;

use log::{debug, info};
use rand::Rng;
use tokio::process::{Child as TokioChild, Command as TokioCommand};

/// Split a command line into arguments, honoring single and double quotes.
///
/// Quote characters delimit a single argument but are not part of it;
/// `engine --config "my file.cfg"` yields three arguments.
///
/// # Errors
///
/// Returns [`SpawnError::CommandLine`] for an empty command line or
/// unbalanced quotes.
#[track_caller]
pub fn split_command_line(command_line: &str) -> Result<Vec<String>, SpawnError> {
    let mut arguments = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for character in command_line.chars() {
        match quote {
            Some(open) if character == open => quote = None,
            Some(_) => current.push(character),
            None => match character {
                '"' | '\'' => {
                    quote = Some(character);
                    in_token = true;
                }
                c if c.is_whitespace() => {
                    if in_token {
                        arguments.push(take(&mut current));
                        in_token = false;
                    }
                }
                c => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
    }

    if quote.is_some() {
        return Err(SpawnError::CommandLine {
            message: format!("Unbalanced quotes in command line: {command_line}"),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    if in_token {
        arguments.push(current);
    }

    if arguments.is_empty() {
        return Err(SpawnError::CommandLine {
            message: String::from("Empty command line"),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    Ok(arguments)
}

/// Replace the random seed placeholder with a freshly drawn seed.
///
/// Engines that take a seed argument can be launched with `%SRAND` so every
/// attach plays differently.
pub(crate) fn substitute_random_seed(command_line: &str) -> String {
    if !command_line.contains(RANDOM_SEED_PLACEHOLDER) {
        return command_line.to_string();
    }

    let seed: u32 = rand::thread_rng().r#gen();
    debug!("Substituting random seed {seed} into command line");
    command_line.replace(RANDOM_SEED_PLACEHOLDER, &seed.to_string())
}

/// Launch the engine process with all three standard streams piped.
pub(crate) fn spawn_engine_process(
    command_line: &str,
    working_dir: Option<&Path>,
) -> Result<TokioChild, SpawnError> {
    let substituted = substitute_random_seed(command_line);
    let arguments = split_command_line(&substituted)?;

    let mut command = TokioCommand::new(&arguments[0]);
    command
        .args(&arguments[1..])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = working_dir {
        command.current_dir(dir);
    }

    match command.spawn() {
        Ok(child) => {
            info!(
                "Started Go program (PID: {:?}): {}",
                child.id(),
                arguments[0]
            );
            Ok(child)
        }
        Err(error) => Err(SpawnError::Spawn {
            message: format!("Failed to start Go program \"{}\": {error}", arguments[0]),
            location: ErrorLocation::from(Location::caller()),
            source: Box::new(error),
        }),
    }
}
