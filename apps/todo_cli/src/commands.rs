//! Text commands typed at the prompt, and their mapping onto controller intents.

use client_core::ListStateController;
use shared::domain::{Item, ItemId};

pub const HELP: &str = "\
commands:
  type <text>     set the draft text (empty clears it)
  add [text]      add the draft (or <text>) as a new todo
  edit <n|id>     start editing row n, or the item with that id
  buffer <text>   set the pending name for the item being edited
  save            commit the pending name
  cancel          drop the pending edit
  delete <n|id>   delete row n, or the item with that id
  list            show the list
  help            show this help
  quit            exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Type(String),
    Add(Option<String>),
    Edit(String),
    Buffer(String),
    Save,
    Cancel,
    Delete(String),
    List,
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim_start();
    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (trimmed, ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "type" => Ok(Command::Type(rest.to_string())),
        "add" => Ok(Command::Add((!rest.is_empty()).then(|| rest.to_string()))),
        "edit" => required(rest, "edit").map(Command::Edit),
        "buffer" => Ok(Command::Buffer(rest.to_string())),
        "save" => Ok(Command::Save),
        "cancel" => Ok(Command::Cancel),
        "delete" | "rm" => required(rest, "delete").map(Command::Delete),
        "" | "list" | "ls" => Ok(Command::List),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("unknown command '{other}'; try 'help'")),
    }
}

fn required(rest: &str, command: &str) -> Result<String, String> {
    let target = rest.trim();
    if target.is_empty() {
        return Err(format!("'{command}' needs a row number or id"));
    }
    Ok(target.to_string())
}

/// A 1-based row number in range selects that row; anything else must be an exact id.
pub fn resolve_target(items: &[Item], target: &str) -> Option<ItemId> {
    if let Ok(row) = target.parse::<usize>() {
        if (1..=items.len()).contains(&row) {
            return Some(items[row - 1].id.clone());
        }
    }
    items
        .iter()
        .find(|item| item.id.as_str() == target)
        .map(|item| item.id.clone())
}

pub async fn dispatch(
    controller: &ListStateController,
    command: Command,
) -> Result<Outcome, String> {
    match command {
        Command::Type(text) => controller.set_draft_name(text).await,
        Command::Add(text) => {
            if let Some(text) = text {
                controller.set_draft_name(text).await;
            }
            controller.submit_create().await;
        }
        Command::Edit(target) => {
            let id = lookup(controller, &target).await?;
            controller.begin_edit(&id).await;
        }
        Command::Buffer(text) => {
            if controller.edit_cursor().await.is_none() {
                return Err("nothing is being edited; use 'edit <n|id>' first".into());
            }
            controller.set_edit_buffer(text).await;
        }
        Command::Save => controller.submit_update().await,
        Command::Cancel => controller.cancel_edit().await,
        Command::Delete(target) => {
            let id = lookup(controller, &target).await?;
            controller.submit_delete(&id).await;
        }
        Command::List | Command::Help => {}
        Command::Quit => return Ok(Outcome::Quit),
    }
    Ok(Outcome::Continue)
}

async fn lookup(controller: &ListStateController, target: &str) -> Result<ItemId, String> {
    let items = controller.items().await;
    resolve_target(&items, target).ok_or_else(|| format!("no todo matches '{target}'"))
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
