//! Launch process assembly.
//!
//! Turns compiled binaries into the image's start commands. With live reload
//! on, every binary also gets a `reload-<name>` process that runs it under
//! `watchexec`, and the first reload process becomes the default.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::consts::{RELOAD_PROCESS_PREFIX, TINY_STACK_ID, WATCHEXEC};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Process {
  #[serde(rename = "type")]
  pub process_type: String,
  pub command: String,
  pub args: Vec<String>,
  pub direct: bool,
  pub default: bool,
}

#[derive(Debug, Error)]
pub enum LaunchError {
  #[error("cannot enable live reload on stack '{stack}': stack does not support watchexec")]
  UnsupportedStack { stack: String },
}

/// Build the ordered process list for `binaries`.
///
/// Fails before producing anything when live reload is requested on the
/// tiny stack, even for an empty binary list.
pub fn assemble(
  binaries: &[PathBuf],
  working_dir: &Path,
  stack: &str,
  live_reload: bool,
) -> Result<Vec<Process>, LaunchError> {
  if live_reload && is_tiny_stack(stack) {
    return Err(LaunchError::UnsupportedStack {
      stack: stack.to_string(),
    });
  }

  let mut processes = Vec::with_capacity(if live_reload { binaries.len() * 2 } else { binaries.len() });

  for (index, binary) in binaries.iter().enumerate() {
    let first = index == 0;
    let process_type = process_type(binary);
    let command = binary.to_string_lossy().into_owned();

    processes.push(Process {
      process_type: process_type.clone(),
      command: command.clone(),
      args: Vec::new(),
      direct: true,
      default: first && !live_reload,
    });

    if live_reload {
      processes.push(Process {
        process_type: format!("{}{}", RELOAD_PROCESS_PREFIX, process_type),
        command: WATCHEXEC.to_string(),
        args: vec![
          "--restart".to_string(),
          "--watch".to_string(),
          working_dir.to_string_lossy().into_owned(),
          "--watch".to_string(),
          containing_dir(binary),
          "--".to_string(),
          command,
        ],
        direct: true,
        default: first,
      });
    }
  }

  Ok(processes)
}

pub fn is_tiny_stack(stack: &str) -> bool {
  stack.starts_with(TINY_STACK_ID)
}

/// Render processes as aligned `type (default): command args` lines.
pub fn describe(processes: &[Process]) -> Vec<String> {
  let labels: Vec<String> = processes
    .iter()
    .map(|p| {
      if p.default {
        format!("{} (default):", p.process_type)
      } else {
        format!("{}:", p.process_type)
      }
    })
    .collect();
  let width = labels.iter().map(String::len).max().unwrap_or(0);

  processes
    .iter()
    .zip(labels)
    .map(|(process, label)| {
      let mut line = format!("{:<width$} {}", label, process.command, width = width);
      for arg in &process.args {
        line.push(' ');
        line.push_str(arg);
      }
      line
    })
    .collect()
}

fn process_type(binary: &Path) -> String {
  binary
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_else(|| binary.to_string_lossy().into_owned())
}

fn containing_dir(binary: &Path) -> String {
  match binary.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent.to_string_lossy().into_owned(),
    _ => ".".to_string(),
  }
}
