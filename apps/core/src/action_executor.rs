use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::model::{ActionEffect, CloseBehavior};
use crate::presenter::{path_from_url, Platform};

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("empty launch target")]
    EmptyTarget,
    #[error("path does not exist: {}", .0.display())]
    MissingPath(PathBuf),
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{program}' exited with {status}")]
    Failed { program: String, status: String },
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

impl PartialEq for LaunchError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::EmptyTarget, Self::EmptyTarget) => true,
            (Self::MissingPath(a), Self::MissingPath(b)) => a == b,
            (Self::Unsupported(a), Self::Unsupported(b)) => a == b,
            (
                Self::Failed { program: a, status: sa },
                Self::Failed { program: b, status: sb },
            ) => a == b && sa == sb,
            _ => false,
        }
    }
}

/// Check that `effect` targets something that exists, without running it.
pub fn validate(effect: &ActionEffect) -> Result<(), LaunchError> {
    match effect {
        ActionEffect::OpenUrl { url } => {
            let url = url.trim();
            if url.is_empty() {
                return Err(LaunchError::EmptyTarget);
            }
            if let Some(path) = path_from_url(url) {
                require_existing(&path)?;
            }
            Ok(())
        }
        ActionEffect::CopyText { text } => {
            if text.is_empty() {
                return Err(LaunchError::EmptyTarget);
            }
            Ok(())
        }
        ActionEffect::RevealInFileBrowser { dir } => require_existing(dir),
        ActionEffect::RunDetached { argv, workdir } => {
            if argv.first().map_or(true, |program| program.trim().is_empty()) {
                return Err(LaunchError::EmptyTarget);
            }
            workdir.as_deref().map_or(Ok(()), require_existing)
        }
        ActionEffect::RunInTerminal {
            script, workdir, ..
        } => {
            if script.trim().is_empty() {
                return Err(LaunchError::EmptyTarget);
            }
            workdir.as_deref().map_or(Ok(()), require_existing)
        }
    }
}

pub fn execute(effect: &ActionEffect, platform: Platform) -> Result<(), LaunchError> {
    validate(effect)?;
    tracing::info!(?effect, "executing action");
    match effect {
        ActionEffect::OpenUrl { url } => open_target(url.trim(), platform),
        ActionEffect::CopyText { text } => copy_text(text, platform),
        ActionEffect::RevealInFileBrowser { dir } => reveal_dir(dir, platform),
        ActionEffect::RunDetached { argv, workdir } => {
            spawn_detached(&argv[0], &argv[1..], workdir.as_deref())
        }
        ActionEffect::RunInTerminal {
            script,
            workdir,
            close,
        } => run_in_terminal(script, workdir.as_deref(), *close, platform),
    }
}

fn require_existing(path: &str) -> Result<(), LaunchError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(LaunchError::EmptyTarget);
    }
    let candidate = Path::new(trimmed);
    if !candidate.exists() {
        return Err(LaunchError::MissingPath(candidate.to_path_buf()));
    }
    Ok(())
}

fn open_target(target: &str, platform: Platform) -> Result<(), LaunchError> {
    match platform {
        Platform::Windows => shell_execute("open", target),
        Platform::MacOs => spawn_detached("open", &[target.to_string()], None),
        Platform::Linux | Platform::Other => spawn_detached("xdg-open", &[target.to_string()], None),
    }
}

fn reveal_dir(dir: &str, platform: Platform) -> Result<(), LaunchError> {
    match platform {
        Platform::Windows => shell_execute("explore", dir),
        Platform::MacOs => spawn_detached("open", &[dir.to_string()], None),
        Platform::Linux => spawn_detached("xdg-open", &[dir.to_string()], None),
        Platform::Other => Err(LaunchError::Unsupported("revealing a folder")),
    }
}

fn copy_text(text: &str, platform: Platform) -> Result<(), LaunchError> {
    let (program, args): (&str, &[&str]) = match platform {
        Platform::Windows => ("clip", &[]),
        Platform::MacOs => ("pbcopy", &[]),
        Platform::Linux | Platform::Other => ("xclip", &["-selection", "clipboard"]),
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| LaunchError::Spawn {
            program: program.to_string(),
            source,
        })?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .map_err(|source| LaunchError::Spawn {
                program: program.to_string(),
                source,
            })?;
    }
    let status = child.wait().map_err(|source| LaunchError::Spawn {
        program: program.to_string(),
        source,
    })?;
    if !status.success() {
        return Err(LaunchError::Failed {
            program: program.to_string(),
            status: status.to_string(),
        });
    }
    Ok(())
}

fn spawn_detached(program: &str, args: &[String], workdir: Option<&str>) -> Result<(), LaunchError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if let Some(dir) = workdir {
        command.current_dir(dir);
    }
    command.spawn().map_err(|source| LaunchError::Spawn {
        program: program.to_string(),
        source,
    })?;
    Ok(())
}

/// Shell line run inside the terminal for a given close policy.
pub fn terminal_script(script: &str, close: CloseBehavior) -> String {
    match close {
        CloseBehavior::CloseOnExit => script.to_string(),
        CloseBehavior::CloseOnSuccess => format!("{script} || exec \"${{SHELL:-sh}}\""),
        CloseBehavior::DoNotClose => format!("{script}; exec \"${{SHELL:-sh}}\""),
    }
}

fn run_in_terminal(
    script: &str,
    workdir: Option<&str>,
    close: CloseBehavior,
    platform: Platform,
) -> Result<(), LaunchError> {
    match platform {
        Platform::Windows => {
            let keep = if close == CloseBehavior::CloseOnExit { "/C" } else { "/K" };
            let args = ["/C", "start", "", "cmd", keep, script].map(str::to_string);
            spawn_detached("cmd", &args, workdir)
        }
        Platform::MacOs => {
            let line = match workdir {
                Some(dir) => format!("cd {} && {}", sh_quote(dir), terminal_script(script, close)),
                None => terminal_script(script, close),
            };
            let apple_script = format!(
                "tell application \"Terminal\" to do script \"{}\"",
                line.replace('\\', "\\\\").replace('"', "\\\"")
            );
            spawn_detached("osascript", &["-e".to_string(), apple_script], None)
        }
        Platform::Linux | Platform::Other => {
            let terminal = std::env::var("TERMINAL")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| "x-terminal-emulator".to_string());
            let args = vec![
                "-e".to_string(),
                "sh".to_string(),
                "-c".to_string(),
                terminal_script(script, close),
            ];
            spawn_detached(&terminal, &args, workdir)
        }
    }
}

fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

#[cfg(target_os = "windows")]
fn shell_execute(verb: &str, target: &str) -> Result<(), LaunchError> {
    use windows_sys::Win32::UI::Shell::ShellExecuteW;
    use windows_sys::Win32::UI::WindowsAndMessaging::SW_SHOWNORMAL;

    let verb_w = to_wide(verb);
    let target_w = to_wide(target);
    let result = unsafe {
        ShellExecuteW(
            std::ptr::null_mut(),
            verb_w.as_ptr(),
            target_w.as_ptr(),
            std::ptr::null(),
            std::ptr::null(),
            SW_SHOWNORMAL,
        )
    };
    // Values above 32 mean success.
    if result as isize <= 32 {
        return Err(LaunchError::Failed {
            program: format!("ShellExecuteW({verb})"),
            status: format!("code {}", result as isize),
        });
    }
    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn shell_execute(_verb: &str, _target: &str) -> Result<(), LaunchError> {
    Err(LaunchError::Unsupported("ShellExecute"))
}

#[cfg(target_os = "windows")]
fn to_wide(value: &str) -> Vec<u16> {
    value.encode_utf16().chain(std::iter::once(0)).collect()
}
