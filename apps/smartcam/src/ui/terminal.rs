//! Line-oriented front end driving the presentation adapter.

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    thread,
};

use anyhow::Result;
use crossbeam_channel::{bounded, select, Receiver};
use shared::domain::ImageSource;

use crate::{
    backend_bridge::commands::AppCommand,
    capability::image_ref_from_path,
    controller::{
        events::{UiError, UiErrorContext, UiEvent},
        orchestration::{Notice, PresentationAdapter},
    },
};

pub const HELP: &str = "\
commands:
  start | stop          toggle the camera stream
  label <text>          set the person's label
  image <path>          use an image file
  capture | pick        take the newest image from the camera or library folder
  submit                enroll the current draft
  new                   discard the draft and start over
  status | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(AppCommand),
    ImagePath(PathBuf),
    Status,
    Help,
    Quit,
}

pub fn parse_line(line: &str) -> Result<Option<Input>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let input = match word.to_ascii_lowercase().as_str() {
        "start" => Input::Command(AppCommand::StartStream),
        "stop" => Input::Command(AppCommand::StopStream),
        "label" => Input::Command(AppCommand::SetLabel {
            text: rest.to_string(),
        }),
        "image" if rest.is_empty() => return Err("usage: image <path>".to_string()),
        "image" => Input::ImagePath(PathBuf::from(rest)),
        "capture" => Input::Command(AppCommand::AcquireImage {
            source: ImageSource::Camera,
        }),
        "pick" => Input::Command(AppCommand::AcquireImage {
            source: ImageSource::Library,
        }),
        "submit" => Input::Command(AppCommand::SubmitEnrollment),
        "new" => Input::Command(AppCommand::NewEntry),
        "status" => Input::Status,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => return Err(format!("unknown command '{other}'; type 'help'")),
    };
    Ok(Some(input))
}

pub fn spawn_stdin_reader() -> Receiver<String> {
    let (line_tx, line_rx) = bounded::<String>(64);
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });
    line_rx
}

enum Step {
    Line(Option<String>),
    Event(Option<UiEvent>),
}

/// Runs until the user quits, input closes, or the backend goes away.
pub fn run(
    adapter: &mut PresentationAdapter,
    lines: Receiver<String>,
    events: Receiver<UiEvent>,
    out: &mut impl Write,
) -> Result<()> {
    writeln!(out, "{HELP}")?;
    writeln!(out, "{}", adapter.view().render())?;

    loop {
        let step = select! {
            recv(lines) -> line => Step::Line(line.ok()),
            recv(events) -> event => Step::Event(event.ok()),
        };
        match step {
            Step::Line(None) => break,
            Step::Line(Some(line)) => match parse_line(&line) {
                Ok(None) => {}
                Ok(Some(Input::Quit)) => break,
                Ok(Some(Input::Help)) => writeln!(out, "{HELP}")?,
                Ok(Some(Input::Status)) => writeln!(out, "{}", adapter.view().render())?,
                Ok(Some(Input::ImagePath(path))) => match image_ref_from_path(&path) {
                    Ok(image) => dispatch(adapter, AppCommand::SetImage { image }, out)?,
                    Err(err) => {
                        let err = UiError::from_message(
                            UiErrorContext::ImageAcquisition,
                            format!("{err:#}"),
                        );
                        write_error(out, &err)?;
                    }
                },
                Ok(Some(Input::Command(cmd))) => dispatch(adapter, cmd, out)?,
                Err(usage) => writeln!(out, "{usage}")?,
            },
            Step::Event(None) => {
                writeln!(out, "backend stopped")?;
                break;
            }
            Step::Event(Some(event)) => {
                let rerender = matches!(
                    event,
                    UiEvent::SessionChanged(_) | UiEvent::DraftChanged(_)
                );
                match adapter.apply(event) {
                    Some(Notice::Info(message)) => writeln!(out, "{message}")?,
                    Some(Notice::Error(err)) => write_error(out, &err)?,
                    None => {}
                }
                if rerender {
                    writeln!(out, "{}", adapter.view().render())?;
                }
            }
        }
        out.flush()?;
    }
    Ok(())
}

fn dispatch(adapter: &PresentationAdapter, cmd: AppCommand, out: &mut impl Write) -> Result<()> {
    if let Err(err) = adapter.dispatch(cmd) {
        write_error(out, &err)?;
    }
    Ok(())
}

fn write_error(out: &mut impl Write, err: &UiError) -> Result<()> {
    if err.is_retryable() {
        writeln!(out, "error: {err} (retry when ready)")?;
    } else {
        writeln!(out, "error: {err}")?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../tests/terminal_tests.rs"]
mod tests;
