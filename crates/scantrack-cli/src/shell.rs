use clap::Parser;

use scantrack_core::models::MangaDraft;
use scantrack_runtime::Runtime;

use crate::app;
use crate::cli::{Command, ShellCommand, ShellLine};
use crate::error::CliError;
use crate::input::Input;
use crate::render;

/// Interactive loop. One tracker stays alive, so search text, the active
/// tab and queued writes carry over between commands.
pub async fn run(runtime: &mut Runtime, input: &mut Input) -> Result<(), CliError> {
    println!("{}", render::view(&runtime.tracker().view().await));
    println!("Type `help` for commands, `quit` to leave.");

    while let Some(line) = input.prompt("scantrack> ").await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }

        let command = match ShellLine::try_parse_from(words.iter().copied()) {
            Ok(parsed) => parsed.command,
            Err(e) => {
                let _ = e.print();
                continue;
            }
        };

        let tracker = runtime.tracker();
        match command {
            ShellCommand::Tab { status } => {
                tracker.set_tab(status).await;
                println!("{}", render::view(&tracker.view().await));
            }
            ShellCommand::Search { text } => {
                tracker.set_search(text.join(" ")).await;
                println!("{}", render::view(&tracker.view().await));
            }
            ShellCommand::New => {
                if let Err(e) = add_form(runtime, input).await {
                    eprintln!("error: {e}");
                }
            }
            ShellCommand::Refresh => {
                if let Err(e) = tracker.refresh().await {
                    eprintln!("error: {e}");
                }
                println!("{}", render::view(&tracker.view().await));
            }
            ShellCommand::Log => {
                let entries = tracker
                    .events()
                    .lock()
                    .map(|log| log.snapshot())
                    .unwrap_or_default();
                println!("{}", render::events(&entries));
            }
            ShellCommand::Quit => break,
            ShellCommand::Tracker(command) => {
                let signed_out = tracker.session().await.is_none();
                if signed_out && !matches!(command, Command::Login | Command::Whoami) {
                    eprintln!("error: {}", CliError::SignedOut);
                    continue;
                }
                // Tickets are dropped; failures land in `log`.
                if let Err(e) = app::execute(runtime, command, input).await {
                    eprintln!("error: {e}");
                }
            }
        }
    }

    runtime.tracker().flush().await;
    Ok(())
}

/// Prompt for the add-form fields. A blank title closes the form.
async fn add_form(runtime: &Runtime, input: &mut Input) -> Result<(), CliError> {
    let tracker = runtime.tracker();
    tracker.open_add_form().await;

    let title = input.prompt("Title: ").await?.unwrap_or_default();
    if title.trim().is_empty() {
        tracker.close_add_form().await;
        println!("Cancelled");
        return Ok(());
    }

    let mut draft = MangaDraft::new(title.trim());
    let chapter = input.prompt("Chapter [1]: ").await?.unwrap_or_default();
    draft.chapter = chapter.trim().parse().ok();
    let link = input.prompt("Link (optional): ").await?.unwrap_or_default();
    if !link.trim().is_empty() {
        draft = draft.with_site_url(link.trim());
    }

    let result = app::add(tracker, draft, &runtime.config().covers.placeholder).await;
    tracker.close_add_form().await;
    result.map(|_| ())
}
