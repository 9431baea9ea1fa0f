use std::path::{Path, PathBuf};

use scantrack_core::config::{AppConfig, BackendKind};
use scantrack_core::legacy::SNAPSHOT_KEY;
use scantrack_core::models::{MangaDraft, MangaRecord};
use scantrack_runtime::{AppTracker, DeleteOutcome, Runtime, WriteOutcome, WriteTicket};

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::input::Input;
use crate::{render, shell};

/// Run one invocation of the binary.
pub async fn run(cli: Cli, mut runtime: Runtime) -> Result<(), CliError> {
    let mut input = Input::new();

    match cli.command {
        Command::Login => {
            execute(&mut runtime, Command::Login, &mut input).await?;
        }
        Command::Logout => {
            execute(&mut runtime, Command::Logout, &mut input).await?;
        }
        Command::Shell => {
            runtime.start().await?;
            shell::run(&mut runtime, &mut input).await?;
        }
        command => {
            runtime.start().await?;
            if needs_session(&command) && runtime.tracker().session().await.is_none() {
                return Err(CliError::SignedOut);
            }
            if let Some(ticket) = execute(&mut runtime, command, &mut input).await? {
                if let WriteOutcome::Failed(message) = ticket.outcome().await {
                    eprintln!("warning: the change was not saved: {message}");
                }
            }
        }
    }

    runtime.tracker().flush().await;
    Ok(())
}

/// Write the default config to `path` (or the platform location).
///
/// Runs before the runtime opens so a broken user file can be replaced.
pub fn init(path: Option<&Path>, force: bool) -> Result<(), CliError> {
    let target = path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::config_path);
    if target.exists() && !force {
        return Err(CliError::ConfigExists(target));
    }
    let written = AppConfig::default().save(Some(&target))?;
    println!("Wrote {}", written.display());
    Ok(())
}

fn needs_session(command: &Command) -> bool {
    !matches!(
        command,
        Command::Init { .. }
            | Command::Login
            | Command::Logout
            | Command::Whoami
            | Command::Shell
    )
}

/// Carry out a command against a started runtime.
///
/// Optimistic writes hand back their ticket; the one-shot path waits on it,
/// the shell lets it resolve in the background.
pub async fn execute(
    runtime: &mut Runtime,
    command: Command,
    input: &mut Input,
) -> Result<Option<WriteTicket>, CliError> {
    match command {
        Command::Login => {
            let session = runtime.login().await?;
            println!("Signed in as {}", session.display_name());
            print_refresh_error(runtime.tracker()).await;
        }
        Command::Logout => {
            runtime.logout().await?;
            println!("Signed out");
        }
        Command::Whoami => whoami(runtime).await,
        Command::List(args) => {
            let tracker = runtime.tracker();
            if let Some(status) = args.status {
                tracker.set_tab(status).await;
            }
            if let Some(search) = args.search {
                tracker.set_search(search).await;
            }
            println!("{}", render::view(&tracker.view().await));
        }
        Command::Add(args) => {
            let mut draft = MangaDraft::new(args.title());
            draft.chapter = args.chapter;
            draft.site_url = args.url;
            add(runtime.tracker(), draft, &runtime.config().covers.placeholder).await?;
        }
        Command::Next { sel } => return bump(runtime.tracker(), &sel, 1).await.map(Some),
        Command::Prev { sel } => return bump(runtime.tracker(), &sel, -1).await.map(Some),
        Command::Bump { sel, delta } => {
            return bump(runtime.tracker(), &sel, delta).await.map(Some)
        }
        Command::Status { sel, status } => {
            let tracker = runtime.tracker();
            let record = select(tracker, &sel).await?;
            let ticket = tracker.set_status(&record.id, status).await?;
            println!("{} moved to {status}", record.title);
            return Ok(Some(ticket));
        }
        Command::Delete { sel, yes } => {
            let tracker = runtime.tracker();
            let record = select(tracker, &sel).await?;
            let confirmed = yes
                || input
                    .confirm(&format!("Delete \"{}\"?", record.title))
                    .await?;
            return match tracker.delete(&record.id, |_| confirmed).await? {
                DeleteOutcome::Cancelled => {
                    println!("Kept {}", record.title);
                    Ok(None)
                }
                DeleteOutcome::Removed(ticket) => {
                    println!("Deleted {}", record.title);
                    Ok(Some(ticket))
                }
            };
        }
        Command::Open { sel, print } => {
            let tracker = runtime.tracker();
            let record = select(tracker, &sel).await?;
            let link = tracker.link_for(&record.id).await?;
            if print {
                println!("{link}");
            } else if let Err(e) = open::that(&link) {
                tracing::warn!("Failed to open browser: {e}");
                println!("{link}");
            } else {
                println!("Opened {link}");
            }
        }
        Command::Import { file } => {
            let json = std::fs::read_to_string(&file)?;
            let imported = runtime.tracker().import_snapshot(&json).await?;
            println!("Imported {imported} titles from {}", file.display());
        }
        Command::Export { file } => {
            let tracker = runtime.tracker();
            let json = tracker.export_snapshot().await?;
            let path = file.unwrap_or_else(|| PathBuf::from(format!("{SNAPSHOT_KEY}.json")));
            std::fs::write(&path, json)?;
            println!(
                "Wrote {} titles to {}",
                tracker.records().await.len(),
                path.display()
            );
        }
        Command::Init { .. } | Command::Shell => println!("Not available here"),
    }
    Ok(None)
}

async fn whoami(runtime: &Runtime) {
    let backend = match runtime.config().backend.kind {
        BackendKind::Local => "local store",
        BackendKind::Supabase => "supabase",
    };
    match runtime.tracker().session().await {
        Some(session) if session.is_local() => println!("Using the {backend}"),
        Some(session) => println!("{} ({backend})", session.display_name()),
        None => println!("Not signed in ({backend})"),
    }
    println!("config: {}", AppConfig::config_path().display());
    println!("data:   {}", AppConfig::data_dir().display());
}

pub async fn add(
    tracker: &AppTracker,
    draft: MangaDraft,
    placeholder: &str,
) -> Result<MangaRecord, CliError> {
    let record = tracker.add(draft).await?;
    println!(
        "Added {} at chapter {}",
        record.title, record.current_chapter
    );
    if record.cover == placeholder {
        println!("  (no cover found, using the placeholder)");
    }
    Ok(record)
}

async fn bump(tracker: &AppTracker, sel: &str, delta: i64) -> Result<WriteTicket, CliError> {
    let record = select(tracker, sel).await?;
    let (chapter, ticket) = tracker.adjust_chapter(&record.id, delta).await?;
    println!("{}: chapter {chapter}", record.title);
    Ok(ticket)
}

async fn print_refresh_error(tracker: &AppTracker) {
    if let Some(error) = tracker.last_error().await {
        eprintln!("warning: could not load your list: {error}");
    }
}

/// Resolve `<SEL>` against the current view.
async fn select(tracker: &AppTracker, sel: &str) -> Result<MangaRecord, CliError> {
    select_from(&tracker.visible().await, &tracker.records().await, sel).cloned()
}

/// A 1-based position in `visible`, else an exact id, else a unique id
/// prefix among all `records`.
fn select_from<'a>(
    visible: &'a [MangaRecord],
    records: &'a [MangaRecord],
    sel: &str,
) -> Result<&'a MangaRecord, CliError> {
    let sel = sel.trim();
    if let Ok(position) = sel.parse::<usize>() {
        if let Some(record) = position.checked_sub(1).and_then(|i| visible.get(i)) {
            return Ok(record);
        }
    }
    if let Some(record) = records.iter().find(|r| r.id == sel) {
        return Ok(record);
    }

    let matches: Vec<_> = records.iter().filter(|r| r.id.starts_with(sel)).collect();
    match matches.as_slice() {
        [one] if !sel.is_empty() => Ok(one),
        [] | [_] => Err(CliError::Selection(format!("no title matches '{sel}'"))),
        many => Err(CliError::Selection(format!(
            "'{sel}' matches {} titles; use more of the id",
            many.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use scantrack_core::models::{Chapter, ReadingStatus};
    use scantrack_runtime::DbHandle;

    use crate::cli::ListArgs;

    use super::*;

    async fn local_runtime(titles: &[&str]) -> (Runtime, DbHandle) {
        let db = DbHandle::open_memory().unwrap();
        for title in titles {
            db.insert_manga(MangaDraft::new(*title).into_new_manga("c.jpg".into()))
                .await
                .unwrap();
        }
        let mut runtime = Runtime::with_db(AppConfig::default(), db.clone());
        runtime.start().await.unwrap();
        (runtime, db)
    }

    async fn applied(ticket: Option<WriteTicket>) {
        let ticket = ticket.expect("write should return a ticket");
        assert!(matches!(ticket.outcome().await, WriteOutcome::Applied));
    }

    #[tokio::test]
    async fn status_moves_record_and_list_switches_tab() {
        let (mut runtime, db) = local_runtime(&["Berserk", "Vagabond"]).await;
        let mut input = Input::new();
        let newest = runtime.tracker().visible().await[0].clone();

        let ticket = execute(
            &mut runtime,
            Command::Status {
                sel: "1".into(),
                status: ReadingStatus::Completed,
            },
            &mut input,
        )
        .await
        .unwrap();
        applied(ticket).await;

        let stored = db.list_manga().await.unwrap();
        let moved = stored.iter().find(|r| r.id == newest.id).unwrap();
        assert_eq!(moved.status, Some(ReadingStatus::Completed));

        let listed = execute(
            &mut runtime,
            Command::List(ListArgs {
                status: Some(ReadingStatus::Completed),
                search: None,
            }),
            &mut input,
        )
        .await
        .unwrap();
        assert!(listed.is_none());
        let visible = runtime.tracker().visible().await;
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, newest.id);
    }

    #[tokio::test]
    async fn next_and_forced_delete_reach_the_store() {
        let (mut runtime, db) = local_runtime(&["Monster"]).await;
        let mut input = Input::new();
        let id = runtime.tracker().records().await[0].id.clone();

        let ticket = execute(&mut runtime, Command::Next { sel: id.clone() }, &mut input)
            .await
            .unwrap();
        applied(ticket).await;
        assert_eq!(db.list_manga().await.unwrap()[0].current_chapter.get(), 2);

        let ticket = execute(
            &mut runtime,
            Command::Delete {
                sel: "1".into(),
                yes: true,
            },
            &mut input,
        )
        .await
        .unwrap();
        applied(ticket).await;
        assert!(db.list_manga().await.unwrap().is_empty());
        assert!(runtime.tracker().records().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_selector_is_reported() {
        let (mut runtime, _db) = local_runtime(&["Monster"]).await;
        let mut input = Input::new();
        let err = execute(&mut runtime, Command::Prev { sel: "9".into() }, &mut input)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Selection(_)));
    }

    fn record(id: &str, title: &str) -> MangaRecord {
        MangaRecord {
            id: id.into(),
            title: title.into(),
            current_chapter: Chapter::FIRST,
            slug: String::new(),
            cover: String::new(),
            status: None,
            site_url: None,
            created_at: None,
        }
    }

    #[test]
    fn position_then_id_then_prefix() {
        let records = vec![
            record("1718000000002", "Solo Leveling"),
            record("1718000000001", "Berserk"),
            record("a9f0", "Vagabond"),
        ];
        let visible = vec![records[0].clone(), records[2].clone()];

        assert_eq!(select_from(&visible, &records, "2").unwrap().title, "Vagabond");
        assert_eq!(
            select_from(&visible, &records, "1718000000001").unwrap().title,
            "Berserk"
        );
        assert_eq!(select_from(&visible, &records, "a9").unwrap().title, "Vagabond");
    }

    #[test]
    fn ambiguous_or_unknown_selection_fails() {
        let records = vec![record("1718000000002", "A"), record("1718000000001", "B")];
        let err = select_from(&records, &records, "17180").unwrap_err();
        assert!(err.to_string().contains("matches 2 titles"));

        assert!(select_from(&records, &records, "zz").is_err());
        assert!(select_from(&records, &records, "").is_err());
        assert!(select_from(&records, &records, "0").is_err());
    }
}
