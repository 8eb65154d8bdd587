use super::render::{
    render_backups, render_config, render_record, render_record_list, render_status,
    render_summary, success, warn_not_persisted, warn_upload,
};
use super::setup::{Cli, Commands};
use chrono::Local;
use directories::ProjectDirs;
use servicenotes::backup::{BackupGuard, BackupManager};
use servicenotes::config::{NotesConfig, HOME_ENV, TOKEN_ENV};
use servicenotes::error::{NotesError, Result};
use servicenotes::model::RecordFields;
use servicenotes::server;
use servicenotes::store::{Receipt, RecordStore};
use std::path::PathBuf;
use std::sync::Arc;

struct AppContext {
    home: PathBuf,
    config: NotesConfig,
    store: Arc<RecordStore>,
    backups: BackupManager,
    // Dropped last, when the command has finished: takes the shutdown backup.
    _shutdown_backup: BackupGuard,
}

pub(super) fn execute(cli: Cli) -> Result<()> {
    let ctx = init_context()?;

    match cli.command {
        None | Some(Commands::List) => handle_list(&ctx),
        Some(Commands::View { index }) => handle_view(&ctx, index),
        Some(Commands::Add {
            date,
            theme,
            passage,
            notes,
            devotional,
        }) => {
            let date = date.unwrap_or_else(today);
            handle_add(
                &ctx,
                RecordFields::new(date, theme, passage, notes, devotional),
            )
        }
        Some(Commands::Edit {
            index,
            date,
            theme,
            passage,
            notes,
            devotional,
        }) => handle_edit(
            &ctx,
            index,
            FieldChanges {
                date,
                theme,
                passage,
                notes,
                devotional,
            },
        ),
        Some(Commands::Delete { index }) => handle_delete(&ctx, index),
        Some(Commands::Summary) => handle_summary(&ctx),
        Some(Commands::Status) => handle_status(&ctx),
        Some(Commands::Backup) => handle_backup(&ctx),
        Some(Commands::Backups) => handle_backups(&ctx),
        Some(Commands::Restore { backup }) => handle_restore(&ctx, &backup),
        Some(Commands::Config) => handle_config(&ctx),
        Some(Commands::Serve { bind }) => server::serve(Arc::clone(&ctx.store), bind),
    }
}

fn init_context() -> Result<AppContext> {
    let home = resolve_home()?;
    let config = NotesConfig::load(&home)?;
    let env_token = std::env::var(TOKEN_ENV).ok();
    let store = Arc::new(config.open_store(&home, env_token));
    let backups = config.backup_manager(&home);

    Ok(AppContext {
        _shutdown_backup: backups.clone().guard(),
        home,
        config,
        store,
        backups,
    })
}

/// `$SERVICENOTES_HOME`, else the platform data directory.
fn resolve_home() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|h| !h.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    ProjectDirs::from("org", "servicenotes", "servicenotes")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            NotesError::Config(format!(
                "could not determine a data directory; set {}",
                HOME_ENV
            ))
        })
}

fn today() -> String {
    Local::now().format("%d/%m/%Y").to_string()
}

/// Record numbers shown to users start at 1.
fn to_position(number: usize) -> Result<usize> {
    number
        .checked_sub(1)
        .ok_or_else(|| NotesError::Validation("Record numbers start at 1".to_string()))
}

/// Error text for the terminal, with positions shown as record numbers.
pub(super) fn describe_error(e: &NotesError) -> String {
    match e {
        NotesError::IndexOutOfRange { index, len } => match len {
            0 => format!("No record {} (there are no records)", index + 1),
            1 => format!("No record {} (there is 1 record)", index + 1),
            _ => format!("No record {} (there are {} records)", index + 1, len),
        },
        other => other.to_string(),
    }
}

fn report(receipt: &Receipt, verb: &str) {
    success(&format!(
        "{} {}. {} ({})",
        verb,
        receipt.index + 1,
        receipt.record.theme,
        receipt.record.date
    ));
    if !receipt.persisted {
        warn_not_persisted();
    }
    warn_upload(receipt.upload.as_ref());
}

fn handle_list(ctx: &AppContext) -> Result<()> {
    print!("{}", render_record_list(&ctx.store.list()));
    Ok(())
}

fn handle_view(ctx: &AppContext, number: usize) -> Result<()> {
    let record = ctx.store.get(to_position(number)?)?;
    print!("{}", render_record(number, &record));
    Ok(())
}

fn handle_add(ctx: &AppContext, fields: RecordFields) -> Result<()> {
    let receipt = ctx.store.add(fields)?;
    report(&receipt, "Added");
    Ok(())
}

/// Fields given on the command line; `None` keeps the current value.
struct FieldChanges {
    date: Option<String>,
    theme: Option<String>,
    passage: Option<String>,
    notes: Option<String>,
    devotional: Option<String>,
}

impl FieldChanges {
    fn apply(self, mut fields: RecordFields) -> RecordFields {
        if let Some(date) = self.date {
            fields.date = date;
        }
        if let Some(theme) = self.theme {
            fields.theme = theme;
        }
        if let Some(passage) = self.passage {
            fields.passage = passage;
        }
        if let Some(notes) = self.notes {
            fields.service_notes = notes;
        }
        if let Some(devotional) = self.devotional {
            fields.devotional = devotional;
        }
        fields
    }
}

fn handle_edit(ctx: &AppContext, number: usize, changes: FieldChanges) -> Result<()> {
    let position = to_position(number)?;
    let current = ctx.store.get(position)?;
    let receipt = ctx
        .store
        .update(position, changes.apply(RecordFields::from(current)))?;
    report(&receipt, "Updated");
    Ok(())
}

fn handle_delete(ctx: &AppContext, number: usize) -> Result<()> {
    let receipt = ctx.store.delete(to_position(number)?)?;
    report(&receipt, "Deleted");
    Ok(())
}

fn handle_summary(ctx: &AppContext) -> Result<()> {
    print!("{}", render_summary(&ctx.store.summarize()));
    Ok(())
}

fn handle_status(ctx: &AppContext) -> Result<()> {
    print!("{}", render_status(&ctx.store.status()));
    Ok(())
}

fn handle_backup(ctx: &AppContext) -> Result<()> {
    let path = ctx.backups.snapshot()?;
    success(&format!("Backup written to {}", path.display()));
    Ok(())
}

fn handle_backups(ctx: &AppContext) -> Result<()> {
    print!("{}", render_backups(&ctx.backups.list()?));
    Ok(())
}

fn handle_restore(ctx: &AppContext, name: &str) -> Result<()> {
    let path = ctx.backups.resolve(name)?;
    let restored = ctx.store.restore(&path)?;
    success(&format!(
        "Restored {} records from {}",
        restored.records,
        path.display()
    ));
    if !restored.persisted {
        warn_not_persisted();
    }
    warn_upload(restored.upload.as_ref());
    Ok(())
}

fn handle_config(ctx: &AppContext) -> Result<()> {
    print!(
        "{}",
        render_config(
            &ctx.config,
            &ctx.config.data_path(&ctx.home).display().to_string(),
            &ctx.backups.dir().display().to_string(),
        )
    );
    Ok(())
}
