//! Terminal output. Layout (widths, truncation, padding) is computed here in
//! Rust; every function returns the text so it can be checked without a tty.

use chrono::{Local, NaiveDateTime};
use colored::Colorize;
use servicenotes::backup::BackupEntry;
use servicenotes::config::{NotesConfig, RemoteConfig};
use servicenotes::model::{Record, Summary};
use servicenotes::store::{PullOutcome, PushOutcome, StoreStatus, SyncHealth};
use std::fmt::Write;
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LINE_WIDTH: usize = 100;
const DATE_WIDTH: usize = 10;
const PASSAGE_WIDTH: usize = 24;
const TIME_WIDTH: usize = 14;

pub(super) fn render_record_list(records: &[Record]) -> String {
    if records.is_empty() {
        return "No records found.\n".to_string();
    }

    let idx_width = records.len().to_string().len() + 2;
    let mut out = String::new();
    for (i, record) in records.iter().enumerate() {
        let idx_str = format!("{:>width$}", format!("{}.", i + 1), width = idx_width);
        let fixed = 4 + idx_str.width() + 1 + DATE_WIDTH + 2 + 2 + PASSAGE_WIDTH;
        let theme_width = LINE_WIDTH.saturating_sub(fixed);

        let theme = truncate_to_width(&record.theme, theme_width);
        let theme_padding = theme_width.saturating_sub(theme.width());
        let passage = truncate_to_width(&record.passage, PASSAGE_WIDTH);

        let _ = writeln!(
            out,
            "    {} {:<date_w$}  {}{}  {}",
            idx_str.yellow(),
            record.date,
            theme,
            " ".repeat(theme_padding),
            passage.dimmed(),
            date_w = DATE_WIDTH,
        );
    }
    out
}

pub(super) fn render_record(number: usize, record: &Record) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}",
        format!("{}.", number).yellow(),
        record.theme.bold()
    );
    let _ = writeln!(out, "--------------------------------");
    let _ = writeln!(out, "{:<12}{}", "Date:".dimmed(), record.date);
    let _ = writeln!(out, "{:<12}{}", "Passage:".dimmed(), record.passage);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "Service notes".bold());
    let _ = writeln!(out, "{}", record.service_notes);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "Devotional".bold());
    let _ = writeln!(out, "{}", record.devotional);
    out
}

pub(super) fn render_summary(summary: &Summary) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", "Themes".bold());
    if summary.themes.is_empty() {
        let _ = writeln!(out, "  {}", "(none)".dimmed());
    }
    for theme in &summary.themes {
        let _ = writeln!(out, "  {}", theme);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "Passages by book".bold());
    if summary.passages_by_book.is_empty() {
        let _ = writeln!(out, "  {}", "(none)".dimmed());
    }
    for (book, passages) in &summary.passages_by_book {
        let _ = writeln!(out, "  {}", book.yellow());
        for passage in passages {
            let _ = writeln!(out, "    {}", passage);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "Dates".bold());
    let dates = summary.dates_chronological();
    if dates.is_empty() {
        let _ = writeln!(out, "  {}", "(none)".dimmed());
    }
    for date in dates {
        let _ = writeln!(out, "  {}", date);
    }
    out
}

pub(super) fn render_status(status: &StoreStatus) -> String {
    let health = match &status.health {
        SyncHealth::LocalOnly => "local only".normal(),
        SyncHealth::Unchecked => "not checked".dimmed(),
        SyncHealth::Synced => "synced".green(),
        SyncHealth::Degraded { reason } => format!("degraded: {}", reason).red(),
    };

    let mut out = String::new();
    let _ = writeln!(out, "{:<10}{}", "file:", status.local_file.display());
    let _ = writeln!(
        out,
        "{:<10}{}",
        "remote:",
        status.remote.as_deref().unwrap_or("none")
    );
    let _ = writeln!(out, "{:<10}{}", "records:", status.records);
    let _ = writeln!(out, "{:<10}{}", "sync:", health);
    if let Some(pull) = &status.last_pull {
        let pull = match pull {
            PullOutcome::Downloaded => "downloaded newer remote copy".to_string(),
            PullOutcome::UpToDate => "local copy is current".to_string(),
            PullOutcome::RemoteUnavailable(reason) => format!("remote unavailable: {}", reason),
            PullOutcome::DownloadFailed(reason) => format!("download failed: {}", reason),
        };
        let _ = writeln!(out, "{:<10}{}", "pull:", pull);
    }
    out
}

pub(super) fn render_backups(entries: &[BackupEntry]) -> String {
    if entries.is_empty() {
        return "No backups found.\n".to_string();
    }

    let now = Local::now().naive_local();
    let mut out = String::new();
    for entry in entries {
        let name = entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| entry.path.display().to_string());
        let _ = writeln!(
            out,
            "    {}  {}",
            name,
            format_time_ago(entry.taken_at, now).dimmed()
        );
    }
    out
}

pub(super) fn render_config(config: &NotesConfig, data_path: &str, backup_dir: &str) -> String {
    let remote = match &config.remote {
        RemoteConfig::None => "none".to_string(),
        RemoteConfig::Directory { root, path } => {
            format!("directory {} ({})", root.display(), path)
        }
        RemoteConfig::Dropbox { path, token } => format!(
            "dropbox {} (token {})",
            path,
            if token.is_some() { "in config" } else { "from environment" }
        ),
    };

    let mut out = String::new();
    let _ = writeln!(out, "{:<20}{}", "data-file", data_path);
    let _ = writeln!(out, "{:<20}{}", "backup-dir", backup_dir);
    let _ = writeln!(out, "{:<20}{}", "backup-prefix", config.backup_prefix);
    let _ = writeln!(out, "{:<20}{}", "backup-after-write", config.backup_after_write);
    let _ = writeln!(out, "{:<20}{}", "remote", remote);
    out
}

pub(super) fn success(message: &str) {
    println!("{}", message.green());
}

/// Printed when a change was applied locally but could not be written out.
pub(super) fn warn_not_persisted() {
    println!(
        "{}",
        "Warning: the change could not be saved; see the log for details.".yellow()
    );
}

/// Printed when the local save worked but the remote copy is now behind.
pub(super) fn warn_upload(upload: Option<&PushOutcome>) {
    if let Some(PushOutcome::Failed(reason)) = upload {
        println!(
            "{}",
            format!("Warning: saved locally, but the upload failed: {}", reason).yellow()
        );
    }
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let c = if c == '\n' { ' ' } else { c };
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}

fn format_time_ago(taken_at: NaiveDateTime, now: NaiveDateTime) -> String {
    let duration = now.signed_duration_since(taken_at);
    let time_str = Formatter::new().convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}
