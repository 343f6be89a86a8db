use std::fmt::Display;
use std::time::Duration;

use owo_colors::OwoColorize;
use shelfmark_core::{ArchiveReport, Bookmark};

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {}", "Shelfmark".bold().bright_blue(), format!("v{VERSION}").dimmed());
    eprintln!("{}", "Bookmarks with readable text and offline archives\n".dimmed());
}

fn status(symbol: impl Display, message: impl Display) {
    eprintln!("{symbol} {message}");
}

/// Print `[step/total] message`, one line per bookmark being processed
pub fn print_step(step: usize, total: usize, message: &str) {
    status(format!("[{step}/{total}]").dimmed(), message.bright_cyan());
}

pub fn print_success(message: &str) {
    status("✓".green(), message.bright_green());
}

pub fn print_info(message: &str) {
    status("ℹ".blue(), message.bright_blue());
}

pub fn print_warning(message: &str) {
    status("⚠".yellow(), message.bright_yellow());
}

pub fn print_error(message: &str) {
    status("✗".red(), message.bright_red());
}

/// Print how long a bookmark took; a page with many subresources is slow by nature
pub fn print_timing(label: &str, duration: Duration) {
    let secs = duration.as_secs_f64();
    let label = format!("{label}:");
    match secs {
        s if s < 2.0 => eprintln!("  {} {s:>6.2}s ({})", label.dimmed(), "fast".dimmed()),
        s if s < 10.0 => eprintln!("  {} {s:>6.2}s ({})", label.dimmed(), "moderate".bright_yellow()),
        s => eprintln!("  {} {s:>6.2}s ({})", label.dimmed(), "slow".bright_red()),
    }
}

/// Print resource counts of a freshly written archive
pub fn print_archive_report(report: &ArchiveReport, size: Option<u64>) {
    let size = size.map(|s| format!(", {}", format_size(s))).unwrap_or_default();
    eprintln!(
        "  {} {} resources, {} failed{}",
        "Archive:".dimmed(),
        report.saved.to_string().bright_white(),
        report.warnings.len().to_string().bright_white(),
        size.dimmed()
    );
}

/// Print one bookmark as an index, title, URL, excerpt and tag block
pub fn print_bookmark(bookmark: &Bookmark) {
    println!("{} {}", format!("{}.", bookmark.id).bright_cyan(), bookmark.title.bold());
    println!("   {}", bookmark.url.bright_yellow().underline());
    if !bookmark.excerpt.is_empty() {
        println!("   {}", bookmark.excerpt.dimmed());
    }
    if !bookmark.tags.is_empty() {
        let tags: Vec<String> = bookmark.tags.iter().map(|t| format!("#{}", t.name)).collect();
        println!("   {}", tags.join(" ").bright_magenta());
    }
    println!();
}

/// Print the index moves caused by compaction after a delete
pub fn print_moves(moves: &[(i64, i64)]) {
    for (old, new) in moves {
        print_info(&format!("Bookmark {old} moved to index {new}"));
    }
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;

    match bytes {
        b if b >= MB => format!("{:.1} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1} KB", b as f64 / KB as f64),
        b => format!("{b} B"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024 + 512 * 1024), "3.5 MB");
    }
}
