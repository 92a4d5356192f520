//! Logging and output control
//!
//! This module provides the [`Logger`] for controlling output verbosity, formatting
//! messages, rendering image pull progress and tracking operation timing. It supports
//! quiet, normal and verbose output. A `Logger` is built once from the command-line
//! flags and cloned into every component that reports to the operator.

use std::io::{self, Write};
use std::time::{Duration, Instant};

/// Progress event reported by the engine while pulling one image layer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerProgress {
    pub layer_id: Option<String>,
    pub status: String,
    pub current: Option<u64>,
    pub total: Option<u64>,
}

/// Message severity; decides the prefix, the stream and when a line is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Detail,
    Info,
    Step,
    Success,
    Warning,
    Error,
}

impl Level {
    fn prefix(self) -> &'static str {
        match self {
            Level::Debug => "🐛 DEBUG: ",
            Level::Detail => "   ",
            Level::Info => "ℹ️  ",
            Level::Step => "▶️  ",
            Level::Success => "✅ ",
            Level::Warning => "⚠️  WARNING: ",
            Level::Error => "❌ ERROR: ",
        }
    }

    fn to_stderr(self) -> bool {
        matches!(self, Level::Warning | Level::Error)
    }
}

/// Logger responsible for all user-visible output
#[derive(Debug, Clone)]
pub struct Logger {
    pub verbose: bool,
    pub quiet: bool,
    pub start_time: Option<Instant>,
}

impl Logger {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            quiet: false,
            start_time: Some(Instant::now()),
        }
    }

    pub fn new_quiet() -> Self {
        Self {
            verbose: false,
            quiet: true,
            ..Self::new(false)
        }
    }

    /// Whether a message at `level` is printed under the current flags.
    /// Warnings and errors always are.
    pub fn enabled(&self, level: Level) -> bool {
        match level {
            Level::Warning | Level::Error => true,
            Level::Debug | Level::Detail => self.verbose && !self.quiet,
            _ => !self.quiet,
        }
    }

    pub fn log(&self, level: Level, message: &str) {
        if !self.enabled(level) {
            return;
        }
        if level.to_stderr() {
            eprintln!("{}{}", level.prefix(), message);
        } else {
            println!("{}{}", level.prefix(), message);
        }
    }

    /// Main section heading
    pub fn section(&self, title: &str) {
        self.heading('=', title);
    }

    pub fn subsection(&self, title: &str) {
        self.heading('-', title);
    }

    fn heading(&self, rule: char, title: &str) {
        if !self.quiet {
            let rule = rule.to_string().repeat(3);
            println!("\n{} {} {}", rule, title, rule);
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    pub fn success(&self, message: &str) {
        self.log(Level::Success, message);
    }

    /// Shown even in quiet mode
    pub fn warning(&self, message: &str) {
        self.log(Level::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }

    pub fn step(&self, message: &str) {
        self.log(Level::Step, message);
    }

    /// Verbose-only detail line
    pub fn detail(&self, message: &str) {
        self.log(Level::Detail, message);
    }

    /// Start an in-line progress message; finish it with [`Logger::progress_done`]
    pub fn progress(&self, message: &str) {
        if !self.quiet {
            print!("⏳ {}...", message);
            let _ = io::stdout().flush();
        }
    }

    pub fn progress_done(&self) {
        if !self.quiet {
            println!(" done");
        }
    }

    pub fn summary_kv(&self, title: &str, items: &[(&str, String)]) {
        if self.quiet {
            return;
        }
        self.subsection(title);
        let width = items.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
        for (key, value) in items {
            println!("  {:<width$}  {}", format!("{}:", key), value, width = width + 1);
        }
    }

    /// Print an already rendered block (tables, vertical listings)
    pub fn block(&self, text: &str) {
        if !self.quiet {
            println!("{}", text.trim_end_matches('\n'));
        }
    }

    /// Render one layer progress event from an image pull.
    ///
    /// Verbose mode prints every event on its own line. Otherwise only
    /// completed layers are printed, so a pull of a cached image stays quiet.
    pub fn layer_progress(&self, event: &LayerProgress) {
        if self.quiet {
            return;
        }

        let finished = ["Pull complete", "Already exists"]
            .iter()
            .any(|status| event.status.starts_with(status));
        if self.verbose || finished {
            println!("   {}", self.format_layer_progress(event));
        }
    }

    pub fn format_layer_progress(&self, event: &LayerProgress) -> String {
        let mut line = match &event.layer_id {
            Some(id) => format!("{}: {}", id, event.status),
            None => event.status.clone(),
        };

        if let (Some(current), Some(total)) = (event.current, event.total) {
            if total > 0 {
                let percentage = (current as f64 / total as f64) * 100.0;
                line.push_str(&format!(
                    " {:.1}% ({} / {})",
                    percentage,
                    self.format_size(current),
                    self.format_size(total)
                ));
            }
        }

        line
    }

    /// Human-readable byte count in binary units
    pub fn format_size(&self, bytes: u64) -> String {
        const UNITS: [&str; 3] = ["KB", "MB", "GB"];
        if bytes < 1024 {
            return format!("{} B", bytes);
        }
        let mut value = bytes as f64 / 1024.0;
        let mut unit = 0;
        while value >= 1024.0 && unit < UNITS.len() - 1 {
            value /= 1024.0;
            unit += 1;
        }
        format!("{:.1} {}", value, UNITS[unit])
    }

    /// Format duration in human-readable format
    pub fn format_duration(&self, duration: Duration) -> String {
        let secs = duration.as_secs();
        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m{}s", secs / 60, secs % 60)
        } else {
            format!("{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time
            .map(|start| start.elapsed())
            .unwrap_or_default()
    }
}
