//! User-facing CLI messages (stdout, errors on stderr).

use ansi_term::{Colour, Style};
use std::fmt;

enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    fn style(&self) -> (Style, &'static str) {
        match self {
            Level::Info => (Colour::Blue.bold(), "ℹ️"),
            Level::Success => (Colour::Green.bold(), "✅"),
            Level::Warning => (Colour::Yellow.bold(), "⚠️"),
            Level::Error => (Colour::Red.bold(), "❌"),
        }
    }
}

fn render<T: fmt::Display>(level: Level, msg: T) -> String {
    let (style, icon) = level.style();
    format!("{} {msg}", style.paint(icon))
}

pub fn info<T: fmt::Display>(msg: T) {
    println!("{}", render(Level::Info, msg));
}

pub fn success<T: fmt::Display>(msg: T) {
    println!("{}", render(Level::Success, msg));
}

pub fn warning<T: fmt::Display>(msg: T) {
    println!("{}", render(Level::Warning, msg));
}

pub fn error<T: fmt::Display>(msg: T) {
    eprintln!("{}", render(Level::Error, msg));
}

/// Section header
pub fn header<T: fmt::Display>(msg: T) {
    println!("{}\n", Colour::Blue.bold().paint(format!("== {msg} ==")));
}
