use std::time::SystemTime;

use cfs::ext::SystemTimeExt;
use cfs::filesystem::{Directory, FileAttributes, Node, SimpleFile};
use cfs::watch::{FileModification, ModificationKind};
use colored::{Color, Colorize};
use supports_color::Stream;

pub fn configure_colors() {
    colored::control::set_override(supports_color::on(Stream::Stdout).is_some());
}

pub fn print_directory(directory: &Directory) {
    println!("{}", format!("{}/", directory.name()).blue().bold());
}

pub fn print_file(file: &SimpleFile) {
    println!("{}", file.name());
}

pub fn print_modification(event: &FileModification) {
    let color = match event.kind() {
        ModificationKind::Create => Color::Green,
        ModificationKind::Delete => Color::Red,
        ModificationKind::Modify => Color::Yellow,
    };
    println!(
        "{} {}",
        event.kind().to_string().color(color).bold(),
        event.target().path()
    );
}

pub fn print_stat(file: &SimpleFile, size: u64, attributes: &FileAttributes) {
    println!("{} {}", "path".bold(), file.path());
    println!("{} {}", "physical".bold(), file.physical_path().display());
    println!("{} {}", "size".bold(), size);
    println!("{} {}", "modified".bold(), render_time(attributes.last_modified()));
    println!("{} {}", "created".bold(), render_time(attributes.created()));
    println!("{} {}", "accessed".bold(), render_time(attributes.last_accessed()));
}

fn render_time(time: Option<SystemTime>) -> String {
    time.and_then(|time| time.to_epoch_millis())
        .map(|millis| format!("{millis} ms since epoch"))
        .unwrap_or_else(|| "-".to_string())
}
