use chat::Sender;
use chat_client::{Entry, EntryState};
use colored::*;

pub fn print_entry(entry: &Entry, local: &Sender) {
    let time = entry.timestamp.format("%H:%M:%S").to_string();
    let name = if entry.sender_id == local.id() {
        entry.sender_name.bright_blue().bold()
    } else {
        entry.sender_name.bright_magenta().bold()
    };

    let marker = match entry.state {
        EntryState::Pending => " …".yellow(),
        EntryState::Unsent => " ✗ unsent".red(),
        EntryState::Confirmed => "".normal(),
    };

    println!("[{}] {}: {}{}", time.dimmed(), name, entry.text, marker);
}

pub fn print_confirmation(entry: &Entry) {
    if let Some(sequence) = entry.sequence {
        println!("   {} {}", "✓".green(), format!("delivered as #{sequence}").dimmed());
    }
}

pub fn print_status(message: &str) {
    println!("{} {}", "→".blue(), message);
}

pub fn print_error(message: &str) {
    println!("{} {}", "✗".red(), message.red());
}
