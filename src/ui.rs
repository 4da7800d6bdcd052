// UI layer: prompts, a spinner while a request is in flight, and colored
// output. Commands decide what to say; this module only decides how it
// looks on the terminal.

use anyhow::Result;
use crossterm::style::Stylize;
use dialoguer::Password;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::error::ApiError;

/// Ask for a password with hidden input. With `confirm` set the user has to
/// type it twice, as on signup.
pub fn prompt_password(confirm: bool) -> Result<String> {
    let mut prompt = Password::new();
    prompt.with_prompt("Password");
    if confirm {
        prompt.with_confirmation("Repeat password", "Error: the passwords don't match.");
    }
    Ok(prompt.interact()?)
}

/// Run `f` while showing a spinner with `message`. The spinner is cleared
/// before returning so the result can be printed on a clean line.
pub fn with_spinner<T>(message: &str, f: impl FnOnce() -> T) -> T {
    let spinner = ProgressBar::new_spinner();
    // The template is static; fall back to the default style if it is rejected.
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    let out = f();
    spinner.finish_and_clear();
    out
}

pub fn print_message(message: &str) {
    println!("{message}");
}

pub fn print_success(message: &str) {
    println!("{}", message.green());
}

pub fn print_link(link: &str) {
    println!("{} {}", "link:".yellow(), link);
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", "Warning:".yellow(), message);
}

/// Render a classified failure. Fatal errors get a louder prefix.
pub fn print_error(err: &ApiError) {
    if err.is_fatal() {
        eprintln!("{} {}", "Fatal:".red().bold(), err);
    } else {
        eprintln!("{}", err.to_string().red());
    }
}
