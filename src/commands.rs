// Command handlers: one function per CLI flow, generic over the settings
// store and the transport so the load-mutate-store cycle can run against
// in-memory doubles. `main.rs` only parses arguments and picks the real
// backends.

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

use crate::api::{Dispatcher, Transport};
use crate::config::{effective_token, update_config, ConfigUpdate, ConfigurationStore};
use crate::error::ApiError;
use crate::qr;
use crate::service::{resolve_short_url, LinkService};
use crate::ui;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new user account
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        /// Your password. If not provided, you will be prompted to enter it.
        #[arg(long)]
        password: Option<String>,
    },
    /// Authenticate with an existing account and store the issued token
    Login {
        #[arg(long)]
        username: String,
        /// Your password. If not provided, you will be prompted to enter it.
        #[arg(long)]
        password: Option<String>,
    },
    /// Create a shortened URL
    Create {
        /// The original URL to be shortened
        url: String,
        /// Custom path for the shortened URL
        #[arg(long)]
        custom_path: Option<String>,
        /// Save a QR code image of the shortened URL into this directory
        #[arg(long, value_name = "DIR")]
        generate_qr_code: Option<PathBuf>,
    },
    /// Delete a shortened URL
    Delete {
        /// The full shortened URL
        url: String,
    },
    /// Configure the instance URL and token
    Config {
        /// The URL of the instance to use for shortening links
        #[arg(long)]
        instance_url: Option<String>,
        /// Authentication token to use for API access
        #[arg(long)]
        token: Option<String>,
    },
    /// Check whether an instance is reachable
    Ping {
        /// Instance to check; defaults to the configured one
        url: Option<String>,
    },
    /// Show the active instance and whether a token is stored
    ShowConfig,
}

/// Exit code for a command that failed with `err`.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<ApiError>()
        .map_or(EXIT_FAILURE, ApiError::exit_code)
}

/// Run one command. Loads the settings once, and writes them back only
/// when the command actually changed something.
pub fn execute<S, T>(command: Command, store: &S, dispatcher: Dispatcher<T>) -> Result<u8>
where
    S: ConfigurationStore,
    T: Transport,
{
    let config = store.load()?;
    let service = LinkService::new(&config, dispatcher);

    match command {
        Command::Signup { username, email, password } => {
            let password = match password {
                Some(p) => p,
                None => ui::prompt_password(true)?,
            };
            let message = ui::with_spinner("Signing up...", || {
                service.register_user(&username, &password, &email)
            })?;
            ui::print_message(&message);
        }
        Command::Login { username, password } => {
            let password = match password {
                Some(p) => p,
                None => ui::prompt_password(false)?,
            };
            let token = ui::with_spinner("Logging in...", || service.authenticate(&username, &password))?;
            let update = ConfigUpdate { token: Some(token), ..Default::default() };
            let (next, _) = update_config(&config, update)?;
            store.save(&next)?;
            ui::print_success("Logged in successfully.");
        }
        Command::Create { url, custom_path, generate_qr_code } => {
            let shortened = ui::with_spinner("Shortening...", || {
                service.create_link(&url, custom_path.as_deref())
            })?;
            let link = resolve_short_url(service.instance_url(), &shortened)?;
            ui::print_link(&link);

            if let Some(dir) = generate_qr_code {
                let path = qr::save_link_qr_code(&link, &shortened, &dir)?;
                ui::print_message(&format!("QR code saved at {}", path.display()));
            }
        }
        Command::Delete { url } => {
            let message = ui::with_spinner("Deleting...", || service.delete_link(&url))?;
            ui::print_message(&message);
        }
        Command::Config { instance_url, token } => {
            let mut instance_url = instance_url.filter(|u| !u.is_empty());
            if let Some(candidate) = instance_url.as_deref() {
                let reachable = ui::with_spinner("Checking instance...", || service.ping_instance(candidate))?;
                if !reachable {
                    ui::print_warning(&format!(
                        "Could not validate {candidate}; the instance URL was not changed."
                    ));
                    instance_url = None;
                }
            }

            let (next, updated) = update_config(&config, ConfigUpdate { instance_url, token })?;
            if updated.is_empty() {
                ui::print_message("No configuration changes were made.");
            } else {
                store.save(&next)?;
                let fields: Vec<String> = updated.iter().map(ToString::to_string).collect();
                ui::print_success(&format!("Configuration updated successfully: {}", fields.join(", ")));
            }
        }
        Command::Ping { url } => {
            let target = url.unwrap_or_else(|| service.instance_url().to_string());
            let reachable = ui::with_spinner("Pinging...", || service.ping_instance(&target))?;
            if !reachable {
                ui::print_warning(&format!("{target} is not reachable."));
                return Ok(EXIT_FAILURE);
            }
            ui::print_success(&format!("{target} is reachable."));
        }
        Command::ShowConfig => {
            if let Some(path) = store.location() {
                ui::print_message(&format!("settings file: {}", path.display()));
            }
            ui::print_message(&format!("instance URL:  {}", service.instance_url()));
            let token_state = if effective_token(&config).is_some() { "stored" } else { "not set" };
            ui::print_message(&format!("token:         {token_state}"));
        }
    }

    Ok(EXIT_SUCCESS)
}
