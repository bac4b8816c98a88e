//! Command parsing and execution.

use std::io::{self, Write};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};

use fileshare_core::utils::truncate_string;
use fileshare_core::{AuthState, AuthStatePublisher, Config, FileRecord, User};

pub const USAGE: &str = "\
Usage: fileshare <command> [args]

Commands:
  login [email]          Sign in (prompts for password)
  register [email]       Create an account
  logout                 Sign out and forget the stored credential
  whoami                 Show the signed-in user
  files [--json]         List your files
  rename <id> <name>     Rename a file
  delete <id>            Delete a file
  stats                  Show storage and download totals
  passwd                 Change your password
  prefs <on|off> <on|off>
                         Set download alerts and expiry reminders
  delete-account         Permanently delete your account
  oauth <token>          Finish an OAuth sign-in with the redirect token
  help                   Show this message

Environment:
  FILESHARE_API_URL              API base URL
  FILESHARE_CREDENTIAL_BACKEND   file | keyring | memory
  RUST_LOG                       Log filter (default: warn)";

const NAME_WIDTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { email: Option<String> },
    Register { email: Option<String> },
    Logout,
    WhoAmI,
    Files { json: bool },
    Rename { id: String, name: String },
    Delete { id: String },
    Stats,
    Passwd,
    Prefs { download_alerts: bool, expiry_reminders: bool },
    DeleteAccount,
    OAuth { token: String },
    Help,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut args = args.iter().map(String::as_str);
        let name = args.next().unwrap_or("help");
        let rest: Vec<&str> = args.collect();

        let command = match (name, rest.as_slice()) {
            ("login", [email]) => Command::Login { email: Some(email.to_string()) },
            ("login", []) => Command::Login { email: None },
            ("register", [email]) => Command::Register { email: Some(email.to_string()) },
            ("register", []) => Command::Register { email: None },
            ("logout", []) => Command::Logout,
            ("whoami", []) => Command::WhoAmI,
            ("files", []) => Command::Files { json: false },
            ("files", ["--json"]) => Command::Files { json: true },
            ("rename", [id, new_name]) => Command::Rename {
                id: id.to_string(),
                name: new_name.to_string(),
            },
            ("delete", [id]) => Command::Delete { id: id.to_string() },
            ("stats", []) => Command::Stats,
            ("passwd", []) => Command::Passwd,
            ("prefs", [alerts, reminders]) => Command::Prefs {
                download_alerts: parse_switch(alerts)?,
                expiry_reminders: parse_switch(reminders)?,
            },
            ("delete-account", []) => Command::DeleteAccount,
            ("oauth", [token]) => Command::OAuth { token: token.to_string() },
            ("help" | "--help" | "-h", _) => Command::Help,
            (
                "login" | "register" | "logout" | "whoami" | "files" | "rename" | "delete"
                | "stats" | "passwd" | "prefs" | "delete-account" | "oauth",
                _,
            ) => bail!("Wrong arguments for '{}'", name),
            _ => bail!("Unknown command '{}'", name),
        };
        Ok(command)
    }

    /// Commands that act on behalf of a signed-in user.
    fn needs_user(&self) -> bool {
        !matches!(
            self,
            Command::Login { .. }
                | Command::Register { .. }
                | Command::Logout
                | Command::OAuth { .. }
                | Command::Help
        )
    }
}

fn parse_switch(value: &str) -> Result<bool> {
    match value {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => bail!("Expected 'on' or 'off', got '{}'", other),
    }
}

pub async fn run(command: Command, publisher: &AuthStatePublisher, config: &mut Config) -> Result<()> {
    if command.needs_user() {
        if let AuthState::Anonymous = publisher.initialize().await {
            bail!("Not signed in. Run 'fileshare login' first.");
        }
    }

    match command {
        Command::Login { email } => {
            let email = resolve_email(email, config)?;
            let password = rpassword::prompt_password("Password: ")?;
            let user = publisher.login(&email, &password).await?;
            remember_email(config, &user);
            println!("Signed in as {}", user.email);
        }
        Command::Register { email } => {
            let email = resolve_email(email, config)?;
            let password = prompt_new_password()?;
            let user = publisher.register(&email, &password).await?;
            remember_email(config, &user);
            println!("Account created for {}", user.email);
        }
        Command::Logout => {
            publisher.logout();
            println!("Signed out");
        }
        Command::WhoAmI => {
            let user = publisher
                .user()
                .ok_or_else(|| anyhow!("Not signed in"))?;
            print_user(&user);
        }
        Command::Files { json } => {
            let files = publisher.list_files().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&files)?);
            } else if files.is_empty() {
                println!("No files");
            } else {
                let now = Utc::now();
                println!(
                    "{:<24}  {:<width$}  {:>9}  {:>9}  {}",
                    "ID", "NAME", "SIZE", "DOWNLOADS", "EXPIRES",
                    width = NAME_WIDTH
                );
                for file in &files {
                    println!(
                        "{:<24}  {:<width$}  {:>9}  {:>9}  {}",
                        file.id,
                        truncate_string(&file.original_name, NAME_WIDTH),
                        file.size_display(),
                        file.download_count,
                        file.expiry_display(now),
                        width = NAME_WIDTH
                    );
                    println!("{:<24}  {}", "", file_details(file, now));
                }
            }
        }
        Command::Rename { id, name } => {
            publisher.rename_file(&id, &name).await?;
            println!("Renamed {} to {}", id, name);
        }
        Command::Delete { id } => {
            publisher.delete_file(&id).await?;
            println!("Deleted {}", id);
        }
        Command::Stats => {
            let stats = publisher.user_stats().await?;
            println!("Files:      {}", stats.total_files);
            println!("Downloads:  {}", stats.total_downloads);
            println!("Storage:    {}", stats.storage_used);
        }
        Command::Passwd => {
            let current = rpassword::prompt_password("Current password: ")?;
            let new_password = prompt_new_password()?;
            publisher.change_password(&current, &new_password).await?;
            println!("Password changed");
        }
        Command::Prefs { download_alerts, expiry_reminders } => {
            let user = publisher
                .update_notification_preferences(download_alerts, expiry_reminders)
                .await?;
            print_user(&user);
        }
        Command::DeleteAccount => {
            let answer = prompt("Type DELETE to permanently remove your account and files: ")?;
            if answer != "DELETE" {
                println!("Cancelled");
                return Ok(());
            }
            publisher.delete_account().await?;
            config.last_email = None;
            save_config(config);
            println!("Account deleted");
        }
        Command::OAuth { token } => {
            let user = publisher.complete_oauth(&token).await?;
            remember_email(config, &user);
            println!("Signed in as {}", user.email);
        }
        Command::Help => println!("{}", USAGE),
    }

    Ok(())
}

fn print_user(user: &User) {
    let switch = |on: bool| if on { "on" } else { "off" };
    let prefs = user.preferences();
    println!("{}", user.email);
    println!("  Member since:      {}", fileshare_core::utils::format_date(&user.created_at));
    println!("  Download alerts:   {}", switch(prefs.download_alerts));
    println!("  Expiry reminders:  {}", switch(prefs.expiry_reminders));
}

/// Second listing line: type, upload date and the share link while it works.
fn file_details(file: &FileRecord, now: DateTime<Utc>) -> String {
    let link = match file.share_url() {
        _ if file.is_expired(now) => "link expired",
        Some(url) => url,
        None => "no link",
    };
    format!("{} | uploaded {} | {}", file.content_type(), file.uploaded_display(), link)
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line).context("Failed to read input")?;
    Ok(line.trim().to_string())
}

fn resolve_email(email: Option<String>, config: &Config) -> Result<String> {
    if let Some(email) = email {
        return Ok(email);
    }
    let label = match &config.last_email {
        Some(last) => format!("Email [{}]: ", last),
        None => "Email: ".to_string(),
    };
    let entered = prompt(&label)?;
    match (entered.is_empty(), &config.last_email) {
        (false, _) => Ok(entered),
        (true, Some(last)) => Ok(last.clone()),
        (true, None) => bail!("Email is required"),
    }
}

fn prompt_new_password() -> Result<String> {
    let password = rpassword::prompt_password("New password: ")?;
    if password.is_empty() {
        bail!("Password cannot be empty");
    }
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    if password != confirm {
        bail!("Passwords do not match");
    }
    Ok(password)
}

fn remember_email(config: &mut Config, user: &User) {
    config.last_email = Some(user.email.clone());
    save_config(config);
}

/// Config persistence is best effort; the command already succeeded.
fn save_config(config: &Config) {
    if let Err(e) = config.save() {
        tracing::warn!(error = %e, "Failed to save config");
    }
}
