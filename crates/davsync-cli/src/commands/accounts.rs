//! Accounts command - Manage DAV accounts
//!
//! Provides the `davsync accounts` CLI command which:
//! 1. Lists the configured accounts with their status
//! 2. Adds a new (disabled) account
//! 3. Enables or disables an account, restoring or caching its folders
//! 4. Removes an account together with its folder registry
//! 5. Shows and edits account options, honoring the settings locks

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use davsync_core::domain::account::DEFAULT_SERVER_TYPE;
use davsync_core::domain::Account;
use davsync_core::ports::IStateRepository;
use davsync_core::usecases::account_settings::{
    account_options, is_option_locked, provider_icon, set_account_option,
};
use davsync_core::usecases::AccountLifecycleUseCase;
use tracing::info;

use super::{parse_account_id, AppContext};

#[derive(Debug, Subcommand)]
pub enum AccountsCommand {
    /// List accounts
    List,
    /// Add an account (it starts disabled)
    Add(AddAccountArgs),
    /// Enable an account
    Enable {
        /// Account id
        account: String,
    },
    /// Disable an account, caching its folders
    Disable {
        /// Account id
        account: String,
    },
    /// Remove an account and its folders
    Remove {
        /// Account id
        account: String,
    },
    /// Show every option of an account
    Show {
        /// Account id
        account: String,
    },
    /// Change one account option
    Set {
        /// Account id
        account: String,
        /// Option name (see `accounts show`)
        option: String,
        /// New value
        value: String,
    },
}

#[derive(Debug, Args)]
pub struct AddAccountArgs {
    /// Display name
    #[arg(long)]
    pub name: String,
    /// Server host name, optionally with a port
    #[arg(long)]
    pub host: String,
    /// User name
    #[arg(long)]
    pub user: String,
    /// Server type tag
    #[arg(long, default_value = DEFAULT_SERVER_TYPE)]
    pub server_type: String,
    /// Connect over plain HTTP
    #[arg(long)]
    pub http: bool,
    /// Authentication method
    #[arg(long, default_value = "")]
    pub auth_method: String,
    /// Periodic sync interval in minutes (0 = off)
    #[arg(long, default_value_t = 0)]
    pub autosync_minutes: u32,
    /// Never push local changes to the server
    #[arg(long)]
    pub download_only: bool,
    /// Enable the account right away
    #[arg(long)]
    pub enable: bool,
}

impl AccountsCommand {
    pub async fn execute(&self, app: &AppContext) -> Result<()> {
        let repo: Arc<dyn IStateRepository + Send + Sync> = app.open_repository().await?;

        match self {
            AccountsCommand::List => list(app, repo.as_ref()).await,
            AccountsCommand::Add(args) => {
                let mut account = add_account(repo.as_ref(), args).await?;
                if args.enable {
                    account = AccountLifecycleUseCase::new(Arc::clone(&repo))
                        .enable(account.id())
                        .await?;
                }
                report(app, "Account added", &account);
                Ok(())
            }
            AccountsCommand::Enable { account } => {
                let id = parse_account_id(account)?;
                let account = AccountLifecycleUseCase::new(repo).enable(&id).await?;
                report(app, "Account enabled", &account);
                Ok(())
            }
            AccountsCommand::Disable { account } => {
                let id = parse_account_id(account)?;
                let account = AccountLifecycleUseCase::new(repo).disable(&id).await?;
                report(app, "Account disabled", &account);
                Ok(())
            }
            AccountsCommand::Remove { account } => {
                let account = remove_account(repo.as_ref(), account).await?;
                report(app, "Account removed", &account);
                Ok(())
            }
            AccountsCommand::Show { account } => {
                let account = load_account(repo.as_ref(), account).await?;
                show_options(app, &account);
                Ok(())
            }
            AccountsCommand::Set {
                account,
                option,
                value,
            } => {
                let account = set_option(repo.as_ref(), account, option, value).await?;
                report(app, &format!("Set {option}"), &account);
                Ok(())
            }
        }
    }
}

async fn list(app: &AppContext, repo: &dyn IStateRepository) -> Result<()> {
    let formatter = app.formatter();
    let accounts = repo.list_accounts().await.context("Failed to list accounts")?;

    if app.is_json() {
        let json: Vec<_> = accounts.iter().map(account_json).collect();
        formatter.print_json(&serde_json::Value::Array(json));
        return Ok(());
    }

    if accounts.is_empty() {
        formatter.info("No accounts configured. Run 'davsync accounts add' first.");
        return Ok(());
    }

    formatter.success(&format!("{} account(s)", accounts.len()));
    for account in &accounts {
        formatter.info("");
        formatter.info(&format!("{}  {}", account.id(), account.name()));
        formatter.info(&format!("  URL:       {}", account.base_url()));
        formatter.info(&format!("  User:      {}", account.user()));
        formatter.info(&format!("  Status:    {}", account.status()));
        formatter.info(&format!("  Last sync: {}", last_sync_text(account)));
        if account.autosync_minutes() > 0 {
            formatter.info(&format!("  Autosync:  every {} min", account.autosync_minutes()));
        }
    }
    Ok(())
}

/// Creates and stores a disabled account from the command line arguments
async fn add_account(repo: &dyn IStateRepository, args: &AddAccountArgs) -> Result<Account> {
    let mut account = Account::new(args.name.clone(), args.host.clone(), args.user.clone());
    account.set_server_type(args.server_type.clone());
    account.set_https(!args.http);
    account.set_auth(args.auth_method.clone(), "");
    account.set_autosync_minutes(args.autosync_minutes);
    account.set_download_only(args.download_only);
    account.validate()?;

    repo.save_account(&account)
        .await
        .context("Failed to save account")?;
    info!(account_id = %account.id(), host = %account.host(), "Account added");
    Ok(account)
}

async fn load_account(repo: &dyn IStateRepository, account: &str) -> Result<Account> {
    let id = parse_account_id(account)?;
    repo.get_account(&id)
        .await
        .context("Failed to load account")?
        .with_context(|| format!("Account not found: {}", id))
}

/// Deletes an account, returning the record that was removed
async fn remove_account(repo: &dyn IStateRepository, account: &str) -> Result<Account> {
    let account = load_account(repo, account).await?;
    let id = *account.id();
    repo.delete_account(&id)
        .await
        .context("Failed to delete account")?;
    info!(account_id = %id, "Account removed");
    Ok(account)
}

/// Changes one option and stores the account
///
/// Options of an enabled account are locked, except the autosync interval.
async fn set_option(
    repo: &dyn IStateRepository,
    account: &str,
    option: &str,
    value: &str,
) -> Result<Account> {
    let mut account = load_account(repo, account).await?;
    set_account_option(&mut account, option, value)?;
    repo.save_account(&account)
        .await
        .context("Failed to save account")?;
    info!(account_id = %account.id(), option, "Account option changed");
    Ok(account)
}

fn show_options(app: &AppContext, account: &Account) {
    let formatter = app.formatter();
    let options = account_options(account);
    if app.is_json() {
        formatter.print_json(&serde_json::json!({
            "icon": provider_icon(),
            "options": options,
        }));
        return;
    }

    formatter.success(&format!("{}  {}", account.id(), account.name()));
    for (name, value) in &options {
        let lock = if is_option_locked(account, name) { " (locked)" } else { "" };
        formatter.info(&format!("{name:<22} {value}{lock}"));
    }
}

fn last_sync_text(account: &Account) -> String {
    account
        .last_sync()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never".to_string())
}

fn account_json(account: &Account) -> serde_json::Value {
    serde_json::json!({
        "id": account.id().to_string(),
        "name": account.name(),
        "provider": account.provider(),
        "server_type": account.server_type(),
        "url": account.base_url(),
        "user": account.user(),
        "status": account.status().to_string(),
        "autosync_minutes": account.autosync_minutes(),
        "download_only": account.download_only(),
        "last_sync": last_sync_text(account),
    })
}

fn report(app: &AppContext, message: &str, account: &Account) {
    let formatter = app.formatter();
    if app.is_json() {
        formatter.print_json(&account_json(account));
    } else {
        formatter.success(&format!("{}: {} ({})", message, account.name(), account.id()));
        formatter.info(&format!("Status: {}", account.status()));
    }
}
