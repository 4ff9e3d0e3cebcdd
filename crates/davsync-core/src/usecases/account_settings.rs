//! Account settings for the settings UI
//!
//! Plain data the front end needs to build the account dialog: the stored
//! option names, which of them stay editable while the account is enabled,
//! which a server profile fixes, and the icons to show.
//!
//! An option is locked while its account is enabled, unless it is one of
//! [`always_unlocked_settings`]. Options fixed by the account's server type
//! are locked in every state.

use std::collections::BTreeMap;

use crate::domain::{
    folder::{CALDAV, CARDDAV},
    Account, DomainError,
};

/// Icon of the `dav` provider (16x16)
pub const PROVIDER_ICON: &str = "sabredav16.png";

/// Every stored account option, unsorted
const ACCOUNT_OPTIONS: [&str; 16] = [
    "id",
    "name",
    "provider",
    "last_sync",
    "status",
    "server_type",
    "auth_method",
    "auth_options",
    "host",
    "user",
    "https",
    "autosync_minutes",
    "download_only",
    "sync_default_folders",
    "display_override",
    "separator",
];

/// Options owned by the engine; never edited through settings
const READ_ONLY_OPTIONS: [&str; 4] = ["id", "provider", "last_sync", "status"];

/// Names of all stored account options, sorted
pub fn account_storage_fields() -> Vec<&'static str> {
    let mut fields = ACCOUNT_OPTIONS.to_vec();
    fields.sort_unstable();
    fields
}

/// Options that stay editable while the account is enabled
pub fn always_unlocked_settings() -> &'static [&'static str] {
    &["autosync_minutes"]
}

/// Options fixed by a server profile
///
/// A `None` value marks an option filled in by autodiscovery. No profile
/// currently fixes anything; `custom` and `auto` both leave every option
/// editable.
pub fn fixed_server_settings(_server_type: &str) -> BTreeMap<&'static str, Option<String>> {
    BTreeMap::new()
}

/// Icon of a remote folder type, if it has one
pub fn type_image(folder_type: &str) -> Option<&'static str> {
    match folder_type {
        CARDDAV => Some("contacts16.png"),
        CALDAV => Some("calendar16.png"),
        _ => None,
    }
}

/// Icon shown for the provider
pub fn provider_icon() -> &'static str {
    PROVIDER_ICON
}

fn flag(value: bool) -> String {
    String::from(if value { "1" } else { "0" })
}

/// Current value of an option as shown in the settings dialog
///
/// Returns `None` for names that are not account options.
pub fn account_option(account: &Account, name: &str) -> Option<String> {
    let value = match name {
        "id" => account.id().to_string(),
        "name" => account.name().to_string(),
        "provider" => account.provider().to_string(),
        "last_sync" => account
            .last_sync()
            .map(|t| t.to_rfc3339())
            .unwrap_or_default(),
        "status" => account.status().to_string(),
        "server_type" => account.server_type().to_string(),
        "auth_method" => account.auth_method().to_string(),
        "auth_options" => account.auth_options().to_string(),
        "host" => account.host().to_string(),
        "user" => account.user().to_string(),
        "https" => flag(account.https()),
        "autosync_minutes" => account.autosync_minutes().to_string(),
        "download_only" => flag(account.download_only()),
        "sync_default_folders" => flag(account.sync_default_folders()),
        "display_override" => flag(account.display_override()),
        "separator" => u32::from(account.separator()).to_string(),
        _ => return None,
    };
    Some(value)
}

/// All options of an account with their current values
pub fn account_options(account: &Account) -> BTreeMap<&'static str, String> {
    account_storage_fields()
        .into_iter()
        .filter_map(|name| account_option(account, name).map(|value| (name, value)))
        .collect()
}

/// Returns true if the settings dialog must not edit `name` right now
pub fn is_option_locked(account: &Account, name: &str) -> bool {
    if always_unlocked_settings().contains(&name) {
        return false;
    }
    account.status().is_enabled()
        || fixed_server_settings(account.server_type()).contains_key(name)
}

fn parse_flag(name: &str, value: &str) -> Result<bool, DomainError> {
    match value {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(DomainError::ValidationFailed(format!(
            "{name} expects 0 or 1, got '{other}'"
        ))),
    }
}

/// Separator given as a single character or as its character code
fn parse_separator(value: &str) -> Result<char, DomainError> {
    let mut chars = value.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if !c.is_ascii_digit() {
            return Ok(c);
        }
    }
    value
        .parse::<u32>()
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| DomainError::ValidationFailed(format!("Invalid separator '{value}'")))
}

/// Changes one option of an account
///
/// # Errors
/// Returns `DomainError::ValidationFailed` for unknown, engine-owned or
/// locked options and for values that do not parse.
pub fn set_account_option(account: &mut Account, name: &str, value: &str) -> Result<(), DomainError> {
    let unknown = || DomainError::ValidationFailed(format!("Unknown account option '{name}'"));
    if !ACCOUNT_OPTIONS.contains(&name) {
        return Err(unknown());
    }
    if READ_ONLY_OPTIONS.contains(&name) {
        return Err(DomainError::ValidationFailed(format!("'{name}' is managed by the sync engine")));
    }
    if is_option_locked(account, name) {
        return Err(DomainError::ValidationFailed(format!(
            "'{name}' is locked; disable the account first"
        )));
    }

    match name {
        "name" => account.set_name(value),
        "server_type" => account.set_server_type(value),
        "auth_method" => {
            let options = account.auth_options().to_string();
            account.set_auth(value, options);
        }
        "auth_options" => {
            let method = account.auth_method().to_string();
            account.set_auth(method, value);
        }
        "host" => account.set_host(value),
        "user" => account.set_user(value),
        "https" => account.set_https(parse_flag(name, value)?),
        "autosync_minutes" => {
            let minutes = value.parse().map_err(|_| {
                DomainError::ValidationFailed(format!("autosync_minutes expects minutes, got '{value}'"))
            })?;
            account.set_autosync_minutes(minutes);
        }
        "download_only" => account.set_download_only(parse_flag(name, value)?),
        "sync_default_folders" => account.set_sync_default_folders(parse_flag(name, value)?),
        "display_override" => account.set_display_override(parse_flag(name, value)?),
        "separator" => account.set_separator(parse_separator(value)?),
        _ => return Err(unknown()),
    }
    Ok(())
}
