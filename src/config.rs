use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use chrono::{FixedOffset, Offset, Utc};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{key} must be set when STORE_BACKEND={backend}")]
    Missing {
        key: &'static str,
        backend: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Demo,
    Sqlite,
    Sheets,
}

impl StoreBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreBackend::Demo => "demo",
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::Sheets => "sheets",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "demo" | "memory" => Ok(StoreBackend::Demo),
            "sqlite" => Ok(StoreBackend::Sqlite),
            "sheets" | "google_sheets" => Ok(StoreBackend::Sheets),
            other => Err(format!("unknown backend {other}, expected demo|sqlite|sheets")),
        }
    }
}

/// Zero-based column positions of the roster sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterColumns {
    pub id: usize,
    pub name: usize,
    pub organization: usize,
    pub organization_name: usize,
    pub gender: usize,
}

impl Default for RosterColumns {
    fn default() -> Self {
        // K, B, F, G, E
        Self {
            id: 10,
            name: 1,
            organization: 5,
            organization_name: 6,
            gender: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub api_url: String,
    pub spreadsheet_id: String,
    pub access_token: String,
    pub roster_range: String,
    pub log_range: String,
    pub columns: RosterColumns,
}

#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub sheets: Option<SheetsConfig>,
    pub users_file: PathBuf,
    pub jwt_secret: String,
    pub cookie_secure: bool,
    pub utc_offset_minutes: i32,
    pub allow_registration: bool,
    pub bootstrap_admin: Option<AdminBootstrap>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup so tests do not
    /// have to touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend: StoreBackend = try_load(&var, "STORE_BACKEND", "demo")?;
        let database_url = var("DATABASE_URL");
        if backend == StoreBackend::Sqlite && database_url.is_none() {
            return Err(ConfigError::Missing {
                key: "DATABASE_URL",
                backend: backend.as_str(),
            });
        }

        let sheets = if backend == StoreBackend::Sheets {
            Some(load_sheets(&var)?)
        } else {
            None
        };

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, generating a random secret; sessions end on restart");
            format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
        });

        let utc_offset_minutes: i32 = try_load(&var, "EVENT_UTC_OFFSET_MINUTES", "420")?;
        if offset_from_minutes(utc_offset_minutes).is_none() {
            return Err(ConfigError::Invalid {
                key: "EVENT_UTC_OFFSET_MINUTES",
                value: utc_offset_minutes.to_string(),
                reason: "offset out of range".to_string(),
            });
        }

        let bootstrap_admin = match (var("ADMIN_USERNAME"), var("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminBootstrap {
                name: var("ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
                username,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: try_load(&var, "PORT", "3000")?,
            backend,
            database_url,
            sheets,
            users_file: PathBuf::from(
                var("USERS_FILE").unwrap_or_else(|| "data/users.json".to_string()),
            ),
            jwt_secret,
            cookie_secure: try_load(&var, "COOKIE_SECURE", "false")?,
            utc_offset_minutes,
            allow_registration: try_load(&var, "ALLOW_REGISTRATION", "true")?,
            bootstrap_admin,
        })
    }

    pub fn event_offset(&self) -> FixedOffset {
        offset_from_minutes(self.utc_offset_minutes).unwrap_or_else(|| Utc.fix())
    }
}

fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(minutes.checked_mul(60)?)
}

fn load_sheets<F>(var: &F) -> Result<SheetsConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |key: &'static str| {
        var(key).ok_or(ConfigError::Missing {
            key,
            backend: StoreBackend::Sheets.as_str(),
        })
    };

    let defaults = RosterColumns::default();
    Ok(SheetsConfig {
        api_url: var("SHEETS_API_URL")
            .unwrap_or_else(|| "https://sheets.googleapis.com".to_string()),
        spreadsheet_id: required("GOOGLE_SPREADSHEET_ID")?,
        access_token: required("GOOGLE_ACCESS_TOKEN")?,
        roster_range: var("ROSTER_RANGE").unwrap_or_else(|| "ProcessedData!A:Z".to_string()),
        log_range: var("LOG_RANGE").unwrap_or_else(|| "Registrasi!A:C".to_string()),
        columns: RosterColumns {
            id: load_column(var, "ROSTER_ID_COLUMN", defaults.id)?,
            name: load_column(var, "ROSTER_NAME_COLUMN", defaults.name)?,
            organization: load_column(var, "ROSTER_ORGANIZATION_COLUMN", defaults.organization)?,
            organization_name: load_column(
                var,
                "ROSTER_ORGANIZATION_NAME_COLUMN",
                defaults.organization_name,
            )?,
            gender: load_column(var, "ROSTER_GENDER_COLUMN", defaults.gender)?,
        },
    })
}

fn load_column<F>(var: &F, key: &'static str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(default),
        Some(letters) => column_index(&letters).ok_or_else(|| ConfigError::Invalid {
            key,
            value: letters,
            reason: "expected a column letter such as K or AA".to_string(),
        }),
    }
}

/// Spreadsheet column letters to a zero-based index: `A` is 0, `AA` is 26.
pub fn column_index(letters: &str) -> Option<usize> {
    let letters = letters.trim();
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index - 1)
}

fn try_load<F, T>(var: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })
}
