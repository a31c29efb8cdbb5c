//! Loads a JSON roster (array of participants) into the SQLite database so
//! the `sqlite` backend can serve it.
//!
//! ```text
//! DATABASE_URL=sqlite://data/checkin.db import_roster roster.json
//! ```

use std::env;
use std::process::ExitCode;

use dotenvy::dotenv;
use tracing::{error, info};

use checkin::models::Participant;
use checkin::stores::sqlite;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let Some(path) = env::args().nth(1).or_else(|| env::var("ROSTER_FILE").ok()) else {
        error!("usage: import_roster <roster.json> (or set ROSTER_FILE)");
        return ExitCode::FAILURE;
    };
    let Ok(db_url) = env::var("DATABASE_URL") else {
        error!("DATABASE_URL must be set");
        return ExitCode::FAILURE;
    };

    let raw = match tokio::fs::read(&path).await {
        Ok(raw) => raw,
        Err(e) => {
            error!(%path, error = %e, "cannot read roster file");
            return ExitCode::FAILURE;
        }
    };
    let participants: Vec<Participant> = match serde_json::from_slice(&raw) {
        Ok(p) => p,
        Err(e) => {
            error!(%path, error = %e, "roster file is not a JSON array of participants");
            return ExitCode::FAILURE;
        }
    };

    let pool = match sqlite::connect(&db_url).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "cannot open database");
            return ExitCode::FAILURE;
        }
    };

    match sqlite::import_roster(&pool, &participants).await {
        Ok(report) => {
            info!(
                candidates = report.candidates,
                inserted = report.inserted,
                skipped = report.skipped,
                "roster import finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "roster import failed");
            ExitCode::FAILURE
        }
    }
}
