mod cli;
mod infra;
mod routes;
mod server;
mod triage;

use civic_triage::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
