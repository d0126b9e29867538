mod cli;
mod dashboard;
mod infra;
mod routes;
mod server;

use conta_comigo::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
