mod cli;
mod infra;
mod routes;
mod screen;
mod server;

use loan_filtering::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
