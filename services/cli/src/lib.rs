mod cli;
mod commands;
mod demo;
mod infra;

use lcq::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
