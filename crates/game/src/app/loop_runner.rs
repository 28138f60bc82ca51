use std::process::ExitCode;

use tilewalk_engine::{run_app, AppError};
use tracing::error;

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match run_app(app.config, app.scene) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err @ AppError::Scene(_)) => {
            error!(error = %err, "run_failed");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
