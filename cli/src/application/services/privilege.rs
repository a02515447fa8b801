//! Privilege precondition checked once before anything else runs.

use std::time::Duration;

use crate::application::ports::CommandRunner;
use crate::domain::ProvisionError;

const ID_TIMEOUT: Duration = Duration::from_secs(10);

/// Fail unless the effective user is root.
///
/// Asks `id -u` rather than reading the uid directly so the check goes
/// through the same runner as every other host interaction.
///
/// # Errors
///
/// Returns [`ProvisionError::NotElevated`] when the uid is not `0` or cannot
/// be determined.
pub async fn ensure_elevated(runner: &impl CommandRunner) -> Result<(), ProvisionError> {
    let uid = match runner.run_with_timeout("id", &["-u"], ID_TIMEOUT).await {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        Ok(_) | Err(_) => "unknown".to_string(),
    };
    tracing::debug!(uid = %uid, "effective uid");
    if uid == "0" {
        Ok(())
    } else {
        Err(ProvisionError::NotElevated { uid })
    }
}
