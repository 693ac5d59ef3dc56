use std::fs;
use std::path::Path;

use homedir::my_home;
use rst_common::with_logging::log::debug;

use crate::types::CliError;

/// Create `dir` under the home directory when missing, returns its full path
pub fn setup_homedir(dir: &str) -> Result<String, CliError> {
    let current_homedir = my_home().map_err(|err| CliError::HomeDirError(err.to_string()))?;

    match current_homedir {
        Some(current_dir) => {
            let quorum_dir = format!("{}/{}", current_dir.display(), dir);
            let quorum_path = Path::new(quorum_dir.as_str()).to_owned();

            if !quorum_path.exists() {
                debug!("[homedir:setup] creating: {}", quorum_path.display());
                fs::create_dir_all(quorum_path.clone())
                    .map_err(|err| CliError::HomeDirError(err.to_string()))?;
            }

            Ok(quorum_path.display().to_string())
        }
        None => Err(CliError::HomeDirError(
            "unknown home directory path".to_string(),
        )),
    }
}
