//! Secret references in `config.toml`.
//!
//! - `pass::path/in/store`: first line of `pass show path/in/store`
//! - `env::VAR_NAME`: the value of `$VAR_NAME`
//! - anything else: used verbatim

use std::process::Command;

use crate::error::{ClientError, ClientResult};

pub fn resolve(value: &str) -> ClientResult<String> {
    if let Some(path) = value.strip_prefix("pass::") {
        from_pass(value, path)
    } else if let Some(var) = value.strip_prefix("env::") {
        std::env::var(var).map_err(|_| ClientError::secret(value, "environment variable is not set"))
    } else {
        Ok(value.to_string())
    }
}

fn from_pass(reference: &str, path: &str) -> ClientResult<String> {
    let output = Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|e| ClientError::secret(reference, format!("could not run pass: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ClientError::secret(
            reference,
            format!("pass exited with {}: {}", output.status, stderr.trim()),
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| ClientError::secret(reference, "pass produced no output"))
}
