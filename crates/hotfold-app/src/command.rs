//! Handler that runs an external program for every claimed file.
//!
//! The program receives the local path of the file in the processing folder
//! as its final argument, plus `HOTFOLD_FILE_NAME` and `HOTFOLD_FILE_SIZE` in
//! its environment. Exit status zero is success; anything else is a failure
//! whose reason carries the program's stderr.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, bail};
use async_trait::async_trait;
use hotfold_config::HandlerConfig;
use hotfold_engine::{FileDescriptor, FileHandler};
use hotfold_store::LocalStore;
use serde_json::{Value, json};
use tokio::process::Command;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Environment variable carrying the original file name.
pub const FILE_NAME_ENV: &str = "HOTFOLD_FILE_NAME";
/// Environment variable carrying the file size in bytes.
pub const FILE_SIZE_ENV: &str = "HOTFOLD_FILE_SIZE";

/// [`FileHandler`] that shells out to a configured program.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    share: LocalStore,
    program: String,
    args: Vec<String>,
}

impl CommandHandler {
    /// Build from `handler.command` for a share mounted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidConfig`] when no command is configured.
    pub fn from_config(root: impl Into<PathBuf>, handler: &HandlerConfig) -> AppResult<Self> {
        let Some((program, args)) = handler.command.split_first() else {
            return Err(AppError::InvalidConfig {
                field: "handler.command",
                reason: "empty",
                value: None,
            });
        };
        Ok(Self {
            share: LocalStore::new(root),
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl FileHandler for CommandHandler {
    async fn handle(&self, file: FileDescriptor) -> anyhow::Result<Value> {
        let local = self
            .share
            .resolve(&file.path)
            .with_context(|| format!("cannot map {} onto the share", file.path))?;
        debug!(program = %self.program, path = %local.display(), "running handler command");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&local)
            .env(FILE_NAME_ENV, &file.name)
            .env(FILE_SIZE_ENV, file.size.to_string())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.program))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(json!({
            "exit_code": output.status.code(),
            "stdout": String::from_utf8_lossy(&output.stdout).trim(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotfold_test_support::fixtures;

    fn handler(root: &std::path::Path, script: &str) -> CommandHandler {
        let config = HandlerConfig {
            command: vec!["sh".into(), "-c".into(), script.into()],
            ..HandlerConfig::default()
        };
        CommandHandler::from_config(root, &config).expect("command configured")
    }

    fn descriptor() -> FileDescriptor {
        FileDescriptor {
            path: "hot/processing/hello.txt".into(),
            name: "hello.txt".into(),
            size: 5,
        }
    }

    #[test]
    fn empty_command_is_rejected() {
        let err = CommandHandler::from_config("/srv/share", &HandlerConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidConfig {
                field: "handler.command",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn command_receives_path_and_environment() -> anyhow::Result<()> {
        let dir = fixtures::temp_dir()?;
        fixtures::write_file(dir.path(), "hot/processing/hello.txt", b"hello")?;
        // `sh -c script path` binds the appended path to $0.
        let handler = handler(
            dir.path(),
            r#"printf '%s:%s:' "$HOTFOLD_FILE_NAME" "$HOTFOLD_FILE_SIZE"; cat "$0""#,
        );

        let payload = handler.handle(descriptor()).await?;
        assert_eq!(payload["exit_code"], json!(0));
        assert_eq!(payload["stdout"], json!("hello.txt:5:hello"));
        Ok(())
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() -> anyhow::Result<()> {
        let dir = fixtures::temp_dir()?;
        let handler = handler(dir.path(), "echo 'scanner offline' >&2; exit 3");

        let err = handler.handle(descriptor()).await.unwrap_err();
        let reason = format!("{err:#}");
        assert!(reason.contains("scanner offline"), "{reason}");
        Ok(())
    }
}
