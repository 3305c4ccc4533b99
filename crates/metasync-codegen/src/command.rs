//! External-program backend.
//!
//! Protocol: the request is written to the program's stdin as one JSON
//! object; the program prints the generated content on stdout and exits 0.
//! Anything else is a failed attempt. Stdin is fed while stdout is drained,
//! so a program may start printing before it has read the whole request.

use crate::backend::{GeneratedContent, GenerationBackend, GenerationRequest};
use crate::error::{CodegenError, GenerationError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandBackend {
    /// Build from `codegen.command`: program first, then arguments.
    pub fn from_argv(argv: &[String]) -> Result<Self, CodegenError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(CodegenError::Backend(
                "codegen.command must name a program".to_string(),
            ));
        };
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            working_dir: None,
        })
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl GenerationBackend for CommandBackend {
    fn name(&self) -> &str {
        &self.program
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedContent, GenerationError> {
        let payload = serde_json::to_vec(request)
            .map_err(|err| GenerationError::Backend(format!("failed encoding request: {err}")))?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let spawn_error = |err: std::io::Error| GenerationError::Spawn {
            program: self.program.clone(),
            message: err.to_string(),
        };
        let mut child = command.spawn().map_err(spawn_error)?;
        let stdin = child.stdin.take();
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            stdin.write_all(&payload).await?;
            stdin.shutdown().await
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(spawn_error)?;
        match fed {
            // The program exited without reading everything; its status decides.
            Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                debug!(program = %self.program, "backend closed stdin early");
            }
            Err(err) => return Err(spawn_error(err)),
            Ok(()) => {}
        }
        debug!(
            program = %self.program,
            target_file = %request.target_file,
            status = %output.status,
            "backend call finished"
        );

        if !output.status.success() {
            return Err(GenerationError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let content = String::from_utf8(output.stdout)
            .map_err(|err| GenerationError::InvalidOutput(format!("stdout is not UTF-8: {err}")))?;
        if content.trim().is_empty() {
            return Err(GenerationError::InvalidOutput("empty output".to_string()));
        }
        Ok(GeneratedContent::new(content))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::backend::GenerationAction;
    use metasync_kernel::TargetKind;

    fn request() -> GenerationRequest {
        GenerationRequest {
            meta_type: "doc-spec".to_string(),
            meta_file: "docs/guide.meta.yaml".to_string(),
            target_file: "docs/GUIDE.md".to_string(),
            target_kind: TargetKind::Doc,
            action: GenerationAction::Create,
            contract_fields: serde_json::json!({"target": "GUIDE.md"}),
            existing_content: None,
            existing_region: None,
            missing_items: vec!["Install".to_string()],
        }
    }

    fn sh(script: &str) -> CommandBackend {
        CommandBackend::from_argv(&["sh".to_string(), "-c".to_string(), script.to_string()]).unwrap()
    }

    #[tokio::test]
    async fn request_is_sent_on_stdin() {
        let out = sh("cat").generate(&request()).await.unwrap();
        let echoed: serde_json::Value = serde_json::from_str(&out.content).unwrap();
        assert_eq!(echoed["target_file"], "docs/GUIDE.md");
        assert_eq!(echoed["action"], "create");
        assert_eq!(echoed["missing_items"][0], "Install");
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let err = sh("cat >/dev/null; echo boom >&2; exit 3")
            .generate(&request())
            .await
            .unwrap_err();
        match err {
            GenerationError::Exit { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_output_is_rejected() {
        let err = sh("cat >/dev/null").generate(&request()).await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidOutput(_)));
    }

    #[tokio::test]
    async fn large_output_does_not_wait_for_stdin() {
        let mut big = request();
        big.missing_items = vec!["x".repeat(200_000)];
        let backend = sh("yes x | head -c 200000; cat >/dev/null");

        let out = tokio::time::timeout(std::time::Duration::from_secs(10), backend.generate(&big))
            .await
            .expect("backend call should not stall")
            .unwrap();
        assert_eq!(out.content.len(), 200_000);
    }

    #[tokio::test]
    async fn program_ignoring_stdin_still_succeeds() {
        let mut big = request();
        big.missing_items = vec!["x".repeat(200_000)];
        let out = sh("echo done").generate(&big).await.unwrap();
        assert_eq!(out.content, "done\n");
    }

    #[test]
    fn empty_argv_is_a_configuration_error() {
        assert!(CommandBackend::from_argv(&[]).is_err());
    }
}
