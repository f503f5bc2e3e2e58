use std::{
    io::{BufRead as _, BufReader, BufWriter, Write as _},
    path::PathBuf,
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
};

use acetune_params::ParamSet;
use tracing::debug;

use crate::{Oracle, OracleError};

/// How to launch the oracle, and where it reads its configuration artifact from.
#[derive(Debug, Clone)]
pub struct OracleCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub artifact_path: PathBuf,
}

/// A live oracle process. Dropping the handle kills and reaps the child.
#[derive(Debug)]
struct OracleProcess {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl OracleProcess {
    fn spawn(command: &OracleCommand) -> Result<Self, OracleError> {
        let spawn_error = |source| OracleError::Spawn {
            program: command.program.clone(),
            source,
        };
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;
        // both pipes were requested above
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(OracleError::NotRunning);
        };
        Ok(Self {
            child,
            stdin: BufWriter::new(stdin),
            stdout: BufReader::new(stdout),
        })
    }

    fn send(&mut self, line: &str) -> Result<(), OracleError> {
        writeln!(self.stdin, "{line}").map_err(OracleError::Io)?;
        self.stdin.flush().map_err(OracleError::Io)
    }

    fn receive(&mut self) -> Result<String, OracleError> {
        let mut line = String::new();
        let n = self.stdout.read_line(&mut line).map_err(OracleError::Io)?;
        if n == 0 {
            return Err(OracleError::Closed);
        }
        Ok(line)
    }
}

impl Drop for OracleProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// [`Oracle`] backed by a child process.
///
/// At most one process is alive at a time. It is replaced on [`restart`](Oracle::restart),
/// discarded after any protocol error, and killed when the client is dropped.
#[derive(Debug)]
pub struct ProcessOracle {
    command: OracleCommand,
    process: Option<OracleProcess>,
    spawn_count: usize,
}

impl ProcessOracle {
    /// Creates a client. No process is started until the first [`restart`](Oracle::restart).
    #[must_use]
    pub fn new(command: OracleCommand) -> Self {
        Self {
            command,
            process: None,
            spawn_count: 0,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    /// Number of processes started so far.
    #[must_use]
    pub fn spawn_count(&self) -> usize {
        self.spawn_count
    }

    /// Kills the current process, if any.
    pub fn shutdown(&mut self) {
        self.process = None;
    }

    fn with_process<T, F>(&mut self, f: F) -> Result<T, OracleError>
    where
        F: FnOnce(&mut OracleProcess) -> Result<T, OracleError>,
    {
        let process = self.process.as_mut().ok_or(OracleError::NotRunning)?;
        let result = f(process);
        if let Err(err) = &result {
            debug!(%err, "discarding oracle process");
            self.process = None;
        }
        result
    }
}

impl Oracle for ProcessOracle {
    fn restart(&mut self) -> Result<(), OracleError> {
        self.process = None;
        let process = OracleProcess::spawn(&self.command)?;
        self.spawn_count += 1;
        debug!(
            pid = process.child.id(),
            spawn_count = self.spawn_count,
            "started oracle process"
        );
        self.process = Some(process);
        Ok(())
    }

    fn reload(&mut self, params: &ParamSet) -> Result<(), OracleError> {
        if !self.is_running() {
            return Err(OracleError::NotRunning);
        }
        params
            .save(&self.command.artifact_path)
            .map_err(OracleError::Artifact)?;
        self.with_process(|process| process.send("load"))
    }

    fn evaluate(&mut self, position: &str) -> Result<i64, OracleError> {
        self.with_process(|process| {
            process.send(&format!("fen {position}"))?;
            let line = process.receive()?;
            let trimmed = line.trim();
            trimmed.parse().map_err(|source| OracleError::Parse {
                line: trimmed.to_owned(),
                source,
            })
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::Path;

    use acetune_params::ParamValue;

    use super::*;

    const CONSTANT_ORACLE: &str = r#"while IFS= read -r line; do
  case "$line" in
    fen*) echo 42 ;;
  esac
done"#;

    // answers with the "tempo" value of the artifact loaded last
    const TEMPO_ORACLE: &str = r#"tempo=
while IFS= read -r line; do
  case "$line" in
    load) tempo=$(sed -n 's/.*"tempo": \(-\{0,1\}[0-9]*\).*/\1/p' "$1") ;;
    fen*) echo "$tempo" ;;
  esac
done"#;

    const ONE_SHOT_ORACLE: &str = "read -r line; exit 0";

    const GARBAGE_ORACLE: &str = r#"while IFS= read -r line; do echo "not a score"; done"#;

    fn script_oracle(script: &str, artifact_path: &Path) -> ProcessOracle {
        ProcessOracle::new(OracleCommand {
            program: PathBuf::from("sh"),
            args: vec![
                "-c".to_owned(),
                script.to_owned(),
                "oracle".to_owned(),
                artifact_path.display().to_string(),
            ],
            artifact_path: artifact_path.to_owned(),
        })
    }

    fn tempo(value: i64) -> ParamSet {
        let mut params = ParamSet::new();
        params.insert("tempo", ParamValue::Scalar(value));
        params.insert("table", ParamValue::Table(vec![1, 2, 3]));
        params
    }

    #[test]
    fn test_evaluate_reads_one_score_per_request() {
        let dir = tempfile::tempdir().unwrap();
        let mut oracle = script_oracle(CONSTANT_ORACLE, &dir.path().join("params.json"));
        oracle.restart().unwrap();
        for _ in 0..3 {
            assert_eq!(oracle.evaluate("8/8/8/8/8/8/8/K6k w - - 0 0").unwrap(), 42);
        }
    }

    #[test]
    fn test_reload_persists_artifact_and_signals_process() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let mut oracle = script_oracle(TEMPO_ORACLE, &path);
        oracle.restart().unwrap();

        oracle.reload(&tempo(25)).unwrap();
        assert_eq!(ParamSet::open(&path).unwrap(), tempo(25));
        assert_eq!(oracle.evaluate("startpos").unwrap(), 25);

        oracle.reload(&tempo(-30)).unwrap();
        assert_eq!(oracle.evaluate("startpos").unwrap(), -30);
    }

    #[test]
    fn test_requests_before_start_fail() {
        let dir = tempfile::tempdir().unwrap();
        let mut oracle = script_oracle(CONSTANT_ORACLE, &dir.path().join("params.json"));
        assert!(oracle.evaluate("startpos").unwrap_err().is_not_running());
        assert!(oracle.reload(&tempo(1)).unwrap_err().is_not_running());
    }

    #[test]
    fn test_closed_output_tears_down_process() {
        let dir = tempfile::tempdir().unwrap();
        let mut oracle = script_oracle(ONE_SHOT_ORACLE, &dir.path().join("params.json"));
        oracle.restart().unwrap();

        assert!(oracle.evaluate("startpos").unwrap_err().is_closed());
        assert!(!oracle.is_running());
        assert!(oracle.evaluate("startpos").unwrap_err().is_not_running());

        oracle.restart().unwrap();
        assert!(oracle.is_running());
        assert_eq!(oracle.spawn_count(), 2);
    }

    #[test]
    fn test_malformed_score() {
        let dir = tempfile::tempdir().unwrap();
        let mut oracle = script_oracle(GARBAGE_ORACLE, &dir.path().join("params.json"));
        oracle.restart().unwrap();
        let err = oracle.evaluate("startpos").unwrap_err();
        assert!(matches!(err, OracleError::Parse { ref line, .. } if line == "not a score"));
    }

    #[test]
    fn test_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let mut oracle = ProcessOracle::new(OracleCommand {
            program: dir.path().join("no-such-oracle"),
            args: vec![],
            artifact_path: dir.path().join("params.json"),
        });
        assert!(oracle.restart().unwrap_err().is_spawn());
        assert_eq!(oracle.spawn_count(), 0);
    }
}
