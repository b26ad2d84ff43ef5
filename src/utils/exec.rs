//! Running external programs.
//!
//! A small builder around `std::process::Command` with an optional PTY
//! backend. The process always runs to completion; the exit status is
//! returned to the caller rather than turned into an error.
//!
//! ```ignore
//! let out = Cmd::from_slice(&["jsx", "--no-cache-dir", "in", "out"])
//!     .cwd(root)
//!     .pty(true)
//!     .run()?;
//! if !out.success() { /* ... */ }
//! ```

use anyhow::{Context, Result, anyhow};
use portable_pty::{CommandBuilder, NativePtySystem, PtySize, PtySystem};
use std::{
    ffi::{OsStr, OsString},
    io::Read,
    path::{Path, PathBuf},
    process::Command,
};

/// Exit code and captured output of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// stdout followed by stderr (or the single PTY stream).
    pub output: String,
}

impl Captured {
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Command builder for external process execution.
#[derive(Debug, Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
    use_pty: bool,
}

impl Cmd {
    /// Create from a command array (e.g., `["jsx"]` or `["npx", "babel"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter().map(|s| s.as_ref().to_owned());
        Self {
            program: iter.next().unwrap_or_default(),
            args: iter.collect(),
            ..Default::default()
        }
    }

    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Extra environment variables for the subprocess.
    pub fn envs<K, V, I>(mut self, vars: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.envs.extend(
            vars.into_iter()
                .map(|(k, v)| (k.as_ref().to_owned(), v.as_ref().to_owned())),
        );
        self
    }

    /// Run inside a pseudo terminal. A PTY has a single output stream, so
    /// stdout and stderr arrive interleaved in the order they were written.
    pub fn pty(mut self, enable: bool) -> Self {
        self.use_pty = enable;
        self
    }

    /// Run to completion. Only a failure to start is an error.
    pub fn run(self) -> Result<Captured> {
        if self.use_pty {
            self.run_with_pty()
        } else {
            self.run_piped()
        }
    }

    fn name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    fn run_piped(self) -> Result<Captured> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).envs(self.envs.iter().cloned());
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .with_context(|| format!("Failed to execute `{}`", self.name()))?;

        Ok(Captured {
            code: output.status.code(),
            output: merge_streams(&output.stdout, &output.stderr),
        })
    }

    fn run_with_pty(self) -> Result<Captured> {
        let name = self.name();

        let mut builder = CommandBuilder::new(&self.program);
        builder.args(&self.args);
        for (k, v) in &self.envs {
            builder.env(k, v);
        }
        if let Some(dir) = &self.cwd {
            builder.cwd(dir);
        }

        let pair = NativePtySystem::default().openpty(PtySize {
            rows: 24,
            cols: 80,
            pixel_width: 0,
            pixel_height: 0,
        })?;

        let mut child = pair
            .slave
            .spawn_command(builder)
            .with_context(|| format!("Failed to spawn `{name}`"))?;
        drop(pair.slave);

        // PTY reads block until EOF
        let mut reader = pair.master.try_clone_reader()?;
        let reader_thread = std::thread::spawn(move || {
            let mut output = Vec::new();
            // Bytes read before an error stay in `output`
            let result = reader.read_to_end(&mut output);
            (output, result.err().filter(|err| !is_pty_eof(err)))
        });

        let status = child.wait()?;
        drop(pair.master);

        let (output, read_error) = reader_thread
            .join()
            .map_err(|_| anyhow!("Failed to join output reader thread of `{name}`"))?;
        if let Some(err) = read_error {
            return Err(err).with_context(|| format!("Failed to read output of `{name}`"));
        }

        Ok(Captured {
            code: i32::try_from(status.exit_code()).ok(),
            output: String::from_utf8_lossy(&output).into_owned(),
        })
    }
}

/// Linux reports EIO on the master side once the child's end is closed.
fn is_pty_eof(err: &std::io::Error) -> bool {
    const EIO: i32 = 5;
    err.raw_os_error() == Some(EIO)
}

/// stdout, then stderr, skipping whichever is blank.
fn merge_streams(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (_, true) => stdout.into_owned(),
        (true, false) => stderr.into_owned(),
        (false, false) => format!("{}\n{}", stdout.trim_end(), stderr),
    }
}
