//! Blocking execution of external tool pipelines
//!
//! A [`Pipeline`] is the Rust form of a shell line such as
//! `snaptrim in=run.nemo out=- times=1 | s2a in=- out=run1.txt`: stages are
//! chained stdout -> stdin, everything runs to completion, and the first stage
//! that exits non-zero turns into [`Error::ProcessFailed`].
//!
//! [`ToolRunner`] is the seam between the snapshot adapter and the operating
//! system; tests swap [`ProcessRunner`] for a runner that writes canned output.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::{debug, info};

use crate::error::{Error, Result};

/// One program invocation inside a pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub program: String,
    pub args: Vec<String>,
}

impl Stage {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// NEMO-style `key=value` argument
    pub fn kv(self, key: &str, value: impl fmt::Display) -> Self {
        self.arg(format!("{key}={value}"))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A chain of stages and the file it is expected to leave behind
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
    pub product: PathBuf,     // file the pipeline produces
    pub capture_stdout: bool, // write the last stage's stdout into `product`
}

impl Pipeline {
    pub fn new(product: impl Into<PathBuf>) -> Self {
        Self {
            stages: Vec::new(),
            product: product.into(),
            capture_stdout: false,
        }
    }

    pub fn pipe(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn capture(mut self) -> Self {
        self.capture_stdout = true;
        self
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, stage) in self.stages.iter().enumerate() {
            if k > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{stage}")?;
        }
        if self.capture_stdout {
            write!(f, " > {}", self.product.display())?;
        }
        Ok(())
    }
}

/// Lazily produced stdout lines of a running pipeline
pub type LineStream = Box<dyn Iterator<Item = Result<String>>>;

/// Something that can execute pipelines
pub trait ToolRunner {
    /// Run to completion; the product file exists afterwards
    fn run(&self, pipeline: &Pipeline) -> Result<()>;

    /// Start the pipeline and hand back its stdout line by line
    fn stream(&self, pipeline: &Pipeline) -> Result<LineStream>;
}

impl<R: ToolRunner + ?Sized> ToolRunner for &R {
    fn run(&self, pipeline: &Pipeline) -> Result<()> {
        (**self).run(pipeline)
    }

    fn stream(&self, pipeline: &Pipeline) -> Result<LineStream> {
        (**self).stream(pipeline)
    }
}

/// Runs pipelines as child processes of this program
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

type Children = Vec<(String, Child)>;

fn spawn_failed(stage: &Stage, err: std::io::Error) -> Error {
    Error::ProcessFailed {
        command: stage.to_string(),
        status: format!("failed to start: {err}"),
    }
}

/// Kill whatever is still running so no process outlives an error
fn abort_children(children: &mut Children) {
    for (_, child) in children.iter_mut() {
        let _ = child.kill();
        let _ = child.wait();
    }
    children.clear();
}

/// Wait for every stage, then report the first one that failed
fn wait_children(command: &str, children: &mut Children) -> Result<()> {
    let mut failure = None;
    for (stage, mut child) in children.drain(..) {
        let status = child.wait()?;
        if !status.success() && failure.is_none() {
            failure = Some(format!("`{stage}` exited with {status}"));
        }
    }
    match failure {
        None => Ok(()),
        Some(status) => Err(Error::ProcessFailed {
            command: command.to_string(),
            status,
        }),
    }
}

fn spawn_chain(pipeline: &Pipeline, last_stdout: Stdio) -> Result<Children> {
    if pipeline.stages.is_empty() {
        return Err(Error::Validation("empty pipeline".into()));
    }

    let last = pipeline.stages.len() - 1;
    let mut last_stdout = Some(last_stdout);
    let mut upstream: Option<ChildStdout> = None;
    let mut children: Children = Vec::with_capacity(pipeline.stages.len());

    for (k, stage) in pipeline.stages.iter().enumerate() {
        let mut cmd = Command::new(&stage.program);
        cmd.args(&stage.args);

        if let Some(out) = upstream.take() {
            cmd.stdin(Stdio::from(out));
        }
        if k == last {
            cmd.stdout(last_stdout.take().unwrap_or_else(Stdio::inherit));
        } else {
            cmd.stdout(Stdio::piped());
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                abort_children(&mut children);
                return Err(spawn_failed(stage, err));
            }
        };
        if k != last {
            upstream = child.stdout.take();
        }
        children.push((stage.to_string(), child));
    }

    Ok(children)
}

impl ToolRunner for ProcessRunner {
    fn run(&self, pipeline: &Pipeline) -> Result<()> {
        info!("running: {pipeline}");

        let stdout = if pipeline.capture_stdout {
            Stdio::from(File::create(&pipeline.product)?)
        } else {
            Stdio::inherit()
        };

        let mut children = spawn_chain(pipeline, stdout)?;
        wait_children(&pipeline.to_string(), &mut children)
    }

    fn stream(&self, pipeline: &Pipeline) -> Result<LineStream> {
        info!("streaming: {pipeline}");

        let mut children = spawn_chain(pipeline, Stdio::piped())?;
        let stdout = match children.last_mut().and_then(|(_, c)| c.stdout.take()) {
            Some(stdout) => stdout,
            None => {
                abort_children(&mut children);
                return Err(Error::Validation(format!("no stdout for `{pipeline}`")));
            }
        };

        Ok(Box::new(ChildLines {
            command: pipeline.to_string(),
            lines: BufReader::new(stdout).lines(),
            children,
            finished: false,
        }))
    }
}

/// Line iterator that reaps its processes once stdout is exhausted
struct ChildLines {
    command: String,
    lines: Lines<BufReader<ChildStdout>>,
    children: Children,
    finished: bool,
}

impl Iterator for ChildLines {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.lines.next() {
            Some(Ok(line)) => Some(Ok(line)),
            Some(Err(err)) => {
                self.finished = true;
                abort_children(&mut self.children);
                Some(Err(err.into()))
            }
            None => {
                self.finished = true;
                wait_children(&self.command, &mut self.children).err().map(Err)
            }
        }
    }
}

impl Drop for ChildLines {
    fn drop(&mut self) {
        if !self.children.is_empty() {
            debug!("stopping unfinished `{}`", self.command);
            abort_children(&mut self.children);
        }
    }
}

/// Read a text product written by a pipeline
pub fn read_product(path: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}
