//! Trigger detection seam.
//!
//! The runtime hands a [`ListenerFactory`] index-aligned model paths and
//! sensitivities, then drives the built [`Listener`] until it returns.
//! [`DetectorProcess`] runs an external hotword detector as a child process
//! and reads one detected model per stdout line.

use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, info, warn};

use crate::error::AppError;

/// How often a listener checks the stop predicate while idle.
pub const POLL_INTERVAL: Duration = Duration::from_millis(30);

pub trait Listener {
    /// Block until `is_stopped` reports true or the detection source ends.
    ///
    /// `on_detect` receives the index of the detected model. An error from it
    /// ends the loop and is returned.
    fn run(
        &mut self,
        on_detect: &mut dyn FnMut(usize) -> Result<(), AppError>,
        is_stopped: &dyn Fn() -> bool,
        poll: Duration,
    ) -> Result<(), AppError>;

    /// Release the detection engine.
    fn terminate(&mut self);
}

pub trait ListenerFactory {
    fn build(&self, models: &[PathBuf], sensitivities: &[f64])
        -> Result<Box<dyn Listener>, AppError>;
}

// ── Line-oriented listener ───────────────────────────────────────

/// Listener fed by text lines naming detected models.
///
/// A line matches a model by full path or by file stem.
pub struct LineListener {
    models: Vec<PathBuf>,
    lines: Receiver<io::Result<Vec<u8>>>,
    child: Option<Child>,
}

/// Read `input` on a background thread, one raw line per message.
///
/// The channel disconnects at end of input. A read error is sent once and
/// ends the thread.
pub(crate) fn spawn_line_reader<R>(mut input: R) -> Receiver<io::Result<Vec<u8>>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::spawn(move || {
        let mut buf = Vec::new();
        loop {
            match input.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(Ok(std::mem::take(&mut buf))).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
    });
    rx
}

impl LineListener {
    pub fn from_reader<R>(reader: R, models: Vec<PathBuf>) -> Self
    where
        R: Read + Send + 'static,
    {
        Self {
            models,
            lines: spawn_line_reader(BufReader::new(reader)),
            child: None,
        }
    }

    /// The detection source ended. A detector child that exits on its own
    /// is a failure; a plain reader reaching its end is not.
    fn source_closed(&mut self, is_stopped: &dyn Fn() -> bool) -> Result<(), AppError> {
        if is_stopped() {
            return Ok(());
        }
        let Some(mut child) = self.child.take() else {
            info!("Detection source closed");
            return Ok(());
        };
        let status = child.wait().map_err(|e| AppError::Listener {
            message: format!("Failed to reap detector process: {e}"),
        })?;
        Err(AppError::Listener {
            message: format!("Detector exited with {status}"),
        })
    }

    fn with_child(mut self, child: Child) -> Self {
        self.child = Some(child);
        self
    }

    fn match_line(&self, line: &str) -> Option<usize> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        self.models.iter().position(|model| {
            model == Path::new(line)
                || model.file_stem().is_some_and(|stem| stem == line)
        })
    }
}

impl Listener for LineListener {
    fn run(
        &mut self,
        on_detect: &mut dyn FnMut(usize) -> Result<(), AppError>,
        is_stopped: &dyn Fn() -> bool,
        poll: Duration,
    ) -> Result<(), AppError> {
        info!(models = self.models.len(), "Listening...");
        while !is_stopped() {
            match self.lines.recv_timeout(poll) {
                Ok(Ok(bytes)) => {
                    let line = String::from_utf8_lossy(&bytes);
                    match self.match_line(&line) {
                        Some(index) => on_detect(index)?,
                        None => debug!(line = line.trim(), "Ignoring unknown detection"),
                    }
                }
                Ok(Err(e)) => {
                    return Err(AppError::Listener {
                        message: format!("Failed to read detections: {e}"),
                    });
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return self.source_closed(is_stopped),
            }
        }
        Ok(())
    }

    fn terminate(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Err(e) = child.kill() {
            debug!("Detector already exited: {e}");
        }
        match child.wait() {
            Ok(status) => debug!(%status, "Detector terminated"),
            Err(e) => warn!("Failed to reap detector process: {e}"),
        }
    }
}

impl Drop for LineListener {
    fn drop(&mut self) {
        self.terminate();
    }
}

// ── External detector process ────────────────────────────────────

/// Spawns `<program> <args…> --model <path> --sensitivity <v> …`.
#[derive(Debug, Clone)]
pub struct DetectorProcess {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl DetectorProcess {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl ListenerFactory for DetectorProcess {
    fn build(
        &self,
        models: &[PathBuf],
        sensitivities: &[f64],
    ) -> Result<Box<dyn Listener>, AppError> {
        if models.len() != sensitivities.len() {
            return Err(AppError::Listener {
                message: format!(
                    "{} models but {} sensitivities",
                    models.len(),
                    sensitivities.len()
                ),
            });
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (model, sensitivity) in models.iter().zip(sensitivities) {
            cmd.arg("--model")
                .arg(model)
                .arg("--sensitivity")
                .arg(sensitivity.to_string());
        }

        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| AppError::Listener {
                message: format!("Failed to spawn detector {}: {e}", self.program.display()),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| AppError::Listener {
            message: "Failed to capture detector stdout".into(),
        })?;
        info!(program = %self.program.display(), pid = child.id(), "Detector started");
        Ok(Box::new(
            LineListener::from_reader(stdout, models.to_vec()).with_child(child),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn models() -> Vec<PathBuf> {
        vec![
            PathBuf::from("/srv/models/joke.pmdl"),
            PathBuf::from("/srv/models/time.pmdl"),
        ]
    }

    fn listener(input: &str) -> LineListener {
        LineListener::from_reader(Cursor::new(input.as_bytes().to_vec()), models())
    }

    #[test]
    fn reports_detections_by_stem_or_path() {
        let mut l = listener("joke\nsomething else\n/srv/models/time.pmdl\n\n joke \n");
        let mut seen = Vec::new();
        l.run(
            &mut |i| {
                seen.push(i);
                Ok(())
            },
            &|| false,
            POLL_INTERVAL,
        )
        .unwrap();
        assert_eq!(seen, vec![0, 1, 0]);
    }

    #[test]
    fn stops_when_predicate_is_set() {
        let mut l = listener("joke\ntime\n");
        let mut seen = 0;
        l.run(
            &mut |_| {
                seen += 1;
                Ok(())
            },
            &|| true,
            POLL_INTERVAL,
        )
        .unwrap();
        assert_eq!(seen, 0);
    }

    #[test]
    fn detection_errors_end_the_loop() {
        let mut l = listener("time\njoke\n");
        let mut calls = 0;
        let err = l
            .run(
                &mut |_| {
                    calls += 1;
                    Err(AppError::Stopped)
                },
                &|| false,
                POLL_INTERVAL,
            )
            .unwrap_err();
        assert!(matches!(err, AppError::Stopped));
        assert_eq!(calls, 1);
    }

    #[test]
    fn detector_requires_aligned_inputs() {
        let factory = DetectorProcess::new("detector", vec![]);
        let err = factory.build(&models(), &[0.5]).err().unwrap();
        assert!(matches!(err, AppError::Listener { .. }));
    }

    #[test]
    fn missing_detector_program_is_a_listener_error() {
        let factory = DetectorProcess::new("/nonexistent/xavier-detector", vec![]);
        let err = factory.build(&models(), &[0.5, 0.5]).err().unwrap();
        assert!(err.to_string().contains("Failed to spawn detector"));
    }

    #[test]
    fn undecodable_lines_are_ignored() {
        let mut l = LineListener::from_reader(Cursor::new(b"\xff\xfe\njoke\n".to_vec()), models());
        let mut seen = Vec::new();
        l.run(
            &mut |i| {
                seen.push(i);
                Ok(())
            },
            &|| false,
            POLL_INTERVAL,
        )
        .unwrap();
        assert_eq!(seen, vec![0]);
    }

    #[cfg(unix)]
    #[test]
    fn detector_exit_is_a_listener_error() {
        let factory = DetectorProcess::new("sh", vec!["-c".into(), "echo joke; exit 3".into()]);
        let mut l = factory.build(&models(), &[0.5, 0.5]).unwrap();
        let mut seen = Vec::new();
        let err = l
            .run(
                &mut |i| {
                    seen.push(i);
                    Ok(())
                },
                &|| false,
                POLL_INTERVAL,
            )
            .unwrap_err();
        assert_eq!(seen, vec![0]);
        assert!(
            matches!(&err, AppError::Listener { message } if message.contains("Detector exited")),
            "got: {err}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn clean_detector_exit_is_still_an_error() {
        let factory = DetectorProcess::new("sh", vec!["-c".into(), "exit 0".into()]);
        let mut l = factory.build(&models(), &[0.5, 0.5]).unwrap();
        let err = l.run(&mut |_| Ok(()), &|| false, POLL_INTERVAL).unwrap_err();
        assert!(matches!(err, AppError::Listener { .. }), "got: {err}");
    }
}
