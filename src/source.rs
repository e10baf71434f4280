//! JSON-lines input: one tagged event per line, as recorded from the pose
//! model and camera collaborators.

use crate::{error::Error, pose::PoseFrame};
use serde::Deserialize;
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

#[derive(Debug, Clone, Copy, Deserialize)]
struct RawKeypoint {
    x: f32,
    y: f32,
    score: f32,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum RawEvent {
    Start {
        exercise: String,
    },
    Stop,
    Frame {
        #[serde(default)]
        keypoints: Option<Vec<RawKeypoint>>,
    },
    Orientation {
        beta: f32,
        gamma: f32,
    },
    FacingMode {
        mode: String,
    },
    ForceCalibration,
    ForceDetection,
    SkipLevel,
    UpstreamError {
        message: String,
    },
}

/// One validated input event.
#[derive(Debug, Clone)]
pub(crate) enum Input {
    Start { exercise: String },
    Stop,
    /// `None` while the model has produced nothing for this frame.
    Frame(Option<PoseFrame>),
    Orientation { beta: f32, gamma: f32 },
    FacingMode(String),
    ForceCalibration,
    ForceDetection,
    /// Start without waiting for the device to be level.
    SkipLevel,
    UpstreamError(String),
}

impl Input {
    pub(crate) fn is_frame(&self) -> bool {
        matches!(self, Self::Frame(_))
    }
}

/// Parse one line; blank lines yield `Ok(None)`.
pub(crate) fn parse_line(line: &str, line_number: usize) -> Result<Option<Input>, Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let raw: RawEvent =
        serde_json::from_str(line).map_err(|e| Error::ParseEvent(e, line_number))?;

    Ok(Some(match raw {
        RawEvent::Start { exercise } => Input::Start { exercise },
        RawEvent::Stop => Input::Stop,
        RawEvent::Frame { keypoints } => match keypoints {
            Some(keypoints) if !keypoints.is_empty() => {
                let triples = keypoints
                    .iter()
                    .map(|&RawKeypoint { x, y, score }| (x, y, score))
                    .collect::<Vec<_>>();
                let frame = PoseFrame::from_triples(&triples)
                    .map_err(|e| Error::InvalidFrame(Box::new(e), line_number))?;
                Input::Frame(Some(frame))
            }
            _ => Input::Frame(None),
        },
        RawEvent::Orientation { beta, gamma } => Input::Orientation { beta, gamma },
        RawEvent::FacingMode { mode } => Input::FacingMode(mode),
        RawEvent::ForceCalibration => Input::ForceCalibration,
        RawEvent::ForceDetection => Input::ForceDetection,
        RawEvent::SkipLevel => Input::SkipLevel,
        RawEvent::UpstreamError { message } => Input::UpstreamError(message),
    }))
}

/// Read events from `path`, or standard input when no path is given.
pub(crate) fn open(path: Option<&Path>) -> Result<Box<dyn BufRead + Send>, Error> {
    Ok(match path {
        Some(path) => Box::new(BufReader::new(
            File::open(path).map_err(|e| Error::OpenInput(e, path.to_owned()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    })
}

/// Iterator over the events of a reader. Each item is a line's result, so
/// the caller decides which errors to skip.
pub(crate) struct Events<R> {
    lines: io::Lines<R>,
    line_number: usize,
}

impl<R: BufRead> Events<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> Iterator for Events<R> {
    type Item = Result<Input, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_number += 1;
            let parsed = line
                .map_err(|e| Error::ReadInput(e, self.line_number))
                .and_then(|line| parse_line(&line, self.line_number));
            match parsed {
                Ok(None) => continue,
                Ok(Some(input)) => return Some(Ok(input)),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
