use anyhow::{ensure, Context, Result};
use crossbeam::channel::Receiver;
use engine::{Engine, EngineEvent, FrameReport, SecondReport};
use error::Error;
use frame_slot::FrameSlot;
use indicatif::{ProgressBar, ProgressStyle};
use pose::PoseFrame;
use source::{Events, Input};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use structopt::StructOpt;
use tracing::{debug, info, trace, warn};
use tracing_subscriber::layer::SubscriberExt;

mod alignment;
mod angle;
mod clock;
mod config;
mod engine;
mod error;
mod exercise;
mod frame_slot;
mod gate;
mod level;
mod limb;
mod pose;
mod quality;
mod source;
mod status;

#[derive(structopt::StructOpt)]
struct Opt {
    /// JSON-lines event stream; standard input when omitted.
    input: Option<PathBuf>,

    /// Start a session for this exercise before reading any input.
    #[structopt(short, long)]
    exercise: Option<String>,

    /// Initial camera facing mode.
    #[structopt(long, default_value = "user")]
    facing_mode: String,

    /// Replay deterministically, advancing the clock one second per this
    /// many frames. Without it seconds follow the wall clock.
    #[structopt(short, long)]
    replay_fps: Option<usize>,

    #[structopt(short, long, default_value = "info", env = "RUST_LOG")]
    log_level: tracing_subscriber::filter::EnvFilter,

    #[structopt(short, long)]
    show_progress: bool,

    #[structopt(flatten)]
    engine: config::EngineConfig,
}

/// Position of an input in the stream, assigned by the reader thread.
type Seq = u64;

/// A frame waiting in the slot, tagged with its position.
type SeqFrame = (Seq, Option<PoseFrame>);

/// Messages from the reader thread other than frames.
enum Control {
    Input(Seq, Input),
    Failed(Error),
    Finished,
}

fn log_events(events: &[EngineEvent]) {
    for event in events {
        match event {
            EngineEvent::RepCounted { .. }
            | EngineEvent::HoldStarted
            | EngineEvent::HoldLost
            | EngineEvent::DeviceLevelChanged { .. } => info!(%event),
            _ => debug!(%event),
        }
    }
}

fn on_frame_report(report: &FrameReport, progress: Option<&ProgressBar>) {
    log_events(&report.events);
    trace!(
        visible = report.visible,
        average = report.average,
        angle = ?report.smoothed_angle,
        rep_state = %report.rep_state
    );
    if let Some(progress) = progress {
        let message = if report.phase == engine::Phase::Calibrating {
            format!(
                "{} | {} | hold {} s{} | {}",
                report.phase,
                report.quality,
                report.alignment.dwell_remaining(),
                if report.alignment.override_available {
                    " | override available"
                } else {
                    ""
                },
                report.status
            )
        } else {
            format!(
                "{} | {} | count {} | {}",
                report.phase, report.quality, report.count, report.status
            )
        };
        progress.set_message(message);
        progress.inc(1);
    }
}

fn on_second_report(report: &SecondReport, progress: Option<&ProgressBar>) {
    log_events(&report.events);
    debug!(
        message = "second",
        seconds = report.exercise_seconds,
        phase = %report.phase,
        alignment = %report.alignment.state,
        status = %report.status
    );
    if let Some(progress) = progress {
        progress.set_prefix(clock::format_clock(report.exercise_seconds));
    }
}

fn dispatch(engine: &mut Engine, input: Input, progress: Option<&ProgressBar>) {
    match input {
        Input::Start { exercise } => engine.start(&exercise),
        Input::Stop => engine.stop(),
        Input::Frame(frame) => {
            let report = engine.process_frame(frame.as_ref());
            on_frame_report(&report, progress);
        }
        Input::Orientation { beta, gamma } => {
            if let Some(event) = engine.observe_orientation(beta, gamma) {
                log_events(&[event]);
            }
            trace!(beta, gamma, level = ?engine.is_level());
        }
        Input::FacingMode(mode) => engine.switch_facing_mode(&mode),
        Input::ForceCalibration => match engine.force_calibration_complete() {
            Some((outcome, events)) => {
                info!(message = "manual calibration requested", ?outcome);
                log_events(&events);
            }
            None => warn!("manual calibration requested without a session"),
        },
        Input::ForceDetection => {
            if !engine.force_detection() {
                warn!("detection override requested without a session");
            }
        }
        Input::SkipLevel => {
            if let Some(event) = engine.skip_level_check() {
                log_events(&[event]);
            }
        }
        Input::UpstreamError(message) => engine.report_upstream_failure(&message),
    }
}

/// Input errors other than a failed read only cost the offending line.
fn absorb(result: Result<Input, Error>) -> Result<Option<Input>, Error> {
    match result {
        Ok(input) => Ok(Some(input)),
        Err(e @ Error::ReadInput(..)) => Err(e),
        Err(e) => {
            warn!(message = "skipping input line", error = %e);
            Ok(None)
        }
    }
}

/// Frame-counted replay: strictly ordered, one clock second every `fps`
/// frames.
fn replay<I>(
    engine: &mut Engine,
    events: I,
    fps: usize,
    running: &AtomicBool,
    progress: Option<&ProgressBar>,
) -> Result<()>
where
    I: Iterator<Item = Result<Input, Error>>,
{
    let mut frames = 0_usize;
    for result in events {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let input = match absorb(result)? {
            Some(input) => input,
            None => continue,
        };

        let is_frame = input.is_frame();
        dispatch(engine, input, progress);

        if is_frame {
            frames += 1;
            if frames % fps == 0 {
                let report = engine.on_second();
                on_second_report(&report, progress);
            }
        }
    }
    Ok(())
}

fn dispatch_frame(engine: &mut Engine, frame: Option<SeqFrame>, progress: Option<&ProgressBar>) {
    if let Some((_, frame)) = frame {
        dispatch(engine, Input::Frame(frame), progress);
    }
}

/// Handle one reader message. Any frame read before the message's input,
/// held in `pending` or still in the slot, is processed first. Returns
/// `false` once the reader is done.
fn on_control(
    engine: &mut Engine,
    slot: &FrameSlot<SeqFrame>,
    pending: &mut Option<SeqFrame>,
    message: Option<Control>,
    progress: Option<&ProgressBar>,
) -> Result<bool> {
    match message {
        Some(Control::Input(seq, input)) => {
            if pending.as_ref().map_or(false, |(frame_seq, _)| *frame_seq < seq) {
                dispatch_frame(engine, pending.take(), progress);
            }
            dispatch_frame(
                engine,
                slot.take_if(|(frame_seq, _)| *frame_seq < seq),
                progress,
            );
            dispatch(engine, input, progress);
            Ok(true)
        }
        Some(Control::Failed(e)) => Err(e).context("failed reading input"),
        Some(Control::Finished) | None => {
            dispatch_frame(engine, pending.take(), progress);
            dispatch_frame(engine, slot.take(), progress);
            Ok(false)
        }
    }
}

/// Take the newest frame, then everything the reader queued before it.
/// Control inputs are sent before any later frame is stored, so once a
/// frame is taken every earlier input is already in `control_rx`.
fn on_frame_ready(
    engine: &mut Engine,
    slot: &FrameSlot<SeqFrame>,
    control_rx: &Receiver<Control>,
    progress: Option<&ProgressBar>,
) -> Result<bool> {
    let mut pending = slot.take();
    while let Ok(message) = control_rx.try_recv() {
        if !on_control(engine, slot, &mut pending, Some(message), progress)? {
            return Ok(false);
        }
    }
    dispatch_frame(engine, pending, progress);
    Ok(true)
}

/// Wall-clock replay: a reader thread feeds frames through a latest-wins
/// slot while this thread processes them and ticks once a second. Frames
/// may be dropped but are never reordered relative to other inputs.
fn live<I>(
    engine: &mut Engine,
    events: I,
    running: Arc<AtomicBool>,
    progress: Option<&ProgressBar>,
) -> Result<()>
where
    I: Iterator<Item = Result<Input, Error>> + Send + 'static,
{
    let slot = Arc::new(FrameSlot::<SeqFrame>::new());
    let (control_tx, control_rx) = crossbeam::channel::unbounded();
    let ticker = crossbeam::channel::tick(Duration::from_secs(1));

    let reader_slot = slot.clone();
    let reader_running = running.clone();
    // not joined on Ctrl-C: it may be blocked on standard input
    std::thread::Builder::new()
        .name("reader".into())
        .spawn(move || {
            let mut seq: Seq = 0;
            for result in events {
                if !reader_running.load(Ordering::SeqCst) {
                    break;
                }
                seq += 1;
                match absorb(result) {
                    Ok(Some(Input::Frame(frame))) => {
                        if reader_slot.put((seq, frame)) {
                            trace!("dropped unprocessed frame");
                        }
                    }
                    Ok(Some(input)) => {
                        if control_tx.send(Control::Input(seq, input)).is_err() {
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        let _ = control_tx.send(Control::Failed(e));
                        return;
                    }
                }
            }
            let _ = control_tx.send(Control::Finished);
        })
        .context("failed spawning reader thread")?;

    while running.load(Ordering::SeqCst) {
        let more = crossbeam::select! {
            recv(control_rx) -> message => {
                on_control(engine, &slot, &mut None, message.ok(), progress)?
            },
            recv(slot.ready()) -> _ => on_frame_ready(engine, &slot, &control_rx, progress)?,
            recv(ticker) -> _ => {
                let report = engine.on_second();
                on_second_report(&report, progress);
                true
            },
        };
        if !more {
            break;
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(opt.log_level),
    )?;

    opt.engine
        .validate()
        .context("invalid engine configuration")?;
    if let Some(fps) = opt.replay_fps {
        ensure!(fps > 0, "--replay-fps must be greater than zero");
    }

    let mut engine = Engine::new(opt.engine);

    let running = Arc::new(AtomicBool::new(true));
    let running_ctrl_c = running.clone();
    let clock = engine.clock();

    ctrlc::set_handler(move || {
        // no more exercise time accrues once interrupted
        clock.stop();
        running_ctrl_c.store(false, Ordering::SeqCst);
    })
    .context("failed setting Ctrl-C handler")?;

    let reader = source::open(opt.input.as_deref()).context("failed opening input")?;
    let events = Events::new(reader);

    engine.switch_facing_mode(&opt.facing_mode);
    if let Some(exercise) = opt.exercise.as_deref() {
        engine.start(exercise);
    }

    let progress = if opt.show_progress {
        Some(
            ProgressBar::new_spinner().with_style(
                ProgressStyle::default_spinner()
                    .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
                    .template("{prefix:.bold.dim} {spinner} {wide_msg}"),
            ),
        )
    } else {
        None
    };

    match opt.replay_fps {
        Some(fps) => replay(&mut engine, events, fps, &running, progress.as_ref())?,
        None => live(&mut engine, events, running, progress.as_ref())?,
    }

    debug!(
        message = "input finished",
        phase = %engine.phase(),
        quality = %engine.quality(),
        alignment = %engine.alignment().state,
        status = %engine.status(),
        clock_running = engine.clock().is_active(),
        facing_mode = ?engine.facing_mode()
    );
    engine.stop();
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }

    if let Some(exercise) = engine.exercise() {
        println!("Exercise: {}", exercise.display_name());
        println!("Count: {}", engine.count());
        println!("Time: {}", clock::format_clock(engine.exercise_seconds()));
        if let Some(path) = engine.calibration_path() {
            println!("Calibrated via: {}", path);
        }
    }

    Ok(())
}
