use anyhow::{bail, Context};
use crabcapture::platform::{CameraPosition, CaptureBackend};
use crabcapture::testing::{ConcatComposer, SimulatedBackend};
use crabcapture::timing::MonotonicClock;
use crabcapture::{CaptureSession, CrabCaptureConfig, RecordTrigger, SessionEvent};
use crossbeam_channel::Receiver;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const QUEUE_TIMEOUT: Duration = Duration::from_secs(5);

fn main() -> anyhow::Result<()> {
    crabcapture::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: crabcapture-cli <list-devices|photo|record|config> [args]");
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "list-devices" => cmd_list_devices(&args),
        "photo" => cmd_photo(&args),
        "record" => cmd_record(&args),
        "config" => cmd_config(&args),
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_secs(args: &[String], flag: &str) -> anyhow::Result<Option<f64>> {
    match flag_value(args, flag) {
        Some(v) => {
            let secs: f64 = v
                .parse()
                .with_context(|| format!("{} expects seconds, got {:?}", flag, v))?;
            if !secs.is_finite() || secs < 0.0 {
                bail!("{} must be a non-negative number of seconds", flag);
            }
            Ok(Some(secs))
        }
        None => Ok(None),
    }
}

fn load_config(args: &[String]) -> anyhow::Result<CrabCaptureConfig> {
    let config = match flag_value(args, "--path") {
        Some(path) => CrabCaptureConfig::load_from_file(&path)
            .with_context(|| format!("loading config from {}", path))?,
        None => CrabCaptureConfig::load_or_default(),
    };
    Ok(config)
}

fn open_session(config: CrabCaptureConfig) -> anyhow::Result<CaptureSession> {
    let backend = SimulatedBackend::new(Arc::new(MonotonicClock::new()));
    let session = CaptureSession::open(config, backend, ConcatComposer)?;
    session.arm()?;
    match wait_for(&session.events(), |e| {
        matches!(e, SessionEvent::Armed { .. } | SessionEvent::CameraUnavailable)
    })? {
        SessionEvent::Armed { device, preset, .. } => {
            println!("Armed {} ({:?})", device.name, preset);
            Ok(session)
        }
        _ => bail!("no camera available"),
    }
}

fn wait_for<F>(events: &Receiver<SessionEvent>, wanted: F) -> anyhow::Result<SessionEvent>
where
    F: Fn(&SessionEvent) -> bool,
{
    let deadline = Instant::now() + QUEUE_TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let event = events
            .recv_timeout(remaining)
            .context("timed out waiting for the session")?;
        log::debug!("{:?}", event);
        if wanted(&event) {
            return Ok(event);
        }
    }
}

fn cmd_list_devices(args: &[String]) -> anyhow::Result<()> {
    let backend = SimulatedBackend::new(Arc::new(MonotonicClock::new()));
    let devices = backend.discover_cameras();
    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string(&devices)?);
    } else {
        for d in devices {
            println!(
                "{}: {} [{} {:?}] zoom {:.1}-{:.1}",
                d.id,
                d.name,
                d.position.as_str(),
                d.kind,
                d.min_zoom,
                d.max_zoom
            );
        }
    }
    Ok(())
}

fn cmd_photo(args: &[String]) -> anyhow::Result<()> {
    let mut config = load_config(args)?;
    if args.contains(&"--front".to_string()) {
        config.camera.device_position = CameraPosition::Front;
    }
    let session = open_session(config)?;

    if args.contains(&"--flash".to_string()) {
        session.toggle_flash()?;
    }
    if !session.capture_photo()? {
        bail!("photo capture not admitted in state {:?}", session.status());
    }

    match wait_for(&session.events(), |e| {
        matches!(e, SessionEvent::PhotoReady(_) | SessionEvent::PhotoFailed)
    })? {
        SessionEvent::PhotoReady(bytes) => println!("Photo: {} bytes", bytes.len()),
        _ => bail!("photo capture failed"),
    }

    session.close(QUEUE_TIMEOUT)?;
    Ok(())
}

fn cmd_record(args: &[String]) -> anyhow::Result<()> {
    let mut config = load_config(args)?;
    let seconds = parse_secs(args, "--seconds")?.unwrap_or(3.0);
    let switch_at = parse_secs(args, "--switch-at")?;
    if let Some(min) = parse_secs(args, "--min")? {
        config.recording.min_record_duration_secs = min;
    }
    if seconds > config.recording.max_record_duration_secs {
        config.recording.max_record_duration_secs = seconds;
    }
    let trigger = RecordTrigger::from_config(&config.recording);

    let session = open_session(config)?;
    let events = session.events();

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst))
            .context("installing Ctrl-C handler")?;
    }

    if !session.start_recording(trigger)? {
        bail!("recording not admitted in state {:?}", session.status());
    }
    println!("Recording for {:.1}s (Ctrl-C to stop early)", seconds);

    let started = Instant::now();
    let total = Duration::from_secs_f64(seconds);
    let mut switch_at = switch_at.map(Duration::from_secs_f64);
    while started.elapsed() < total && !interrupted.load(Ordering::SeqCst) {
        if switch_at.is_some_and(|at| started.elapsed() >= at) {
            switch_at = None;
            session.switch_camera()?;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    session.stop_recording()?;

    let outcome = wait_for(&events, |e| {
        matches!(
            e,
            SessionEvent::RecordingFinished { .. }
                | SessionEvent::RecordingRejectedTooShort { .. }
                | SessionEvent::MergeFailed { .. }
                | SessionEvent::RecordingAborted
        )
    })?;
    session.close(QUEUE_TIMEOUT)?;

    match outcome {
        SessionEvent::RecordingFinished {
            path,
            duration,
            segment_count,
        } => {
            println!(
                "Take: {} ({:.2}s, {} segment(s))",
                path.display(),
                duration.as_secs_f64(),
                segment_count
            );
            Ok(())
        }
        other => match other.as_error() {
            Some(e) => Err(e.into()),
            None => bail!("nothing was recorded"),
        },
    }
}

fn cmd_config(args: &[String]) -> anyhow::Result<()> {
    let config = load_config(args)?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
