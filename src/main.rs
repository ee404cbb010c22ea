use anyhow::{Context, Result};
use clap::Parser;
use livecap::audio::{self, AudioStream, CaptureStream};
use livecap::config::AppConfig;
use livecap::pipeline::{CaptionPipeline, CaptionSink, SpeechEngine};
use livecap::sink::{ConsolePrinter, OverlayHandle, OverlaySink, TranscriptWriter};
use livecap::stt::Transcriber;
use livecap::{init_tracing, overlay, Session};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Idle nap for busy-loop mode: long enough to stop a core from spinning
/// flat out, far shorter than one capture block.
const IDLE_NAP: Duration = Duration::from_millis(5);

fn main() -> Result<()> {
    let mut config = AppConfig::parse();

    if config.list_devices {
        print_device_list();
        return Ok(());
    }

    config.validate()?;
    init_tracing(&config);
    let caption_cfg = config.caption_config();

    // Fatal startup resources first: model, transcript file, device.
    let model_path = config.resolved_model_path()?;
    let transcriber = Transcriber::new(
        model_path
            .to_str()
            .context("whisper model path must be valid UTF-8")?,
    )?;

    let overlay_handle = (!config.no_overlay).then(OverlayHandle::new);
    let mut sinks: Vec<Box<dyn CaptionSink>> =
        vec![Box::new(ConsolePrinter::new(config.translate))];
    if let Some(path) = &config.output {
        let writer = TranscriptWriter::create(path)?;
        println!("Saving transcript to: {}", writer.path().display());
        sinks.push(Box::new(writer));
    }
    if let Some(handle) = &overlay_handle {
        sinks.push(Box::new(OverlaySink::new(handle.clone())));
    }

    let devices = audio::list_devices()?;
    let device_index = match config.device {
        Some(index) => index,
        None => audio::prompt_device(&devices)?,
    };

    let (sender, receiver) = audio::block_channel();
    let stream = CaptureStream::open(device_index, &caption_cfg, sender)?;
    println!(
        "Streaming system audio from '{}'... Press Ctrl+C to stop",
        stream.device_name()
    );

    let pipeline = CaptionPipeline::new(&caption_cfg, receiver, transcriber, sinks);
    let mut session = Session::new(stream, pipeline);

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || {
            if !stop.swap(true, Ordering::SeqCst) {
                println!("Stopping transcription...");
            }
        })
        .context("failed to install interrupt handler")?;
    }

    match overlay_handle {
        Some(handle) => overlay::run(session, handle, stop, caption_cfg.tick_ms)?,
        None => {
            run_busy_loop(&mut session, &stop);
            session.close();
        }
    }

    Ok(())
}

/// Busy-loop drive mode: cycles run back-to-back while data flows, with a
/// short nap only when a cycle found nothing to do.
fn run_busy_loop<E, S>(session: &mut Session<E, S>, stop: &AtomicBool)
where
    E: SpeechEngine,
    S: AudioStream,
{
    while !stop.load(Ordering::SeqCst) {
        let report = session.tick();
        if report.drained_blocks == 0 && !report.triggered {
            thread::sleep(IDLE_NAP);
        }
    }
}

fn print_device_list() {
    match audio::list_devices() {
        Ok(devices) => {
            println!("Available audio input devices:");
            for dev in &devices {
                println!(
                    "{:>3}: {} ({} input channels)",
                    dev.index, dev.name, dev.channels
                );
            }
            if devices.is_empty() {
                println!("(none detected)");
            }
        }
        Err(err) => println!("Failed to list audio input devices: {err:#}"),
    }
}
