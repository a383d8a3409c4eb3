//! Basic tilewall-screen usage example
//!
//! This example demonstrates:
//! - Binding a 2x2 surface group
//! - Playing a frame folder from a media root
//! - Driving the scheduler for a few seconds with one viewer
//!
//! Usage: `cargo run --example basic -- <media-root> <folder> [lut-file]`

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tilewall_screen::{
    EngineConfig, GridSize, GroupSpec, PlaybackParams, Position, RecordingSink, Scheduler,
    ScreenManager, Viewer,
};
use tokio::sync::watch;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let root = args.next().unwrap_or_else(|| ".".to_string());
    let folder = args.next().unwrap_or_else(|| "demo".to_string());

    println!("tilewall-screen v{}", tilewall_screen::VERSION);
    println!();

    let mut builder = EngineConfig::builder().media_root(root);
    if let Some(lut) = args.next() {
        builder = builder.lut_path(lut);
    }
    let mut manager = ScreenManager::new(builder.build())?;

    let id = manager.bind(GroupSpec::sequential("world", GridSize::new(2, 2)?, 1).with_radius(64.0))?;
    let params = PlaybackParams {
        ticks_per_frame: 2,
        looping: true,
        ..Default::default()
    };
    let frames = manager.start_sequence(id, &folder, params)?;
    println!("Playing {} frame(s) from '{}'", frames, folder);

    let manager = Arc::new(Mutex::new(manager));
    let scheduler = Scheduler::from_manager(Arc::clone(&manager));
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        let _ = stop_tx.send(true);
    });

    let viewers = vec![Viewer::new(1, "world", Position::new(0.0, 0.0, 10.0))];
    let mut sink = RecordingSink::new();
    let ticks = scheduler.run(&viewers, &mut sink, stop_rx).await;

    let mut manager = manager.lock();
    println!("{}", manager.describe(id)?);
    println!("{} tick(s), {} tile send(s)", ticks, sink.sends.len());
    manager.shutdown();

    Ok(())
}
