//! Basic tilewall-source usage example
//!
//! This example demonstrates:
//! - Checking whether the decoder is installed
//! - Resolving a frame folder from a media root
//! - Running a sequence producer for a moment and draining its queue
//!
//! Usage: `cargo run --example basic -- <media-root> <folder>`

use std::time::Duration;

use tilewall_frame::{FrameQueue, GridSize};
use tilewall_source::{
    DecoderConfig, DecoderProbe, FolderContent, FrameSource, MediaLibrary, ProducerContext,
    ProducerHandle, SequenceSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let root = args.next().unwrap_or_else(|| ".".to_string());
    let folder = args.next().unwrap_or_else(|| "demo".to_string());

    println!("tilewall-source v{}", tilewall_source::VERSION);
    println!();

    let config = DecoderConfig::default();
    let probe = DecoderProbe::new(config.decoder_binary.clone());
    println!("Decoder '{}' available: {}", probe.binary(), probe.is_available());

    let grid = GridSize::new(1, 1)?;
    let library = MediaLibrary::new(root);
    let loaded = library.load_folder(&folder, grid)?;
    println!("Folder '{}': {} frame(s)", loaded.label, loaded.frame_count());

    let FolderContent::Sequence(files) = loaded.content else {
        println!("Folder holds a video; nothing to preview without a color table");
        return Ok(());
    };

    let source = FrameSource::Sequence(SequenceSource {
        files,
        start_index: 0,
        looping: false,
        capacity: config.default_queue_capacity,
    });
    let ctx = ProducerContext {
        owner: "example".to_string(),
        grid,
        lut: None,
        config,
    };
    let mut producer = ProducerHandle::spawn(source, ctx, FrameQueue::new())?;
    std::thread::sleep(Duration::from_millis(200));

    let mut count = 0;
    while let Some(frame) = producer.queue().pop() {
        count += 1;
        println!("  frame {}: first pixel index {}", count, frame.pixels()[0]);
    }
    producer.stop(Duration::from_millis(250));

    Ok(())
}
