use anyhow::Result;
use hwfmt::hal::mock::{Behavior, SimulatedStream};
use hwfmt::hal::{DeviceManager, FormatDescriptor, NegotiationConfig, StreamId};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    hwfmt::logging::init_logging("hwfmt=debug,negotiate_demo=info");

    println!("Physical Format Negotiation Demo");
    println!("================================\n");

    let config: NegotiationConfig = serde_json::from_value(serde_json::json!({
        "switch_timeout_ms": 500,
        "force_packed_bytes": true
    }))?;

    let advertised = vec![
        FormatDescriptor::pcm_int(44100.0, 2, 16),
        FormatDescriptor::pcm_int(48000.0, 2, 24),
        FormatDescriptor::pcm_int(96000.0, 2, 16),
    ];

    let responsive = SimulatedStream::new(StreamId(0x40), advertised[0])
        .with_available(advertised.clone())
        .with_latency(Duration::from_millis(20));
    let stubborn = SimulatedStream::new(StreamId(0x41), advertised[0])
        .with_available(advertised)
        .with_script(vec![Behavior::Ignore]);

    let mut manager = DeviceManager::new(config);
    manager.add_stream(Arc::new(responsive));
    manager.add_stream(Arc::new(stubborn));

    let requested = FormatDescriptor::pcm_int(48000.0, 2, 16);
    println!("Requested: {}\n", requested);

    for stream_id in manager.stream_ids() {
        match manager.negotiate_and_apply(stream_id, &requested) {
            Ok(format) => println!("Stream {}: switched to {}", stream_id, format),
            Err(e) => println!("Stream {}: {:#}", stream_id, e),
        }
    }

    let outcome = manager
        .switch_format(StreamId(0x40), FormatDescriptor::pcm_int(96000.0, 2, 16))
        .await?;
    println!("\nAsync switch of stream 0x40 to 96kHz: {:?}", outcome);

    Ok(())
}
