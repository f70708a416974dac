//! Emulate command implementation
//!
//! Runs the device engine on the host with an in-memory chip. Clients connect
//! over TCP (`ip=host:port`) one at a time; the chip and the device registers
//! survive between connections, like a programmer that stays powered.

use parburn_core::chip::ChipMode;
use parburn_core::dispatch::Dispatcher;
use parburn_core::link::StdLink;
use parburn_core::programmer::{Platform, Programmer};
use parburn_core::{DeviceConfig, Error, Timing};
use parburn_dummy::{DummyChip, DummyConfig};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Idle time after which a partially received frame is abandoned
const LINK_TIMEOUT: Duration = Duration::from_secs(1);

/// Options of the emulate command
pub struct EmulateOptions {
    pub listen: String,
    pub config: Option<PathBuf>,
    pub image: Option<PathBuf>,
    pub save: Option<PathBuf>,
    pub mode: ChipMode,
    pub protected: bool,
    pub realtime: bool,
}

/// Platform that sleeps the calling thread
struct HostPlatform;

impl Platform for HostPlatform {
    fn delay_ms(&mut self, ms: u32) {
        if ms > 0 {
            std::thread::sleep(Duration::from_millis(u64::from(ms)));
        }
    }

    fn activity(&mut self) {
        log::trace!("Block committed");
    }
}

type EmulatedDevice = Dispatcher<DummyChip, HostPlatform, StdLink<TcpStream>>;

/// Build the emulated chip, optionally preloaded from an image file
fn build_chip(
    config: &DeviceConfig,
    mode: ChipMode,
    protected: bool,
    image: Option<&Path>,
) -> Result<DummyChip, Box<dyn std::error::Error>> {
    let chip_config = DummyConfig {
        size: config.window_size,
        kind: mode,
        protected,
        ..Default::default()
    };

    let Some(path) = image else {
        return Ok(DummyChip::new(chip_config));
    };

    let data = std::fs::read(path)?;
    if data.len() > config.window_size {
        return Err(format!(
            "Image size ({} bytes) exceeds chip size ({} bytes)",
            data.len(),
            config.window_size
        )
        .into());
    }
    log::info!("Loaded {} bytes from {:?}", data.len(), path);
    Ok(DummyChip::with_data(chip_config, &data))
}

fn open_link(stream: TcpStream) -> std::io::Result<StdLink<TcpStream>> {
    stream.set_nodelay(true)?;
    stream.set_read_timeout(Some(LINK_TIMEOUT))?;
    Ok(StdLink::new(stream))
}

/// Serve one client until it disconnects
fn serve_client(device: &mut EmulatedDevice) {
    loop {
        match device.step() {
            Ok(()) => {}
            Err(Error::Timeout) => log::trace!("Link timed out"),
            Err(Error::Disconnected) => {
                log::info!("Client disconnected");
                return;
            }
            Err(e) => {
                log::warn!("Link error: {}", e);
                return;
            }
        }
    }
}

fn save_chip(device: &EmulatedDevice, path: &Path) {
    let data = device.programmer().window().data();
    match std::fs::write(path, data) {
        Ok(()) => log::info!("Saved {} bytes to {:?}", data.len(), path),
        Err(e) => log::warn!("Failed to save chip contents to {:?}: {}", path, e),
    }
}

/// Run the emulate command
///
/// Serves clients until the process is interrupted.
pub fn run_emulate(options: &EmulateOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &options.config {
        Some(path) => DeviceConfig::load(path)?,
        None => DeviceConfig::default(),
    };
    config.validate()?;

    let chip = build_chip(
        &config,
        options.mode,
        options.protected,
        options.image.as_deref(),
    )?;
    let timing = if options.realtime {
        config.timing
    } else {
        Timing::none()
    };

    let listener = TcpListener::bind(&options.listen)?;
    let local = listener.local_addr()?;
    println!(
        "Emulating a {} byte {} on {} (connect with ip={})",
        config.window_size, options.mode, local, local
    );

    let (stream, peer) = listener.accept()?;
    log::info!("Client connected from {}", peer);
    let programmer = Programmer::new(chip, HostPlatform, timing);
    let mut device = Dispatcher::new(programmer, open_link(stream)?);

    loop {
        serve_client(&mut device);
        if let Some(path) = &options.save {
            save_chip(&device, path);
        }

        let (stream, peer) = listener.accept()?;
        log::info!("Client connected from {}", peer);
        device.replace_link(open_link(stream)?);
    }
}
