// Polling loop driving the rotator
//
// Commands arrive as JSON lines on stdin and are drained once per tick.
// The timer tick itself only steps the motion controller; serial round
// trips happen only for explicit ping/firmware commands and at connect.

use std::io::Write;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::config::RotatorConfig;
use crate::messages::{RotatorCommand, RotatorSnapshot};
use crate::rotator::{RotatorDriver, SerialTransport, SimulatedDevice, Transport};

pub type RuntimeError = Box<dyn std::error::Error + Send + Sync>;

pub struct Runtime<T: Transport> {
    driver: RotatorDriver<T>,
}

impl<T: Transport> Runtime<T> {
    pub fn new(driver: RotatorDriver<T>) -> Self {
        Self { driver }
    }

    /// Apply one host command. Ping and firmware block on the serial link.
    pub fn on_command(&mut self, cmd: RotatorCommand) -> RotatorSnapshot {
        info!("Received command: {:?}", &cmd);
        match cmd {
            RotatorCommand::Move { angle } => {
                self.driver.move_to(angle);
            }
            RotatorCommand::Sync { angle } => {
                self.driver.sync(angle);
            }
            RotatorCommand::Abort => {
                self.driver.abort();
            }
            RotatorCommand::Reverse { enabled } => {
                self.driver.set_reversed(enabled);
            }
            RotatorCommand::Ping => {
                if let Err(e) = self.driver.ping() {
                    warn!("Ping failed: {}", e);
                }
            }
            RotatorCommand::Firmware => {
                if let Err(e) = self.driver.query_firmware() {
                    warn!("Firmware query failed: {}", e);
                }
            }
        }
        self.driver.snapshot()
    }

    pub fn on_tick(&mut self) -> Option<RotatorSnapshot> {
        self.driver.on_timer_tick()
    }

    pub fn driver(&self) -> &RotatorDriver<T> {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut RotatorDriver<T> {
        &mut self.driver
    }
}

pub async fn run(config: RotatorConfig) -> Result<(), RuntimeError> {
    let transport: Box<dyn Transport> = if config.simulate {
        info!("Using simulated rotator");
        Box::new(SimulatedDevice::default())
    } else {
        info!("Opening rotator on {} at {} baud", config.port, config.baud_rate);
        Box::new(SerialTransport::open(&config.port, config.baud_rate, config.timeout())?)
    };

    let mut driver = RotatorDriver::new(transport, &config);
    driver.initialize();
    if !tokio::task::block_in_place(|| driver.connect()) {
        return Err(format!("{} did not answer the handshake", driver.default_name()).into());
    }

    run_loop(Runtime::new(driver), config.poll_period()).await
}

async fn run_loop<T: Transport>(mut runtime: Runtime<T>, period: Duration) -> Result<(), RuntimeError> {
    let (tx, mut rx) = mpsc::channel(32);
    tokio::spawn(read_commands(tx));

    let mut tick = interval(period);
    let mut input_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!("Runtime started: {}ms polling period", period.as_millis());
    publish(&runtime.driver().snapshot())?;

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = &mut ctrl_c => {
                runtime.driver_mut().abort();
                info!("Interrupted, stopping");
                return Ok(());
            }
        }

        // 1. Drain all pending commands (non-blocking)
        while input_open {
            match rx.try_recv() {
                Ok(cmd) => {
                    let snapshot = tokio::task::block_in_place(|| runtime.on_command(cmd));
                    publish(&snapshot)?;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => input_open = false,
            }
        }

        // 2. Advance motion
        if let Some(snapshot) = runtime.on_tick() {
            publish(&snapshot)?;
        }

        if !input_open && !runtime.driver().motion().is_busy() {
            info!("Input closed and rotator idle, exiting");
            return Ok(());
        }
    }
}

async fn read_commands(tx: mpsc::Sender<RotatorCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<RotatorCommand>(line) {
            Ok(cmd) => {
                if tx.send(cmd).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!("Failed to parse command: {}", e),
        }
    }
}

fn publish(snapshot: &RotatorSnapshot) -> Result<(), RuntimeError> {
    publish_to(&mut std::io::stdout().lock(), snapshot)
}

// A closed stdout (host went away) is an error, not a panic
fn publish_to(out: &mut impl Write, snapshot: &RotatorSnapshot) -> Result<(), RuntimeError> {
    writeln!(out, "{}", serde_json::to_string(snapshot)?)?;
    out.flush()?;
    Ok(())
}
