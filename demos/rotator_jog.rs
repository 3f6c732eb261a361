// Keyboard jog of the simulated rotator
// A/D jog -/+15°, 0-7 go to 0..315°, R toggle reverse, Space abort, Q quit
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use sunshine_rotator::config::RotatorConfig;
use sunshine_rotator::rotator::{RotatorDriver, SimulatedDevice};

const JOG_DEGREES: f64 = 15.0;
const TICK_PERIOD: Duration = Duration::from_millis(200);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_writer(std::io::stderr)
        .init();

    let mut driver = RotatorDriver::new(SimulatedDevice::default(), &RotatorConfig::default());
    if !driver.connect() {
        return Err("simulated rotator did not answer".into());
    }
    println!(
        "{} firmware {}. Controls: A/D jog, 0-7 preset, R reverse, Space abort, Q quit",
        driver.default_name(),
        driver.firmware_version()
    );

    enable_raw_mode()?;
    let result = run_jog(&mut driver);
    disable_raw_mode()?;

    result
}

fn run_jog(driver: &mut RotatorDriver<SimulatedDevice>) -> Result<(), Box<dyn std::error::Error>> {
    let mut reversed = false;
    let mut last_tick = Instant::now();

    loop {
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                if kind == KeyEventKind::Press {
                    match code {
                        KeyCode::Char('a') => {
                            driver.jog(-JOG_DEGREES);
                        }
                        KeyCode::Char('d') => {
                            driver.jog(JOG_DEGREES);
                        }
                        KeyCode::Char(c @ '0'..='7') => {
                            let preset = c.to_digit(10).unwrap_or(0) as f64 * 45.0;
                            driver.move_to(preset);
                        }
                        KeyCode::Char('r') => {
                            reversed = !reversed;
                            driver.set_reversed(reversed);
                        }
                        KeyCode::Char(' ') => {
                            driver.abort();
                        }
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                        _ => {}
                    }
                    print_state(driver);
                }
            }
        }

        if last_tick.elapsed() >= TICK_PERIOD {
            last_tick = Instant::now();
            if driver.on_timer_tick().is_some() {
                print_state(driver);
            }
        }
    }
}

fn print_state(driver: &RotatorDriver<SimulatedDevice>) {
    let snap = driver.snapshot();
    let target = snap
        .target_angle
        .map_or_else(|| "-".to_string(), |t| format!("{:.1}", t));
    // Raw mode needs an explicit carriage return
    print!(
        "\rangle {:6.1}  target {:>6}  {:?}  reversed={}        \r\n",
        snap.current_angle, target, snap.status, snap.reversed
    );
}
