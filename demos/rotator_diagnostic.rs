// Rotator diagnostic: READ-ONLY check of the serial link
//
// Sends only ping and version queries; nothing moves.
//
// Usage: cargo run --example rotator_diagnostic -- [port] [baud]
// Example: cargo run --example rotator_diagnostic -- /dev/ttyUSB0 9600

use sunshine_rotator::config::{DEFAULT_BAUDRATE, DEFAULT_PORT, DRIVER_TIMEOUT};
use sunshine_rotator::rotator::{CommandClient, SerialTransport};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("debug".parse().unwrap()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let port = args.next().unwrap_or_else(|| DEFAULT_PORT.to_string());
    let baud = match args.next() {
        Some(b) => b.parse()?,
        None => DEFAULT_BAUDRATE,
    };

    println!("Sunshine rotator diagnostic (read-only)");
    println!("Serial port: {} @ {} baud", port, baud);
    println!();

    println!("Step 1: Opening serial port...");
    let transport = match SerialTransport::open(&port, baud, DRIVER_TIMEOUT) {
        Ok(t) => {
            println!("  ✓ Serial port opened");
            t
        }
        Err(e) => {
            println!("  ✗ Failed to open serial port: {}", e);
            println!();
            println!("Troubleshooting:");
            println!("  - Check the port path is correct");
            println!("  - Verify the USB cable is connected");
            println!("  - Check you have permission to open the device");
            return Err(e.into());
        }
    };
    let mut client = CommandClient::new(transport);
    println!();

    println!("Step 2: Ping...");
    match client.ping() {
        Ok(()) => println!("  ✓ RESPONDING"),
        Err(e) if e.is_timeout() => {
            println!("  ✗ NO RESPONSE within {:?}", client.timeout());
            return Ok(());
        }
        Err(e) => {
            println!("  ✗ ERROR: {}", e);
            return Ok(());
        }
    }
    println!();

    println!("Step 3: Firmware version...");
    match client.query_firmware() {
        Ok(fw) => println!("  ✓ Firmware {}", fw),
        Err(e) => println!("  ✗ ERROR: {}", e),
    }

    Ok(())
}
