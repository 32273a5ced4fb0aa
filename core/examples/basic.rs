//! Basic circuit breaker usage example

use circuit_guard::{CircuitBreaker, CircuitError, MockClock, mark_ignorable, mark_successful};
use std::io;
use std::sync::Arc;
use std::time::Duration;

fn main() {
    println!("=== Circuit Breaker Basic Example ===\n");

    // Virtual time so the example does not have to sleep
    let clock = Arc::new(MockClock::new());

    let circuit = CircuitBreaker::builder("payment_api")
        .clock(clock.clone())
        .failure_rate(0.5)
        .reset_timeout(Duration::from_secs(5))
        .half_open_probes(2)
        .on_transition(|from, to| println!("   transition: {} -> {}", from, to))
        .on_open(|name| println!("🔴 Circuit '{}' opened!", name))
        .on_close(|name| println!("🟢 Circuit '{}' closed!", name))
        .on_half_open(|name| println!("🟡 Circuit '{}' half-open, testing...", name))
        .build();

    println!("Initial state: {}\n", circuit.state());

    // Simulate successful calls
    println!("--- Successful calls ---");
    for i in 1..=2 {
        match circuit.call(move || Ok::<_, io::Error>(format!("Payment {}", i))) {
            Ok(result) => println!("✓ {}", result),
            Err(e) => println!("✗ Error: {}", e),
        }
    }
    println!("State: {}\n", circuit.state());

    // Reclassified errors
    println!("--- Reclassified errors ---");
    let not_found = || io::Error::from(io::ErrorKind::NotFound);
    let _ = circuit.call(|| Err::<String, _>(mark_successful(not_found())));
    let _ = circuit.call(|| Err::<String, _>(mark_ignorable("caller cancelled")));
    println!("Counters: {:?}\n", circuit.counters());

    // Simulate failures
    println!("--- Triggering failures ---");
    for i in 1..=4 {
        let attempt = move || Err::<String, _>(io::Error::other(format!("Payment failed {}", i)));
        match circuit.call(attempt) {
            Ok(_) => println!("✓ Success"),
            Err(e) => println!("✗ {}", e),
        }
    }
    println!("State: {} (circuit opened)\n", circuit.state());

    // Try calling while open
    println!("--- Attempting call while open ---");
    match circuit.call(|| Ok::<_, io::Error>("Should be rejected")) {
        Ok(_) => println!("✓ Success"),
        Err(CircuitError::Open { circuit }) => println!("✗ rejected by '{}'", circuit),
        Err(e) => println!("✗ {}", e),
    }
    println!();

    // Let the reset timeout elapse
    println!("--- Waiting for reset timeout ---");
    clock.advance(Duration::from_secs(5));
    println!("State: {}\n", circuit.state());

    // Probe calls decide the outcome
    println!("--- Probe calls ---");
    for i in 1..=2 {
        match circuit.call(move || Ok::<_, io::Error>(format!("Probe {}", i))) {
            Ok(result) => println!("✓ {}", result),
            Err(e) => println!("✗ {}", e),
        }
    }
    println!("State: {}", circuit.state());
}
