//! Basic breaker and debounce usage example

use backoff_breaker::{Breaker, CircuitError, Debounce};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backoff_breaker=info".into()),
        )
        .init();

    println!("=== Breaker Basic Example ===\n");

    let healthy = AtomicBool::new(false);
    let breaker = Breaker::builder("payment_api")
        .failure_threshold(2)
        .base_timeout(Duration::from_millis(200))
        .on_open(|name| println!("Circuit '{}' opened!", name))
        .on_close(|name| println!("Circuit '{}' closed!", name))
        .on_half_open(|name| println!("Circuit '{}' half-open, testing...", name))
        .build(|amount: &u32| {
            if healthy.load(Ordering::SeqCst) {
                Ok(format!("charged {}", amount))
            } else {
                Err(format!("gateway timeout charging {}", amount))
            }
        })
        .expect("valid breaker config");

    println!("--- Triggering failures ---");
    for amount in 1..=4 {
        match breaker.call(&amount) {
            Ok(receipt) => println!("ok: {}", receipt),
            Err(CircuitError::Open { retry_after, .. }) => {
                println!("rejected, retry in {:?}", retry_after)
            }
            Err(CircuitError::Execution(e)) => println!("failed: {}", e),
        }
    }
    println!("State: {}\n", breaker.state());

    println!("--- Waiting out the backoff ---");
    healthy.store(true, Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(250));
    match breaker.call(&5) {
        Ok(receipt) => println!("ok: {}", receipt),
        Err(e) => println!("error: {}", e),
    }
    println!("State: {}\n", breaker.state());

    println!("--- Debounce ---");
    let debounce = Debounce::new(
        |_ctx: &()| {
            println!("fetching fresh value ...");
            Ok::<_, String>("exchange rate 1.08")
        },
        Duration::from_millis(500),
    )
    .expect("valid debounce window");

    for _ in 0..5 {
        match debounce.call(&()) {
            Ok(value) => println!("{}", value),
            Err(e) => println!("failed to get value: {}", e),
        }
        std::thread::sleep(Duration::from_millis(150));
    }
}
