//! # Contention Simulator
//!
//! Floods one SKU with concurrent users and checks that no unit is ever
//! sold twice.
//!
//! ## Usage
//! ```bash
//! # 200 users fighting over 25 units (default)
//! cargo run -p stockhold-sim
//!
//! # Custom crowd
//! cargo run -p stockhold-sim -- --stock 10 --users 1000 --sku DROP-42
//!
//! # Use a specific config file
//! cargo run -p stockhold-sim -- --config ./stockhold.toml
//! ```
//!
//! ## Simulated Behavior
//! Every user asks for one unit. Once holding, user `i` does one of:
//! - `i % 4 == 0 | 1`: confirms
//! - `i % 4 == 2`: cancels (frees the unit for the waitlist)
//! - `i % 4 == 3`: walks away (the hold lapses)
//!
//! The engine runs on a manual clock. After the first wave, the clock is
//! moved past the longest hold so the reaper expires abandoned holds and
//! promotes whoever is still waiting. Promoted users then confirm.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use stockhold_core::ReservationOutcome;
use stockhold_engine::{EngineConfig, ExpiryReaper, ManualClock, ReservationEngine};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// What a simulated user ended up doing in the first wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wave {
    Confirmed,
    Cancelled,
    Abandoned,
    Waitlisted,
    Failed,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut sku = String::from("LIMITED-DROP");
    let mut stock: i64 = 25;
    let mut users: usize = 200;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--sku" | "-s" => {
                if i + 1 < args.len() {
                    sku = args[i + 1].clone();
                    i += 1;
                }
            }
            "--stock" | "-n" => {
                if i + 1 < args.len() {
                    stock = args[i + 1].parse().unwrap_or(25);
                    i += 1;
                }
            }
            "--users" | "-u" => {
                if i + 1 < args.len() {
                    users = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockhold Contention Simulator");
                println!();
                println!("Usage: stockhold-sim [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --sku <SKU>      SKU to fight over (default: LIMITED-DROP)");
                println!("  -n, --stock <N>      Units available (default: 25)");
                println!("  -u, --users <N>      Concurrent users (default: 200)");
                println!("  -c, --config <PATH>  Engine config file (default: platform config dir)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = EngineConfig::load_or_default(config_path);

    println!("Stockhold Contention Simulator");
    println!("==============================");
    println!("SKU:   {}", sku);
    println!("Stock: {}", stock);
    println!("Users: {}", users);
    println!();

    let clock = Arc::new(ManualClock::starting_now());
    let engine = Arc::new(ReservationEngine::with_clock(&config, clock.clone()));
    let reaper = ExpiryReaper::new(Arc::clone(&engine), config.reaper.clone()).start();

    engine.initialize_inventory(&sku, stock).await?;

    // -------------------------------------------------------------------------
    // Wave 1: everyone at once
    // -------------------------------------------------------------------------

    let started = std::time::Instant::now();
    let handles: Vec<_> = (0..users)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let sku = sku.clone();
            tokio::spawn(async move { run_user(&engine, &sku, i).await })
        })
        .collect();

    let mut waves = Vec::with_capacity(users);
    for handle in handles {
        waves.push(handle.await?);
    }

    let count = |wave: Wave| waves.iter().filter(|w| **w == wave).count();
    println!("Wave 1 finished in {:?}", started.elapsed());
    println!("  confirmed:  {}", count(Wave::Confirmed));
    println!("  cancelled:  {}", count(Wave::Cancelled));
    println!("  abandoned:  {}", count(Wave::Abandoned));
    println!("  waitlisted: {}", count(Wave::Waitlisted));
    println!("  failed:     {}", count(Wave::Failed));
    println!();

    // -------------------------------------------------------------------------
    // Wave 2: abandoned holds lapse, the waitlist moves up
    // -------------------------------------------------------------------------

    let longest_hold = config.fairness.high_trust_ttl_secs as i64 + 1;
    clock.advance(chrono::Duration::seconds(longest_hold));
    let expired = reaper.sweep().await?;
    info!(expired, "Lapsed holds reaped");

    let mut promoted_confirmed = 0;
    for (i, wave) in waves.iter().enumerate() {
        if *wave != Wave::Waitlisted {
            continue;
        }
        if let Some(hold) = engine.active_reservation(&sku, &user_name(i)).await {
            match engine.confirm_reservation(hold.reservation_id).await {
                Ok(_) => promoted_confirmed += 1,
                Err(e) => warn!(user = %user_name(i), error = %e, "Promoted hold not confirmed"),
            }
        }
    }

    reaper.shutdown().await?;

    // -------------------------------------------------------------------------
    // Report
    // -------------------------------------------------------------------------

    let reservations = engine.reservations_for(&sku).await;
    let sold: i64 = reservations
        .iter()
        .filter(|r| r.status == stockhold_core::ReservationStatus::Confirmed)
        .map(|r| r.quantity)
        .sum();
    let held = engine.held_quantity(&sku).await;
    let available = engine.get_inventory(&sku).await.available_quantity;
    let health = engine.health(&sku).await;

    println!("Wave 2");
    println!("  expired by reaper:   {}", expired);
    println!("  promoted + confirmed: {}", promoted_confirmed);
    println!();
    println!("Final state");
    println!("  sold:      {}", sold);
    println!("  held:      {}", held);
    println!("  available: {}", available);
    println!("  waitlist:  {}", health.waitlist_size);
    println!("  status:    {:?}", health.status);

    if available < 0 || sold + held + available != stock {
        return Err(format!(
            "stock not conserved: sold {} + held {} + available {} != {}",
            sold, held, available, stock
        )
        .into());
    }

    println!();
    println!("✓ No oversell");
    Ok(())
}

/// Name of simulated user `i`.
fn user_name(i: usize) -> String {
    format!("user-{:04}", i)
}

/// One simulated user's first wave.
async fn run_user(engine: &ReservationEngine, sku: &str, i: usize) -> Wave {
    let user = user_name(i);

    let hold = match engine.create_reservation(sku, &user, 1).await {
        Ok(ReservationOutcome::Reserved(hold)) => hold,
        Ok(ReservationOutcome::Waitlisted(_)) => return Wave::Waitlisted,
        Err(e) => {
            warn!(user = %user, error = %e, "Reservation failed");
            return Wave::Failed;
        }
    };

    let result = match i % 4 {
        0 | 1 => engine
            .confirm_reservation(hold.reservation_id)
            .await
            .map(|_| Wave::Confirmed),
        2 => engine
            .cancel_reservation(hold.reservation_id)
            .await
            .map(|_| Wave::Cancelled),
        _ => Ok(Wave::Abandoned),
    };

    result.unwrap_or_else(|e| {
        warn!(user = %user, error = %e, "Follow-up failed");
        Wave::Failed
    })
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise engine events are shown at info.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,stockhold_engine=info,stockhold_sim=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
