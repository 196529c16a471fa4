use std::sync::Arc;
use std::time::{Duration, Instant};

use campus_booking::config::{Config, OwnerLimits};
use campus_booking::engine::LibrarySystem;
use campus_booking::limits::REFERENCE_YEAR_SECS;
use campus_booking::model::{DAY, HOUR};

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    if latencies.is_empty() {
        return;
    }
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.3}ms, p50={:.3}ms, p95={:.3}ms, p99={:.3}ms, max={:.3}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies[latencies.len() - 1].as_secs_f64() * 1000.0,
    );
}

fn setup(system: &LibrarySystem, rooms: usize, laptops: usize) {
    for i in 0..rooms {
        system.add_room(&format!("R{i:03}"));
    }
    for i in 0..laptops {
        system.add_laptop(&format!("L{i:03}"));
    }
    println!("  created {rooms} rooms, {laptops} laptops");
}

async fn phase1_sequential(system: &LibrarySystem) {
    // One-hour slots, every other hour, across the reference year.
    let n = (REFERENCE_YEAR_SECS / (2 * HOUR)) as usize;
    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();
    for i in 0..n {
        let s = i as i64 * 2 * HOUR;
        let t = Instant::now();
        let out = system.book_room("R000", s, s + HOUR, "bench").await;
        latencies.push(t.elapsed());
        assert!(out.success, "{}", out.message);
    }
    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} bookings in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("write latency", &mut latencies);
}

async fn phase2_concurrent(system: Arc<LibrarySystem>, rooms: usize) {
    let n_tasks = 16;
    let n_per_task = 2_000;
    let start = Instant::now();
    let mut handles = Vec::new();
    for t in 0..n_tasks {
        let system = system.clone();
        handles.push(tokio::spawn(async move {
            let mut won = 0usize;
            for j in 0..n_per_task {
                // Tasks share rooms on purpose; half the attempts collide.
                let room = format!("R{:03}", 1 + (t + j) % (rooms - 1));
                let s = (j as i64 / 2) * HOUR;
                if system.book_room(&room, s, s + HOUR, &format!("user{t}")).await.success {
                    won += 1;
                }
            }
            won
        }));
    }
    let mut committed = 0;
    for h in handles {
        committed += h.await.unwrap_or(0);
    }
    let elapsed = start.elapsed();
    let total = n_tasks * n_per_task;
    println!(
        "  {n_tasks} tasks x {n_per_task} attempts = {total} total, {committed} committed in {:.2}s = {:.0} ops/sec",
        elapsed.as_secs_f64(),
        total as f64 / elapsed.as_secs_f64()
    );
}

async fn phase3_auto_assign(system: Arc<LibrarySystem>, laptops: usize) {
    let slots = 200;
    let start = Instant::now();
    let mut handles = Vec::new();
    for u in 0..laptops * 2 {
        let system = system.clone();
        handles.push(tokio::spawn(async move {
            let mut latencies = Vec::with_capacity(slots);
            for slot in 0..slots {
                let s = slot as i64 * DAY;
                let t = Instant::now();
                system.borrow_any_laptop(s, s + 4 * HOUR, &format!("student{u}")).await;
                latencies.push(t.elapsed());
            }
            latencies
        }));
    }
    let mut latencies = Vec::new();
    for h in handles {
        latencies.extend(h.await.unwrap_or_default());
    }
    println!(
        "  {} requests for {laptops} laptops x {slots} slots in {:.2}s",
        latencies.len(),
        start.elapsed().as_secs_f64()
    );
    print_latency("assign latency", &mut latencies);
}

async fn phase4_reads(system: &LibrarySystem) {
    let mut history = Vec::new();
    let mut gaps = Vec::new();
    for i in 0..500 {
        let t = Instant::now();
        system.get_user_bookings(&format!("user{}", i % 16)).await;
        history.push(t.elapsed());

        let t = Instant::now();
        let day = (i % 300) as i64 * DAY;
        let _ = system.room_availability("R000", day + 8 * HOUR, day + 20 * HOUR).await;
        gaps.push(t.elapsed());
    }
    print_latency("user history", &mut history);
    print_latency("room availability", &mut gaps);
}

async fn phase5_save(system: &LibrarySystem) {
    let dir = std::env::temp_dir().join("campus_bench");
    let _ = std::fs::remove_dir_all(&dir);
    let config = Config {
        data_dir: dir,
        ..Config::default()
    };
    let target = match LibrarySystem::open(&config).await {
        Ok(t) => t,
        Err(e) => {
            println!("  skipped: {e}");
            return;
        }
    };
    target.restore(system.snapshot().await).await;
    let t = Instant::now();
    match target.try_save().await {
        Ok(()) => println!("  snapshot saved in {:.2}ms", t.elapsed().as_secs_f64() * 1000.0),
        Err(e) => println!("  save failed: {e}"),
    }
}

#[tokio::main]
async fn main() {
    let rooms = 50;
    let laptops = 20;
    let system = Arc::new(LibrarySystem::in_memory(OwnerLimits::OFF));

    println!("=== campus booking stress benchmark ===\n");

    println!("[setup]");
    setup(&system, rooms, laptops);

    println!("\n[phase 1] sequential booking throughput");
    phase1_sequential(&system).await;

    println!("\n[phase 2] concurrent booking with collisions");
    phase2_concurrent(system.clone(), rooms).await;

    println!("\n[phase 3] laptop auto-assign contention");
    phase3_auto_assign(system.clone(), laptops).await;

    println!("\n[phase 4] read latency");
    phase4_reads(&system).await;

    println!("\n[phase 5] snapshot save");
    phase5_save(&system).await;

    println!("\n=== benchmark complete ===");
}
