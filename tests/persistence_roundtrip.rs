use std::collections::BTreeSet;
use std::path::PathBuf;

use campus_booking::command::{execute, parse_command};
use campus_booking::config::{Config, OwnerLimits};
use campus_booking::engine::LibrarySystem;
use campus_booking::model::{Booking, HOUR, ResourceInfo, User};
use campus_booking::store::{BOOKINGS_FILE, BOOKS_FILE, PersistenceStore, ROOMS_FILE, USERS_FILE};

// ── Test infrastructure ──────────────────────────────────────

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("campus_int_test").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn config(dir: &PathBuf) -> Config {
    Config::from_lookup(|key| match key {
        "CAMPUS_DATA_DIR" => Some(dir.display().to_string()),
        _ => None,
    })
}

async fn run(system: &LibrarySystem, lines: &[&str]) -> Vec<serde_json::Value> {
    let mut out = Vec::new();
    for line in lines {
        let cmd = parse_command(line).unwrap_or_else(|e| panic!("{line}: {e}"));
        out.push(execute(system, cmd).await);
    }
    out
}

fn as_sets(snapshot: &campus_booking::store::Snapshot) -> (BTreeSet<String>, BTreeSet<Booking>, BTreeSet<String>) {
    let resources = snapshot
        .resources
        .iter()
        .map(|r: &ResourceInfo| format!("{:?}", r))
        .collect();
    let bookings = snapshot.bookings.iter().cloned().collect();
    let users = snapshot.users.iter().map(|u: &User| format!("{u:?}")).collect();
    (resources, bookings, users)
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn save_then_reload_is_equivalent() {
    let dir = scratch_dir("roundtrip");
    let before = {
        let sys = LibrarySystem::open(&config(&dir)).await.unwrap();
        let results = run(
            &sys,
            &[
                "add_room R101",
                "add_room R102",
                "add_laptop L001",
                "add_laptop L002",
                r#"add_book B0001 "Intro to Algorithms, 3rd ed." "Cormen""#,
                "book_room R101 32400 36000 alice",
                "book_room R101 36000 39600 bob",
                "borrow_any_laptop 36000 39600 carol",
                "borrow_any_laptop 36000 39600 carol",
                "borrow_book B0001 0 604800 alice",
                "change_password user1 pass1 hunter2",
                "save",
            ],
        )
        .await;
        assert!(results.iter().all(|r| r["success"] == true), "{results:?}");
        sys.snapshot().await
    };

    let sys = LibrarySystem::open(&config(&dir)).await.unwrap();
    let after = sys.snapshot().await;
    assert_eq!(as_sets(&before), as_sets(&after));
    assert_eq!(sys.get_laptops(), vec!["L001", "L002"]);
    assert_eq!(sys.get_room_bookings("R101").await.len(), 2);
    assert!(sys.login("user1", "hunter2").success);
}

#[tokio::test]
async fn corrupt_lines_do_not_block_startup() {
    let dir = scratch_dir("corrupt");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(BOOKS_FILE), "B1,Dune,Herbert\nB2 no commas here\nB3,Emma,Austen\n").unwrap();
    std::fs::write(
        dir.join(BOOKINGS_FILE),
        "book,B1,alice,0,86400\nbook,B1,bob,not,a-number\nbook,B9,carol,0,10\n",
    )
    .unwrap();
    std::fs::write(dir.join(USERS_FILE), "admin,admin123,True\nbroken-line\nadmin,dupe,0\n").unwrap();

    let sys = LibrarySystem::open(&config(&dir)).await.unwrap();
    assert_eq!(sys.get_books(), vec!["B1", "B3"]);
    assert_eq!(sys.get_user_bookings("alice").await.len(), 1);
    assert!(sys.get_user_bookings("carol").await.is_empty());
    // Users store was not empty, so no defaults were added.
    assert!(sys.login("admin", "admin123").is_admin);
    assert!(!sys.login("user1", "pass1").success);
}

#[tokio::test]
async fn undecodable_line_does_not_block_startup() {
    let dir = scratch_dir("non_utf8");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(ROOMS_FILE), b"R101\nR\xff\xfe2\nR103\n").unwrap();
    std::fs::write(dir.join(BOOKINGS_FILE), b"room,R101,alice,0,3600\nroom,R103,\xff,0,3600\n").unwrap();

    let sys = LibrarySystem::open(&config(&dir)).await.unwrap();
    assert_eq!(sys.get_rooms(), vec!["R101", "R103"]);
    assert_eq!(sys.get_room_bookings("R101").await.len(), 1);
    assert!(sys.get_room_bookings("R103").await.is_empty());
}

#[tokio::test]
async fn cascade_survives_save() {
    let dir = scratch_dir("cascade");
    {
        let sys = LibrarySystem::open(&config(&dir)).await.unwrap();
        sys.add_room("R101");
        sys.book_room("R101", 0, HOUR, "alice").await;
        sys.remove_room("R101").await;
        assert!(sys.save().await.success);
    }
    let bookings = std::fs::read_to_string(dir.join(BOOKINGS_FILE)).unwrap();
    assert!(bookings.is_empty());

    let sys = LibrarySystem::open(&config(&dir)).await.unwrap();
    assert!(sys.get_rooms().is_empty());
    assert!(sys.get_user_bookings("alice").await.is_empty());
}

#[tokio::test]
async fn store_snapshot_matches_engine_snapshot() {
    let dir = scratch_dir("store_direct");
    let sys = LibrarySystem::open(&config(&dir)).await.unwrap();
    sys.add_room("R1");
    sys.book_room("R1", HOUR, 2 * HOUR, "alice").await;
    sys.try_save().await.unwrap();

    let loaded = PersistenceStore::open(&dir).unwrap().load().unwrap();
    assert_eq!(loaded, sys.snapshot().await);
}

#[tokio::test]
async fn limits_from_config() {
    let dir = scratch_dir("limits");
    let config = Config::from_lookup(|key| match key {
        "CAMPUS_DATA_DIR" => Some(dir.display().to_string()),
        "CAMPUS_OWNER_LIMITS" => Some("laptop=1".to_string()),
        _ => None,
    });
    assert_eq!(config.owner_limits.laptop, Some(1));
    assert_ne!(config.owner_limits, OwnerLimits::CAMPUS);

    let sys = LibrarySystem::open(&config).await.unwrap();
    run(&sys, &["add_laptop L001", "add_laptop L002"]).await;
    let out = run(
        &sys,
        &["borrow_any_laptop 0 3600 carol", "borrow_any_laptop 0 3600 carol"],
    )
    .await;
    assert_eq!(out[0]["success"], true);
    assert_eq!(out[1]["error"], "owner_limit_reached");
}
