use std::net::SocketAddr;

use crate::command::Command;

// ── Request metrics ─────────────────────────────────────────────

/// Counter: driver commands executed. Labels: command, status.
pub const COMMANDS_TOTAL: &str = "campus_commands_total";

/// Counter: booking attempts. Labels: kind, status.
pub const BOOKINGS_TOTAL: &str = "campus_bookings_total";

/// Histogram: facade operation latency in seconds. Labels: op.
pub const OPERATION_DURATION_SECONDS: &str = "campus_operation_duration_seconds";

/// Counter: failed logins.
pub const LOGIN_FAILURES_TOTAL: &str = "campus_login_failures_total";

// ── State metrics ───────────────────────────────────────────────

/// Gauge: registered resources. Labels: kind.
pub const RESOURCES: &str = "campus_resources";

/// Counter: persisted records skipped during load. Labels: store.
pub const RECORDS_SKIPPED_TOTAL: &str = "campus_records_skipped_total";

/// Histogram: full snapshot save duration in seconds.
pub const SAVE_DURATION_SECONDS: &str = "campus_save_duration_seconds";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    match metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        Ok(()) => tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics"),
        Err(e) => tracing::error!("failed to install Prometheus metrics exporter: {e}"),
    }
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::Login { .. } => "login",
        Command::AddResource { .. } => "add_resource",
        Command::RemoveResource { .. } => "remove_resource",
        Command::ListIds(_) => "list_ids",
        Command::SearchBooks(_) => "search_books",
        Command::BookRoom { .. } => "book_room",
        Command::BorrowAnyLaptop { .. } => "borrow_any_laptop",
        Command::BorrowLaptop { .. } => "borrow_laptop",
        Command::BorrowBook { .. } => "borrow_book",
        Command::Cancel { .. } => "cancel",
        Command::RoomBookings(_) => "room_bookings",
        Command::UserBookings(_) => "user_bookings",
        Command::RoomAvailability { .. } => "room_availability",
        Command::ChangePassword { .. } => "change_password",
        Command::Save => "save",
        Command::Quit => "quit",
    }
}
