//! Line-oriented snapshot files.
//!
//! One file per category inside the data directory, one comma-separated
//! record per line:
//!
//! | file           | record                                  |
//! |----------------|-----------------------------------------|
//! | `rooms.txt`    | `id`                                    |
//! | `laptops.txt`  | `id`                                    |
//! | `books.txt`    | `id,title,author`                       |
//! | `bookings.txt` | `kind,resource_id,owner,start,end`      |
//! | `users.txt`    | `username,password,is_admin`            |
//!
//! Loading skips (and logs) malformed lines instead of failing. Saving
//! rewrites every file through a temp file that is fsynced and then renamed
//! over the original, so a crash mid-save leaves the previous snapshot intact.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::EngineError;
use crate::model::*;
use crate::validate;

pub const ROOMS_FILE: &str = "rooms.txt";
pub const LAPTOPS_FILE: &str = "laptops.txt";
pub const BOOKS_FILE: &str = "books.txt";
pub const BOOKINGS_FILE: &str = "bookings.txt";
pub const USERS_FILE: &str = "users.txt";

/// Everything the engine persists. Resources are listed kind by kind, each
/// kind in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub resources: Vec<ResourceInfo>,
    pub bookings: Vec<Booking>,
    pub users: Vec<User>,
}

fn store_name(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Room => "rooms",
        ResourceKind::Laptop => "laptops",
        ResourceKind::Book => "books",
    }
}

fn file_name(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Room => ROOMS_FILE,
        ResourceKind::Laptop => LAPTOPS_FILE,
        ResourceKind::Book => BOOKS_FILE,
    }
}

/// Log and count a record that could not be loaded.
pub fn skip_record(err: &EngineError, store: &'static str) {
    warn!(store, "skipping record: {err}");
    metrics::counter!(crate::observability::RECORDS_SKIPPED_TOTAL, "store" => store).increment(1);
}

fn malformed(store: &'static str, line: usize, reason: impl Into<String>) -> EngineError {
    EngineError::MalformedRecord {
        store,
        line,
        reason: reason.into(),
    }
}

fn field_error(store: &'static str, line: usize, err: EngineError) -> EngineError {
    malformed(store, line, err.to_string())
}

// ── Encoding ─────────────────────────────────────────────────────

pub fn encode_resource(info: &ResourceInfo) -> String {
    match &info.attrs {
        ResourceAttrs::Room | ResourceAttrs::Laptop => info.id.clone(),
        ResourceAttrs::Book { title, author } => format!("{},{title},{author}", info.id),
    }
}

pub fn encode_booking(b: &Booking) -> String {
    format!(
        "{},{},{},{},{}",
        b.kind, b.resource_id, b.owner, b.interval.start, b.interval.end
    )
}

pub fn encode_user(u: &User) -> String {
    format!("{},{},{}", u.username, u.password, if u.is_admin { 1 } else { 0 })
}

// ── Decoding ─────────────────────────────────────────────────────

/// Decode one resource line. `line_no` is 1-based and only used in errors.
pub fn decode_resource(kind: ResourceKind, line: &str, line_no: usize) -> Result<ResourceInfo, EngineError> {
    let store = store_name(kind);
    let (id, attrs) = match kind {
        ResourceKind::Room => (line, ResourceAttrs::Room),
        ResourceKind::Laptop => (line, ResourceAttrs::Laptop),
        ResourceKind::Book => {
            // Titles may contain commas: id ends at the first, author starts
            // after the last.
            let (id, rest) = line
                .split_once(',')
                .ok_or_else(|| malformed(store, line_no, "expected id,title,author"))?;
            let (title, author) = rest
                .rsplit_once(',')
                .ok_or_else(|| malformed(store, line_no, "expected id,title,author"))?;
            (
                id,
                ResourceAttrs::Book {
                    title: title.to_string(),
                    author: author.to_string(),
                },
            )
        }
    };
    validate::resource_id(id).map_err(|e| field_error(store, line_no, e))?;
    validate::attrs(&attrs).map_err(|e| field_error(store, line_no, e))?;
    Ok(ResourceInfo {
        id: id.to_string(),
        attrs,
    })
}

pub fn decode_booking(line: &str, line_no: usize) -> Result<Booking, EngineError> {
    const STORE: &str = "bookings";
    let fields: Vec<&str> = line.split(',').collect();
    let [kind, resource_id, owner, start, end] = fields.as_slice() else {
        return Err(malformed(
            STORE,
            line_no,
            format!("expected 5 fields, found {}", fields.len()),
        ));
    };
    let kind = ResourceKind::parse(kind)
        .ok_or_else(|| malformed(STORE, line_no, format!("unknown resource kind {kind:?}")))?;
    validate::resource_id(resource_id).map_err(|e| field_error(STORE, line_no, e))?;
    validate::username(owner).map_err(|e| field_error(STORE, line_no, e))?;
    let start: Secs = start
        .trim()
        .parse()
        .map_err(|_| malformed(STORE, line_no, format!("bad start {start:?}")))?;
    let end: Secs = end
        .trim()
        .parse()
        .map_err(|_| malformed(STORE, line_no, format!("bad end {end:?}")))?;
    let interval = Interval::try_new(start, end).map_err(|e| field_error(STORE, line_no, e))?;
    Ok(Booking {
        kind,
        resource_id: resource_id.to_string(),
        interval,
        owner: owner.to_string(),
    })
}

pub fn decode_user(line: &str, line_no: usize) -> Result<User, EngineError> {
    const STORE: &str = "users";
    let fields: Vec<&str> = line.split(',').collect();
    let [username, password, is_admin] = fields.as_slice() else {
        return Err(malformed(
            STORE,
            line_no,
            format!("expected 3 fields, found {}", fields.len()),
        ));
    };
    validate::username(username).map_err(|e| field_error(STORE, line_no, e))?;
    validate::password(password).map_err(|e| field_error(STORE, line_no, e))?;
    let is_admin = matches!(is_admin.trim(), "1" | "true" | "True");
    Ok(User::new(*username, *password, is_admin))
}

// ── Files ────────────────────────────────────────────────────────

/// Reads and rewrites the snapshot files of one data directory.
#[derive(Debug, Clone)]
pub struct PersistenceStore {
    dir: PathBuf,
}

impl PersistenceStore {
    /// Use `dir` as the data directory, creating it if needed.
    pub fn open(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Read every store. Missing files count as empty; malformed lines are
    /// logged, counted and skipped. Only real I/O failures are returned.
    pub fn load(&self) -> io::Result<Snapshot> {
        let mut snapshot = Snapshot::default();
        for kind in ResourceKind::ALL {
            let store = store_name(kind);
            for_each_line(&self.dir.join(file_name(kind)), store, |line, line_no| {
                match decode_resource(kind, line, line_no) {
                    Ok(info) => snapshot.resources.push(info),
                    Err(e) => skip_record(&e, store),
                }
            })?;
        }
        for_each_line(&self.dir.join(BOOKINGS_FILE), "bookings", |line, line_no| {
            match decode_booking(line, line_no) {
                Ok(b) => snapshot.bookings.push(b),
                Err(e) => skip_record(&e, "bookings"),
            }
        })?;
        for_each_line(&self.dir.join(USERS_FILE), "users", |line, line_no| match decode_user(line, line_no) {
            Ok(u) => snapshot.users.push(u),
            Err(e) => skip_record(&e, "users"),
        })?;
        debug!(
            dir = %self.dir.display(),
            resources = snapshot.resources.len(),
            bookings = snapshot.bookings.len(),
            users = snapshot.users.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Rewrite every store from `snapshot`.
    pub fn save(&self, snapshot: &Snapshot) -> io::Result<()> {
        for kind in ResourceKind::ALL {
            let lines = snapshot
                .resources
                .iter()
                .filter(|r| r.attrs.kind() == kind)
                .map(encode_resource);
            write_atomic(&self.dir.join(file_name(kind)), lines)?;
        }
        write_atomic(
            &self.dir.join(BOOKINGS_FILE),
            snapshot.bookings.iter().map(encode_booking),
        )?;
        write_atomic(&self.dir.join(USERS_FILE), snapshot.users.iter().map(encode_user))?;
        Ok(())
    }
}

/// Call `f(line, line_no)` for each non-blank line of `path`. Lines that
/// are not valid UTF-8 are skipped as malformed records of `store`.
fn for_each_line(path: &Path, store: &'static str, mut f: impl FnMut(&str, usize)) -> io::Result<()> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    for (idx, bytes) in BufReader::new(file).split(b'\n').enumerate() {
        let bytes = bytes?;
        let line_no = idx + 1;
        let Ok(line) = std::str::from_utf8(&bytes) else {
            skip_record(&malformed(store, line_no, "invalid UTF-8"), store);
            continue;
        };
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            continue;
        }
        f(line, line_no);
    }
    Ok(())
}

/// Write `lines` to `<path>.tmp`, fsync, then rename over `path`.
fn write_atomic(path: &Path, lines: impl Iterator<Item = String>) -> io::Result<()> {
    let tmp_path = path.with_extension("txt.tmp");
    let file = File::create(&tmp_path)?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    writer.get_ref().sync_all()?;
    fs::rename(&tmp_path, path)
}
