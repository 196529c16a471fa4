use serde_json::{Value, json};

use crate::engine::LibrarySystem;
use crate::model::*;

/// One line of driver input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { username: String, password: String },
    AddResource { id: String, attrs: ResourceAttrs },
    RemoveResource { kind: ResourceKind, id: String },
    ListIds(ResourceKind),
    SearchBooks(Option<String>),
    BookRoom { id: String, start: Secs, end: Secs, user: String },
    BorrowAnyLaptop { start: Secs, end: Secs, user: String },
    BorrowLaptop { id: String, start: Secs, end: Secs, user: String },
    BorrowBook { id: String, start: Secs, end: Secs, user: String },
    Cancel { kind: ResourceKind, id: String, start: Secs, end: Secs, user: String },
    RoomBookings(String),
    UserBookings(String),
    RoomAvailability { id: String, start: Secs, end: Secs },
    ChangePassword { user: String, current: String, new: String },
    Save,
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    UnterminatedQuote,
    Unknown(String),
    WrongArity(&'static str, usize, usize),
    BadNumber(String),
    UnknownKind(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Empty => write!(f, "empty command"),
            CommandError::UnterminatedQuote => write!(f, "unterminated quote"),
            CommandError::Unknown(s) => write!(f, "unknown command: {s}"),
            CommandError::WrongArity(cmd, expected, got) => {
                write!(f, "{cmd}: expected {expected} arguments, got {got}")
            }
            CommandError::BadNumber(s) => write!(f, "not an integer: {s}"),
            CommandError::UnknownKind(s) => write!(f, "unknown resource kind: {s}"),
        }
    }
}

impl std::error::Error for CommandError {}

/// Split on whitespace; a double-quoted run is one token and may be empty.
fn tokenize(line: &str) -> Result<Vec<String>, CommandError> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut token = String::new();
        if c == '"' {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(ch) => token.push(ch),
                    None => return Err(CommandError::UnterminatedQuote),
                }
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                token.push(ch);
                chars.next();
            }
        }
        tokens.push(token);
    }
    Ok(tokens)
}

fn secs(s: &str) -> Result<Secs, CommandError> {
    s.parse().map_err(|_| CommandError::BadNumber(s.to_string()))
}

fn kind(s: &str) -> Result<ResourceKind, CommandError> {
    ResourceKind::parse(s).ok_or_else(|| CommandError::UnknownKind(s.to_string()))
}

fn arity(name: &'static str, args: &[String], expected: usize) -> Result<(), CommandError> {
    if args.len() != expected {
        return Err(CommandError::WrongArity(name, expected, args.len()));
    }
    Ok(())
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let tokens = tokenize(line)?;
    let Some((name, args)) = tokens.split_first() else {
        return Err(CommandError::Empty);
    };
    let a = |i: usize| args[i].clone();

    let cmd = match name.as_str() {
        "login" => {
            arity("login", args, 2)?;
            Command::Login { username: a(0), password: a(1) }
        }
        "add_room" => {
            arity("add_room", args, 1)?;
            Command::AddResource { id: a(0), attrs: ResourceAttrs::Room }
        }
        "add_laptop" => {
            arity("add_laptop", args, 1)?;
            Command::AddResource { id: a(0), attrs: ResourceAttrs::Laptop }
        }
        "add_book" => {
            arity("add_book", args, 3)?;
            Command::AddResource {
                id: a(0),
                attrs: ResourceAttrs::Book { title: a(1), author: a(2) },
            }
        }
        "remove_room" | "remove_laptop" | "remove_book" => {
            arity("remove", args, 1)?;
            let k = kind(name.trim_start_matches("remove_"))?;
            Command::RemoveResource { kind: k, id: a(0) }
        }
        "rooms" => Command::ListIds(ResourceKind::Room),
        "laptops" => Command::ListIds(ResourceKind::Laptop),
        "books" => Command::ListIds(ResourceKind::Book),
        "search_books" => Command::SearchBooks(if args.is_empty() { None } else { Some(args.join(" ")) }),
        "book_room" => {
            arity("book_room", args, 4)?;
            Command::BookRoom { id: a(0), start: secs(&args[1])?, end: secs(&args[2])?, user: a(3) }
        }
        "borrow_any_laptop" => {
            arity("borrow_any_laptop", args, 3)?;
            Command::BorrowAnyLaptop { start: secs(&args[0])?, end: secs(&args[1])?, user: a(2) }
        }
        "borrow_laptop" => {
            arity("borrow_laptop", args, 4)?;
            Command::BorrowLaptop { id: a(0), start: secs(&args[1])?, end: secs(&args[2])?, user: a(3) }
        }
        "borrow_book" => {
            arity("borrow_book", args, 4)?;
            Command::BorrowBook { id: a(0), start: secs(&args[1])?, end: secs(&args[2])?, user: a(3) }
        }
        "cancel" => {
            arity("cancel", args, 5)?;
            Command::Cancel {
                kind: kind(&args[0])?,
                id: a(1),
                start: secs(&args[2])?,
                end: secs(&args[3])?,
                user: a(4),
            }
        }
        "room_bookings" => {
            arity("room_bookings", args, 1)?;
            Command::RoomBookings(a(0))
        }
        "user_bookings" => {
            arity("user_bookings", args, 1)?;
            Command::UserBookings(a(0))
        }
        "room_availability" => {
            arity("room_availability", args, 3)?;
            Command::RoomAvailability { id: a(0), start: secs(&args[1])?, end: secs(&args[2])? }
        }
        "change_password" => {
            arity("change_password", args, 3)?;
            Command::ChangePassword { user: a(0), current: a(1), new: a(2) }
        }
        "save" => Command::Save,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(cmd)
}

/// Run `cmd` and render the result as one JSON object.
pub async fn execute(system: &LibrarySystem, cmd: Command) -> Value {
    match cmd {
        Command::Login { username, password } => json!(system.login(&username, &password)),
        Command::AddResource { id, attrs } => json!(system.add_resource(&id, attrs)),
        Command::RemoveResource { kind, id } => json!(system.remove_resource(kind, &id).await),
        Command::ListIds(kind) => {
            let ids = system.ledger(kind).list_ids();
            json!({ "success": true, "ids": ids })
        }
        Command::SearchBooks(query) => {
            let books = system.search_books(query.as_deref()).await;
            json!({ "success": true, "books": books })
        }
        Command::BookRoom { id, start, end, user } => json!(system.book_room(&id, start, end, &user).await),
        Command::BorrowAnyLaptop { start, end, user } => json!(system.borrow_any_laptop(start, end, &user).await),
        Command::BorrowLaptop { id, start, end, user } => {
            json!(system.borrow_laptop(&id, start, end, &user).await)
        }
        Command::BorrowBook { id, start, end, user } => json!(system.borrow_book(&id, start, end, &user).await),
        Command::Cancel { kind, id, start, end, user } => {
            json!(system.cancel_booking(kind, &id, start, end, &user).await)
        }
        Command::RoomBookings(id) => {
            let bookings = system.get_room_bookings(&id).await;
            json!({ "success": true, "bookings": bookings })
        }
        Command::UserBookings(user) => {
            let bookings = system.get_user_bookings(&user).await;
            json!({ "success": true, "bookings": bookings })
        }
        Command::RoomAvailability { id, start, end } => match system.room_availability(&id, start, end).await {
            Ok(free) => json!({ "success": true, "free": free }),
            Err(e) => json!(Outcome::failed(&e)),
        },
        Command::ChangePassword { user, current, new } => json!(system.change_password(&user, &current, &new)),
        Command::Save => json!(system.save().await),
        Command::Quit => json!(Outcome::ok("Goodbye.")),
    }
}

/// JSON shape for a line that failed to parse.
pub fn parse_failure(err: &CommandError) -> Value {
    json!({ "success": false, "message": err.to_string() })
}
