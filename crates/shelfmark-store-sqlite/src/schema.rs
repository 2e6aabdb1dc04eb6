//! SQL schema for the Shelfmark SQLite store.
//!
//! Executed once per connection at startup. Future migrations will be gated
//! on `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Mirror of subjects issued by the identity provider.
CREATE TABLE IF NOT EXISTS members (
    member_id     TEXT PRIMARY KEY,
    username      TEXT NOT NULL,
    role          TEXT NOT NULL CHECK (role IN ('ADMIN', 'MEMBER')),
    registered_at TEXT NOT NULL
);

-- Counters mirror book_copies and open borrow_records; only ever changed
-- inside a write transaction.
CREATE TABLE IF NOT EXISTS books (
    book_id          TEXT PRIMARY KEY,
    title            TEXT NOT NULL,
    author           TEXT NOT NULL,
    isbn             TEXT NOT NULL,
    category         TEXT NOT NULL,
    publisher        TEXT,
    description      TEXT,
    image_ref        TEXT,
    total_copies     INTEGER NOT NULL DEFAULT 0,
    available_copies INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL,
    CHECK (total_copies >= 0),
    CHECK (available_copies >= 0 AND available_copies <= total_copies)
);

CREATE TABLE IF NOT EXISTS book_copies (
    copy_id      TEXT PRIMARY KEY,
    book_id      TEXT NOT NULL REFERENCES books(book_id) ON DELETE CASCADE,
    accession_no TEXT NOT NULL UNIQUE,
    created_at   TEXT NOT NULL
);

-- Largest accession sequence ever issued, so numbers of deleted copies are
-- never handed out again. Single row.
CREATE TABLE IF NOT EXISTS accession_sequence (
    id         INTEGER PRIMARY KEY CHECK (id = 1),
    high_water INTEGER NOT NULL
);
INSERT OR IGNORE INTO accession_sequence (id, high_water) VALUES (1, 0);

CREATE TABLE IF NOT EXISTS book_requests (
    request_id    TEXT PRIMARY KEY,
    member_id     TEXT NOT NULL REFERENCES members(member_id) ON DELETE CASCADE,
    copy_id       TEXT NOT NULL REFERENCES book_copies(copy_id) ON DELETE CASCADE,
    requested_on  TEXT NOT NULL,   -- YYYY-MM-DD; immutable
    status        TEXT NOT NULL DEFAULT 'PENDING'
                  CHECK (status IN ('PENDING', 'APPROVED', 'REJECTED')),
    admin_comment TEXT,
    created_at    TEXT NOT NULL
);

-- due_on is fixed at borrow time; returned_on is set once, with returned.
CREATE TABLE IF NOT EXISTS borrow_records (
    borrow_id   TEXT PRIMARY KEY,
    member_id   TEXT NOT NULL REFERENCES members(member_id) ON DELETE CASCADE,
    copy_id     TEXT NOT NULL REFERENCES book_copies(copy_id) ON DELETE CASCADE,
    borrowed_on TEXT NOT NULL,
    due_on      TEXT NOT NULL,
    returned    INTEGER NOT NULL DEFAULT 0 CHECK (returned IN (0, 1)),
    returned_on TEXT,
    fine        INTEGER NOT NULL DEFAULT 0 CHECK (fine >= 0),
    created_at  TEXT NOT NULL,
    CHECK ((returned = 0) = (returned_on IS NULL))
);

-- At most one open loan per copy.
CREATE UNIQUE INDEX IF NOT EXISTS borrow_records_open_copy_idx
    ON borrow_records(copy_id) WHERE returned = 0;

CREATE TABLE IF NOT EXISTS book_notification_requests (
    watch_id   TEXT PRIMARY KEY,
    member_id  TEXT NOT NULL REFERENCES members(member_id) ON DELETE CASCADE,
    book_id    TEXT NOT NULL REFERENCES books(book_id) ON DELETE CASCADE,
    notified   INTEGER NOT NULL DEFAULT 0 CHECK (notified IN (0, 1)),
    created_at TEXT NOT NULL,
    UNIQUE (member_id, book_id)
);

CREATE TABLE IF NOT EXISTS notifications (
    notification_id TEXT PRIMARY KEY,
    member_id       TEXT NOT NULL REFERENCES members(member_id) ON DELETE CASCADE,
    message         TEXT NOT NULL,
    is_read         INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS books_isbn_idx           ON books(isbn);
CREATE INDEX IF NOT EXISTS book_copies_book_idx     ON book_copies(book_id);
CREATE INDEX IF NOT EXISTS book_requests_member_idx ON book_requests(member_id);
CREATE INDEX IF NOT EXISTS borrow_records_member_idx ON borrow_records(member_id);
CREATE INDEX IF NOT EXISTS notifications_member_idx ON notifications(member_id);

PRAGMA user_version = 1;
";
