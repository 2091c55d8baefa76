//! Connection open flags and settings.

use std::time::Duration;

use bitflags::bitflags;

bitflags! {
    /// Flags controlling how the database file is opened.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        /// Open the database in read-only mode.
        const READ_ONLY = 0x0000_0001;
        /// Open the database for reading and writing.
        const READ_WRITE = 0x0000_0002;
        /// Create the database if it does not exist.
        const CREATE = 0x0000_0004;
        /// Interpret the path as a URI.
        const URI = 0x0000_0040;
        /// Open an in-memory database.
        const MEMORY = 0x0000_0080;
        /// Multi-thread mode: the connection itself is not shared.
        const NO_MUTEX = 0x0000_8000;
        /// Serialized mode.
        const FULL_MUTEX = 0x0001_0000;
    }
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self::READ_WRITE | Self::CREATE | Self::URI | Self::NO_MUTEX
    }
}

impl OpenFlags {
    pub(crate) fn to_engine(self) -> rusqlite::OpenFlags {
        const PAIRS: [(OpenFlags, rusqlite::OpenFlags); 7] = [
            (OpenFlags::READ_ONLY, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY),
            (OpenFlags::READ_WRITE, rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE),
            (OpenFlags::CREATE, rusqlite::OpenFlags::SQLITE_OPEN_CREATE),
            (OpenFlags::URI, rusqlite::OpenFlags::SQLITE_OPEN_URI),
            (OpenFlags::MEMORY, rusqlite::OpenFlags::SQLITE_OPEN_MEMORY),
            (OpenFlags::NO_MUTEX, rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX),
            (OpenFlags::FULL_MUTEX, rusqlite::OpenFlags::SQLITE_OPEN_FULL_MUTEX),
        ];

        PAIRS
            .iter()
            .filter(|(ours, _)| self.contains(*ours))
            .fold(rusqlite::OpenFlags::empty(), |acc, (_, engine)| acc | *engine)
    }
}

/// Settings applied when a connection is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub flags: OpenFlags,
    /// How long a statement waits on a locked database before failing busy.
    pub busy_timeout: Option<Duration>,
    /// Enforce foreign key constraints.
    pub foreign_keys: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            flags: OpenFlags::default(),
            busy_timeout: Some(Duration::from_secs(5)),
            foreign_keys: false,
        }
    }
}

impl ConnectionConfig {
    /// Read-only access to an existing database.
    pub fn read_only() -> Self {
        Self {
            flags: OpenFlags::READ_ONLY | OpenFlags::URI | OpenFlags::NO_MUTEX,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub const fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }
}
