//! Undo journal.
//!
//! Every store mutation records the interval's JSON form before and after
//! the change. An empty side means the interval did not exist on that side.
//! Records are grouped into transactions so a bulk operation can be rolled
//! back as one unit:
//!
//! ```text
//! txn:
//!   type: interval
//!   before: {"start":"20160602T010000Z","end":"20160602T020000Z"}
//!   after: {"start":"20160602T013000Z","end":"20160602T020000Z"}
//! ```
//!
//! Transactions are appended to `undo.data` as soon as they end; the journal
//! does not wait for the store's commit.

use std::io;
use std::path::Path;

use crate::atomic::AtomicFile;

/// File name of the journal inside the store location.
pub const JOURNAL_FILENAME: &str = "undo.data";

const TXN_HEADER: &str = "txn:";
const TYPE_PREFIX: &str = "  type: ";
const BEFORE_PREFIX: &str = "  before: ";
const AFTER_PREFIX: &str = "  after: ";

/// One before/after pair. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoAction {
    kind: String,
    before: String,
    after: String,
}

impl UndoAction {
    #[must_use]
    pub fn new(kind: impl Into<String>, before: impl Into<String>, after: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            before: before.into(),
            after: after.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn before(&self) -> &str {
        &self.before
    }

    #[must_use]
    pub fn after(&self) -> &str {
        &self.after
    }

    fn write_to(&self, out: &mut String) {
        for (prefix, value) in [
            (TYPE_PREFIX, &self.kind),
            (BEFORE_PREFIX, &self.before),
            (AFTER_PREFIX, &self.after),
        ] {
            out.push_str(prefix);
            out.push_str(value);
            out.push('\n');
        }
    }
}

/// The actions recorded between one start/end pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    actions: Vec<UndoAction>,
}

impl Transaction {
    #[must_use]
    pub fn actions(&self) -> &[UndoAction] {
        &self.actions
    }

    fn render(&self) -> String {
        let mut out = String::from(TXN_HEADER);
        out.push('\n');
        for action in &self.actions {
            action.write_to(&mut out);
        }
        out
    }
}

/// How many transactions the journal keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Record nothing.
    Disabled,
    /// Keep every transaction.
    Unlimited,
    /// Keep only the newest `n` transactions.
    Limit(usize),
}

impl Retention {
    /// Negative sizes mean unlimited, zero disables the journal.
    #[must_use]
    pub fn from_size(size: i64) -> Self {
        match usize::try_from(size) {
            Err(_) => Self::Unlimited,
            Ok(0) => Self::Disabled,
            Ok(n) => Self::Limit(n),
        }
    }
}

/// Append-only log of undo transactions.
#[derive(Debug)]
pub struct Journal {
    file: AtomicFile,
    retention: Retention,
    current: Option<Transaction>,
}

impl Journal {
    /// Journal backed by `location/undo.data`. See [`Retention::from_size`].
    #[must_use]
    pub fn new(location: &Path, size: i64) -> Self {
        Self {
            file: AtomicFile::new(location.join(JOURNAL_FILENAME)),
            retention: Retention::from_size(size),
            current: None,
        }
    }

    #[must_use]
    pub const fn retention(&self) -> Retention {
        self.retention
    }

    #[must_use]
    pub const fn in_transaction(&self) -> bool {
        self.current.is_some()
    }

    /// Begin grouping subsequent records. Nested calls keep the outer
    /// transaction open.
    pub fn start_transaction(&mut self) {
        if self.retention == Retention::Disabled {
            return;
        }
        if self.current.is_none() {
            self.current = Some(Transaction::default());
        }
    }

    /// Close the current transaction and append it to the log. An empty
    /// transaction writes nothing.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the journal file cannot be written.
    pub fn end_transaction(&mut self) -> io::Result<()> {
        let Some(txn) = self.current.take() else {
            return Ok(());
        };
        if txn.actions.is_empty() {
            return Ok(());
        }

        self.file.append(txn.render().as_bytes())?;
        self.trim()
    }

    /// Record an interval change. Outside a transaction the record forms a
    /// transaction of its own and is written immediately.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a standalone record cannot be written.
    pub fn record_interval_action(&mut self, before: &str, after: &str) -> io::Result<()> {
        self.record(UndoAction::new("interval", before, after))
    }

    /// Record an arbitrary action.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a standalone record cannot be written.
    pub fn record(&mut self, action: UndoAction) -> io::Result<()> {
        if self.retention == Retention::Disabled {
            return Ok(());
        }

        if let Some(txn) = self.current.as_mut() {
            txn.actions.push(action);
            return Ok(());
        }

        self.start_transaction();
        if let Some(txn) = self.current.as_mut() {
            txn.actions.push(action);
        }
        self.end_transaction()
    }

    /// Read every persisted transaction, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the journal exists but cannot be read, or
    /// `InvalidData` if it is malformed.
    pub fn transactions(&self) -> io::Result<Vec<Transaction>> {
        if !self.file.exists() {
            return Ok(Vec::new());
        }
        parse_transactions(&self.file.read()?)
    }

    fn trim(&self) -> io::Result<()> {
        let Retention::Limit(limit) = self.retention else {
            return Ok(());
        };

        let txns = self.transactions()?;
        if txns.len() <= limit {
            return Ok(());
        }

        let keep = &txns[txns.len() - limit..];
        let contents: String = keep.iter().map(Transaction::render).collect();
        tracing::debug!(
            dropped = txns.len() - limit,
            kept = limit,
            "trimmed undo journal"
        );
        self.file.write(contents.as_bytes())
    }
}

fn parse_transactions(content: &str) -> io::Result<Vec<Transaction>> {
    let mut txns: Vec<Transaction> = Vec::new();
    let mut lines = content.lines().enumerate().filter(|(_, l)| !l.is_empty());

    while let Some((line_no, line)) = lines.next() {
        if line == TXN_HEADER {
            txns.push(Transaction::default());
            continue;
        }

        let Some(kind) = line.strip_prefix(TYPE_PREFIX) else {
            return Err(malformed(line_no, "expected 'txn:' or '  type:'"));
        };
        let Some(txn) = txns.last_mut() else {
            return Err(malformed(line_no, "action before first 'txn:'"));
        };

        let mut field = |prefix: &str| {
            lines
                .next()
                .and_then(|(_, l)| l.strip_prefix(prefix).map(str::to_string))
                .ok_or_else(|| malformed(line_no, "incomplete action"))
        };
        let before = field(BEFORE_PREFIX.trim_end())
            .map(|v| v.trim_start().to_string())?;
        let after = field(AFTER_PREFIX.trim_end()).map(|v| v.trim_start().to_string())?;
        txn.actions.push(UndoAction::new(kind, before, after));
    }

    Ok(txns)
}

fn malformed(line_no: usize, reason: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("{JOURNAL_FILENAME} line {}: {reason}", line_no + 1),
    )
}
