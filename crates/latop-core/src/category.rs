//! Command categories.
//!
//! Every completed operation is attributed to one of a fixed set of logical
//! command kinds. The compact report further folds those kinds into read,
//! write and other groups.

use std::fmt;

/// Logical kind of a completed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandCategory {
    Insert,
    Find,
    FindAndModify,
    Update,
    Delete,
    Aggregate,
    Distinct,
    /// Anything without a dedicated category.
    Other,
}

impl CommandCategory {
    /// Number of categories.
    pub const COUNT: usize = 8;

    /// All categories in report order.
    pub const ALL: [CommandCategory; Self::COUNT] = [
        CommandCategory::Insert,
        CommandCategory::Find,
        CommandCategory::FindAndModify,
        CommandCategory::Update,
        CommandCategory::Delete,
        CommandCategory::Aggregate,
        CommandCategory::Distinct,
        CommandCategory::Other,
    ];

    /// Classify a command by its wire name.
    ///
    /// Lookup is case-sensitive and total: unknown names map to
    /// [`CommandCategory::Other`].
    pub fn from_command_name(name: &str) -> Self {
        match name {
            "insert" => CommandCategory::Insert,
            "find" => CommandCategory::Find,
            "findAndModify" => CommandCategory::FindAndModify,
            "update" => CommandCategory::Update,
            "delete" => CommandCategory::Delete,
            "aggregate" => CommandCategory::Aggregate,
            "distinct" => CommandCategory::Distinct,
            _ => CommandCategory::Other,
        }
    }

    /// Key used for this category in verbose reports.
    pub fn as_str(self) -> &'static str {
        match self {
            CommandCategory::Insert => "insert",
            CommandCategory::Find => "find",
            CommandCategory::FindAndModify => "findAndModify",
            CommandCategory::Update => "update",
            CommandCategory::Delete => "delete",
            CommandCategory::Aggregate => "aggregate",
            CommandCategory::Distinct => "distinct",
            CommandCategory::Other => "other",
        }
    }

    /// Slot of this category in per-category storage.
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Compact-report group this category is folded into.
    pub fn group(self) -> CommandGroup {
        match self {
            CommandCategory::Find | CommandCategory::Aggregate | CommandCategory::Distinct => {
                CommandGroup::Read
            }
            CommandCategory::Insert
            | CommandCategory::FindAndModify
            | CommandCategory::Update
            | CommandCategory::Delete => CommandGroup::Write,
            CommandCategory::Other => CommandGroup::Other,
        }
    }
}

impl From<&str> for CommandCategory {
    fn from(name: &str) -> Self {
        Self::from_command_name(name)
    }
}

impl fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse grouping used by the compact report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandGroup {
    Read,
    Write,
    Other,
}

impl CommandGroup {
    /// All groups in report order.
    pub const ALL: [CommandGroup; 3] = [
        CommandGroup::Read,
        CommandGroup::Write,
        CommandGroup::Other,
    ];

    /// Key used for this group in compact reports.
    pub fn as_str(self) -> &'static str {
        match self {
            CommandGroup::Read => "read",
            CommandGroup::Write => "write",
            CommandGroup::Other => "other",
        }
    }

    /// Categories folded into this group.
    pub fn categories(self) -> impl Iterator<Item = CommandCategory> {
        CommandCategory::ALL
            .into_iter()
            .filter(move |category| category.group() == self)
    }
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
