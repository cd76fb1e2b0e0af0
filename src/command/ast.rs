use indexmap::IndexMap;

/// Column name → condition text, in command order.
pub type Conditions = IndexMap<String, String>;

/// Column name → raw value text, in command order.
pub type Assignments = IndexMap<String, String>;

/// A validated command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Clear,
    List,
    Columns,
    Add {
        values: Assignments,
    },
    AddBatch {
        columns: IndexMap<String, Vec<String>>,
        row_count: usize,
    },
    Update {
        conditions: Conditions,
        assignments: Assignments,
    },
    Delete {
        conditions: Conditions,
        confirmed: bool,
    },
    DeleteAll {
        confirmed: bool,
    },
    Search {
        keyword: String,
    },
    SearchExact {
        column: String,
        condition: String,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Clear => "clear",
            Command::List => "list",
            Command::Columns => "columns",
            Command::Add { .. } => "add",
            Command::AddBatch { .. } => "add_batch",
            Command::Update { .. } => "update",
            Command::Delete { .. } => "delete",
            Command::DeleteAll { .. } => "delete_all",
            Command::Search { .. } => "search",
            Command::SearchExact { .. } => "search_exact",
        }
    }
}

/// Renders a mapping the way result messages quote it: `{a: 1, b: x}`.
pub fn describe_pairs<V: AsRef<str>>(pairs: &IndexMap<String, V>) -> String {
    let inner: Vec<String> = pairs
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v.as_ref()))
        .collect();
    format!("{{{}}}", inner.join(", "))
}
