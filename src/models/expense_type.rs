/// Categories every new account starts with, inserted in this order.
pub(crate) const DEFAULT_TYPES: [&str; 8] = [
    "Food",
    "Transportation",
    "Entertainment",
    "Utilities",
    "Shopping",
    "Healthcare",
    "Education",
    "Other",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExpenseType {
    pub(crate) user_id: String,
    pub(crate) name: String,
}

impl ExpenseType {
    pub(crate) fn new(user_id: &str, name: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: name.to_string(),
        }
    }

    /// Find a type by name (case-insensitive) in a slice of names.
    pub(crate) fn find_by_name<'a>(names: &'a [String], name: &str) -> Option<&'a String> {
        let lower = name.to_lowercase();
        names.iter().find(|n| n.to_lowercase() == lower)
    }
}

impl std::fmt::Display for ExpenseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
