use serde::Serialize;

/// Storage type of a field; drives coercion of filter values and comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Id,
    Text,
    Integer,
    Float,
    Bool,
    Timestamp,
    Enum(Vec<String>),
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Id => "id",
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Bool => "bool",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Enum(_) => "enum",
        }
    }

    pub fn is_rangeable(&self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Float | FieldKind::Timestamp)
    }
}

/// Substring matching rule for free-text fields. Entities disagree on this,
/// so every contains-filter declares its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseRule {
    Sensitive,
    Insensitive,
}

/// How a field may be filtered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// `field=value` → Equals
    Exact,
    /// `field=text` → Contains
    Contains(CaseRule),
    /// `field_from` / `field_to` → Range; bare `field` → Equals
    Range,
    /// `field=[a,b]` → In
    OneOf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub filter: Option<FilterMode>,
    pub sortable: bool,
    /// Internal fields never leave the row mapper
    pub public: bool,
    pub nullable: bool,
}

impl FieldDef {
    fn new(name: impl Into<String>, kind: FieldKind, filter: Option<FilterMode>) -> Self {
        Self {
            name: name.into(),
            kind,
            filter,
            sortable: false,
            public: true,
            nullable: false,
        }
    }

    /// UUID identifier, exact match
    pub fn id(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Id, Some(FilterMode::Exact))
    }

    /// Free text, substring match
    pub fn text(name: impl Into<String>, case: CaseRule) -> Self {
        Self::new(name, FieldKind::Text, Some(FilterMode::Contains(case)))
    }

    /// Text compared as a whole value (codes, emails, slugs)
    pub fn keyword(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text, Some(FilterMode::Exact))
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer, Some(FilterMode::Range))
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float, Some(FilterMode::Range))
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Timestamp, Some(FilterMode::Range))
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bool, Some(FilterMode::Exact))
    }

    pub fn enumeration(name: impl Into<String>, variants: &[&str]) -> Self {
        Self::new(
            name,
            FieldKind::Enum(variants.iter().map(|v| v.to_string()).collect()),
            Some(FilterMode::OneOf),
        )
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn internal(mut self) -> Self {
        self.public = false;
        self
    }

    pub fn unfiltered(mut self) -> Self {
        self.filter = None;
        self
    }

    pub fn filter_mode(mut self, mode: FilterMode) -> Self {
        self.filter = Some(mode);
        self
    }

    /// Whether `mode` makes sense for this field's kind
    pub(crate) fn accepts_mode(&self, mode: FilterMode) -> bool {
        match mode {
            FilterMode::Exact => true,
            FilterMode::Contains(_) => self.kind == FieldKind::Text,
            FilterMode::Range => self.kind.is_rangeable(),
            FilterMode::OneOf => matches!(
                self.kind,
                FieldKind::Enum(_) | FieldKind::Text | FieldKind::Id | FieldKind::Integer
            ),
        }
    }
}
