/// Per-entity metadata: entity name, key fields, and cascade set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    entity_name: String,
    primary_key: String,
    foreign_key: String,
    cascades: Vec<String>,
}

impl Schema {
    /// Schema with primary key `id`, foreign key `<snake_case name>_id`, and
    /// no cascades.
    pub fn new(entity_name: impl Into<String>) -> Self {
        let entity_name = entity_name.into();
        let foreign_key = format!("{}_id", to_snake_case(&entity_name));
        Self {
            entity_name,
            primary_key: "id".to_string(),
            foreign_key,
            cascades: Vec::new(),
        }
    }

    pub fn with_primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    /// Field on dependent rows that holds this entity's identifier.
    pub fn with_foreign_key(mut self, field: impl Into<String>) -> Self {
        self.foreign_key = field.into();
        self
    }

    /// Add a dependent entity purged when rows of this entity are deleted.
    pub fn with_cascade(mut self, entity: impl Into<String>) -> Self {
        let entity = entity.into();
        if !self.cascades.contains(&entity) {
            self.cascades.push(entity);
        }
        self
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    pub fn cascades(&self) -> &[String] {
        &self.cascades
    }
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}
