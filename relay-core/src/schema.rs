/// Describes the configuration fields a connector accepts.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ProtocolSchema {
    pub name: String,
    pub fields: Vec<SchemaField>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Boolean,
    Records,
}

impl ProtocolSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn required(mut self, name: &str, field_type: FieldType, description: &str) -> Self {
        self.fields.push(SchemaField {
            name: name.to_string(),
            field_type,
            description: description.to_string(),
            required: true,
        });
        self
    }

    pub fn optional(mut self, name: &str, field_type: FieldType, description: &str) -> Self {
        self.fields.push(SchemaField {
            name: name.to_string(),
            field_type,
            description: description.to_string(),
            required: false,
        });
        self
    }
}
