use crate::error::ParseError;
use crate::types::ConnectionsDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
    Auto,
}

#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub document: ConnectionsDocument,
    pub format: DocumentFormat,
}

pub fn parse_document_str(input: &str, format: DocumentFormat) -> Result<ParsedDocument, ParseError> {
    match format {
        DocumentFormat::Json => Ok(ParsedDocument {
            document: serde_json::from_str::<ConnectionsDocument>(input)?,
            format,
        }),
        DocumentFormat::Yaml => Ok(ParsedDocument {
            document: serde_yaml::from_str::<ConnectionsDocument>(input)?,
            format,
        }),
        DocumentFormat::Auto => parse_document_auto(input),
    }
}

fn parse_document_auto(input: &str) -> Result<ParsedDocument, ParseError> {
    // JSON always starts with `{` after trimming; YAML is a superset so it is the fallback.
    let trimmed = input.trim_start();
    if trimmed.starts_with('{') {
        return match serde_json::from_str::<ConnectionsDocument>(input) {
            Ok(document) => Ok(ParsedDocument {
                document,
                format: DocumentFormat::Json,
            }),
            Err(e) => match serde_yaml::from_str::<ConnectionsDocument>(input) {
                Ok(document) => Ok(ParsedDocument {
                    document,
                    format: DocumentFormat::Yaml,
                }),
                Err(_) => Err(ParseError::Json(e)),
            },
        };
    }

    let document = serde_yaml::from_str::<ConnectionsDocument>(input)?;
    Ok(ParsedDocument {
        document,
        format: DocumentFormat::Yaml,
    })
}
