use std::collections::{BTreeMap, HashSet};

use crate::types::{ConnectionsDocument, ConnectorConfig, ConnectorRef, RefSection};
use crate::validate::validator::{Validator, ID_RE};

pub(crate) fn validate_document(v: &mut Validator, doc: &ConnectionsDocument) {
    validate_connectors(v, "$.sources", &doc.sources);
    validate_connectors(v, "$.destinations", &doc.destinations);

    if doc.connections.is_empty() {
        v.push("$.connections", "must have at least one entry");
    }

    let mut names = HashSet::<&str>::new();
    for (idx, c) in doc.connections.iter().enumerate() {
        let path = format!("$.connections[{idx}]");

        if !ID_RE.is_match(&c.name) {
            v.push(format!("{path}.name"), "must match regex [A-Za-z0-9_\\-]+");
        }
        if !names.insert(c.name.as_str()) {
            v.push(format!("{path}.name"), "must be unique within the document");
        }

        validate_ref(v, doc, &format!("{path}.source"), &c.source, RefSection::Sources);
        validate_ref(
            v,
            doc,
            &format!("{path}.destination"),
            &c.destination,
            RefSection::Destinations,
        );
    }
}

fn validate_connectors(v: &mut Validator, path: &str, entries: &BTreeMap<String, ConnectorConfig>) {
    for (name, cfg) in entries {
        let epath = format!("{path}.{name}");
        if !ID_RE.is_match(name) {
            v.push(&epath, "name must match regex [A-Za-z0-9_\\-]+");
        }
        if cfg.type_name().is_err() {
            v.push(format!("{epath}.type"), "is required");
        }
    }
}

fn validate_ref(
    v: &mut Validator,
    doc: &ConnectionsDocument,
    path: &str,
    r: &ConnectorRef,
    expected: RefSection,
) {
    if let Err(e) = doc.lookup(r, expected) {
        v.push(format!("{path}.$ref"), e.to_string());
    }
}
