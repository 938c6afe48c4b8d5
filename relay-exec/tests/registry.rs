use std::sync::Arc;

use relay_core::{parse_document_str, ConfigError, ConnectorConfig, DocumentFormat};
use relay_exec::executor::ReqwestHttpClient;
use relay_exec::registry::Registry;
use serde_json::json;

fn registry() -> Registry {
    Registry::new(Arc::new(ReqwestHttpClient::default()))
}

const DOC: &str = r##"
sources:
  inline_leads:
    type: inline
    records:
      - { customer_id: "1", order_id: "a" }
  mystery:
    type: carrier_pigeon
destinations:
  logger:
    type: log
    fields: [customer_id, order_id]
    required_fields: [order_id]
    partition_key: customer_id
    batch_size: 50
  broken_logger:
    type: log
    fields: [customer_id]
    required_fields: [order_id]
connections:
  - name: good
    schedule: "@hourly"
    source: { $ref: "#/sources/inline_leads" }
    destination: { $ref: "#/destinations/logger" }
  - name: unknown_source
    source: { $ref: "#/sources/mystery" }
    destination: { $ref: "#/destinations/logger" }
  - name: invalid_destination
    source: { $ref: "#/sources/inline_leads" }
    destination: { $ref: "#/destinations/broken_logger" }
  - name: also_good
    source: { $ref: "#/sources/inline_leads" }
    destination: { $ref: "#/destinations/logger" }
"##;

#[test]
fn failing_connections_do_not_block_their_siblings() {
    let doc = parse_document_str(DOC, DocumentFormat::Auto).unwrap().document;
    let registration = registry().register_connections(&doc);

    assert!(!registration.is_complete());
    let names: Vec<_> = registration.connections.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["good", "also_good"]);

    let good = &registration.connections[0];
    assert_eq!(good.schedule.as_deref(), Some("@hourly"));
    assert_eq!(good.source.kind(), "inline");
    assert_eq!(good.destination.kind(), "log");
    assert_eq!(good.destination.batch_size(), 50);
    assert_eq!(good.destination.partition_key(), Some("customer_id"));
    assert_eq!(good.destination_config.get("batch_size"), Some(&json!(50)));

    assert_eq!(registration.errors.len(), 2);
    assert_eq!(registration.errors[0].connection, "unknown_source");
    assert_eq!(
        registration.errors[0].error,
        ConfigError::UnknownConnector {
            role: "source",
            name: "carrier_pigeon".to_string()
        }
    );
    assert_eq!(registration.errors[1].connection, "invalid_destination");
    match &registration.errors[1].error {
        ConfigError::Invalid { role, messages } => {
            assert_eq!(*role, "destination");
            assert!(messages[0].contains("order_id"));
        }
        other => panic!("expected invalid config, got {other:?}"),
    }
}

#[test]
fn unknown_destination_type_is_rejected() {
    let err = registry()
        .build_destination(&ConnectorConfig::new("fax"))
        .err()
        .unwrap();
    assert_eq!(
        err,
        ConfigError::UnknownConnector {
            role: "destination",
            name: "fax".to_string()
        }
    );
}

#[test]
fn replay_cannot_be_configured_directly() {
    let err = registry()
        .build_source(&ConnectorConfig::new("replay"))
        .err()
        .unwrap();
    assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "type"));
}

#[test]
fn missing_type_is_reported() {
    let cfg = ConnectorConfig::from_json(json!({"path": "x.json"})).unwrap();
    let err = registry().build_source(&cfg).err().unwrap();
    assert_eq!(err, ConfigError::MissingType);
}

#[test]
fn conversion_upload_without_credentials_is_invalid() {
    let cfg = ConnectorConfig::new("conversion_upload").with("endpoint", "https://ads.test/v17");
    let err = registry().build_destination(&cfg).err().unwrap();
    match err {
        ConfigError::Invalid { role, messages } => {
            assert_eq!(role, "destination");
            assert_eq!(messages.len(), 5);
        }
        other => panic!("expected invalid config, got {other:?}"),
    }
}

#[test]
fn connector_listing_covers_every_kind() {
    let listing = Registry::connectors();
    let kinds: Vec<_> = listing.iter().map(|c| (c.role, c.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            ("source", "inline"),
            ("source", "json_file"),
            ("source", "replay"),
            ("destination", "conversion_upload"),
            ("destination", "log"),
        ]
    );
    let upload = &listing[3].schema;
    assert!(upload.fields.iter().any(|f| f.name == "developer_token" && f.required));
}
