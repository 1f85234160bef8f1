//! Turns an incoming batch of `{x, y, z}` messages into tiles.

use serde_json::Value;
use slippy::Tile;

use crate::error::{Error, Result};

/// Accepts either a bare array of tile messages or a queue delivery of the
/// form `{"Records": [{"body": "{\"x\": 4, \"y\": 5, \"z\": 3}"}]}`.
///
/// Order is preserved; one bad message rejects the whole batch.
pub fn extract_tiles(event: &Value) -> Result<Vec<Tile>> {
    let messages = match event {
        Value::Array(messages) => messages.iter().map(MessageRef::Inline).collect::<Vec<_>>(),
        Value::Object(envelope) => match envelope.get("Records") {
            Some(Value::Array(records)) => records.iter().map(MessageRef::Record).collect(),
            _ => {
                return Err(Error::MalformedTileMessage {
                    index: 0,
                    reason: "expected an array of messages or a `Records` envelope".to_string(),
                });
            }
        },
        _ => {
            return Err(Error::MalformedTileMessage {
                index: 0,
                reason: "batch is neither an array nor an object".to_string(),
            });
        }
    };

    messages
        .into_iter()
        .enumerate()
        .map(|(index, message)| {
            message
                .resolve()
                .and_then(|body| parse_tile(&body))
                .map_err(|reason| Error::MalformedTileMessage { index, reason })
        })
        .collect()
}

enum MessageRef<'a> {
    Inline(&'a Value),
    Record(&'a Value),
}

impl MessageRef<'_> {
    fn resolve(&self) -> Result<Value, String> {
        match self {
            MessageRef::Inline(value) => Ok((*value).clone()),
            MessageRef::Record(record) => match record.get("body") {
                Some(Value::String(body)) => {
                    serde_json::from_str(body).map_err(|err| format!("body is not json: {err}"))
                }
                Some(body @ Value::Object(_)) => Ok(body.clone()),
                Some(_) => Err("body must be a json string or object".to_string()),
                None => Err("record has no body".to_string()),
            },
        }
    }
}

fn parse_tile(message: &Value) -> Result<Tile, String> {
    let field = |name: &str| -> Result<u64, String> {
        match message.get(name) {
            Some(value) => value
                .as_u64()
                .ok_or_else(|| format!("`{name}` must be a non-negative integer, got {value}")),
            None => Err(format!("missing `{name}`")),
        }
    };
    let x = u32::try_from(field("x")?).map_err(|err| format!("`x`: {err}"))?;
    let y = u32::try_from(field("y")?).map_err(|err| format!("`y`: {err}"))?;
    let z = u8::try_from(field("z")?).map_err(|err| format!("`z`: {err}"))?;
    Tile::new(x, y, z).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_records_envelope() {
        let event = json!({
            "Records": [
                { "body": "{ \"x\": 4, \"y\": 5, \"z\": 3 }" },
                { "body": "{ \"z\": 4, \"x\": 9, \"y\": 10 }" },
            ]
        });
        let tiles = extract_tiles(&event).unwrap();
        assert_eq!(
            tiles,
            vec![Tile::new(4, 5, 3).unwrap(), Tile::new(9, 10, 4).unwrap()]
        );
    }

    #[test]
    fn test_bare_array_keeps_order() {
        let event = json!([
            { "x": 1, "y": 0, "z": 1 },
            { "x": 0, "y": 0, "z": 1 },
            { "x": 1, "y": 1, "z": 1 },
        ]);
        let tiles = extract_tiles(&event).unwrap();
        let xy: Vec<_> = tiles.iter().map(|t| (t.x(), t.y())).collect();
        assert_eq!(xy, vec![(1, 0), (0, 0), (1, 1)]);
    }

    #[test]
    fn test_malformed_aborts_batch() {
        let cases = [
            json!([{ "x": 4, "y": 5, "z": 3 }, { "x": 4, "y": 5 }]),
            json!([{ "x": 4, "y": 5, "z": 3 }, { "x": 4.5, "y": 5, "z": 3 }]),
            json!([{ "x": 4, "y": 5, "z": 3 }, { "x": -1, "y": 5, "z": 3 }]),
            json!([{ "x": 4, "y": 5, "z": 3 }, { "x": "4", "y": 5, "z": 3 }]),
            json!([{ "x": 4, "y": 5, "z": 3 }, { "x": 8, "y": 5, "z": 3 }]),
            json!({
                "Records": [
                    { "body": "{ \"x\": 0, \"y\": 0, \"z\": 0 }" },
                    { "body": "not json" },
                ]
            }),
        ];
        for event in cases {
            match extract_tiles(&event) {
                Err(Error::MalformedTileMessage { index, .. }) => assert_eq!(index, 1),
                other => panic!("expected MalformedTileMessage, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_rejects_non_batch() {
        assert!(matches!(
            extract_tiles(&json!("tiles")),
            Err(Error::MalformedTileMessage { .. })
        ));
        assert!(matches!(
            extract_tiles(&json!({ "tiles": [] })),
            Err(Error::MalformedTileMessage { .. })
        ));
    }
}
