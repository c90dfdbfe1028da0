//! End-to-end envelope coverage: wire formats, static values, headers,
//! version tags and the checksum trailer.

use picopack::{decode, encode, Error, Format, Message, PayloadSpec};
use serde_json::{json, Value};

fn telemetry_spec() -> PayloadSpec {
    PayloadSpec::from_value(&json!({
        "name": "telemetry",
        "version": 0,
        "body": [
            {
                "key": "confidences",
                "type": "array",
                "length": 7,
                "blocks": {"key": "confidence", "type": "float", "bits": 4}
            },
            {
                "key": "categories",
                "type": "array",
                "length": 7,
                "blocks": {
                    "key": "category",
                    "type": "categories",
                    "categories": ["bike", "skate", "scooter"]
                }
            },
            {"key": "msg_version", "type": "integer", "bits": 6, "value": 1},
            {"key": "timestamp", "type": "integer", "bits": 32},
            {"key": "voltage", "type": "float", "bits": 8, "lower": 10, "upper": 13},
            {"key": "temperature", "type": "float", "bits": 8, "lower": 5, "upper": 50}
        ]
    }))
    .unwrap()
}

fn telemetry_data() -> Value {
    json!({
        "confidences": [0.9, 0.8, 0.7],
        "categories": ["bike", "bike", "scooter"],
        "timestamp": 1234567890u64,
        "voltage": 12,
        "temperature": 45
    })
}

const TELEMETRY_BITS: &str =
    "01111101100101001100001000000101001001100101100000001011010010101010101110001100";
const TELEMETRY_HEX: &str = "7d94c20526580b4aab8c";

#[test]
fn telemetry_bin_vector() {
    let spec = telemetry_spec();
    let message = encode(&telemetry_data(), &spec, Format::Bin).unwrap();
    assert_eq!(message.as_bin().unwrap(), TELEMETRY_BITS);

    let decoded = decode(&message, &spec).unwrap();
    assert_eq!(decoded.meta.name, "telemetry");
    assert_eq!(decoded.meta.version, 0);
    assert_eq!(decoded.meta.message, format!("0x{TELEMETRY_HEX}"));
    assert_eq!(decoded.meta.checksum, None);
    assert_eq!(decoded.meta.header, None);

    // The static member rides the wire and decodes like any other.
    assert_eq!(decoded.body["msg_version"], json!(1));
    assert_eq!(decoded.body["timestamp"], json!(1234567890));
    assert_eq!(decoded.body["categories"], json!(["bike", "bike", "scooter"]));
    assert_eq!(decoded.body["voltage"].as_f64().unwrap(), 12.0);

    // Floats come back within quantization tolerance.
    let confidences = decoded.body["confidences"].as_array().unwrap();
    for (back, original) in confidences.iter().zip([0.9, 0.8, 0.7]) {
        assert!((back.as_f64().unwrap() - original).abs() <= 1.0 / 15.0);
    }
    assert!((decoded.body["temperature"].as_f64().unwrap() - 45.0).abs() <= 45.0 / 255.0);
}

#[test]
fn telemetry_hex_and_bytes_vectors() {
    let spec = telemetry_spec();

    let message = encode(&telemetry_data(), &spec, Format::Hex).unwrap();
    assert_eq!(message.as_hex().unwrap(), TELEMETRY_HEX);
    let decoded = decode(&message, &spec).unwrap();
    assert_eq!(decoded.body["msg_version"], json!(1));

    let message = encode(&telemetry_data(), &spec, Format::Bytes).unwrap();
    assert_eq!(
        message.as_bytes().unwrap(),
        [125, 148, 194, 5, 38, 88, 11, 74, 171, 140]
    );
    let decoded = decode(&message, &spec).unwrap();
    assert_eq!(decoded.body["timestamp"], json!(1234567890));
}

#[test]
fn checksum_vector_and_corruption_detection() {
    let spec = PayloadSpec::from_value(&json!({
        "name": "sensor",
        "version": 0,
        "body": [
            {"key": "value1", "type": "integer", "bits": 8},
            {
                "key": "value2",
                "type": "categories",
                "categories": ["cat", "kitten", "cute"]
            },
            {"key": "value3", "type": "float", "bits": 8},
            {"key": "value4", "type": "boolean"}
        ],
        "meta": {"crc8": true}
    }))
    .unwrap();
    let data = json!({
        "value1": 1, "value2": "kitten", "value3": 0.9, "value4": true
    });

    let message = encode(&data, &spec, Format::Bin).unwrap();
    assert_eq!(
        message.as_bin().unwrap(),
        "00000001011110011010000000011101"
    );
    let decoded = decode(&message, &spec).unwrap();
    assert_eq!(decoded.meta.checksum, Some(true));
    assert_eq!(decoded.body["value2"], json!("kitten"));

    // Flipping any single body bit must flip the verdict, not abort.
    let bits = message.as_bin().unwrap();
    for position in 0..bits.len() - 8 {
        let mut corrupted: Vec<u8> = bits.bytes().collect();
        corrupted[position] = if corrupted[position] == b'0' { b'1' } else { b'0' };
        let corrupted = Message::Bin(String::from_utf8(corrupted).unwrap());
        let decoded = decode(&corrupted, &spec).unwrap();
        assert_eq!(decoded.meta.checksum, Some(false), "bit {position}");
    }
}

fn versioned_spec() -> PayloadSpec {
    PayloadSpec::from_value(&json!({
        "name": "report",
        "version": 2,
        "body": [{"key": "n", "type": "integer", "bits": 4}],
        "meta": {
            "encode_version": true,
            "version_bits": 6,
            "header": [
                {"key": "sender", "type": "string", "length": 2},
                {"key": "unit", "type": "string", "length": 3, "value": "lab"}
            ]
        }
    }))
    .unwrap()
}

#[test]
fn version_tag_and_header_roundtrip() {
    let spec = versioned_spec();
    let data = json!({"sender": "AB", "n": 9});

    let message = encode(&data, &spec, Format::Hex).unwrap();
    // Version tag, two wire header characters, body; the static header
    // entry takes no bits.
    assert_eq!(message.as_hex().unwrap(), "080064");

    let decoded = decode(&message, &spec).unwrap();
    assert_eq!(decoded.meta.version, 2);
    let header = decoded.meta.header.as_ref().unwrap();
    assert_eq!(header["sender"], json!("AB"));
    // Injected verbatim, never on the wire.
    assert_eq!(header["unit"], json!("lab"));
    assert_eq!(decoded.body, json!({"n": 9}));
}

#[test]
fn version_mismatch_fails_decode() {
    let spec = versioned_spec();
    // Same wire image with the version tag rewritten to 3.
    let message = Message::Bin("000011000000000001100100".to_string());
    let err = decode(&message, &spec).unwrap_err();
    assert_eq!(
        err,
        Error::VersionMismatch {
            expected: 2,
            found: 3
        }
    );
}

#[test]
fn malformed_wire_input_is_rejected() {
    let spec = telemetry_spec();
    assert!(matches!(
        decode(&Message::Bin("01x0".to_string()), &spec),
        Err(Error::Malformed { .. })
    ));
    assert!(matches!(
        decode(&Message::Hex("0z".to_string()), &spec),
        Err(Error::Malformed { .. })
    ));
    // Odd-length hex has no byte rendering.
    assert!(matches!(
        decode(&Message::Hex("abc".to_string()), &spec),
        Err(Error::Malformed { .. })
    ));
    // A message shorter than the schema demands.
    assert!(matches!(
        decode(&Message::Bytes(vec![0x01]), &spec),
        Err(Error::Malformed { .. })
    ));
}

#[test]
fn format_selector_parses_and_rejects() {
    let spec = telemetry_spec();
    let format: Format = "hex".parse().unwrap();
    let message = encode(&telemetry_data(), &spec, format).unwrap();
    assert_eq!(message.format(), Format::Hex);

    let err = "yaml".parse::<Format>().unwrap_err();
    assert_eq!(err, Error::InvalidFormat("yaml".to_string()));
}
