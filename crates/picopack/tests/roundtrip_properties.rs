//! Property coverage: round trips within declared precision and bit-width
//! conservation for composite messages.

use picopack::{
    decode, decode_field, encode, encode_field, field_width, Approximation, FieldKind, FieldSpec,
    Format, IntegerMode, PayloadSpec,
};
use proptest::prelude::*;
use serde_json::json;

fn integer_spec(bits: u32, offset: i64) -> FieldSpec {
    FieldSpec::new(
        "n",
        FieldKind::Integer {
            bits,
            offset,
            mode: IntegerMode::Truncate,
        },
    )
    .unwrap()
}

proptest! {
    #[test]
    fn integer_roundtrip_in_domain(
        bits in 1u32..=16,
        offset in -1000i64..1000,
        raw in 0u64..65536,
    ) {
        let raw = raw % (1u64 << bits);
        let spec = integer_spec(bits, offset);
        let value = offset + raw as i64;
        let encoded = encode_field(&json!(value), &spec).unwrap();
        prop_assert_eq!(encoded.len(), bits as usize);
        prop_assert_eq!(decode_field(&encoded, &spec).unwrap(), json!(value));
    }

    #[test]
    fn integer_truncate_clamps_out_of_domain(
        bits in 1u32..=12,
        value in -100_000i64..100_000,
    ) {
        let spec = integer_spec(bits, 0);
        let encoded = encode_field(&json!(value), &spec).unwrap();
        let decoded = decode_field(&encoded, &spec).unwrap().as_i64().unwrap();
        let max = (1i64 << bits) - 1;
        prop_assert_eq!(decoded, value.clamp(0, max));
    }

    #[test]
    fn float_roundtrip_within_tolerance(
        bits in 2u32..=12,
        lower in -100.0f64..100.0,
        span in 0.1f64..200.0,
        t in 0.0f64..1.0,
    ) {
        let upper = lower + span;
        let spec = FieldSpec::new(
            "f",
            FieldKind::Float { bits, lower, upper, approximation: Approximation::Round },
        )
        .unwrap();
        let value = lower + t * span;
        let encoded = encode_field(&json!(value), &spec).unwrap();
        prop_assert_eq!(encoded.len(), bits as usize);
        let decoded = decode_field(&encoded, &spec).unwrap().as_f64().unwrap();
        let step = span / ((1u64 << bits) - 1) as f64;
        prop_assert!((decoded - value).abs() <= step / 2.0 + 1e-9);
    }

    #[test]
    fn binary_roundtrip_exact(pattern in "[01]{1,32}") {
        let spec = FieldSpec::new(
            "bin",
            FieldKind::Binary { bits: pattern.len() },
        )
        .unwrap();
        let encoded = encode_field(&json!(pattern), &spec).unwrap();
        prop_assert_eq!(&encoded, &pattern);
        prop_assert_eq!(decode_field(&encoded, &spec).unwrap(), json!(pattern));
    }

    #[test]
    fn string_roundtrip_over_alphabet(s in "[A-Za-z0-9]{1,12}") {
        let spec = FieldSpec::new(
            "msg",
            FieldKind::String { length: s.chars().count(), overrides: vec![] },
        )
        .unwrap();
        let encoded = encode_field(&json!(s), &spec).unwrap();
        prop_assert_eq!(encoded.len(), s.chars().count() * 6);
        prop_assert_eq!(decode_field(&encoded, &spec).unwrap(), json!(s));
    }

    #[test]
    fn boolean_roundtrip(b in any::<bool>()) {
        let spec = FieldSpec::new("b", FieldKind::Boolean).unwrap();
        let encoded = encode_field(&json!(b), &spec).unwrap();
        prop_assert_eq!(decode_field(&encoded, &spec).unwrap(), json!(b));
    }

    #[test]
    fn array_truncates_and_roundtrips(xs in proptest::collection::vec(0u64..64, 0..10)) {
        let spec = FieldSpec::new(
            "arr",
            FieldKind::Array {
                length: 3,
                fixed: false,
                items: Box::new(integer_spec(6, 0)),
            },
        )
        .unwrap();
        let encoded = encode_field(&json!(xs), &spec).unwrap();
        let decoded = decode_field(&encoded, &spec).unwrap();
        let expected: Vec<u64> = xs.iter().copied().take(3).collect();
        prop_assert_eq!(decoded, json!(expected));
    }

    #[test]
    fn width_discovery_conserves_bits(
        n in 0u64..64,
        xs in proptest::collection::vec(0u64..64, 0..7),
        category in 0usize..3,
    ) {
        let labels = ["fighter", "wizard", "rogue"];
        let spec = FieldSpec::new(
            "obj",
            FieldKind::Object {
                fields: vec![
                    integer_spec(6, 0),
                    FieldSpec::new(
                        "xs",
                        FieldKind::Array {
                            length: 7,
                            fixed: false,
                            items: Box::new(integer_spec(6, 0)),
                        },
                    )
                    .unwrap(),
                    FieldSpec::new(
                        "class",
                        FieldKind::Categories {
                            categories: labels.iter().map(|s| s.to_string()).collect(),
                            error: None,
                        },
                    )
                    .unwrap(),
                ],
            },
        )
        .unwrap();
        let value = json!({"n": n, "xs": xs, "class": labels[category]});
        let encoded = encode_field(&value, &spec).unwrap();
        prop_assert_eq!(field_width(&encoded, &spec).unwrap(), encoded.len());
    }

    #[test]
    fn envelope_roundtrip_with_checksum(n in 0u64..256, version in 0i64..16) {
        let spec = PayloadSpec::from_value(&json!({
            "name": "probe",
            "version": version,
            "body": [{"key": "n", "type": "integer", "bits": 8}],
            "meta": {"encode_version": true, "version_bits": 4, "crc8": true}
        }))
        .unwrap();
        let message = encode(&json!({"n": n}), &spec, Format::Bytes).unwrap();
        let decoded = decode(&message, &spec).unwrap();
        prop_assert_eq!(decoded.meta.checksum, Some(true));
        prop_assert_eq!(decoded.meta.version, version);
        prop_assert_eq!(decoded.body, json!({"n": n}));
    }
}
