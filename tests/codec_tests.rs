//! Integration coverage for the MCPACKv2 codec's testable properties (round-trip, size
//! consistency, short/long compatibility, field-name precedence, case-fold fallback, truncation
//! detection) and the literal byte scenarios.

use std::collections::BTreeMap;

use mcpackv2::{marshal, unmarshal, Decode, Decoder, Encoder, Error, Mcpack, Tag, Value};

#[derive(Debug, Default, Clone, PartialEq, Mcpack)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(Debug, Default, Clone, PartialEq, Mcpack)]
struct Profile {
    #[mcpack(rename = "UserName")]
    name: String,
    #[mcpack(omit_empty)]
    nickname: String,
    active: bool,
    scores: Vec<i32>,
    tags: BTreeMap<String, i32>,
}

// --- 1. Round-trip -----------------------------------------------------------------------------

#[test]
fn round_trip_preserves_a_simple_struct() {
    let p = Point { x: -7, y: 42 };
    let buf = marshal(&p).unwrap();
    let back: Point = unmarshal(&buf).unwrap();
    assert_eq!(back, p);
}

#[test]
fn round_trip_preserves_nested_collections() {
    let mut tags = BTreeMap::new();
    tags.insert("a".to_string(), 1);
    tags.insert("b".to_string(), 2);
    let p = Profile {
        name: "ivy".to_string(),
        nickname: String::new(),
        active: true,
        scores: vec![1, 2, 3],
        tags,
    };
    let buf = marshal(&p).unwrap();
    let back: Profile = unmarshal(&buf).unwrap();
    assert_eq!(back, p);
}

#[test]
fn omit_empty_field_is_absent_from_the_wire() {
    let p = Profile {
        name: "ivy".to_string(),
        nickname: String::new(),
        active: false,
        scores: vec![],
        tags: BTreeMap::new(),
    };
    let buf = marshal(&p).unwrap();
    let value = unmarshal::<Value>(&buf).unwrap();
    let obj = value.as_object().unwrap();
    assert!(!obj.contains_key("nickname"));
    assert!(obj.contains_key("UserName"));
}

// --- 2. Size consistency ------------------------------------------------------------------------

#[test]
fn cursor_reaches_end_after_decoding_a_well_formed_buffer() {
    let buf = marshal(&Point { x: 1, y: 2 }).unwrap();
    let mut dec = Decoder::new(&buf);
    let _p = Point::decode(&mut dec).unwrap();
    assert!(dec.is_empty());
}

#[test]
fn fixed_and_variable_length_items_match_the_size_formula() {
    // total = 1 (tag) + 1 (keylen) + vlen_prefix + keylen_bytes + vlen
    let mut enc = Encoder::new();
    enc.write_i32("abc", 7).unwrap();
    let fixed = enc.into_bytes();
    assert_eq!(fixed.len(), 1 + 1 + 0 + 4 + 4);

    let mut enc = Encoder::new();
    enc.write_str("", "x").unwrap();
    let var = enc.into_bytes();
    assert_eq!(var.len(), 1 + 1 + 1 + 0 + 2);
}

// --- 3. Short/long compatibility -----------------------------------------------------------------

#[test]
fn long_form_string_decodes_the_same_as_short_form() {
    let short_buf = {
        let mut enc = Encoder::new();
        enc.write_str("", "abc").unwrap();
        enc.into_bytes()
    };
    let long_buf = {
        let len_with_nul = "abc".len() as u32 + 1;
        let mut buf = vec![u8::from(Tag::String), 0];
        buf.extend_from_slice(&len_with_nul.to_le_bytes());
        buf.extend_from_slice(b"abc");
        buf.push(0);
        buf
    };
    assert_eq!(unmarshal::<String>(&short_buf).unwrap(), "abc");
    assert_eq!(unmarshal::<String>(&long_buf).unwrap(), "abc");
}

#[test]
fn long_form_binary_decodes_the_same_as_short_form() {
    let short_buf = {
        let mut enc = Encoder::new();
        enc.write_binary("", &[1, 2, 3]).unwrap();
        enc.into_bytes()
    };
    let long_buf = {
        let mut buf = vec![u8::from(Tag::Binary), 0];
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(&[1, 2, 3]);
        buf
    };
    assert_eq!(unmarshal::<Vec<u8>>(&short_buf).unwrap(), vec![1, 2, 3]);
    assert_eq!(unmarshal::<Vec<u8>>(&long_buf).unwrap(), vec![1, 2, 3]);
}

// --- 4. Field-name precedence --------------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq, Mcpack)]
struct Renamed {
    #[mcpack(rename = "foo_bar")]
    value: i32,
}

#[test]
fn rename_tag_is_matched_over_the_declared_field_name() {
    let mut enc = Encoder::new();
    let handle = enc.start_container(Tag::Object, "", 1).unwrap();
    enc.write_i32("foo_bar", 9).unwrap();
    enc.end_container(handle);
    let buf = enc.into_bytes();

    let back: Renamed = unmarshal(&buf).unwrap();
    assert_eq!(back.value, 9);
}

#[test]
fn unmatched_key_is_ignored_but_still_advances_the_cursor() {
    let mut enc = Encoder::new();
    let handle = enc.start_container(Tag::Object, "", 2).unwrap();
    enc.write_i32("unexpected", 1).unwrap();
    enc.write_i32("foo_bar", 9).unwrap();
    enc.end_container(handle);
    let buf = enc.into_bytes();

    let back: Renamed = unmarshal(&buf).unwrap();
    assert_eq!(back.value, 9);
}

#[derive(Debug, Default, Clone, PartialEq, Mcpack)]
struct Inner {
    shared: i32,
}

#[derive(Debug, Default, Clone, PartialEq, Mcpack)]
struct Outer {
    #[mcpack(embed)]
    inner: Inner,
    shared: i32,
}

#[test]
fn a_directly_declared_field_wins_over_a_same_named_embedded_one() {
    let o = Outer { inner: Inner { shared: 99 }, shared: 7 };
    let buf = marshal(&o).unwrap();
    let back: Outer = unmarshal(&buf).unwrap();
    // Only one "shared" survives the collapse (the shallower, directly-declared one), so the
    // embedded value never reaches the wire and comes back as Inner's default on decode.
    assert_eq!(back.shared, 7);
    assert_eq!(back.inner.shared, 0);
}

// --- 5. Case-fold fallback -----------------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq, Mcpack)]
struct CaseFold {
    #[mcpack(rename = "Name")]
    name: String,
}

#[test]
fn a_single_case_fold_match_is_used_when_no_exact_match_exists() {
    let mut enc = Encoder::new();
    let handle = enc.start_container(Tag::Object, "", 1).unwrap();
    enc.write_str("name", "abc").unwrap();
    enc.end_container(handle);
    let buf = enc.into_bytes();

    let back: CaseFold = unmarshal(&buf).unwrap();
    assert_eq!(back.name, "abc");
}

#[derive(Debug, Default, Clone, PartialEq, Mcpack)]
struct CaseFoldAmbiguous {
    #[mcpack(rename = "Name")]
    a: String,
    #[mcpack(rename = "NAME")]
    b: String,
}

#[test]
fn two_case_fold_matches_drop_the_field_instead_of_crashing_or_guessing() {
    let mut enc = Encoder::new();
    let handle = enc.start_container(Tag::Object, "", 1).unwrap();
    enc.write_str("name", "abc").unwrap();
    enc.end_container(handle);
    let buf = enc.into_bytes();

    let back: CaseFoldAmbiguous = unmarshal(&buf).unwrap();
    assert_eq!(back, CaseFoldAmbiguous::default());
}

// --- 6. Truncation detection -----------------------------------------------------------------------

#[test]
fn every_proper_prefix_of_a_valid_buffer_is_rejected() {
    let buf = marshal(&Point { x: 1, y: 2 }).unwrap();
    for n in 0..buf.len() {
        let prefix = &buf[..n];
        let result: Result<Point, _> = unmarshal(prefix);
        assert!(matches!(result, Err(Error::Truncated)), "prefix of length {n} was accepted");
    }
}

// --- Literal byte scenarios ------------------------------------------------------------------------

#[test]
fn scenario_1_short_form_tag_confusingly_named_but_literally_a_long_string() {
    let bytes: Vec<u8> = vec![0x50, 0x00, 0x04, 0x00, 0x00, 0x00, b'f', b'o', b'o', 0x00];
    let s: String = unmarshal(&bytes).unwrap();
    assert_eq!(s, "foo");
}

#[test]
fn scenario_2_fixed_width_i32() {
    let bytes: Vec<u8> = vec![0x14, 0x00, 0x04, 0x00, 0x00, 0x00];
    let v: i32 = unmarshal(&bytes).unwrap();
    assert_eq!(v, 4);
}

#[test]
fn scenario_3_object_with_a_wrong_but_untrusted_content_length() {
    let bytes: Vec<u8> = vec![
        0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x50, 0x04, 0x04, 0x00,
        0x00, 0x00, b'f', b'o', b'o', 0x00, b'b', b'a', b'r', 0x00,
    ];
    let value = unmarshal::<Value>(&bytes).unwrap();
    let obj = value.as_object().unwrap();
    assert_eq!(obj.get("foo").unwrap().as_str(), Some("bar"));
}

#[test]
fn scenario_4_array_with_a_wrong_but_untrusted_content_length() {
    let bytes: Vec<u8> = vec![
        0x20, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x50, 0x00, 0x04, 0x00,
        0x00, 0x00, b'f', b'o', b'o', 0x00,
    ];
    let value = unmarshal::<Value>(&bytes).unwrap();
    let arr = value.as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0].as_str(), Some("foo"));
}

#[test]
fn scenario_5_marshal_chooses_short_form_and_preserves_order() {
    #[derive(Debug, Default, Mcpack)]
    struct Flags {
        a: bool,
        x: String,
        y: i64,
    }

    let buf = marshal(&Flags { a: true, x: "x".to_string(), y: 1 }).unwrap();
    let mut dec = Decoder::new(&buf);
    dec.read_container(Tag::Object, |sub| -> mcpackv2::Result<()> {
        assert_eq!(sub.peek_tag().unwrap(), Tag::Bool);
        assert!(sub.read_bool().unwrap());
        sub.finish_item();

        assert_eq!(sub.peek_tag().unwrap(), Tag::ShortString);
        assert_eq!(sub.read_str().unwrap(), "x");
        sub.finish_item();

        assert_eq!(sub.peek_tag().unwrap(), Tag::Int64);
        assert_eq!(sub.read_i64().unwrap(), 1);
        sub.finish_item();

        assert!(sub.is_empty());
        Ok(())
    })
    .unwrap();
}

#[test]
fn scenario_6_long_form_forced_past_the_short_form_boundary() {
    let too_long = "a".repeat(254); // +NUL = 255, forces long form
    let mut enc = Encoder::new();
    enc.write_str("", &too_long).unwrap();
    let buf = enc.into_bytes();
    assert_eq!(buf[0], u8::from(Tag::String));
}

#[test]
fn scenario_7_empty_key_inside_an_object_is_rejected() {
    let mut enc = Encoder::new();
    let handle = enc.start_container(Tag::Object, "", 1).unwrap();
    enc.write_i8("", 5).unwrap();
    enc.end_container(handle);
    let buf = enc.into_bytes();

    let result = unmarshal::<Value>(&buf);
    assert!(matches!(result, Err(Error::EmptyKey)));
}

#[test]
fn scenario_8_key_too_long_is_rejected_at_encode_time() {
    let key = "k".repeat(255);
    let mut enc = Encoder::new();
    let result = enc.write_i32(&key, 1);
    assert!(matches!(result, Err(Error::KeyTooLong { len: 255 })));
}
