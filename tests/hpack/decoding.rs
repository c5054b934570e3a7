//! Tests for HPACK decoding

use h2_engine::{HpackDecoder, HpackError};

#[test]
fn test_decode_indexed_header() {
    let mut decoder = HpackDecoder::new();

    // 0x82 = indexed header, index 2 = :method: GET
    let data = [0x82];
    let headers = decoder.decode(&data).unwrap();

    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].name, ":method");
    assert_eq!(headers[0].value, "GET");
}

#[test]
fn test_decode_multiple_indexed_headers() {
    let mut decoder = HpackDecoder::new();

    // 0x82 = :method: GET, 0x86 = :scheme: http, 0x84 = :path: /
    let data = [0x82, 0x86, 0x84];
    let headers = decoder.decode(&data).unwrap();

    assert_eq!(headers.len(), 3);
    assert_eq!(headers[0].name, ":method");
    assert_eq!(headers[0].value, "GET");
    assert_eq!(headers[1].name, ":scheme");
    assert_eq!(headers[1].value, "http");
    assert_eq!(headers[2].name, ":path");
    assert_eq!(headers[2].value, "/");
}

#[test]
fn test_decode_literal_with_indexing() {
    let mut decoder = HpackDecoder::new();

    // 0x40 = literal with indexing, new name
    let data = [
        0x40, // Literal with indexing, new name
        0x06, // Name length: 6
        b'c', b'u', b's', b't', b'o', b'm',
        0x05, // Value length: 5
        b'v', b'a', b'l', b'u', b'e',
    ];

    let headers = decoder.decode(&data).unwrap();

    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].name, "custom");
    assert_eq!(headers[0].value, "value");
}

#[test]
fn test_decode_literal_indexed_name() {
    let mut decoder = HpackDecoder::new();

    // 0x41 = literal with indexing, indexed name (index 1 = :authority)
    let data = [
        0x41, // Literal with indexing, name index 1
        0x0B, // Value length: 11
        b'e', b'x', b'a', b'm', b'p', b'l', b'e', b'.', b'c', b'o', b'm',
    ];

    let headers = decoder.decode(&data).unwrap();

    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].name, ":authority");
    assert_eq!(headers[0].value, "example.com");
}

#[test]
fn test_decode_literal_with_indexing_adds_table_entry() {
    let mut decoder = HpackDecoder::new();

    // RFC 7541 C.3.1: first request, no Huffman
    let mut data = vec![0x82, 0x86, 0x84, 0x41, 0x0f];
    data.extend_from_slice(b"www.example.com");
    let headers = decoder.decode(&data).unwrap();
    assert_eq!(headers[3].name, ":authority");
    assert_eq!(headers[3].value, "www.example.com");
    assert_eq!(decoder.table().len(), 1);
    assert_eq!(decoder.table().size(), 57);

    // C.3.2: index 62 now refers to the new entry
    let mut data = vec![0x82, 0x86, 0x84, 0xbe, 0x58, 0x08];
    data.extend_from_slice(b"no-cache");
    let headers = decoder.decode(&data).unwrap();
    assert_eq!(headers[3].value, "www.example.com");
    assert_eq!(headers[4].name, "cache-control");
    assert_eq!(decoder.table().size(), 110);
}

#[test]
fn test_decode_huffman_request_sequence() {
    let mut decoder = HpackDecoder::new();

    // RFC 7541 C.4.1 - C.4.3
    let first = [
        0x82, 0x86, 0x84, 0x41, 0x8c, 0xf1, 0xe3, 0xc2, 0xe5, 0xf2, 0x3a, 0x6b, 0xa0, 0xab, 0x90, 0xf4, 0xff,
    ];
    let second = [0x82, 0x86, 0x84, 0xbe, 0x58, 0x86, 0xa8, 0xeb, 0x10, 0x64, 0x9c, 0xbf];
    let third = [
        0x82, 0x87, 0x85, 0xbf, 0x40, 0x88, 0x25, 0xa8, 0x49, 0xe9, 0x5b, 0xa9, 0x7d, 0x7f, 0x89, 0x25, 0xa8,
        0x49, 0xe9, 0x5b, 0xb8, 0xe8, 0xb4, 0xbf,
    ];

    let headers = decoder.decode(&first).unwrap();
    assert_eq!(headers[3].value, "www.example.com");

    let headers = decoder.decode(&second).unwrap();
    assert_eq!(headers[4].name, "cache-control");
    assert_eq!(headers[4].value, "no-cache");

    let headers = decoder.decode(&third).unwrap();
    assert_eq!(headers.len(), 5);
    assert_eq!(headers[1].value, "https");
    assert_eq!(headers[2].value, "/index.html");
    assert_eq!(headers[3].value, "www.example.com");
    assert_eq!(headers[4].name, "custom-key");
    assert_eq!(headers[4].value, "custom-value");
    assert_eq!(decoder.table().size(), 164);
}

#[test]
fn test_decode_never_indexed_marks_sensitive() {
    let mut decoder = HpackDecoder::new();

    // RFC 7541 C.2.3
    let mut data = vec![0x10, 0x08];
    data.extend_from_slice(b"password");
    data.push(0x06);
    data.extend_from_slice(b"secret");

    let headers = decoder.decode(&data).unwrap();
    assert!(headers[0].sensitive);
    assert_eq!(headers[0].name, "password");
    assert!(decoder.table().is_empty());
}

#[test]
fn test_decode_without_indexing_leaves_table_alone() {
    let mut decoder = HpackDecoder::new();

    // RFC 7541 C.2.2: :path /sample/path
    let mut data = vec![0x04, 0x0c];
    data.extend_from_slice(b"/sample/path");

    let headers = decoder.decode(&data).unwrap();
    assert_eq!(headers[0].name, ":path");
    assert!(!headers[0].sensitive);
    assert!(decoder.table().is_empty());
}

#[test]
fn test_decode_index_zero_is_error() {
    let mut decoder = HpackDecoder::new();
    assert_eq!(decoder.decode(&[0x80]), Err(HpackError::HeaderIndexOutOfRange(0)));
}

#[test]
fn test_decode_index_past_tables_is_error() {
    let mut decoder = HpackDecoder::new();
    // Index 62 with an empty dynamic table
    assert_eq!(decoder.decode(&[0xbe]), Err(HpackError::HeaderIndexOutOfRange(62)));
}

#[test]
fn test_decode_size_update_at_start() {
    let mut decoder = HpackDecoder::new();
    // Size update to 0, then :method GET
    let headers = decoder.decode(&[0x20, 0x82]).unwrap();
    assert_eq!(headers.len(), 1);
    assert_eq!(decoder.table().max_size(), 0);
}

#[test]
fn test_decode_size_update_after_field_is_error() {
    let mut decoder = HpackDecoder::new();
    assert!(matches!(
        decoder.decode(&[0x82, 0x20]),
        Err(HpackError::InvalidTableSizeUpdate { .. })
    ));
}

#[test]
fn test_decode_size_update_above_setting_is_error() {
    let mut decoder = HpackDecoder::new();
    decoder.set_max_allowed_table_size(100);
    // 0x3f 0xe1 0x1f = 4096 > 100
    assert_eq!(
        decoder.decode(&[0x3f, 0xe1, 0x1f]),
        Err(HpackError::InvalidTableSizeUpdate {
            requested: 4096,
            permitted: 100
        })
    );
}

#[test]
fn test_decode_truncated_string_is_error() {
    let mut decoder = HpackDecoder::new();
    assert_eq!(decoder.decode(&[0x40, 0x05, b'a', b'b']), Err(HpackError::TruncatedString));
}

#[test]
fn test_decode_header_list_limit() {
    let mut decoder = HpackDecoder::new();
    decoder.set_max_header_list_size(Some(40));
    // :method GET is 7 + 3 + 32 = 42
    assert_eq!(decoder.decode(&[0x82]), Err(HpackError::HeaderListTooLarge { max: 40 }));
}
