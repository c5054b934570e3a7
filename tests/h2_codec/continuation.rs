//! Tests for HTTP/2 CONTINUATION frame handling

use h2_engine::frame::{Frame, HeadersFrame, PushPromiseFrame};
use h2_engine::{ErrorCode, ErrorKind, H2Codec, H2Error};

#[test]
fn test_continuation_single_frame() {
    let mut codec = H2Codec::new();

    // HEADERS without END_HEADERS
    let mut data = vec![0, 0, 3, 1, 0, 0, 0, 0, 1];
    data.extend_from_slice(&[0x82, 0x86, 0x84]);

    // CONTINUATION with END_HEADERS
    data.extend_from_slice(&[0, 0, 2, 9, 4, 0, 0, 0, 1]);
    data.extend_from_slice(&[0x41, 0x8a]);

    let frames = codec.process(&data).unwrap();
    assert_eq!(frames.len(), 1);

    match &frames[0] {
        Frame::Headers(HeadersFrame {
            stream_id,
            header_block,
            end_stream,
            end_headers,
            ..
        }) => {
            assert_eq!(*stream_id, 1);
            assert_eq!(header_block, &[0x82, 0x86, 0x84, 0x41, 0x8a][..]);
            assert!(!*end_stream);
            assert!(*end_headers);
        }
        _ => panic!("Expected Headers frame"),
    }
}

#[test]
fn test_continuation_multiple_frames() {
    let mut codec = H2Codec::new();

    // HEADERS with END_STREAM, no END_HEADERS
    let mut data = vec![0, 0, 2, 1, 1, 0, 0, 0, 3];
    data.extend_from_slice(&[0x82, 0x86]);
    data.extend_from_slice(&[0, 0, 1, 9, 0, 0, 0, 0, 3, 0x84]);
    data.extend_from_slice(&[0, 0, 1, 9, 4, 0, 0, 0, 3, 0x87]);

    let frames = codec.process(&data).unwrap();
    match &frames[..] {
        [Frame::Headers(headers)] => {
            assert_eq!(headers.header_block, &[0x82, 0x86, 0x84, 0x87][..]);
            assert!(headers.end_stream, "END_STREAM comes from the HEADERS frame");
        }
        _ => panic!("Expected one Headers frame"),
    }
}

#[test]
fn test_open_block_reported_until_end_headers() {
    let mut codec = H2Codec::new();
    codec.process(&[0, 0, 1, 1, 0, 0, 0, 0, 5, 0x82]).unwrap();
    assert_eq!(codec.open_header_block(), Some(5));
    codec.process(&[0, 0, 1, 9, 4, 0, 0, 0, 5, 0x84]).unwrap();
    assert_eq!(codec.open_header_block(), None);
}

#[test]
fn test_push_promise_continuation() {
    let mut codec = H2Codec::new();
    // PUSH_PROMISE on stream 1 promising stream 2, no END_HEADERS
    let mut data = vec![0, 0, 5, 5, 0, 0, 0, 0, 1, 0, 0, 0, 2, 0x82];
    data.extend_from_slice(&[0, 0, 1, 9, 4, 0, 0, 0, 1, 0x84]);

    let frames = codec.process(&data).unwrap();
    match &frames[0] {
        Frame::PushPromise(PushPromiseFrame {
            promised_stream_id,
            header_block,
            ..
        }) => {
            assert_eq!(*promised_stream_id, 2);
            assert_eq!(header_block, &[0x82, 0x84][..]);
        }
        _ => panic!("Expected PushPromise frame"),
    }
}

#[test]
fn test_interleaved_frame_is_connection_error() {
    let mut codec = H2Codec::new();
    let mut data = vec![0, 0, 1, 1, 0, 0, 0, 0, 1, 0x82];
    // DATA on stream 3 while stream 1's block is open
    data.extend_from_slice(&[0, 0, 1, 0, 0, 0, 0, 0, 3, 0]);

    let err = codec.process(&data).unwrap_err();
    assert!(err.is_connection_error());
    assert_eq!(err.code(), ErrorCode::ProtocolError);
    assert_eq!(
        err.kind(),
        &ErrorKind::UnexpectedFrameDuringHeaderBlock {
            frame_type: 0,
            stream_id: 3,
            open_stream: 1
        }
    );
}

#[test]
fn test_continuation_on_wrong_stream() {
    let mut codec = H2Codec::new();
    let mut data = vec![0, 0, 1, 1, 0, 0, 0, 0, 1, 0x82];
    data.extend_from_slice(&[0, 0, 1, 9, 4, 0, 0, 0, 3, 0x84]);
    let err = codec.process(&data).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ProtocolError);
}

#[test]
fn test_orphan_continuation() {
    let mut codec = H2Codec::new();
    let err = codec.process(&[0, 0, 1, 9, 4, 0, 0, 0, 1, 0x82]).unwrap_err();
    assert!(matches!(err, H2Error::Connection { code: ErrorCode::ProtocolError, .. }));
}

#[test]
fn test_header_block_size_cap() {
    let mut codec = H2Codec::new().with_max_header_block_size(8);
    let mut data = vec![0, 0, 6, 1, 0, 0, 0, 0, 1];
    data.extend_from_slice(&[0; 6]);
    data.extend_from_slice(&[0, 0, 6, 9, 4, 0, 0, 0, 1]);
    data.extend_from_slice(&[0; 6]);

    let err = codec.process(&data).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::HeaderBlockTooLarge { size: 12, max: 8 });
    assert_eq!(codec.open_header_block(), None);
}
