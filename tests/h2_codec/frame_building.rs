//! Tests for HTTP/2 frame encoding

use bytes::{Bytes, BytesMut};
use h2_engine::frame::{
    ContinuationFrame, DataFrame, Frame, GoAwayFrame, HeadersFrame, PingFrame, RstStreamFrame, Setting,
    SettingsFrame, WindowUpdateFrame,
};
use h2_engine::{flags, frame_type, ErrorCode, H2Codec};

fn encode(frame: Frame) -> BytesMut {
    let mut buf = BytesMut::new();
    frame.encode(&mut buf);
    buf
}

#[test]
fn test_create_rst_stream() {
    let frame = encode(Frame::RstStream(RstStreamFrame::new(1, ErrorCode::Http11Required)));
    assert_eq!(frame.len(), 13);
    assert_eq!(&frame[0..3], &[0, 0, 4]);
    assert_eq!(frame[3], frame_type::RST_STREAM);
    assert_eq!(&frame[9..], &[0, 0, 0, 0xd]);
}

#[test]
fn test_create_settings_ack() {
    let frame = encode(Frame::Settings(SettingsFrame::ack()));
    assert_eq!(&frame[..], &[0, 0, 0, frame_type::SETTINGS, flags::ACK, 0, 0, 0, 0]);
}

#[test]
fn test_create_settings_empty() {
    let frame = encode(Frame::Settings(SettingsFrame::new(vec![])));
    assert_eq!(frame.len(), 9);
    assert_eq!(frame[3], frame_type::SETTINGS);
    assert_eq!(frame[4], 0);
}

#[test]
fn test_create_settings_with_window() {
    let frame = encode(Frame::Settings(SettingsFrame::new(vec![Setting::InitialWindowSize(1_048_576)])));
    assert_eq!(frame.len(), 15);
    assert_eq!(&frame[9..11], &[0, 4]);
    assert_eq!(&frame[11..], &[0, 0x10, 0, 0]);
}

#[test]
fn test_create_ping_ack() {
    let data = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];
    let frame = encode(Frame::Ping(PingFrame { ack: true, data }));
    assert_eq!(frame.len(), 17);
    assert_eq!(frame[3], frame_type::PING);
    assert_eq!(frame[4], flags::ACK);
    assert_eq!(&frame[9..], &data);
}

#[test]
fn test_create_window_update() {
    let frame = encode(Frame::WindowUpdate(WindowUpdateFrame::new(3, 65_535)));
    assert_eq!(&frame[..], &[0, 0, 4, 8, 0, 0, 0, 0, 3, 0, 0, 0xff, 0xff]);
}

#[test]
fn test_create_goaway() {
    let frame = encode(Frame::GoAway(GoAwayFrame {
        last_stream_id: 5,
        error_code: ErrorCode::EnhanceYourCalm,
        debug_data: Bytes::from_static(b"slow"),
    }));
    assert_eq!(&frame[0..3], &[0, 0, 12]);
    assert_eq!(&frame[9..17], &[0, 0, 0, 5, 0, 0, 0, 0xb]);
    assert_eq!(&frame[17..], b"slow");
}

#[test]
fn test_create_data_frame() {
    let frame = encode(Frame::Data(DataFrame::new(1, Bytes::from_static(b"abc"), true)));
    assert_eq!(&frame[..9], &[0, 0, 3, 0, flags::END_STREAM, 0, 0, 0, 1]);
    assert_eq!(&frame[9..], b"abc");
}

#[test]
fn test_headers_and_continuation_flags() {
    let headers = encode(Frame::Headers(HeadersFrame::new(1, Bytes::from_static(&[0x82]), true, false)));
    assert_eq!(headers[4], flags::END_STREAM);

    let continuation = encode(Frame::Continuation(ContinuationFrame {
        stream_id: 1,
        header_block: Bytes::from_static(&[0x84]),
        end_headers: true,
    }));
    assert_eq!(continuation[3], frame_type::CONTINUATION);
    assert_eq!(continuation[4], flags::END_HEADERS);
}

#[test]
fn test_encoded_frames_parse_back() {
    let frames = vec![
        Frame::Headers(HeadersFrame::new(1, Bytes::from_static(&[0x82, 0x84]), false, true)),
        Frame::Data(DataFrame::new(1, Bytes::from_static(b"body"), true)),
        Frame::RstStream(RstStreamFrame::new(3, ErrorCode::Cancel)),
        Frame::Settings(SettingsFrame::new(vec![Setting::EnablePush(0), Setting::MaxFrameSize(20_000)])),
    ];
    let mut wire = BytesMut::new();
    for frame in &frames {
        frame.encode(&mut wire);
    }

    let mut codec = H2Codec::new();
    assert_eq!(codec.process(&wire).unwrap(), frames);
}
