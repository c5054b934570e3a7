//! Tests for stream and connection flow-control windows

use bytes::Bytes;
use h2_engine::frame::{Frame, Setting, SettingsFrame, WindowUpdateFrame};
use h2_engine::{ConnectionConfig, ErrorCode, ErrorKind, Event, Settings, StreamState};

use crate::support::{
    client_with_raw_server, connected, connected_with, data_frame, drain_events, encode, headers_frame, output_frames,
    pump, request, server_with_raw_client,
};

fn window_update(stream_id: u32, increment: u32) -> Frame {
    Frame::WindowUpdate(WindowUpdateFrame::new(stream_id, increment))
}

#[test]
fn test_send_blocked_until_window_update() {
    let mut client = client_with_raw_server(vec![]);
    let id = client.open_stream(&request("/upload"), false).unwrap();
    client.poll_output();
    drain_events(&mut client);
    assert_eq!(client.send_capacity(id), 65535);

    let err = client
        .send_data(id, Bytes::from(vec![0u8; 70000]), false)
        .unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::FlowControl {
            requested: 70000,
            available: 65535
        }
    );
    assert!(!err.is_connection_error());
    assert!(client.poll_output().is_none());

    client.send_data(id, Bytes::from(vec![0u8; 65535]), false).unwrap();
    assert_eq!(client.send_capacity(id), 0);

    client
        .recv(&encode(&[window_update(0, 10000), window_update(id, 10000)]))
        .unwrap();
    assert_eq!(
        drain_events(&mut client),
        vec![
            Event::WindowUpdate {
                stream_id: 0,
                increment: 10000
            },
            Event::WindowUpdate {
                stream_id: id,
                increment: 10000
            },
        ]
    );
    assert_eq!(client.send_capacity(id), 10000);
    assert!(client.send_data(id, Bytes::from(vec![0u8; 10001]), false).is_err());
    client.send_data(id, Bytes::from(vec![0u8; 10000]), false).unwrap();
    assert_eq!(client.send_capacity(id), 0);
}

#[test]
fn test_stream_window_follows_peer_initial_window() {
    let mut client = client_with_raw_server(vec![Setting::InitialWindowSize(100)]);
    let first = client.open_stream(&request("/a"), false).unwrap();
    assert_eq!(client.send_capacity(first), 100);

    let err = client.send_data(first, Bytes::from(vec![0u8; 101]), false).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::FlowControl {
            requested: 101,
            available: 100
        }
    );
    client.send_data(first, Bytes::from(vec![0u8; 100]), false).unwrap();
    assert_eq!(client.send_capacity(first), 0);

    // The connection window is separate.
    let second = client.open_stream(&request("/b"), false).unwrap();
    assert_eq!(client.send_capacity(second), 100);
}

#[test]
fn test_window_shrink_can_go_negative() {
    let mut client = client_with_raw_server(vec![]);
    let id = client.open_stream(&request("/upload"), false).unwrap();
    client.send_data(id, Bytes::from(vec![0u8; 60000]), false).unwrap();
    client.poll_output();

    client
        .recv(&encode(&[Frame::Settings(SettingsFrame::new(vec![
            Setting::InitialWindowSize(1000),
        ]))]))
        .unwrap();
    match &output_frames(&mut client)[..] {
        [Frame::Settings(settings)] => assert!(settings.ack),
        _ => panic!("Expected SETTINGS ACK"),
    }
    // 5535 left, shrunk by 64535
    assert_eq!(client.send_capacity(id), 0);
    assert!(client.send_data(id, Bytes::from_static(b"x"), false).is_err());

    client.recv(&encode(&[window_update(id, 59001)])).unwrap();
    assert_eq!(client.send_capacity(id), 1);
    client.send_data(id, Bytes::from_static(b"x"), false).unwrap();

    // Ending the stream needs no capacity.
    client.send_data(id, Bytes::new(), true).unwrap();
    assert_eq!(client.stream_state(id), StreamState::HalfClosedLocal);
}

#[test]
fn test_stream_ends_while_window_is_negative() {
    let mut client = client_with_raw_server(vec![]);
    let id = client.open_stream(&request("/upload"), false).unwrap();
    client.send_data(id, Bytes::from(vec![0u8; 60000]), false).unwrap();
    client
        .recv(&encode(&[Frame::Settings(SettingsFrame::new(vec![
            Setting::InitialWindowSize(1000),
        ]))]))
        .unwrap();
    client.poll_output();

    // Window is now -59000; an empty END_STREAM frame still goes out.
    client.send_data(id, Bytes::new(), true).unwrap();
    assert_eq!(client.stream_state(id), StreamState::HalfClosedLocal);
    match &output_frames(&mut client)[..] {
        [Frame::Data(data)] => {
            assert!(data.data.is_empty());
            assert!(data.end_stream);
        }
        _ => panic!("Expected empty DATA frame"),
    }
}

#[test]
fn test_peer_ends_stream_while_our_window_is_negative() {
    let mut server = server_with_raw_client(ConnectionConfig::server().auto_window_update(false));
    let chunk = vec![0u8; 15000];
    server
        .recv(&encode(&[
            headers_frame(1, &request("/upload"), false),
            data_frame(1, &chunk, false),
            data_frame(1, &chunk, false),
            data_frame(1, &chunk, false),
            data_frame(1, &chunk, false),
        ]))
        .unwrap();

    server
        .update_settings(Settings::builder().initial_window_size(1000).build())
        .unwrap();
    server
        .recv(&encode(&[Frame::Settings(SettingsFrame::ack())]))
        .unwrap();
    assert_eq!(server.local_settings().initial_window_size, 1000);
    server.poll_output();
    drain_events(&mut server);

    server.recv(&encode(&[data_frame(1, b"", true)])).unwrap();
    assert!(server.poll_output().is_none());
    assert_eq!(
        drain_events(&mut server),
        vec![
            Event::Data {
                stream_id: 1,
                data: Bytes::new(),
                end_stream: true
            },
            Event::StreamStateChanged {
                stream_id: 1,
                state: StreamState::HalfClosedRemote
            },
        ]
    );
}

#[test]
fn test_automatic_window_updates() {
    let (mut client, mut server) = connected();
    let id = client.open_stream(&request("/upload"), false).unwrap();
    client.send_data(id, Bytes::from(vec![0u8; 60000]), false).unwrap();
    assert_eq!(client.send_capacity(id), 5535);
    pump(&mut client, &mut server);

    // One update was sent once the window fell to half; the rest is pending.
    assert_eq!(client.send_capacity(id), 38303);
    let updates: Vec<_> = drain_events(&mut client)
        .into_iter()
        .filter(|event| matches!(event, Event::WindowUpdate { .. }))
        .collect();
    assert_eq!(
        updates,
        vec![
            Event::WindowUpdate {
                stream_id: id,
                increment: 32768
            },
            Event::WindowUpdate {
                stream_id: 0,
                increment: 32768
            },
        ]
    );
}

#[test]
fn test_manual_window_release() {
    let server_config = ConnectionConfig::server().auto_window_update(false);
    let (mut client, mut server) = connected_with(ConnectionConfig::client(), server_config);
    let id = client.open_stream(&request("/upload"), false).unwrap();
    client.send_data(id, Bytes::from(vec![0u8; 40000]), false).unwrap();
    pump(&mut client, &mut server);
    assert_eq!(client.send_capacity(id), 25535);
    drain_events(&mut client);

    server.release_capacity(id, 40000).unwrap();
    pump(&mut client, &mut server);
    assert_eq!(client.send_capacity(id), 65535);
    assert_eq!(
        drain_events(&mut client),
        vec![
            Event::WindowUpdate {
                stream_id: id,
                increment: 40000
            },
            Event::WindowUpdate {
                stream_id: 0,
                increment: 40000
            },
        ]
    );
}

#[test]
fn test_larger_connection_window() {
    let server_config = ConnectionConfig::server()
        .initial_connection_window_size(1 << 20)
        .settings(Settings::builder().initial_window_size(1 << 20).build());
    let (mut client, mut server) = connected_with(ConnectionConfig::client(), server_config);

    let id = client.open_stream(&request("/upload"), false).unwrap();
    assert_eq!(client.send_capacity(id), 1 << 20);
    client.send_data(id, Bytes::from(vec![0u8; 100_000]), true).unwrap();
    pump(&mut client, &mut server);

    let received: usize = drain_events(&mut server)
        .iter()
        .map(|event| match event {
            Event::Data { data, .. } => data.len(),
            _ => 0,
        })
        .sum();
    assert_eq!(received, 100_000);
    assert!(!server.is_closed());
}

#[test]
fn test_peer_overrunning_window_is_connection_error() {
    let mut server = server_with_raw_client(ConnectionConfig::server().auto_window_update(false));
    let chunk = vec![0u8; 16384];
    let bytes = encode(&[
        headers_frame(1, &request("/upload"), false),
        data_frame(1, &chunk, false),
        data_frame(1, &chunk, false),
        data_frame(1, &chunk, false),
        data_frame(1, &chunk, false),
    ]);

    let err = server.recv(&bytes).unwrap_err();
    assert_eq!(err.code(), ErrorCode::FlowControlError);
    assert!(err.is_connection_error());
    assert!(server.is_closed());
    match output_frames(&mut server).last() {
        Some(Frame::GoAway(goaway)) => {
            assert_eq!(goaway.error_code, ErrorCode::FlowControlError);
            assert_eq!(goaway.last_stream_id, 1);
        }
        _ => panic!("Expected GOAWAY frame"),
    }
}

#[test]
fn test_stream_window_overflow_resets_stream() {
    let mut client = client_with_raw_server(vec![]);
    let id = client.open_stream(&request("/"), false).unwrap();
    client.poll_output();
    drain_events(&mut client);

    client.recv(&encode(&[window_update(id, 0x7fff_ffff)])).unwrap();
    match &output_frames(&mut client)[..] {
        [Frame::RstStream(rst)] => assert_eq!(rst.error_code, ErrorCode::FlowControlError),
        _ => panic!("Expected RST_STREAM frame"),
    }
    match drain_events(&mut client).last() {
        Some(Event::StreamError(err)) => assert_eq!(err.kind(), &ErrorKind::WindowOverflow),
        _ => panic!("Expected StreamError event"),
    }
    assert!(!client.is_closed());
}

#[test]
fn test_connection_window_overflow_is_connection_error() {
    let mut client = client_with_raw_server(vec![]);
    let err = client
        .recv(&encode(&[window_update(0, 0x7fff_ffff)]))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::FlowControlError);
    assert!(client.is_closed());
}
