//! Tests for the connection preface, SETTINGS exchange and PING

use bytes::Bytes;
use h2_engine::frame::{Frame, Setting};
use h2_engine::{
    Connection, ConnectionConfig, ConnectionState, ErrorCode, Event, H2Header, Role, Settings, CONNECTION_PREFACE,
};

use crate::support::{connected, connected_with, decode, drain_events, output_frames, pump, request, status};

#[test]
fn test_client_starts_with_preface_and_settings() {
    let mut client = Connection::client();
    let bytes = client.poll_output().unwrap();
    assert!(bytes.starts_with(CONNECTION_PREFACE));

    let frames = decode(&bytes);
    assert_eq!(frames.len(), 1);
    match &frames[0] {
        Frame::Settings(settings) => {
            assert!(!settings.ack);
            assert!(settings.settings.is_empty());
        }
        _ => panic!("Expected SETTINGS frame"),
    }
}

#[test]
fn test_server_sends_settings_without_preface() {
    let config = ConnectionConfig::server().settings(Settings::builder().max_concurrent_streams(100).build());
    let mut server = Connection::new(config).unwrap();
    assert_eq!(server.role(), Role::Server);

    let bytes = server.poll_output().unwrap();
    assert!(!bytes.starts_with(CONNECTION_PREFACE));
    match &decode(&bytes)[0] {
        Frame::Settings(settings) => assert_eq!(settings.settings, vec![Setting::MaxConcurrentStreams(100)]),
        _ => panic!("Expected SETTINGS frame"),
    }
}

#[test]
fn test_settings_exchange() {
    let client_config = ConnectionConfig::client().settings(
        Settings::builder()
            .max_concurrent_streams(10)
            .initial_window_size(1 << 20)
            .build(),
    );
    let mut client = Connection::new(client_config).unwrap();
    let mut server = Connection::server();
    pump(&mut client, &mut server);

    assert_eq!(server.peer_settings().max_concurrent_streams, Some(10));
    assert_eq!(server.peer_settings().initial_window_size, 1 << 20);
    assert_eq!(client.local_settings().initial_window_size, 1 << 20);

    let events = drain_events(&mut server);
    match &events[0] {
        Event::Settings(settings) => assert_eq!(settings.max_concurrent_streams, Some(10)),
        _ => panic!("Expected Settings event"),
    }
    assert!(events.contains(&Event::SettingsAcknowledged));
    assert!(drain_events(&mut client).contains(&Event::SettingsAcknowledged));
    assert_eq!(client.state(), ConnectionState::Open);
    assert_eq!(server.state(), ConnectionState::Open);
}

#[test]
fn test_local_settings_wait_for_ack() {
    let (mut client, mut server) = connected();
    client
        .update_settings(Settings::builder().max_frame_size(32768).build())
        .unwrap();
    assert_eq!(client.local_settings().max_frame_size, 16384);

    pump(&mut client, &mut server);
    assert_eq!(client.local_settings().max_frame_size, 32768);
    assert_eq!(server.peer_settings().max_frame_size, 32768);
    drain_events(&mut client);

    // The server may now use the larger frame size.
    let id = client.open_stream(&request("/big"), true).unwrap();
    pump(&mut client, &mut server);
    server.send_headers(id, &status("200"), false).unwrap();
    server.send_data(id, Bytes::from(vec![7u8; 30000]), true).unwrap();
    pump(&mut client, &mut server);

    let data: Vec<_> = drain_events(&mut client)
        .into_iter()
        .filter_map(|event| match event {
            Event::Data { data, .. } => Some(data.len()),
            _ => None,
        })
        .collect();
    assert_eq!(data, vec![30000]);
}

#[test]
fn test_settings_timeout_fails_connection() {
    let (mut client, _server) = connected();
    client.handle_settings_timeout().unwrap();

    client
        .update_settings(Settings::builder().enable_push(false).build())
        .unwrap();
    client.poll_output();
    let err = client.handle_settings_timeout().unwrap_err();
    assert_eq!(err.code(), ErrorCode::SettingsTimeout);
    assert!(client.is_closed());

    let frames = output_frames(&mut client);
    match frames.last() {
        Some(Frame::GoAway(goaway)) => assert_eq!(goaway.error_code, ErrorCode::SettingsTimeout),
        _ => panic!("Expected GOAWAY frame"),
    }
    match drain_events(&mut client).last() {
        Some(Event::ConnectionError(err)) => assert_eq!(err.code(), ErrorCode::SettingsTimeout),
        _ => panic!("Expected ConnectionError event"),
    }
}

#[test]
fn test_zero_header_table_size() {
    let client_config = ConnectionConfig::client().settings(Settings::builder().header_table_size(0).build());
    let (mut client, mut server) = connected_with(client_config, ConnectionConfig::server());

    for path in ["/a", "/b", "/c"] {
        let id = client.open_stream(&request(path), true).unwrap();
        pump(&mut client, &mut server);
        let response = [H2Header::new(":status", "200"), H2Header::new("x-path", path.to_string())];
        server.send_headers(id, &response, true).unwrap();
        pump(&mut client, &mut server);

        match &drain_events(&mut client)[0] {
            Event::Headers { headers, end_stream, .. } => {
                assert!(end_stream);
                assert_eq!(headers[1].value, path);
            }
            _ => panic!("Expected Headers event"),
        }
    }
    assert!(!client.is_closed());
}

#[test]
fn test_ping_round_trip() {
    let (mut client, mut server) = connected();
    client.ping(*b"12345678").unwrap();
    pump(&mut client, &mut server);

    assert_eq!(drain_events(&mut server), vec![Event::Ping(*b"12345678")]);
    assert_eq!(drain_events(&mut client), vec![Event::Pong(*b"12345678")]);

    server.ping([9; 8]).unwrap();
    pump(&mut client, &mut server);
    assert_eq!(drain_events(&mut server), vec![Event::Pong([9; 8])]);
}
