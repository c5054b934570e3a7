//! Helpers shared by the connection tests.

use bytes::Bytes;
use h2_engine::frame::{DataFrame, Frame, HeadersFrame, Setting, SettingsFrame};
use h2_engine::{Connection, ConnectionConfig, Event, H2Codec, H2Header, HpackEncoder, CONNECTION_PREFACE};

pub fn drain_events(conn: &mut Connection) -> Vec<Event> {
    std::iter::from_fn(|| conn.poll_event()).collect()
}

/// Shuttle bytes both ways until neither side has anything to say.
/// Client output is always delivered first.
pub fn pump(client: &mut Connection, server: &mut Connection) {
    loop {
        let mut moved = false;
        if let Some(bytes) = client.poll_output() {
            let _ = server.recv(&bytes);
            moved = true;
        }
        if let Some(bytes) = server.poll_output() {
            let _ = client.recv(&bytes);
            moved = true;
        }
        if !moved {
            break;
        }
    }
}

/// A client and server that have exchanged and acknowledged SETTINGS.
pub fn connected_with(client: ConnectionConfig, server: ConnectionConfig) -> (Connection, Connection) {
    let mut client = Connection::new(client).unwrap();
    let mut server = Connection::new(server).unwrap();
    pump(&mut client, &mut server);
    drain_events(&mut client);
    drain_events(&mut server);
    (client, server)
}

pub fn connected() -> (Connection, Connection) {
    connected_with(ConnectionConfig::client(), ConnectionConfig::server())
}

pub fn request(path: &str) -> Vec<H2Header> {
    vec![
        H2Header::new(":method", "GET"),
        H2Header::new(":scheme", "https"),
        H2Header::new(":path", path.to_string()),
        H2Header::new(":authority", "example.com"),
    ]
}

pub fn status(code: &'static str) -> Vec<H2Header> {
    vec![H2Header::new(":status", code)]
}

pub fn encode(frames: &[Frame]) -> Vec<u8> {
    let mut buf = bytes::BytesMut::new();
    for frame in frames {
        frame.encode(&mut buf);
    }
    buf.to_vec()
}

/// Parse what a connection wrote, skipping the client preface.
pub fn decode(bytes: &[u8]) -> Vec<Frame> {
    let bytes = bytes.strip_prefix(CONNECTION_PREFACE).unwrap_or(bytes);
    let mut codec = H2Codec::new();
    codec.set_max_frame_size(16_777_215);
    codec.process(bytes).unwrap()
}

pub fn output_frames(conn: &mut Connection) -> Vec<Frame> {
    conn.poll_output().map(|bytes| decode(&bytes)).unwrap_or_default()
}

/// A header block from a fresh, Huffman-free encoder. Only literals and
/// static-table references, so it decodes regardless of table state.
pub fn headers_frame(stream_id: u32, headers: &[H2Header], end_stream: bool) -> Frame {
    let mut encoder = HpackEncoder::new();
    encoder.set_use_huffman(false);
    Frame::Headers(HeadersFrame::new(
        stream_id,
        Bytes::from(encoder.encode(headers)),
        end_stream,
        true,
    ))
}

pub fn data_frame(stream_id: u32, data: &[u8], end_stream: bool) -> Frame {
    Frame::Data(DataFrame::new(stream_id, Bytes::copy_from_slice(data), end_stream))
}

/// A server whose peer is driven by hand-built frames.
pub fn server_with_raw_client(config: ConnectionConfig) -> Connection {
    let mut server = Connection::new(config).unwrap();
    let mut bytes = CONNECTION_PREFACE.to_vec();
    bytes.extend(encode(&[
        Frame::Settings(SettingsFrame::new(vec![])),
        Frame::Settings(SettingsFrame::ack()),
    ]));
    server.recv(&bytes).unwrap();
    server.poll_output();
    drain_events(&mut server);
    server
}

/// A client whose peer is driven by hand-built frames.
pub fn client_with_raw_server(settings: Vec<Setting>) -> Connection {
    let mut client = Connection::client();
    client.poll_output();
    client
        .recv(&encode(&[
            Frame::Settings(SettingsFrame::new(settings)),
            Frame::Settings(SettingsFrame::ack()),
        ]))
        .unwrap();
    client.poll_output();
    drain_events(&mut client);
    client
}
