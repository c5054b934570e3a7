//! Sans-IO HTTP/2 connection engine.
//!
//! A [`Connection`] owns every piece of per-connection state: the frame
//! decoder, both HPACK contexts, the stream table, flow-control windows and
//! both settings sets. It never touches a socket. The caller moves bytes:
//!
//! ```text
//!  transport ──recv()──▶ Connection ──poll_event()──▶ application
//!  transport ◀─poll_output()── Connection ◀──actions── application
//! ```
//!
//! Failures follow RFC 7540 §5.4. A stream error queues RST_STREAM and an
//! [`Event::StreamError`]; the connection keeps going. A connection error
//! queues GOAWAY, closes every stream, emits [`Event::ConnectionError`] and
//! is also returned from the call that hit it. Local API misuse returns
//! [`H2Error::Local`] and writes nothing.
//!
//! Our own SETTINGS take effect when the peer acknowledges them; the peer
//! sends its ACK before any frame that relies on the new values.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::config::{ConnectionConfig, Role};
use crate::error::{ErrorCode, ErrorKind, H2Error, HpackError};
use crate::flow_control::{FlowWindow, RecvWindow};
use crate::frame::{
    frame_type, ContinuationFrame, DataFrame, Frame, GoAwayFrame, HeadersFrame, PingFrame, PriorityFrame,
    PrioritySpec, PushPromiseFrame, RstStreamFrame, SettingsFrame, WindowUpdateFrame,
};
use crate::h2_codec::{H2Codec, CONNECTION_PREFACE};
use crate::hpack::{H2Header, HpackDecoder, HpackEncoder};
use crate::settings::{Settings, DEFAULT_INITIAL_WINDOW_SIZE};
use crate::stream::{reset_code, CloseCause, Stream, StreamState, StreamStore};

/// Something the application should know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A complete, decoded header block (request, response or trailers).
    Headers {
        stream_id: u32,
        headers: Vec<H2Header>,
        end_stream: bool,
    },
    Data {
        stream_id: u32,
        data: Bytes,
        end_stream: bool,
    },
    /// The peer reserved `promised_stream_id` for a pushed response.
    PushPromise {
        stream_id: u32,
        promised_stream_id: u32,
        headers: Vec<H2Header>,
    },
    StreamStateChanged { stream_id: u32, state: StreamState },
    /// A stream was reset; `remote` when the peer did it (or refused it via GOAWAY).
    StreamReset {
        stream_id: u32,
        error_code: ErrorCode,
        remote: bool,
    },
    /// We reset a stream because the peer misbehaved on it.
    StreamError(H2Error),
    /// The peer granted more send capacity. Stream 0 is the connection.
    WindowUpdate { stream_id: u32, increment: u32 },
    /// The peer's settings changed; already applied and acknowledged.
    Settings(Settings),
    SettingsAcknowledged,
    /// The peer pinged us; the ACK is already queued.
    Ping([u8; 8]),
    Pong([u8; 8]),
    GoAway {
        last_stream_id: u32,
        error_code: ErrorCode,
        debug_data: Bytes,
    },
    /// The connection failed and is now closed.
    ConnectionError(H2Error),
}

/// Coarse connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    /// The peer sent GOAWAY.
    RemoteDraining,
    /// We sent GOAWAY.
    LocalDraining,
    Closed,
}

/// One HTTP/2 connection, client or server side.
#[derive(Debug)]
pub struct Connection {
    config: ConnectionConfig,
    codec: H2Codec,
    encoder: HpackEncoder,
    decoder: HpackDecoder,
    /// Settings the peer has acknowledged.
    local_settings: Settings,
    /// Sent but not yet acknowledged, oldest first.
    unacked_settings: VecDeque<Settings>,
    peer_settings: Settings,
    peer_settings_received: bool,
    streams: StreamStore,
    send_window: FlowWindow,
    recv_window: RecvWindow,
    goaway_sent: Option<u32>,
    goaway_received: Option<u32>,
    closed: bool,
    output: BytesMut,
    events: VecDeque<Event>,
}

impl Connection {
    /// Build a connection; the preface (client) and our SETTINGS are queued at once.
    pub fn new(config: ConnectionConfig) -> Result<Self, H2Error> {
        config.settings.validate()?;
        Ok(Self::with_config(config))
    }

    pub fn client() -> Self {
        Self::with_config(ConnectionConfig::client())
    }

    pub fn server() -> Self {
        Self::with_config(ConnectionConfig::server())
    }

    fn with_config(config: ConnectionConfig) -> Self {
        let codec = match config.role {
            Role::Client => H2Codec::new(),
            Role::Server => H2Codec::server(),
        }
        .with_max_header_block_size(config.max_header_block_size);

        let mut encoder = HpackEncoder::new();
        encoder.set_use_huffman(config.use_huffman);
        encoder.set_size_limit(config.max_encoder_table_size);

        let mut conn = Self {
            codec,
            encoder,
            decoder: HpackDecoder::new(),
            local_settings: Settings::default(),
            unacked_settings: VecDeque::new(),
            peer_settings: Settings::default(),
            peer_settings_received: false,
            streams: StreamStore::new(config.role == Role::Client, config.closed_stream_grace),
            send_window: FlowWindow::new(DEFAULT_INITIAL_WINDOW_SIZE),
            recv_window: RecvWindow::with_initial(DEFAULT_INITIAL_WINDOW_SIZE, config.initial_connection_window_size),
            goaway_sent: None,
            goaway_received: None,
            closed: false,
            output: BytesMut::new(),
            events: VecDeque::new(),
            config,
        };

        if conn.config.role == Role::Client {
            conn.output.extend_from_slice(CONNECTION_PREFACE);
        }
        let initial = conn.config.settings.clone();
        conn.send_settings(initial);
        if let Some(increment) = conn.recv_window.take_update(true) {
            conn.write_frame(&Frame::WindowUpdate(WindowUpdateFrame::new(0, increment)));
        }
        conn
    }

    // ------------------------------------------------------------------
    // Byte and event plumbing
    // ------------------------------------------------------------------

    /// Feed bytes read from the transport.
    ///
    /// Stream errors are handled internally and reported as events. A
    /// connection error is returned after GOAWAY has been queued.
    pub fn recv(&mut self, data: &[u8]) -> Result<(), H2Error> {
        self.ensure_open()?;
        self.codec.feed(data);
        while !self.closed {
            let frame = match self.codec.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => {
                    self.handle_error(err)?;
                    continue;
                }
            };
            if let Err(err) = self.handle_frame(frame) {
                self.handle_error(err)?;
            }
        }
        Ok(())
    }

    /// Bytes to write to the transport, if any are queued.
    pub fn poll_output(&mut self) -> Option<Bytes> {
        if self.output.is_empty() {
            return None;
        }
        Some(self.output.split().freeze())
    }

    pub fn has_output(&self) -> bool {
        !self.output.is_empty()
    }

    pub fn poll_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn role(&self) -> Role {
        self.config.role
    }

    pub fn state(&self) -> ConnectionState {
        if self.closed {
            ConnectionState::Closed
        } else if self.goaway_sent.is_some() {
            ConnectionState::LocalDraining
        } else if self.goaway_received.is_some() {
            ConnectionState::RemoteDraining
        } else {
            ConnectionState::Open
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// State of any stream id. Ids already used and forgotten report `Closed`.
    pub fn stream_state(&self, stream_id: u32) -> StreamState {
        if let Some(stream) = self.streams.get(stream_id) {
            return stream.state();
        }
        let used = if self.streams.is_local_id(stream_id) {
            stream_id < self.streams.next_local_id()
        } else {
            stream_id <= self.streams.last_peer_id()
        };
        if stream_id != 0 && used {
            StreamState::Closed
        } else {
            StreamState::Idle
        }
    }

    /// DATA bytes that may be sent on `stream_id` right now.
    pub fn send_capacity(&self, stream_id: u32) -> usize {
        self.streams
            .get(stream_id)
            .map_or(0, |s| s.send_window().capacity().min(self.send_window.capacity()))
    }

    /// Settings in force for what the peer sends us.
    pub fn local_settings(&self) -> &Settings {
        &self.local_settings
    }

    pub fn peer_settings(&self) -> &Settings {
        &self.peer_settings
    }

    /// Ids of streams that are not yet closed, ascending.
    pub fn active_streams(&self) -> Vec<u32> {
        self.streams.ids()
    }

    // ------------------------------------------------------------------
    // Application actions
    // ------------------------------------------------------------------

    /// Start a new request stream (client only). Returns its id.
    pub fn open_stream(&mut self, headers: &[H2Header], end_stream: bool) -> Result<u32, H2Error> {
        self.ensure_open()?;
        if self.config.role != Role::Client {
            return Err(H2Error::local(ErrorKind::Protocol(
                "servers open streams with push_promise".into(),
            )));
        }
        let id = self.streams.next_local_id();
        self.check_going_away(id)?;
        if let Some(max) = self.peer_settings.max_concurrent_streams {
            if self.streams.active_count(true) >= max as usize {
                return Err(H2Error::local(ErrorKind::RefusedStream));
            }
        }
        self.check_outgoing_headers(headers)?;

        let id = self.streams.allocate_local_id().map_err(H2Error::local)?;
        let mut stream = self.new_stream(id);
        stream.send_headers(end_stream).map_err(H2Error::local)?;
        debug!(stream_id = id, end_stream, "stream opened");
        self.streams.insert(stream);

        let block = Bytes::from(self.encoder.encode(headers));
        self.write_headers(id, block, end_stream);
        self.after_transition(id, StreamState::Idle);
        Ok(id)
    }

    /// Send response headers or trailers on an existing stream.
    pub fn send_headers(&mut self, stream_id: u32, headers: &[H2Header], end_stream: bool) -> Result<(), H2Error> {
        self.ensure_open()?;
        self.check_outgoing_headers(headers)?;
        let stream = self.stream_mut(stream_id)?;
        let before = stream.state();
        stream.send_headers(end_stream).map_err(H2Error::local)?;

        let block = Bytes::from(self.encoder.encode(headers));
        self.write_headers(stream_id, block, end_stream);
        self.after_transition(stream_id, before);
        Ok(())
    }

    /// Send DATA. All of `data` is sent or none of it.
    ///
    /// Fails with a local flow-control error when `data` exceeds
    /// [`send_capacity`](Self::send_capacity).
    pub fn send_data(&mut self, stream_id: u32, data: Bytes, end_stream: bool) -> Result<(), H2Error> {
        self.ensure_open()?;
        let connection_capacity = self.send_window.capacity();
        let stream = self.stream_mut(stream_id)?;
        if !stream.state().can_send() {
            return Err(H2Error::local(ErrorKind::StreamClosed(stream_id)));
        }
        let available = connection_capacity.min(stream.send_window().capacity());
        if data.len() > available {
            return Err(H2Error::local(ErrorKind::FlowControl {
                requested: data.len(),
                available: available as i64,
            }));
        }

        let before = stream.state();
        let len = data.len() as u32;
        stream.send_window_mut().consume(len).map_err(H2Error::local)?;
        stream.send_data(end_stream).map_err(H2Error::local)?;
        self.send_window.consume(len).map_err(H2Error::local)?;

        self.write_data(stream_id, data, end_stream);
        self.after_transition(stream_id, before);
        Ok(())
    }

    /// Reserve a pushed stream associated with `stream_id` (server only).
    pub fn push_promise(&mut self, stream_id: u32, headers: &[H2Header]) -> Result<u32, H2Error> {
        self.ensure_open()?;
        if self.config.role != Role::Server {
            return Err(H2Error::local(ErrorKind::Protocol("only servers can push".into())));
        }
        if !self.peer_settings.enable_push {
            return Err(H2Error::local(ErrorKind::Protocol("peer disabled server push".into())));
        }
        let promised = self.streams.next_local_id();
        self.check_going_away(promised)?;
        self.check_outgoing_headers(headers)?;
        match self.streams.get(stream_id).map(Stream::state) {
            Some(StreamState::Open | StreamState::HalfClosedRemote) => {}
            _ => return Err(H2Error::local(ErrorKind::StreamClosed(stream_id))),
        }

        let promised = self.streams.allocate_local_id().map_err(H2Error::local)?;
        let mut stream = self.new_stream(promised);
        stream.reserve_local().map_err(H2Error::local)?;
        debug!(stream_id, promised_stream_id = promised, "push promised");
        self.streams.insert(stream);

        let block = Bytes::from(self.encoder.encode(headers));
        self.write_push_promise(stream_id, promised, block);
        self.after_transition(promised, StreamState::Idle);
        Ok(promised)
    }

    pub fn reset_stream(&mut self, stream_id: u32, error_code: ErrorCode) -> Result<(), H2Error> {
        self.ensure_open()?;
        let stream = self.stream_mut(stream_id)?;
        stream.reset(CloseCause::LocalReset);
        self.streams.remove(stream_id);
        debug!(stream_id, %error_code, "stream reset");

        self.write_frame(&Frame::RstStream(RstStreamFrame::new(stream_id, error_code)));
        self.events.push_back(Event::StreamReset {
            stream_id,
            error_code,
            remote: false,
        });
        self.events.push_back(Event::StreamStateChanged {
            stream_id,
            state: StreamState::Closed,
        });
        Ok(())
    }

    pub fn ping(&mut self, data: [u8; 8]) -> Result<(), H2Error> {
        self.ensure_open()?;
        self.write_frame(&Frame::Ping(PingFrame { ack: false, data }));
        Ok(())
    }

    /// Send GOAWAY naming the highest stream the peer opened.
    pub fn goaway(&mut self, error_code: ErrorCode, debug_data: impl Into<Bytes>) -> Result<(), H2Error> {
        let last_stream_id = self.streams.last_peer_id();
        self.goaway_with_last_stream_id(last_stream_id, error_code, debug_data)
    }

    /// Send GOAWAY with an explicit last stream id.
    ///
    /// Streams above the id may no longer be opened from either side. A
    /// second GOAWAY can lower the id but never raise it.
    pub fn goaway_with_last_stream_id(
        &mut self,
        last_stream_id: u32,
        error_code: ErrorCode,
        debug_data: impl Into<Bytes>,
    ) -> Result<(), H2Error> {
        self.ensure_open()?;
        let last_stream_id = self.goaway_sent.map_or(last_stream_id, |prev| prev.min(last_stream_id));
        debug!(last_stream_id, %error_code, "sending GOAWAY");
        self.write_frame(&Frame::GoAway(GoAwayFrame {
            last_stream_id,
            error_code,
            debug_data: debug_data.into(),
        }));
        self.goaway_sent = Some(last_stream_id);
        Ok(())
    }

    /// Advertise new local settings. They apply once acknowledged.
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), H2Error> {
        self.ensure_open()?;
        settings.validate()?;
        self.send_settings(settings);
        Ok(())
    }

    /// Hand `len` consumed bytes of `stream_id` back to the peer.
    ///
    /// Only needed with `auto_window_update` disabled. Unknown or finished
    /// streams still release connection-level capacity.
    pub fn release_capacity(&mut self, stream_id: u32, len: usize) -> Result<(), H2Error> {
        self.ensure_open()?;
        let len = u32::try_from(len).unwrap_or(u32::MAX);
        let increment = self
            .streams
            .get_mut(stream_id)
            .filter(|s| s.state().can_recv())
            .and_then(|s| s.recv_window_mut().release(len));
        if let Some(increment) = increment {
            self.write_frame(&Frame::WindowUpdate(WindowUpdateFrame::new(stream_id, increment)));
        }
        self.release_connection_capacity(len);
        Ok(())
    }

    /// Call when the caller's SETTINGS ACK timer fires.
    ///
    /// Fails the connection with SETTINGS_TIMEOUT if a SETTINGS frame is
    /// still unacknowledged; otherwise does nothing.
    pub fn handle_settings_timeout(&mut self) -> Result<(), H2Error> {
        if self.closed || self.unacked_settings.is_empty() {
            return Ok(());
        }
        let err = H2Error::connection(ErrorKind::SettingsTimeout);
        self.fail(err.clone());
        Err(err)
    }

    // ------------------------------------------------------------------
    // Inbound frames
    // ------------------------------------------------------------------

    fn handle_frame(&mut self, frame: Frame) -> Result<(), H2Error> {
        if !self.peer_settings_received && !matches!(&frame, Frame::Settings(s) if !s.ack) {
            return Err(H2Error::protocol(format!(
                "expected SETTINGS as first frame, got {}",
                frame_type::name(frame.frame_type())
            )));
        }

        match frame {
            Frame::Data(f) => self.on_data(f),
            Frame::Headers(f) => self.on_headers(f),
            Frame::Priority(f) => {
                self.on_priority(f);
                Ok(())
            }
            Frame::RstStream(f) => self.on_rst_stream(f),
            Frame::Settings(f) => self.on_settings(f),
            Frame::PushPromise(f) => self.on_push_promise(f),
            Frame::Ping(f) => {
                self.on_ping(f);
                Ok(())
            }
            Frame::GoAway(f) => {
                self.on_goaway(f);
                Ok(())
            }
            Frame::WindowUpdate(f) => self.on_window_update(f),
            // The codec folds CONTINUATION into the block it continues.
            Frame::Continuation(f) => Err(H2Error::protocol(format!(
                "unexpected CONTINUATION on stream {}",
                f.stream_id
            ))),
        }
    }

    fn on_data(&mut self, frame: DataFrame) -> Result<(), H2Error> {
        let id = frame.stream_id;
        let len = frame.flow_controlled_len;
        self.recv_window.receive(len).map_err(H2Error::connection)?;

        let Some(stream) = self.streams.get_mut(id) else {
            self.release_connection_capacity(len);
            return self.on_missing_stream(id, frame_type::DATA);
        };
        let before = stream.state();
        let received = if before.can_recv() {
            stream
                .recv_window_mut()
                .receive(len)
                .and_then(|()| stream.recv_data(frame.end_stream))
        } else {
            stream.recv_data(frame.end_stream)
        };
        if let Err(kind) = received {
            self.release_connection_capacity(len);
            return Err(H2Error::stream_with(id, reset_code(&kind), kind));
        }

        let auto = self.config.auto_window_update;
        let replenish = if auto && stream.state().can_recv() {
            stream.recv_window_mut().release(len)
        } else {
            None
        };
        if let Some(increment) = replenish {
            self.write_frame(&Frame::WindowUpdate(WindowUpdateFrame::new(id, increment)));
        }
        if auto {
            self.release_connection_capacity(len);
        }

        self.events.push_back(Event::Data {
            stream_id: id,
            data: frame.data,
            end_stream: frame.end_stream,
        });
        self.after_transition(id, before);
        Ok(())
    }

    fn on_headers(&mut self, frame: HeadersFrame) -> Result<(), H2Error> {
        let id = frame.stream_id;
        // Always decode: the HPACK context must track every block.
        let headers = self.decoder.decode(&frame.header_block)?;

        if self.streams.contains(id) {
            return self.on_stream_headers(frame, headers);
        }
        if self.streams.is_new_peer_id(id) {
            return self.open_remote_stream(frame, headers);
        }
        if self.streams.is_unused_local_id(id) {
            return Err(H2Error::protocol(format!("HEADERS on idle stream {id}")));
        }
        match self.streams.recently_closed(id) {
            Some(CloseCause::LocalReset) => {
                trace!(stream_id = id, "discarding HEADERS on reset stream");
                Ok(())
            }
            Some(_) => Err(H2Error::stream(id, ErrorKind::StreamClosed(id))),
            None if self.streams.is_local_id(id) => Err(H2Error::stream(id, ErrorKind::StreamClosed(id))),
            None => Err(H2Error::protocol(format!(
                "HEADERS on stream {id} below last opened stream {}",
                self.streams.last_peer_id()
            ))),
        }
    }

    fn on_stream_headers(&mut self, frame: HeadersFrame, headers: Vec<H2Header>) -> Result<(), H2Error> {
        let id = frame.stream_id;
        check_priority(id, frame.priority)?;
        check_incoming_headers(id, &headers)?;
        let Some(stream) = self.streams.get_mut(id) else {
            return Ok(());
        };
        let before = stream.state();
        if let Some(priority) = frame.priority {
            stream.set_priority(priority);
        }
        stream
            .recv_headers(frame.end_stream)
            .map_err(|kind| H2Error::stream_with(id, reset_code(&kind), kind))?;

        self.events.push_back(Event::Headers {
            stream_id: id,
            headers,
            end_stream: frame.end_stream,
        });
        self.after_transition(id, before);
        Ok(())
    }

    fn open_remote_stream(&mut self, frame: HeadersFrame, headers: Vec<H2Header>) -> Result<(), H2Error> {
        let id = frame.stream_id;
        if self.config.role == Role::Client {
            return Err(H2Error::protocol(format!("server opened stream {id} without PUSH_PROMISE")));
        }
        self.streams.note_peer_id(id);
        if let Some(last) = self.goaway_sent.filter(|last| id > *last) {
            debug!(stream_id = id, last_stream_id = last, "ignoring stream opened after GOAWAY");
            self.streams.remember_closed(id, CloseCause::LocalReset);
            return Ok(());
        }
        check_priority(id, frame.priority)?;
        check_incoming_headers(id, &headers)?;
        if let Some(max) = self.local_settings.max_concurrent_streams {
            if self.streams.active_count(false) >= max as usize {
                return Err(H2Error::stream(id, ErrorKind::RefusedStream));
            }
        }

        let mut stream = self.new_stream(id);
        if let Some(priority) = frame.priority {
            stream.set_priority(priority);
        }
        stream
            .recv_headers(frame.end_stream)
            .map_err(|kind| H2Error::stream_with(id, reset_code(&kind), kind))?;
        debug!(stream_id = id, end_stream = frame.end_stream, "stream opened by peer");
        self.streams.insert(stream);

        self.events.push_back(Event::Headers {
            stream_id: id,
            headers,
            end_stream: frame.end_stream,
        });
        self.after_transition(id, StreamState::Idle);
        Ok(())
    }

    fn on_push_promise(&mut self, frame: PushPromiseFrame) -> Result<(), H2Error> {
        let headers = self.decoder.decode(&frame.header_block)?;
        let associated = frame.stream_id;
        let promised = frame.promised_stream_id;

        if self.config.role == Role::Server {
            return Err(H2Error::protocol("PUSH_PROMISE sent by a client"));
        }
        if !self.local_settings.enable_push {
            return Err(H2Error::protocol("PUSH_PROMISE while push is disabled"));
        }
        if !self.streams.is_new_peer_id(promised) {
            return Err(H2Error::protocol(format!("invalid promised stream id {promised}")));
        }
        self.streams.note_peer_id(promised);

        match self.streams.get(associated).map(Stream::state) {
            Some(StreamState::Open | StreamState::HalfClosedLocal) => {}
            _ if self.streams.recently_closed(associated) == Some(CloseCause::LocalReset) => {
                return Err(H2Error::stream_with(promised, ErrorCode::Cancel, ErrorKind::StreamClosed(associated)));
            }
            _ => {
                return Err(H2Error::protocol(format!(
                    "PUSH_PROMISE on stream {associated} that is not open"
                )));
            }
        }
        check_incoming_headers(promised, &headers)?;

        let mut stream = self.new_stream(promised);
        stream.reserve_remote().map_err(H2Error::connection)?;
        debug!(stream_id = associated, promised_stream_id = promised, "push promise received");
        self.streams.insert(stream);

        self.events.push_back(Event::PushPromise {
            stream_id: associated,
            promised_stream_id: promised,
            headers,
        });
        self.after_transition(promised, StreamState::Idle);
        Ok(())
    }

    fn on_priority(&mut self, frame: PriorityFrame) {
        // Recorded only; scheduling is left to the caller.
        if let Some(stream) = self.streams.get_mut(frame.stream_id) {
            stream.set_priority(frame.priority);
        }
    }

    fn on_rst_stream(&mut self, frame: RstStreamFrame) -> Result<(), H2Error> {
        let id = frame.stream_id;
        let Some(stream) = self.streams.get_mut(id) else {
            return self.on_missing_stream(id, frame_type::RST_STREAM);
        };
        stream.reset(CloseCause::RemoteReset);
        self.streams.remove(id);
        debug!(stream_id = id, error_code = %frame.error_code, "stream reset by peer");

        self.events.push_back(Event::StreamReset {
            stream_id: id,
            error_code: frame.error_code,
            remote: true,
        });
        self.events.push_back(Event::StreamStateChanged {
            stream_id: id,
            state: StreamState::Closed,
        });
        Ok(())
    }

    fn on_settings(&mut self, frame: SettingsFrame) -> Result<(), H2Error> {
        if frame.ack {
            let Some(acked) = self.unacked_settings.pop_front() else {
                warn!("SETTINGS ACK without outstanding SETTINGS");
                return Ok(());
            };
            self.apply_local_settings(acked)?;
            self.events.push_back(Event::SettingsAcknowledged);
            return Ok(());
        }

        let mut next = self.peer_settings.clone();
        for setting in frame.settings {
            next.apply(setting)?;
        }
        let delta = i64::from(next.initial_window_size) - i64::from(self.peer_settings.initial_window_size);
        if delta != 0 {
            self.streams.adjust_send_windows(delta).map_err(H2Error::connection)?;
        }
        if next.header_table_size != self.peer_settings.header_table_size {
            self.encoder.apply_peer_table_size(next.header_table_size as usize);
        }
        debug!(settings = ?next, "peer settings applied");
        self.peer_settings = next;
        self.peer_settings_received = true;

        self.write_frame(&Frame::Settings(SettingsFrame::ack()));
        self.events.push_back(Event::Settings(self.peer_settings.clone()));
        Ok(())
    }

    fn on_ping(&mut self, frame: PingFrame) {
        if frame.ack {
            self.events.push_back(Event::Pong(frame.data));
        } else {
            self.write_frame(&Frame::Ping(PingFrame {
                ack: true,
                data: frame.data,
            }));
            self.events.push_back(Event::Ping(frame.data));
        }
    }

    fn on_goaway(&mut self, frame: GoAwayFrame) {
        let last = self
            .goaway_received
            .map_or(frame.last_stream_id, |prev| prev.min(frame.last_stream_id));
        debug!(last_stream_id = last, error_code = %frame.error_code, "GOAWAY received");
        self.goaway_received = Some(last);
        self.events.push_back(Event::GoAway {
            last_stream_id: frame.last_stream_id,
            error_code: frame.error_code,
            debug_data: frame.debug_data,
        });

        // Local streams above `last` were never processed; they may be retried.
        let is_client = self.config.role == Role::Client;
        let refused = self
            .streams
            .reset_where(CloseCause::RemoteReset, |id| (id % 2 == 1) == is_client && id > last);
        for stream_id in refused {
            self.events.push_back(Event::StreamReset {
                stream_id,
                error_code: ErrorCode::RefusedStream,
                remote: true,
            });
            self.events.push_back(Event::StreamStateChanged {
                stream_id,
                state: StreamState::Closed,
            });
        }
    }

    fn on_window_update(&mut self, frame: WindowUpdateFrame) -> Result<(), H2Error> {
        let id = frame.stream_id;
        if id == 0 {
            self.send_window.increase(frame.increment).map_err(H2Error::connection)?;
        } else {
            let Some(stream) = self.streams.get_mut(id) else {
                return self.on_missing_stream(id, frame_type::WINDOW_UPDATE);
            };
            stream
                .send_window_mut()
                .increase(frame.increment)
                .map_err(|kind| H2Error::stream(id, kind))?;
        }
        self.events.push_back(Event::WindowUpdate {
            stream_id: id,
            increment: frame.increment,
        });
        Ok(())
    }

    /// A stream-level frame for a stream not in the table.
    fn on_missing_stream(&mut self, id: u32, ty: u8) -> Result<(), H2Error> {
        if self.streams.is_new_peer_id(id) || self.streams.is_unused_local_id(id) {
            return match ty {
                frame_type::DATA => {
                    // First use of a peer id closes the idle stream, so it can be reset.
                    if self.streams.is_new_peer_id(id) {
                        self.streams.note_peer_id(id);
                    }
                    Err(H2Error::stream(id, ErrorKind::Protocol(format!("DATA on idle stream {id}"))))
                }
                _ => Err(H2Error::protocol(format!("{} on idle stream {id}", frame_type::name(ty)))),
            };
        }
        match self.streams.recently_closed(id) {
            Some(CloseCause::LocalReset) => {
                trace!(stream_id = id, frame = frame_type::name(ty), "discarding frame on reset stream");
                Ok(())
            }
            _ if ty == frame_type::WINDOW_UPDATE || ty == frame_type::RST_STREAM => Ok(()),
            _ => Err(H2Error::stream(id, ErrorKind::StreamClosed(id))),
        }
    }

    // ------------------------------------------------------------------
    // Error handling
    // ------------------------------------------------------------------

    /// Stream errors are absorbed; connection errors close us and propagate.
    fn handle_error(&mut self, err: H2Error) -> Result<(), H2Error> {
        match err {
            H2Error::Stream { stream_id, code, .. } => {
                self.reset_after_error(stream_id, code);
                self.events.push_back(Event::StreamError(err));
                Ok(())
            }
            H2Error::Connection { .. } => {
                self.fail(err.clone());
                Err(err)
            }
            H2Error::Local(kind) => {
                let err = H2Error::connection(kind);
                self.fail(err.clone());
                Err(err)
            }
        }
    }

    fn reset_after_error(&mut self, stream_id: u32, error_code: ErrorCode) {
        // RST_STREAM is never sent on an idle stream.
        if self.stream_state(stream_id) == StreamState::Idle {
            warn!(stream_id, %error_code, "stream error on idle stream");
            return;
        }
        warn!(stream_id, %error_code, "resetting stream after error");
        self.write_frame(&Frame::RstStream(RstStreamFrame::new(stream_id, error_code)));
        match self.streams.get_mut(stream_id) {
            Some(stream) => {
                stream.reset(CloseCause::LocalReset);
                self.streams.remove(stream_id);
                self.events.push_back(Event::StreamStateChanged {
                    stream_id,
                    state: StreamState::Closed,
                });
            }
            None => self.streams.remember_closed(stream_id, CloseCause::LocalReset),
        }
    }

    /// Tear the connection down: GOAWAY, close every stream, notify.
    fn fail(&mut self, err: H2Error) {
        if self.closed {
            return;
        }
        warn!(error = %err, "connection error");
        let last_stream_id = self.streams.last_peer_id();
        self.write_frame(&Frame::GoAway(GoAwayFrame {
            last_stream_id,
            error_code: err.code(),
            debug_data: Bytes::from(err.kind().to_string()),
        }));
        self.goaway_sent = Some(last_stream_id);
        self.closed = true;
        self.codec.reset();

        for stream_id in self.streams.reset_where(CloseCause::LocalReset, |_| true) {
            self.events.push_back(Event::StreamStateChanged {
                stream_id,
                state: StreamState::Closed,
            });
        }
        self.events.push_back(Event::ConnectionError(err));
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn ensure_open(&self) -> Result<(), H2Error> {
        if self.closed {
            return Err(H2Error::local(ErrorKind::ConnectionClosed));
        }
        Ok(())
    }

    fn check_going_away(&self, stream_id: u32) -> Result<(), H2Error> {
        for last_stream_id in [self.goaway_sent, self.goaway_received].into_iter().flatten() {
            if stream_id > last_stream_id {
                return Err(H2Error::local(ErrorKind::GoingAway {
                    stream_id,
                    last_stream_id,
                }));
            }
        }
        Ok(())
    }

    fn check_outgoing_headers(&self, headers: &[H2Header]) -> Result<(), H2Error> {
        if let Some(bad) = headers.iter().find(|h| !h.has_valid_name()) {
            return Err(H2Error::local(ErrorKind::InvalidHeaderName(
                String::from_utf8_lossy(&bad.name).into_owned(),
            )));
        }
        if let Some(max) = self.peer_settings.max_header_list_size {
            let size: usize = headers.iter().map(H2Header::size).sum();
            if size > max as usize {
                return Err(H2Error::local(HpackError::HeaderListTooLarge { max: max as usize }));
            }
        }
        Ok(())
    }

    fn stream_mut(&mut self, stream_id: u32) -> Result<&mut Stream, H2Error> {
        if !self.streams.contains(stream_id) {
            let kind = match self.stream_state(stream_id) {
                StreamState::Idle => ErrorKind::InvalidStreamId(stream_id),
                _ => ErrorKind::StreamClosed(stream_id),
            };
            return Err(H2Error::local(kind));
        }
        self.streams
            .get_mut(stream_id)
            .ok_or(H2Error::local(ErrorKind::StreamClosed(stream_id)))
    }

    fn new_stream(&self, id: u32) -> Stream {
        Stream::new(
            id,
            self.peer_settings.initial_window_size,
            self.local_settings.initial_window_size,
        )
    }

    /// Emit a state change event and drop the stream once closed.
    fn after_transition(&mut self, stream_id: u32, before: StreamState) {
        let Some(state) = self.streams.get(stream_id).map(Stream::state) else {
            return;
        };
        if state != before {
            trace!(stream_id, ?before, ?state, "stream state changed");
            self.events.push_back(Event::StreamStateChanged { stream_id, state });
        }
        if state.is_closed() {
            debug!(stream_id, "stream closed");
            self.streams.remove(stream_id);
        }
    }

    fn send_settings(&mut self, settings: Settings) {
        let previous = self.unacked_settings.back().unwrap_or(&self.local_settings);
        let changes = settings.diff(previous);
        debug!(?changes, "sending SETTINGS");
        self.write_frame(&Frame::Settings(SettingsFrame::new(changes)));
        self.unacked_settings.push_back(settings);
    }

    fn apply_local_settings(&mut self, settings: Settings) -> Result<(), H2Error> {
        if settings.initial_window_size != self.local_settings.initial_window_size {
            self.streams
                .set_recv_targets(settings.initial_window_size)
                .map_err(H2Error::connection)?;
        }
        self.decoder.set_max_allowed_table_size(settings.header_table_size as usize);
        self.decoder
            .set_max_header_list_size(settings.max_header_list_size.map(|max| max as usize));
        self.codec.set_max_frame_size(settings.max_frame_size);
        debug!(settings = ?settings, "local settings acknowledged");
        self.local_settings = settings;
        Ok(())
    }

    fn release_connection_capacity(&mut self, len: u32) {
        if let Some(increment) = self.recv_window.release(len) {
            self.write_frame(&Frame::WindowUpdate(WindowUpdateFrame::new(0, increment)));
        }
    }

    fn write_frame(&mut self, frame: &Frame) {
        trace!(
            frame = frame_type::name(frame.frame_type()),
            stream_id = frame.stream_id(),
            "frame queued"
        );
        frame.encode(&mut self.output);
    }

    /// HEADERS plus as many CONTINUATION frames as the peer's frame size needs.
    fn write_headers(&mut self, stream_id: u32, mut block: Bytes, end_stream: bool) {
        let max = self.peer_settings.max_frame_size as usize;
        let first = block.split_to(block.len().min(max));
        let frame = HeadersFrame::new(stream_id, first, end_stream, block.is_empty());
        self.write_frame(&Frame::Headers(frame));
        self.write_continuations(stream_id, block);
    }

    fn write_push_promise(&mut self, stream_id: u32, promised_stream_id: u32, mut block: Bytes) {
        // Four bytes of the first frame carry the promised id.
        let max = self.peer_settings.max_frame_size as usize - 4;
        let first = block.split_to(block.len().min(max));
        self.write_frame(&Frame::PushPromise(PushPromiseFrame {
            stream_id,
            promised_stream_id,
            header_block: first,
            end_headers: block.is_empty(),
        }));
        self.write_continuations(stream_id, block);
    }

    fn write_continuations(&mut self, stream_id: u32, mut block: Bytes) {
        let max = self.peer_settings.max_frame_size as usize;
        while !block.is_empty() {
            let chunk = block.split_to(block.len().min(max));
            self.write_frame(&Frame::Continuation(ContinuationFrame {
                stream_id,
                header_block: chunk,
                end_headers: block.is_empty(),
            }));
        }
    }

    /// DATA split to the peer's SETTINGS_MAX_FRAME_SIZE; END_STREAM on the last frame.
    fn write_data(&mut self, stream_id: u32, mut data: Bytes, end_stream: bool) {
        let max = self.peer_settings.max_frame_size as usize;
        loop {
            let chunk = data.split_to(data.len().min(max));
            let last = data.is_empty();
            self.write_frame(&Frame::Data(DataFrame::new(stream_id, chunk, end_stream && last)));
            if last {
                break;
            }
        }
    }
}

/// Received field names must be lower-case (RFC 7540 §8.1.2).
fn check_incoming_headers(stream_id: u32, headers: &[H2Header]) -> Result<(), H2Error> {
    match headers.iter().find(|h| !h.has_valid_name()) {
        Some(bad) => Err(H2Error::stream(
            stream_id,
            ErrorKind::InvalidHeaderName(String::from_utf8_lossy(&bad.name).into_owned()),
        )),
        None => Ok(()),
    }
}

fn check_priority(stream_id: u32, priority: Option<PrioritySpec>) -> Result<(), H2Error> {
    match priority {
        Some(priority) if priority.is_self_dependent(stream_id) => Err(H2Error::stream(
            stream_id,
            ErrorKind::Protocol("stream depends on itself".into()),
        )),
        _ => Ok(()),
    }
}
