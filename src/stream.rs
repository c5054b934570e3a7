//! Stream lifecycle (RFC 7540 Section 5.1) and the per-connection stream arena.
//!
//! Transitions return a bare [`ErrorKind`]; the connection decides whether a
//! failure is a local error, a stream error or a connection error.

use std::collections::{HashMap, VecDeque};

use crate::error::{ErrorCode, ErrorKind};
use crate::flow_control::{FlowWindow, RecvWindow};
use crate::frame::{PrioritySpec, MAX_STREAM_ID};

/// Stream state as defined in RFC 7540 Section 5.1.
///
/// ```text
/// Idle --H--> Open --ES(local)--> HalfClosedLocal --ES(remote)--> Closed
///               \---ES(remote)--> HalfClosedRemote --ES(local)--> Closed
/// Idle --PP(send)--> ReservedLocal --H(send)--> HalfClosedRemote
/// Idle --PP(recv)--> ReservedRemote --H(recv)--> HalfClosedLocal
/// any  --RST_STREAM--> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamState {
    Idle,
    ReservedLocal,
    ReservedRemote,
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed,
}

impl StreamState {
    /// May we send DATA?
    pub fn can_send(&self) -> bool {
        matches!(self, Self::Open | Self::HalfClosedRemote)
    }

    /// May the peer send DATA?
    pub fn can_recv(&self) -> bool {
        matches!(self, Self::Open | Self::HalfClosedLocal)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Counts toward SETTINGS_MAX_CONCURRENT_STREAMS.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Open | Self::HalfClosedLocal | Self::HalfClosedRemote)
    }
}

/// How a closed stream got there; decides how late frames are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCause {
    /// Both sides sent END_STREAM.
    EndStream,
    /// We sent RST_STREAM. The peer may not have seen it yet.
    LocalReset,
    /// The peer sent RST_STREAM.
    RemoteReset,
}

/// One logical stream. Owned by the [`StreamStore`], never shared.
#[derive(Debug)]
pub struct Stream {
    id: u32,
    state: StreamState,
    send_window: FlowWindow,
    recv_window: RecvWindow,
    priority: PrioritySpec,
    headers_sent: bool,
    headers_received: bool,
    close_cause: Option<CloseCause>,
}

impl Stream {
    pub fn new(id: u32, send_window: u32, recv_window: u32) -> Self {
        Self {
            id,
            state: StreamState::Idle,
            send_window: FlowWindow::new(send_window),
            recv_window: RecvWindow::new(recv_window),
            priority: PrioritySpec::default(),
            headers_sent: false,
            headers_received: false,
            close_cause: None,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn send_window(&self) -> &FlowWindow {
        &self.send_window
    }

    pub fn send_window_mut(&mut self) -> &mut FlowWindow {
        &mut self.send_window
    }

    pub fn recv_window(&self) -> &RecvWindow {
        &self.recv_window
    }

    pub fn recv_window_mut(&mut self) -> &mut RecvWindow {
        &mut self.recv_window
    }

    pub fn priority(&self) -> &PrioritySpec {
        &self.priority
    }

    pub fn set_priority(&mut self, priority: PrioritySpec) {
        self.priority = priority;
    }

    pub fn close_cause(&self) -> Option<CloseCause> {
        self.close_cause
    }

    /// Local HEADERS (initial or trailers).
    pub fn send_headers(&mut self, end_stream: bool) -> Result<(), ErrorKind> {
        self.state = match self.state {
            StreamState::Idle => StreamState::Open,
            StreamState::ReservedLocal => StreamState::HalfClosedRemote,
            StreamState::Open | StreamState::HalfClosedRemote if !self.headers_sent => self.state,
            StreamState::Open | StreamState::HalfClosedRemote if end_stream => self.state,
            StreamState::Open | StreamState::HalfClosedRemote => {
                return Err(ErrorKind::Protocol("trailers must carry END_STREAM".into()));
            }
            _ => return Err(ErrorKind::StreamClosed(self.id)),
        };
        self.headers_sent = true;
        if end_stream {
            self.end_local();
        }
        Ok(())
    }

    /// Peer HEADERS (initial or trailers).
    pub fn recv_headers(&mut self, end_stream: bool) -> Result<(), ErrorKind> {
        self.state = match self.state {
            StreamState::Idle => StreamState::Open,
            StreamState::ReservedRemote => StreamState::HalfClosedLocal,
            StreamState::Open | StreamState::HalfClosedLocal if !self.headers_received => self.state,
            StreamState::Open | StreamState::HalfClosedLocal if end_stream => self.state,
            StreamState::Open | StreamState::HalfClosedLocal => {
                return Err(ErrorKind::Protocol("second HEADERS without END_STREAM".into()));
            }
            StreamState::ReservedLocal => {
                return Err(ErrorKind::Protocol("HEADERS on locally reserved stream".into()));
            }
            StreamState::HalfClosedRemote | StreamState::Closed => return Err(ErrorKind::StreamClosed(self.id)),
        };
        self.headers_received = true;
        if end_stream {
            self.end_remote();
        }
        Ok(())
    }

    pub fn send_data(&mut self, end_stream: bool) -> Result<(), ErrorKind> {
        if !self.state.can_send() {
            return Err(ErrorKind::StreamClosed(self.id));
        }
        if end_stream {
            self.end_local();
        }
        Ok(())
    }

    pub fn recv_data(&mut self, end_stream: bool) -> Result<(), ErrorKind> {
        match self.state {
            StreamState::Open | StreamState::HalfClosedLocal => {}
            StreamState::Idle | StreamState::ReservedLocal | StreamState::ReservedRemote => {
                return Err(ErrorKind::Protocol(format!("DATA on stream {} in state {:?}", self.id, self.state)));
            }
            StreamState::HalfClosedRemote | StreamState::Closed => return Err(ErrorKind::StreamClosed(self.id)),
        }
        if end_stream {
            self.end_remote();
        }
        Ok(())
    }

    /// We sent PUSH_PROMISE for this stream.
    pub fn reserve_local(&mut self) -> Result<(), ErrorKind> {
        if self.state != StreamState::Idle {
            return Err(ErrorKind::Protocol(format!("cannot reserve stream {}", self.id)));
        }
        self.state = StreamState::ReservedLocal;
        Ok(())
    }

    /// The peer promised this stream.
    pub fn reserve_remote(&mut self) -> Result<(), ErrorKind> {
        if self.state != StreamState::Idle {
            return Err(ErrorKind::Protocol(format!("cannot reserve stream {}", self.id)));
        }
        self.state = StreamState::ReservedRemote;
        Ok(())
    }

    /// RST_STREAM in either direction, or connection teardown.
    pub fn reset(&mut self, cause: CloseCause) {
        self.state = StreamState::Closed;
        self.close_cause = Some(cause);
    }

    fn end_local(&mut self) {
        self.state = match self.state {
            StreamState::Open => StreamState::HalfClosedLocal,
            _ => self.close(),
        };
    }

    fn end_remote(&mut self) {
        self.state = match self.state {
            StreamState::Open => StreamState::HalfClosedRemote,
            _ => self.close(),
        };
    }

    fn close(&mut self) -> StreamState {
        self.close_cause = Some(CloseCause::EndStream);
        StreamState::Closed
    }
}

/// All streams of one connection, keyed by id.
///
/// Closed streams leave the map at once; their ids are remembered in a
/// bounded ring so late frames already in flight are not mistaken for
/// protocol violations.
#[derive(Debug)]
pub struct StreamStore {
    streams: HashMap<u32, Stream>,
    recently_closed: VecDeque<(u32, CloseCause)>,
    closed_capacity: usize,
    is_client: bool,
    next_local_id: u32,
    /// Highest id opened by the peer (including promised ids).
    last_peer_id: u32,
}

impl StreamStore {
    pub fn new(is_client: bool, closed_capacity: usize) -> Self {
        Self {
            streams: HashMap::new(),
            recently_closed: VecDeque::with_capacity(closed_capacity),
            closed_capacity,
            is_client,
            next_local_id: if is_client { 1 } else { 2 },
            last_peer_id: 0,
        }
    }

    /// Client-initiated ids are odd, server-initiated even.
    pub fn is_local_id(&self, id: u32) -> bool {
        (id % 2 == 1) == self.is_client
    }

    pub fn next_local_id(&self) -> u32 {
        self.next_local_id
    }

    /// Reserve the next local id.
    pub fn allocate_local_id(&mut self) -> Result<u32, ErrorKind> {
        let id = self.next_local_id;
        if id > MAX_STREAM_ID {
            return Err(ErrorKind::InvalidStreamId(id));
        }
        self.next_local_id += 2;
        Ok(id)
    }

    pub fn last_peer_id(&self) -> u32 {
        self.last_peer_id
    }

    /// A peer id above everything seen so far: a new stream.
    pub fn is_new_peer_id(&self, id: u32) -> bool {
        !self.is_local_id(id) && id > self.last_peer_id
    }

    pub fn note_peer_id(&mut self, id: u32) {
        self.last_peer_id = self.last_peer_id.max(id);
    }

    /// A local id we have not handed out yet.
    pub fn is_unused_local_id(&self, id: u32) -> bool {
        self.is_local_id(id) && id >= self.next_local_id
    }

    pub fn insert(&mut self, stream: Stream) {
        self.streams.insert(stream.id(), stream);
    }

    pub fn get(&self, id: u32) -> Option<&Stream> {
        self.streams.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Stream> {
        self.streams.get_mut(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.streams.contains_key(&id)
    }

    /// Drop a closed stream and remember how it ended.
    pub fn remove(&mut self, id: u32) -> Option<Stream> {
        let stream = self.streams.remove(&id)?;
        self.remember_closed(id, stream.close_cause().unwrap_or(CloseCause::EndStream));
        Some(stream)
    }

    /// Record a closed id that may still see frames in flight.
    pub fn remember_closed(&mut self, id: u32, cause: CloseCause) {
        if self.closed_capacity == 0 {
            return;
        }
        if self.recently_closed.len() == self.closed_capacity {
            self.recently_closed.pop_front();
        }
        self.recently_closed.push_back((id, cause));
    }

    /// How `id` closed, if it closed recently.
    pub fn recently_closed(&self, id: u32) -> Option<CloseCause> {
        self.recently_closed
            .iter()
            .rev()
            .find(|(closed, _)| *closed == id)
            .map(|(_, cause)| *cause)
    }

    /// Streams counting against the concurrency limit of one side.
    pub fn active_count(&self, local: bool) -> usize {
        self.streams
            .values()
            .filter(|s| s.state().is_active() && self.is_local_id(s.id()) == local)
            .count()
    }

    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.streams.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Apply a peer SETTINGS_INITIAL_WINDOW_SIZE change to every send window.
    pub fn adjust_send_windows(&mut self, delta: i64) -> Result<(), ErrorKind> {
        for stream in self.streams.values_mut() {
            stream.send_window_mut().adjust(delta)?;
        }
        Ok(())
    }

    /// Apply our own SETTINGS_INITIAL_WINDOW_SIZE change to every receive window.
    pub fn set_recv_targets(&mut self, target: u32) -> Result<(), ErrorKind> {
        for stream in self.streams.values_mut() {
            stream.recv_window_mut().set_target(target)?;
        }
        Ok(())
    }

    /// Reset every stream whose id satisfies `pred`, returning their ids.
    pub fn reset_where(&mut self, cause: CloseCause, pred: impl Fn(u32) -> bool) -> Vec<u32> {
        let ids: Vec<u32> = self.ids().into_iter().filter(|id| pred(*id)).collect();
        for id in &ids {
            if let Some(stream) = self.streams.get_mut(id) {
                stream.reset(cause);
            }
            self.remove(*id);
        }
        ids
    }
}

/// Error code to put in RST_STREAM for a failed transition.
pub fn reset_code(kind: &ErrorKind) -> ErrorCode {
    match kind {
        ErrorKind::StreamClosed(_) => ErrorCode::StreamClosed,
        other => other.code(),
    }
}
