//! Integration tests for the connection engine, driven end to end.

mod flow_control;
mod handshake;
mod support;
