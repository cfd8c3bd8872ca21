//! Framing and link-layer recovery for packet radio captures: KISS byte
//! stuffing, and IL2P frames with Reed-Solomon protected headers and
//! payloads.

pub mod il2p;
pub mod kiss;
