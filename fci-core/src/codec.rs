//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// Framed-message codec: the wire shape exchanged over the transport
// (`fci-daemon::transport`) before a command ever reaches the dispatch
// core. Grounded on `holo-utils::bytes`'s cursor-based TLV parsing,
// generalized here from TLV records to the fixed three-field frame the
// accelerator's message header uses.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use fci_types::Errno;

/// Maximum payload carried by a single command frame. The original
/// header's `code`/`length` fields are 32-bit for ABI parity with the
/// accelerator's message struct, but no real command ever carries more
/// than this; `CmdBody` keeps the validated value as a `u16`.
pub const MAX_PAYLOAD: usize = 256;

const TYPE_CLIENT_REGISTER: u32 = 1;
const TYPE_CLIENT_UNREGISTER: u32 = 2;
const TYPE_CMD: u32 = 3;
const TYPE_CORE_CLIENT_BROADCAST: u32 = 4;

#[derive(Debug)]
pub enum CodecError {
    UnknownTypeTag(u32),
    PayloadTooLarge(u32),
    Truncated,
}

impl CodecError {
    pub fn errno(&self) -> Errno {
        match self {
            CodecError::UnknownTypeTag(_) | CodecError::PayloadTooLarge(_) => Errno::Einval,
            CodecError::Truncated => Errno::Efault,
        }
    }
}

/// A parsed command body. `code`/`length` are the wire's 32-bit fields
/// truncated and validated into `u16`s; `full_code`/`full_length` return
/// the original 32-bit values for callers that round-trip the frame
/// unmodified (the legacy reply framing does).
#[derive(Clone, Debug)]
pub struct CmdBody {
    code: u32,
    length: u32,
    pub sender: u32,
    pub payload: Vec<u8>,
}

impl CmdBody {
    pub fn new(code: u16, sender: u32, payload: Vec<u8>) -> Self {
        Self {
            code: code as u32,
            length: payload.len() as u32,
            sender,
            payload,
        }
    }

    pub fn code(&self) -> u16 {
        self.code as u16
    }

    pub fn length(&self) -> u16 {
        self.length as u16
    }

    pub fn full_code(&self) -> u32 {
        self.code
    }

    pub fn full_length(&self) -> u32 {
        self.length
    }
}

#[derive(Debug)]
pub enum MessageRecord {
    ClientRegister { sender: u32 },
    ClientUnregister { sender: u32 },
    Cmd(CmdBody),
    CoreClientBroadcast(CmdBody),
}

/// Parses one framed message out of `buf`. The frame is
/// `type_tag: u32, code: u32, length: u32, sender: u32, payload: [u8;
/// length]`, all big-endian.
pub fn parse(mut buf: Bytes) -> Result<MessageRecord, CodecError> {
    if buf.remaining() < 4 {
        return Err(CodecError::Truncated);
    }
    let type_tag = buf.get_u32();
    match type_tag {
        TYPE_CLIENT_REGISTER | TYPE_CLIENT_UNREGISTER => {
            if buf.remaining() < 4 {
                return Err(CodecError::Truncated);
            }
            let sender = buf.get_u32();
            Ok(if type_tag == TYPE_CLIENT_REGISTER {
                MessageRecord::ClientRegister { sender }
            } else {
                MessageRecord::ClientUnregister { sender }
            })
        }
        TYPE_CMD | TYPE_CORE_CLIENT_BROADCAST => {
            if buf.remaining() < 12 {
                return Err(CodecError::Truncated);
            }
            let code = buf.get_u32();
            let length = buf.get_u32();
            let sender = buf.get_u32();
            if length as usize > MAX_PAYLOAD {
                return Err(CodecError::PayloadTooLarge(length));
            }
            if buf.remaining() < length as usize {
                return Err(CodecError::Truncated);
            }
            let payload = buf.copy_to_bytes(length as usize).to_vec();
            let body = CmdBody {
                code,
                length,
                sender,
                payload,
            };
            Ok(if type_tag == TYPE_CMD {
                MessageRecord::Cmd(body)
            } else {
                MessageRecord::CoreClientBroadcast(body)
            })
        }
        other => Err(CodecError::UnknownTypeTag(other)),
    }
}

/// Reply framing convention. `Standard` prepends a dedicated
/// errno/code/length header ahead of the payload. `Legacy` matches older
/// client libraries that never adopted that header: the return code is
/// written in place over the payload's own first two bytes, and the
/// reply is exactly as long as the payload it replaces. The original
/// source picked one of these at compile time via a macro; here it is a
/// runtime field on `Endpoint` instead.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReplyFraming {
    Standard,
    Legacy,
}

#[derive(Clone, Debug)]
pub struct ReplyRecord {
    pub errno: Errno,
    pub code: u16,
    pub payload: Vec<u8>,
}

pub fn emit(reply: &ReplyRecord, framing: ReplyFraming) -> Bytes {
    match framing {
        ReplyFraming::Standard => {
            let mut buf = BytesMut::with_capacity(8 + reply.payload.len());
            buf.put_u32(reply.errno as u32);
            buf.put_u16(reply.code);
            buf.put_u16(reply.payload.len() as u16);
            buf.put_slice(&reply.payload);
            buf.freeze()
        }
        ReplyFraming::Legacy => {
            let mut payload = reply.payload.clone();
            if payload.len() < 2 {
                payload.resize(2, 0);
            }
            payload[..2].copy_from_slice(&reply.code.to_be_bytes());
            Bytes::from(payload)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn framed_cmd(code: u32, length: u32, sender: u32, payload: &[u8]) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u32(TYPE_CMD);
        buf.put_u32(code);
        buf.put_u32(length);
        buf.put_u32(sender);
        buf.put_slice(payload);
        buf.freeze()
    }

    #[test]
    fn parses_a_well_formed_cmd_frame() {
        let frame = framed_cmd(0xf230, 4, 7, &[1, 2, 3, 4]);
        match parse(frame).unwrap() {
            MessageRecord::Cmd(body) => {
                assert_eq!(body.code(), 0xf230);
                assert_eq!(body.sender, 7);
                assert_eq!(body.payload, vec![1, 2, 3, 4]);
            }
            _ => panic!("expected Cmd"),
        }
    }

    #[test]
    fn oversized_length_is_rejected() {
        let frame = framed_cmd(0xf230, (MAX_PAYLOAD + 1) as u32, 0, &[]);
        assert!(matches!(parse(frame), Err(CodecError::PayloadTooLarge(_))));
    }

    #[test]
    fn unknown_type_tag_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32(0xdead);
        assert!(matches!(parse(buf.freeze()), Err(CodecError::UnknownTypeTag(0xdead))));
    }

    #[test]
    fn truncated_frame_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32(TYPE_CLIENT_REGISTER);
        assert!(matches!(parse(buf.freeze()), Err(CodecError::Truncated)));
    }

    #[test]
    fn legacy_framing_overwrites_payload_prefix_in_place() {
        let reply = ReplyRecord {
            errno: Errno::Ok,
            code: 0xf202,
            payload: vec![9, 9, 7, 7],
        };
        let standard = emit(&reply, ReplyFraming::Standard);
        let legacy = emit(&reply, ReplyFraming::Legacy);
        assert_eq!(standard.len(), 4 + 2 + 2 + reply.payload.len());
        assert_eq!(legacy.len(), reply.payload.len());
        assert_eq!(&legacy[..2], &0xf202u16.to_be_bytes());
        assert_eq!(&legacy[2..], &[7, 7]);
    }

    #[test]
    fn legacy_framing_pads_short_payload_to_hold_the_return_code() {
        let reply = ReplyRecord {
            errno: Errno::Ok,
            code: 5,
            payload: Vec::new(),
        };
        let legacy = emit(&reply, ReplyFraming::Legacy);
        assert_eq!(legacy.len(), 2);
        assert_eq!(&legacy[..], &5u16.to_be_bytes());
    }
}
