//! Read framing: turns a byte stream from a socket into discrete records.
//!
//! Beast framing must be a resumable state machine rather than a
//! `strtok`-style scanner because frames straddle socket reads (spec.md §9
//! "Escape-aware framing"). [`Framer`] owns a residual buffer and is fed
//! successive `read()` chunks via [`Framer::push`]; each call drains as many
//! complete records as the buffer currently holds and carries any partial
//! tail over to the next call.
//!
//! Grounded on `adsb-core`'s existing (client-side, fixed-type) Beast framer
//! in `crates/rs1090/src/source/beast.rs`, generalized to the server-side
//! sub-records (`0xE3`/`0xE4`), garbage counting and `BEAST_COMMAND`
//! described in spec.md §4.7.

const ESC: u8 = 0x1A;

/// How a [`Service`](super::service::Service) reads its incoming byte
/// stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    Beast,
    /// Outbound-only: `{0x1A, '1', c}` Mode-A/C on/off settings.
    BeastCommand,
    Avr,
    Sbs,
    /// Newline-delimited query records (spec.md §4.7's "API" read mode).
    Api,
    /// Read-and-discard, used by output-only services.
    Ignore,
}

/// A decoded Beast sub-record.
#[derive(Debug, Clone, PartialEq)]
pub enum BeastFrame {
    ModeAc { timestamp: u64, signal: u8, payload: [u8; 2] },
    ModeSShort { timestamp: u64, signal: u8, payload: [u8; 7] },
    ModeSLong { timestamp: u64, signal: u8, payload: [u8; 14] },
    /// `0xE3`: 8 raw bytes, itself escape-aware.
    ReceiverId([u8; 8]),
    /// `0xE4`: ASCII, terminated by the next (unescaped) `0x1A`.
    Uuid(String),
}

/// One record produced by a [`Framer`], tagged by the framing mode that
/// produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Beast(BeastFrame),
    /// One line from an ASCII (AVR/SBS/API) stream, separator stripped.
    Ascii(String),
}

/// Bytes between recognized frames beyond which a client is disconnected
/// (spec.md §4.7).
pub const GARBAGE_DISCONNECT_THRESHOLD: usize = 512;

/// Escapes `0x1A` as `0x1A 0x1A`, as Beast output framing requires.
pub fn escape(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    for &b in input {
        out.push(b);
        if b == ESC {
            out.push(ESC);
        }
    }
    out
}

/// Collapses `0x1A 0x1A` into a single literal `0x1A`. Inverse of [`escape`].
pub fn unescape(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        out.push(input[i]);
        if input[i] == ESC && input.get(i + 1) == Some(&ESC) {
            i += 1;
        }
        i += 1;
    }
    out
}

fn beast_body_len(type_byte: u8) -> Option<usize> {
    match type_byte {
        b'1' => Some(9),  // 6 ts + 1 signal + 2 payload
        b'2' => Some(14), // 6 ts + 1 signal + 7 payload
        b'3' | b'4' => Some(21), // 6 ts + 1 signal + 14 payload
        _ => None,
    }
}

fn split_ts_sig(body: &[u8]) -> (u64, u8, &[u8]) {
    let mut ts = [0u8; 8];
    ts[2..8].copy_from_slice(&body[0..6]);
    (u64::from_be_bytes(ts), body[6], &body[7..])
}

/// Resumable framer. One instance per connected client/socket.
pub struct Framer {
    mode: FramingMode,
    separator: u8,
    buf: Vec<u8>,
    pub garbage_bytes: usize,
}

impl Framer {
    pub fn new(mode: FramingMode) -> Self {
        Framer { mode, separator: b'\n', buf: Vec::new(), garbage_bytes: 0 }
    }

    pub fn with_separator(mode: FramingMode, separator: u8) -> Self {
        Framer { mode, separator, buf: Vec::new(), garbage_bytes: 0 }
    }

    pub fn garbage_exceeded(&self) -> bool {
        self.garbage_bytes > GARBAGE_DISCONNECT_THRESHOLD
    }

    /// Feed newly read bytes in and drain every complete record the buffer
    /// now holds. Call repeatedly as more bytes arrive; an incomplete tail
    /// is preserved across calls.
    pub fn push(&mut self, data: &[u8]) -> Vec<Frame> {
        self.buf.extend_from_slice(data);
        match self.mode {
            FramingMode::Beast => self.drain_beast(),
            FramingMode::Avr | FramingMode::Sbs | FramingMode::Api => {
                self.drain_ascii()
            }
            FramingMode::BeastCommand | FramingMode::Ignore => {
                self.buf.clear();
                Vec::new()
            }
        }
    }

    fn drain_ascii(&mut self) -> Vec<Frame> {
        let mut out = Vec::new();
        loop {
            let Some(pos) = self.buf.iter().position(|&b| b == self.separator)
            else {
                break;
            };
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = &line[..line.len() - 1];
            let text = String::from_utf8_lossy(line).trim().to_string();
            if !text.is_empty() {
                out.push(Frame::Ascii(text));
            }
        }
        out
    }

    fn drain_beast(&mut self) -> Vec<Frame> {
        let mut out = Vec::new();
        loop {
            let Some(start) = self.buf.iter().position(|&b| b == ESC) else {
                self.garbage_bytes += self.buf.len();
                self.buf.clear();
                break;
            };
            if start > 0 {
                self.garbage_bytes += start;
                self.buf.drain(..start);
            }

            // Need at least the escape plus a type byte to proceed.
            if self.buf.len() < 2 {
                break;
            }
            let type_byte = self.buf[1];

            match type_byte {
                b'2' | b'3' | b'4' => {
                    let Some(body_len) = beast_body_len(type_byte) else {
                        unreachable!()
                    };
                    let Some((consumed, escaped_body)) =
                        collect_escaped(&self.buf[2..], body_len)
                    else {
                        break; // wait for more data
                    };
                    let (ts, signal, payload) = split_ts_sig(&escaped_body);
                    let frame = match type_byte {
                        b'2' => BeastFrame::ModeSShort {
                            timestamp: ts,
                            signal,
                            payload: payload.try_into().unwrap(),
                        },
                        _ => BeastFrame::ModeSLong {
                            timestamp: ts,
                            signal,
                            payload: payload.try_into().unwrap(),
                        },
                    };
                    self.buf.drain(..2 + consumed);
                    if type_byte != b'4' {
                        out.push(Frame::Beast(frame));
                    }
                }
                b'1' => {
                    let Some((consumed, escaped_body)) =
                        collect_escaped(&self.buf[2..], 9)
                    else {
                        break;
                    };
                    let (ts, signal, payload) = split_ts_sig(&escaped_body);
                    self.buf.drain(..2 + consumed);
                    out.push(Frame::Beast(BeastFrame::ModeAc {
                        timestamp: ts,
                        signal,
                        payload: payload.try_into().unwrap(),
                    }));
                }
                0xE3 => {
                    let Some((consumed, escaped_body)) =
                        collect_escaped(&self.buf[2..], 8)
                    else {
                        break;
                    };
                    self.buf.drain(..2 + consumed);
                    let mut id = [0u8; 8];
                    id.copy_from_slice(&escaped_body);
                    out.push(Frame::Beast(BeastFrame::ReceiverId(id)));
                }
                0xE4 => {
                    // ASCII, terminated by the next *unescaped* 0x1A.
                    let rest = &self.buf[2..];
                    let mut i = 0;
                    let mut end = None;
                    while i < rest.len() {
                        if rest[i] == ESC {
                            if rest.get(i + 1) == Some(&ESC) {
                                i += 2;
                                continue;
                            }
                            end = Some(i);
                            break;
                        }
                        i += 1;
                    }
                    let Some(end) = end else { break };
                    let raw = unescape(&rest[..end]);
                    let text = String::from_utf8_lossy(&raw).to_string();
                    self.buf.drain(..2 + end);
                    out.push(Frame::Beast(BeastFrame::Uuid(text)));
                }
                _ => {
                    // Unrecognized escape sequence: treat the escape byte
                    // itself as garbage and keep scanning.
                    self.garbage_bytes += 1;
                    self.buf.drain(..1);
                }
            }
        }
        out
    }
}

/// Consume bytes from `rest` until `target_len` *unescaped* bytes have been
/// collected, collapsing `0x1A 0x1A` along the way. Returns `(bytes consumed
/// from `rest`, unescaped body)` or `None` if `rest` runs out first.
fn collect_escaped(rest: &[u8], target_len: usize) -> Option<(usize, Vec<u8>)> {
    let mut body = Vec::with_capacity(target_len);
    let mut i = 0;
    while body.len() < target_len {
        let b = *rest.get(i)?;
        body.push(b);
        i += 1;
        if b == ESC {
            // A literal 0x1A in the payload is doubled; anything else
            // (end of stream, or a lone 0x1A) means this wasn't data.
            if rest.get(i) == Some(&ESC) {
                i += 1;
            } else {
                return None;
            }
        }
    }
    Some((i, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_unescape_roundtrip() {
        for sample in [
            vec![0x00, 0x1A, 0xFF],
            vec![0x1A, 0x1A, 0x1A],
            vec![],
            vec![1, 2, 3, 4, 5],
        ] {
            assert_eq!(unescape(&escape(&sample)), sample);
        }
    }

    #[test]
    fn escape_never_emits_lone_escape() {
        let escaped = escape(&[0x1A]);
        assert_eq!(escaped, vec![0x1A, 0x1A]);
    }

    #[test]
    fn beast_short_frame_with_embedded_escape() {
        let mut framer = Framer::new(FramingMode::Beast);
        let mut payload = vec![0x1Au8, b'2'];
        payload.extend_from_slice(&[0u8; 6]); // timestamp
        payload.push(0x10); // signal
        payload.extend_from_slice(&[0x11, 0x1A, 0x1A, 0x12, 0x13, 0x14, 0x15, 0x16]); // 7-byte payload with one literal 0x1A
        let frames = framer.push(&payload);
        assert_eq!(frames.len(), 1);
        match &frames[0] {
            Frame::Beast(BeastFrame::ModeSShort { payload, .. }) => {
                assert_eq!(payload, &[0x11, 0x1A, 0x12, 0x13, 0x14, 0x15, 0x16]);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
        assert_eq!(framer.garbage_bytes, 0);
    }

    #[test]
    fn two_frames_back_to_back_no_garbage() {
        let mut framer = Framer::new(FramingMode::Beast);
        let mut data = vec![0x1Au8, b'2'];
        data.extend_from_slice(&[0u8; 6]);
        data.push(0);
        data.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7]);
        data.push(0x1A);
        data.push(b'3');
        data.extend_from_slice(&[0u8; 6]);
        data.push(0);
        data.extend_from_slice(&[0u8; 14]);
        let frames = framer.push(&data);
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[0], Frame::Beast(BeastFrame::ModeSShort { .. })));
        assert!(matches!(frames[1], Frame::Beast(BeastFrame::ModeSLong { .. })));
        assert_eq!(framer.garbage_bytes, 0);
    }

    #[test]
    fn straddled_reads_are_resumed() {
        let mut framer = Framer::new(FramingMode::Beast);
        let mut data = vec![0x1Au8, b'2'];
        data.extend_from_slice(&[0u8; 6]);
        data.push(0);
        data.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7]);

        let (first, second) = data.split_at(10);
        assert!(framer.push(first).is_empty());
        let frames = framer.push(second);
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn garbage_between_frames_is_counted() {
        let mut framer = Framer::new(FramingMode::Beast);
        let mut data = vec![0xFFu8; 10];
        data.push(0x1A);
        data.push(b'1');
        data.extend_from_slice(&[0u8; 6]);
        data.push(0);
        data.extend_from_slice(&[1, 2]);
        let frames = framer.push(&data);
        assert_eq!(frames.len(), 1);
        assert_eq!(framer.garbage_bytes, 10);
        assert!(!framer.garbage_exceeded());
    }

    #[test]
    fn receiver_id_and_uuid_subrecords() {
        let mut framer = Framer::new(FramingMode::Beast);
        let mut data = vec![0x1Au8, 0xE3];
        data.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        data.push(0x1A);
        data.push(0xE4);
        data.extend_from_slice(b"deadbeef-0000-0000-0000-000000000000");
        data.push(0x1A);
        let frames = framer.push(&data);
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[0], Frame::Beast(BeastFrame::ReceiverId(_))));
        match &frames[1] {
            Frame::Beast(BeastFrame::Uuid(s)) => {
                assert_eq!(s, "deadbeef-0000-0000-0000-000000000000")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn ascii_lines_split_on_separator() {
        let mut framer = Framer::new(FramingMode::Avr);
        let frames = framer.push(b"*8D4840D6202CC371C32CE0576098;\n*8D4840D6202CC371C32CE0576099;\n");
        assert_eq!(frames.len(), 2);
    }
}
