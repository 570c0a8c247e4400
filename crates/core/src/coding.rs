//! The coding capability consumed by sources, relays, and sinks.
//!
//! The simulation core never implements an error-correction code
//! itself; it drives one through these traits. A generation of
//! `symbols` data units is encoded into fixed-size payloads, decoders
//! accumulate rank as innovative payloads arrive, and relays can
//! recode — emit a fresh combination of whatever they have decoded so
//! far — without holding the original data.
//!
//! The [`carousel`] module provides a trivial deterministic codec used
//! by the core's own tests and handy for smoke-testing topologies; real
//! scenarios plug in an actual code (see the app crate's RLNC codec).

/// Produces one encoded payload per call.
pub trait Encoder {
    /// Write one encoded payload into `payload`.
    ///
    /// `payload.len()` must equal [`Encoder::payload_size`]; a mismatch
    /// indicates encoder misconfiguration and panics.
    fn encode(&mut self, payload: &mut [u8]);

    /// Fixed payload size agreed at construction.
    fn payload_size(&self) -> usize;

    /// Send original (uncoded) units first, before coded combinations.
    fn systematic_on(&mut self);

    /// Only send coded combinations.
    fn systematic_off(&mut self);
}

/// Consumes payloads, accumulating decoding state.
pub trait Decoder {
    /// Feed one received payload into the decoder.
    ///
    /// `payload.len()` must equal [`Decoder::payload_size`]; a mismatch
    /// indicates decoder misconfiguration and panics.
    fn decode(&mut self, payload: &[u8]);

    /// Write a fresh combination of the decoder's current state into
    /// `payload`. Legal at any rank, including zero.
    fn recode(&mut self, payload: &mut [u8]);

    /// Number of linearly independent units accumulated so far.
    /// Monotonically non-decreasing.
    fn rank(&self) -> u32;

    /// `true` once rank has reached the generation's symbol count.
    fn is_complete(&self) -> bool;

    /// Fixed payload size agreed at construction.
    fn payload_size(&self) -> usize;
}

/// Builds one encoder per source.
pub trait EncoderFactory {
    fn build(&mut self) -> Box<dyn Encoder>;
}

/// Builds one decoder per relay or sink.
pub trait DecoderFactory {
    fn build(&mut self) -> Box<dyn Decoder>;
}

pub mod carousel {
    //! A degenerate "code": payloads carry a bare symbol index.
    //!
    //! The encoder cycles through indices 0..symbols; a decoder's rank
    //! is the number of distinct indices it has seen; recoding replays
    //! seen indices round-robin. Every classification path of the real
    //! system (innovative, linearly dependent, waste) is reachable, and
    //! behavior is exactly predictable, which is what the core's tests
    //! need.

    use super::{Decoder, DecoderFactory, Encoder, EncoderFactory};

    /// Index written by a rank-zero recoder; decoders ignore it.
    const PADDING: u32 = u32::MAX;

    /// Payloads are a single little-endian u32 index.
    pub const PAYLOAD_SIZE: usize = 4;

    /// Emits symbol indices 0, 1, .., symbols-1, 0, 1, ..
    #[derive(Debug)]
    pub struct CarouselEncoder {
        symbols: u32,
        next: u32,
    }

    impl CarouselEncoder {
        pub fn new(symbols: u32) -> Self {
            assert!(symbols > 0, "generation must hold at least one symbol");
            Self { symbols, next: 0 }
        }
    }

    impl Encoder for CarouselEncoder {
        fn encode(&mut self, payload: &mut [u8]) {
            assert_eq!(payload.len(), PAYLOAD_SIZE, "payload size mismatch");
            payload.copy_from_slice(&self.next.to_le_bytes());
            self.next = (self.next + 1) % self.symbols;
        }

        fn payload_size(&self) -> usize {
            PAYLOAD_SIZE
        }

        // The carousel is systematic by construction; the toggles are
        // accepted and ignored.
        fn systematic_on(&mut self) {}
        fn systematic_off(&mut self) {}
    }

    /// Tracks which indices have been seen.
    #[derive(Debug)]
    pub struct CarouselDecoder {
        seen: Vec<bool>,
        rank: u32,
        replay_cursor: usize,
    }

    impl CarouselDecoder {
        pub fn new(symbols: u32) -> Self {
            assert!(symbols > 0, "generation must hold at least one symbol");
            Self {
                seen: vec![false; symbols as usize],
                rank: 0,
                replay_cursor: 0,
            }
        }
    }

    impl Decoder for CarouselDecoder {
        fn decode(&mut self, payload: &[u8]) {
            assert_eq!(payload.len(), PAYLOAD_SIZE, "payload size mismatch");
            let index = u32::from_le_bytes(payload.try_into().expect("checked length"));
            if index == PADDING || index as usize >= self.seen.len() {
                return;
            }
            if !self.seen[index as usize] {
                self.seen[index as usize] = true;
                self.rank += 1;
            }
        }

        fn recode(&mut self, payload: &mut [u8]) {
            assert_eq!(payload.len(), PAYLOAD_SIZE, "payload size mismatch");
            if self.rank == 0 {
                payload.copy_from_slice(&PADDING.to_le_bytes());
                return;
            }
            // Replay seen indices round-robin.
            loop {
                let index = self.replay_cursor % self.seen.len();
                self.replay_cursor += 1;
                if self.seen[index] {
                    payload.copy_from_slice(&(index as u32).to_le_bytes());
                    return;
                }
            }
        }

        fn rank(&self) -> u32 {
            self.rank
        }

        fn is_complete(&self) -> bool {
            self.rank as usize == self.seen.len()
        }

        fn payload_size(&self) -> usize {
            PAYLOAD_SIZE
        }
    }

    /// Factory pair sharing one symbol count.
    #[derive(Debug, Clone, Copy)]
    pub struct CarouselFactory {
        symbols: u32,
    }

    impl CarouselFactory {
        pub fn new(symbols: u32) -> Self {
            Self { symbols }
        }
    }

    impl EncoderFactory for CarouselFactory {
        fn build(&mut self) -> Box<dyn Encoder> {
            Box::new(CarouselEncoder::new(self.symbols))
        }
    }

    impl DecoderFactory for CarouselFactory {
        fn build(&mut self) -> Box<dyn Decoder> {
            Box::new(CarouselDecoder::new(self.symbols))
        }
    }

}
