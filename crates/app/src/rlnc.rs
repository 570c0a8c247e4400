//! Binary random linear network coding over GF(2).
//!
//! Payloads carry their own coding header: a bit-packed coefficient
//! vector (one bit per generation symbol) followed by the combined
//! symbol data. The encoder XORs together the symbols selected by a
//! random coefficient vector; the decoder runs incremental Gaussian
//! elimination over the coefficient bits, so its rank is exactly the
//! number of linearly independent combinations received. Recoding
//! draws a random combination of the decoder's pivot rows, which is
//! what lets relays forward useful traffic without the original data.
//!
//! All randomness is ChaCha8 seeded from the factory, so runs are
//! reproducible.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use relay_sim_core::coding::{Decoder, DecoderFactory, Encoder, EncoderFactory};

/// Bytes needed to hold one coefficient bit per symbol.
fn coefficient_len(symbols: u32) -> usize {
    (symbols as usize + 7) / 8
}

fn get_bit(bits: &[u8], index: usize) -> bool {
    bits[index / 8] & (1 << (index % 8)) != 0
}

fn set_bit(bits: &mut [u8], index: usize) {
    bits[index / 8] |= 1 << (index % 8);
}

fn xor_into(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

/// Encoder holding one generation of symbol data.
pub struct BinaryEncoder {
    symbols: u32,
    symbol_size: usize,
    data: Vec<Vec<u8>>,
    systematic: bool,
    next_systematic: u32,
    rng: ChaCha8Rng,
}

impl BinaryEncoder {
    /// Create an encoder over `data`, one inner vector per symbol.
    ///
    /// # Panics
    /// If `data` is empty or any symbol's length differs from
    /// `symbol_size`.
    pub fn new(data: Vec<Vec<u8>>, symbol_size: usize, seed: u64) -> Self {
        assert!(!data.is_empty(), "generation must hold at least one symbol");
        assert!(
            data.iter().all(|s| s.len() == symbol_size),
            "every symbol must be symbol_size bytes"
        );
        Self {
            symbols: data.len() as u32,
            symbol_size,
            data,
            systematic: false,
            next_systematic: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn random_coefficients(&mut self, coeffs: &mut [u8]) {
        // Redraw on the (rare) all-zero vector; it encodes nothing.
        loop {
            self.rng.fill(coeffs);
            // Clear the padding bits past the last symbol.
            let tail = self.symbols as usize % 8;
            if tail != 0 {
                *coeffs.last_mut().expect("symbols > 0") &= (1 << tail) - 1;
            }
            if coeffs.iter().any(|b| *b != 0) {
                return;
            }
        }
    }
}

impl Encoder for BinaryEncoder {
    fn encode(&mut self, payload: &mut [u8]) {
        assert_eq!(payload.len(), self.payload_size(), "payload size mismatch");
        payload.fill(0);
        let (coeffs, body) = payload.split_at_mut(coefficient_len(self.symbols));

        if self.systematic && self.next_systematic < self.symbols {
            let index = self.next_systematic as usize;
            set_bit(coeffs, index);
            body.copy_from_slice(&self.data[index]);
            self.next_systematic += 1;
            return;
        }

        self.random_coefficients(coeffs);
        for index in 0..self.symbols as usize {
            if get_bit(coeffs, index) {
                xor_into(body, &self.data[index]);
            }
        }
    }

    fn payload_size(&self) -> usize {
        coefficient_len(self.symbols) + self.symbol_size
    }

    fn systematic_on(&mut self) {
        self.systematic = true;
    }

    fn systematic_off(&mut self) {
        self.systematic = false;
    }
}

struct Row {
    coeffs: Vec<u8>,
    body: Vec<u8>,
}

/// Incremental Gaussian-elimination decoder over GF(2).
///
/// One pivot slot per symbol; an incoming payload is eliminated
/// against existing pivots and either claims an empty slot (rank
/// grows) or cancels to zero (linearly dependent).
pub struct BinaryDecoder {
    symbols: u32,
    symbol_size: usize,
    pivots: Vec<Option<Row>>,
    rank: u32,
    rng: ChaCha8Rng,
}

impl BinaryDecoder {
    pub fn new(symbols: u32, symbol_size: usize, seed: u64) -> Self {
        assert!(symbols > 0, "generation must hold at least one symbol");
        Self {
            symbols,
            symbol_size,
            pivots: (0..symbols).map(|_| None).collect(),
            rank: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// The decoded symbol at `index`, once complete.
    ///
    /// # Panics
    /// If the decoder is not yet complete.
    pub fn symbol(&self, index: usize) -> &[u8] {
        assert!(self.is_complete(), "generation not yet decoded");
        // On completion every row has been back-substituted to a unit
        // vector, so pivot i holds symbol i verbatim.
        &self.pivots[index].as_ref().expect("complete").body
    }

    /// Eliminate `row` backwards through already-stored pivots below
    /// its own pivot position, then forward-substitute it out of the
    /// rows above. Keeps the matrix fully reduced so completion means
    /// plain symbols in the pivot slots.
    fn insert_reduced(&mut self, pivot: usize, mut row: Row) {
        for index in pivot + 1..self.symbols as usize {
            if !get_bit(&row.coeffs, index) {
                continue;
            }
            if let Some(stored) = &self.pivots[index] {
                xor_into(&mut row.coeffs, &stored.coeffs);
                xor_into(&mut row.body, &stored.body);
            }
        }
        for maybe in self.pivots.iter_mut() {
            if let Some(stored) = maybe {
                if get_bit(&stored.coeffs, pivot) {
                    xor_into(&mut stored.coeffs, &row.coeffs);
                    xor_into(&mut stored.body, &row.body);
                }
            }
        }
        self.pivots[pivot] = Some(row);
        self.rank += 1;
    }
}

impl Decoder for BinaryDecoder {
    fn decode(&mut self, payload: &[u8]) {
        assert_eq!(payload.len(), self.payload_size(), "payload size mismatch");
        let coeff_len = coefficient_len(self.symbols);
        let mut row = Row {
            coeffs: payload[..coeff_len].to_vec(),
            body: payload[coeff_len..].to_vec(),
        };

        for index in 0..self.symbols as usize {
            if !get_bit(&row.coeffs, index) {
                continue;
            }
            match &self.pivots[index] {
                Some(stored) => {
                    xor_into(&mut row.coeffs, &stored.coeffs);
                    xor_into(&mut row.body, &stored.body);
                }
                None => {
                    self.insert_reduced(index, row);
                    return;
                }
            }
        }
        // Cancelled to zero: linearly dependent, nothing to keep.
    }

    fn recode(&mut self, payload: &mut [u8]) {
        assert_eq!(payload.len(), self.payload_size(), "payload size mismatch");
        payload.fill(0);
        if self.rank == 0 {
            // Nothing decoded yet; the zero combination cancels out at
            // every downstream decoder.
            return;
        }

        let coeff_len = coefficient_len(self.symbols);
        loop {
            let mut any = false;
            for index in 0..self.symbols as usize {
                let include = self.pivots[index].is_some() && self.rng.gen::<bool>();
                if !include {
                    continue;
                }
                let row = self.pivots[index].as_ref().expect("checked");
                let (coeffs, body) = payload.split_at_mut(coeff_len);
                xor_into(coeffs, &row.coeffs);
                xor_into(body, &row.body);
                any = true;
            }
            if any {
                return;
            }
        }
    }

    fn rank(&self) -> u32 {
        self.rank
    }

    fn is_complete(&self) -> bool {
        self.rank == self.symbols
    }

    fn payload_size(&self) -> usize {
        coefficient_len(self.symbols) + self.symbol_size
    }
}

/// Factory pair for one generation geometry.
///
/// Each built encoder holds a fresh random generation; encoders,
/// decoders, and the data itself all derive their seeds from the
/// factory's stream, so one factory seed pins the whole run.
pub struct RlncFactory {
    symbols: u32,
    symbol_size: usize,
    rng: ChaCha8Rng,
}

impl RlncFactory {
    pub fn new(symbols: u32, symbol_size: usize, seed: u64) -> Self {
        assert!(symbols > 0, "generation must hold at least one symbol");
        assert!(symbol_size > 0, "symbols must not be empty");
        Self {
            symbols,
            symbol_size,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn random_generation(&mut self) -> Vec<Vec<u8>> {
        (0..self.symbols)
            .map(|_| {
                let mut symbol = vec![0u8; self.symbol_size];
                self.rng.fill(symbol.as_mut_slice());
                symbol
            })
            .collect()
    }
}

impl EncoderFactory for RlncFactory {
    fn build(&mut self) -> Box<dyn Encoder> {
        let data = self.random_generation();
        let seed = self.rng.gen();
        Box::new(BinaryEncoder::new(data, self.symbol_size, seed))
    }
}

impl DecoderFactory for RlncFactory {
    fn build(&mut self) -> Box<dyn Decoder> {
        let seed = self.rng.gen();
        Box::new(BinaryDecoder::new(self.symbols, self.symbol_size, seed))
    }
}
