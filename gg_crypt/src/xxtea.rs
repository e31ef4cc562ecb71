//! XXTEA (Corrected Block TEA) as described in:
//! David J. Wheeler and Roger M. Needham (October 1998). "Correction to
//! XTEA". Computer Laboratory, Cambridge University.
//! <https://www.movable-type.co.uk/scripts/xxtea.pdf>
//!
//! Words are packed little-endian. Inputs shorter than two words pass
//! through unchanged; trailing bytes beyond the last whole word are
//! appended unencrypted.

/// A 128-bit key.
pub type Key = [u32; 4];

const DELTA: u32 = 0x9E37_79B9;
const WORD_SIZE: usize = 4;

pub fn encrypt(data: &[u8], key: Key) -> Vec<u8> {
    let (mut words, rest) = bytes_to_words(data);
    encrypt_words(&mut words, key);
    let mut out = words_to_bytes(&words);
    out.extend_from_slice(rest);
    out
}

pub fn decrypt(data: &[u8], key: Key) -> Vec<u8> {
    let (mut words, rest) = bytes_to_words(data);
    decrypt_words(&mut words, key);
    let mut out = words_to_bytes(&words);
    out.extend_from_slice(rest);
    out
}

fn encrypt_words(v: &mut [u32], k: Key) {
    let n = v.len();
    if n <= 1 {
        return;
    }
    let mut q = 6 + 52 / n;
    let mut sum: u32 = 0;
    let mut z = v[n - 1];
    while q > 0 {
        sum = sum.wrapping_add(DELTA);
        let e = ((sum >> 2) & 3) as usize;
        for p in 0..n - 1 {
            let y = v[p + 1];
            v[p] = v[p].wrapping_add(mx(y, z, sum, p, e, k));
            z = v[p];
        }
        let y = v[0];
        v[n - 1] = v[n - 1].wrapping_add(mx(y, z, sum, n - 1, e, k));
        z = v[n - 1];
        q -= 1;
    }
}

fn decrypt_words(v: &mut [u32], k: Key) {
    let n = v.len();
    if n <= 1 {
        return;
    }
    let mut q = 6 + 52 / n;
    let mut sum: u32 = (q as u32).wrapping_mul(DELTA);
    let mut y = v[0];
    while q > 0 {
        let e = ((sum >> 2) & 3) as usize;
        for p in (1..n).rev() {
            let z = v[p - 1];
            v[p] = v[p].wrapping_sub(mx(y, z, sum, p, e, k));
            y = v[p];
        }
        let z = v[n - 1];
        v[0] = v[0].wrapping_sub(mx(y, z, sum, 0, e, k));
        y = v[0];
        sum = sum.wrapping_sub(DELTA);
        q -= 1;
    }
}

fn mx(y: u32, z: u32, sum: u32, p: usize, e: usize, k: Key) -> u32 {
    ((z >> 5 ^ y << 2).wrapping_add(y >> 3 ^ z << 4))
        ^ ((sum ^ y).wrapping_add(k[(p & 3) ^ e] ^ z))
}

fn bytes_to_words(b: &[u8]) -> (Vec<u32>, &[u8]) {
    let words = b
        .chunks_exact(WORD_SIZE)
        .map(|chunk| u32::from_le_bytes(chunk.try_into().unwrap()))
        .collect();
    (words, &b[b.len() - b.len() % WORD_SIZE..])
}

fn words_to_bytes(w: &[u32]) -> Vec<u8> {
    let mut b = Vec::with_capacity(w.len() * WORD_SIZE);
    for word in w {
        b.extend_from_slice(&word.to_le_bytes());
    }
    b
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: Key = [0xAEA4_EDF3, 0xAFF8_332A, 0xB5A2_DBB4, 0x9B4B_A022];

    #[test]
    fn test_encrypt() {
        let cases: &[(&[u8], &[u8])] = &[
            (
                b"hello, world",
                &[0x54, 0xC3, 0xFB, 0xB8, 0xF5, 0xAA, 0x3F, 0x3C, 0x5B, 0x91, 0xC3, 0x98],
            ),
            (b"abcdefgh", &[0x9D, 0x5F, 0x1C, 0x05, 0xEB, 0x20, 0xB4, 0x4A]),
            (b"abcdefg", b"abcdefg"),
            (
                b"abcdefghij",
                &[0x9D, 0x5F, 0x1C, 0x05, 0xEB, 0x20, 0xB4, 0x4A, 0x69, 0x6A],
            ),
        ];
        for (input, want) in cases {
            assert_eq!(&encrypt(input, KEY), want, "encrypting {:?}", input);
        }
    }

    #[test]
    fn test_decrypt() {
        let cases: &[(&[u8], &[u8])] = &[
            (
                &[0x54, 0xC3, 0xFB, 0xB8, 0xF5, 0xAA, 0x3F, 0x3C, 0x5B, 0x91, 0xC3, 0x98],
                b"hello, world",
            ),
            (&[0x9D, 0x5F, 0x1C, 0x05, 0xEB, 0x20, 0xB4, 0x4A], b"abcdefgh"),
            (b"abcdefg", b"abcdefg"),
            (
                &[0x9D, 0x5F, 0x1C, 0x05, 0xEB, 0x20, 0xB4, 0x4A, 0x69, 0x6A],
                b"abcdefghij",
            ),
        ];
        for (input, want) in cases {
            assert_eq!(&decrypt(input, KEY), want, "decrypting {:?}", input);
        }
    }

    #[test]
    fn test_round_trip() {
        let key: Key = [1, 2, 3, 4];
        for len in [8, 9, 11, 12, 16, 64, 1000] {
            let original: Vec<u8> = (0..len).map(|i| (i * 31 % 251) as u8).collect();
            let encrypted = encrypt(&original, key);
            assert_eq!(encrypted.len(), original.len());
            assert_eq!(decrypt(&encrypted, key), original, "length {}", len);
        }
    }

    #[test]
    fn test_short_input_passes_through() {
        for len in 0..8 {
            let original: Vec<u8> = (0..len as u8).collect();
            assert_eq!(encrypt(&original, KEY), original);
            assert_eq!(decrypt(&original, KEY), original);
        }
    }
}
