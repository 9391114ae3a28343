use std::io::{self, Write};

/// Hashing primitive used for vertex derivation.
///
/// A family is seeded once per construction attempt and evaluated once per
/// key. Because the generated C function recomputes the same vertices at
/// lookup time, a family must also be able to print its own computation as
/// C source, with the seed baked in as a constant.
pub trait HashFamily: Sync {
    /// Number of 32-bit words produced per key. BDZ needs at least 3.
    fn hash_words(&self) -> usize;

    /// Hash `key` under `seed` into three 32-bit words.
    fn hash(&self, seed: u64, key: &[u8]) -> [u32; 3];

    /// Write C statements computing the same three words.
    ///
    /// `key` and `keylen` are the parameter names in scope in the generated
    /// function; the words must land in `hashes[0]..hashes[2]`, declared by
    /// the caller as a `uint32_t` array.
    fn emit_c(
        &self,
        out: &mut dyn Write,
        seed: u64,
        key: &str,
        keylen: &str,
        hashes: &str,
    ) -> io::Result<()>;
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

const DERIVE_A: u64 = 0x9E37_79B9_7F4A_7C15;
const DERIVE_B: u64 = 0x0000_0000_A24B_1F6F;
const DERIVE_C: u64 = 0x853C_49E6_0A6C_9D39;

/// Default family: seeded FNV-1a/64 base hash, three splitmix64
/// finalizations. The derivation is deliberately small so the emitter can
/// inline it verbatim into the generated function.
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitMix3;

impl HashFamily for SplitMix3 {
    fn hash_words(&self) -> usize {
        3
    }

    fn hash(&self, seed: u64, key: &[u8]) -> [u32; 3] {
        let mut base = FNV_OFFSET ^ seed;
        for &b in key {
            base = (base ^ u64::from(b)).wrapping_mul(FNV_PRIME);
        }
        [
            splitmix64(base ^ DERIVE_A) as u32,
            splitmix64(base.wrapping_add(DERIVE_B)) as u32,
            splitmix64(base ^ DERIVE_C) as u32,
        ]
    }

    fn emit_c(
        &self,
        out: &mut dyn Write,
        seed: u64,
        key: &str,
        keylen: &str,
        hashes: &str,
    ) -> io::Result<()> {
        writeln!(out, "\t{{")?;
        writeln!(out, "\t\tconst uint8_t *p = (const uint8_t *){};", key)?;
        writeln!(
            out,
            "\t\tuint64_t b = UINT64_C(0x{:016x});",
            FNV_OFFSET ^ seed
        )?;
        writeln!(out, "\t\tuint64_t z;")?;
        writeln!(out, "\t\tsize_t i;\n")?;
        writeln!(out, "\t\tfor (i = 0; i < {}; ++i)", keylen)?;
        writeln!(
            out,
            "\t\t\tb = (b ^ p[i]) * UINT64_C(0x{:016x});",
            FNV_PRIME
        )?;
        emit_finalizer(out, &format!("b ^ UINT64_C(0x{:016x})", DERIVE_A), hashes, 0)?;
        emit_finalizer(out, &format!("b + UINT64_C(0x{:016x})", DERIVE_B), hashes, 1)?;
        emit_finalizer(out, &format!("b ^ UINT64_C(0x{:016x})", DERIVE_C), hashes, 2)?;
        writeln!(out, "\t}}")
    }
}

/// One splitmix64 step as C statements, storing into `hashes[word]`.
fn emit_finalizer(
    out: &mut dyn Write,
    input: &str,
    hashes: &str,
    word: usize,
) -> io::Result<()> {
    writeln!(out, "\t\tz = ({}) + UINT64_C(0x{:016x});", input, DERIVE_A)?;
    writeln!(out, "\t\tz = (z ^ (z >> 30)) * UINT64_C(0xbf58476d1ce4e5b9);")?;
    writeln!(out, "\t\tz = (z ^ (z >> 27)) * UINT64_C(0x94d049bb133111eb);")?;
    writeln!(out, "\t\t{}[{}] = (uint32_t)(z ^ (z >> 31));", hashes, word)
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(DERIVE_A);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_depend_on_seed() {
        let f = SplitMix3;
        assert_ne!(f.hash(1, b"key"), f.hash(2, b"key"));
    }

    #[test]
    fn words_depend_on_key() {
        let f = SplitMix3;
        assert_ne!(f.hash(7, b"abc"), f.hash(7, b"abd"));
    }

    #[test]
    fn emitted_source_bakes_the_seed() {
        let f = SplitMix3;
        let mut buf = Vec::new();
        f.emit_c(&mut buf, 0x1234, "key", "keylen", "h").unwrap();
        let src = String::from_utf8(buf).unwrap();
        let mixed = format!("0x{:016x}", FNV_OFFSET ^ 0x1234);
        assert!(src.contains(&mixed));
        assert!(src.contains("h[2] ="));
    }
}
