//! Emission of the generated C source and the optional key-order map.
//!
//! The generated file is self-contained: packed label table, the four
//! rank summaries, the inline hash (seed baked in) and the O(1) rank
//! computation, all inside one function.

use std::io::{self, Write};

use crate::bdz::Mphf;
use crate::hash::HashFamily;

/// What the generated function should look like.
#[derive(Debug, Clone)]
pub struct EmitOptions {
    /// Name of the generated function.
    pub hash_name: String,
    /// Emit the function with internal (`static`) linkage.
    pub static_hash: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            hash_name: "hash".to_owned(),
            static_hash: false,
        }
    }
}

/// Write the standalone C function implementing `mph`.
pub fn emit_c<W: Write>(
    out: &mut W,
    mph: &Mphf,
    family: &dyn HashFamily,
    opts: &EmitOptions,
) -> io::Result<()> {
    writeln!(out, "#include <stdint.h>")?;
    writeln!(out, "#include <stddef.h>")?;
    writeln!(out)?;
    writeln!(out, "#ifndef popcount32")?;
    writeln!(
        out,
        "#define popcount32(x) ((uint32_t)__builtin_popcount((uint32_t)(x)))"
    )?;
    writeln!(out, "#endif")?;
    writeln!(out)?;

    writeln!(
        out,
        "{}uint32_t",
        if opts.static_hash { "static " } else { "" }
    )?;
    writeln!(
        out,
        "{}(const void * __restrict key, size_t keylen)",
        opts.hash_name
    )?;
    writeln!(out, "{{")?;

    write_table(out, "uint32_t", "g", &mph.g, |x| format!("0x{:08x}U", x))?;
    write_table(out, "uint32_t", "holes64k", &mph.rank.holes64k, |x| {
        format!("0x{:08x}U", x)
    })?;
    write_table(out, "uint16_t", "holes256", &mph.rank.holes256, |x| {
        format!("0x{:04x}", x)
    })?;
    write_table(out, "uint8_t", "holes256_64", &mph.rank.holes256_64, |x| {
        format!("0x{:02x}", x)
    })?;
    write_table(out, "uint8_t", "holes256_128", &mph.rank.holes256_128, |x| {
        format!("0x{:02x}", x)
    })?;
    write_table(out, "uint8_t", "holes256_192", &mph.rank.holes256_192, |x| {
        format!("0x{:02x}", x)
    })?;

    writeln!(out, "\tuint32_t h[{}];", family.hash_words())?;
    writeln!(out, "\tuint32_t m;")?;
    writeln!(out, "\tuint32_t a1, a2, b1, b2, c1, c2, idx, idx2;")?;
    writeln!(out)?;

    family.emit_c(out, mph.seed, "key", "keylen", "h")?;

    writeln!(out)?;
    writeln!(out, "\th[0] = h[0] % {}U;", mph.v)?;
    writeln!(out, "\th[1] = h[1] % {}U;", mph.v)?;
    writeln!(out, "\th[2] = h[2] % {}U;", mph.v)?;
    writeln!(out)?;
    writeln!(out, "\ta1 = h[0] >> 4;")?;
    writeln!(out, "\ta2 = 2 * (h[0] & 15);")?;
    writeln!(out, "\tb1 = h[1] >> 4;")?;
    writeln!(out, "\tb2 = 2 * (h[1] & 15);")?;
    writeln!(out, "\tc1 = h[2] >> 4;")?;
    writeln!(out, "\tc2 = 2 * (h[2] & 15);")?;
    writeln!(out)?;
    writeln!(
        out,
        "\tidx = h[(((g[a1] >> a2) & 3) + ((g[b1] >> b2) & 3) +"
    )?;
    writeln!(out, "\t    ((g[c1] >> c2) & 3)) % 3];")?;
    writeln!(out)?;

    writeln!(out, "\tswitch ((idx >> 5) & 7) {{")?;
    writeln!(out, "\tcase 0:")?;
    writeln!(
        out,
        "\t\tidx2 = idx - holes64k[idx >> 16] - holes256[idx >> 8];"
    )?;
    writeln!(out, "\t\tbreak;")?;
    writeln!(out, "\tcase 1: case 2:")?;
    writeln!(
        out,
        "\t\tidx2 = idx - holes64k[idx >> 16] - holes256[idx >> 8]"
    )?;
    writeln!(out, "\t\t    - holes256_64[idx >> 8];")?;
    writeln!(out, "\t\tbreak;")?;
    writeln!(out, "\tcase 3: case 4:")?;
    writeln!(
        out,
        "\t\tidx2 = idx - holes64k[idx >> 16] - holes256[idx >> 8]"
    )?;
    writeln!(out, "\t\t    - holes256_128[idx >> 8];")?;
    writeln!(out, "\t\tbreak;")?;
    writeln!(out, "\tcase 5: case 6:")?;
    writeln!(
        out,
        "\t\tidx2 = idx - holes64k[idx >> 16] - holes256[idx >> 8]"
    )?;
    writeln!(out, "\t\t    - holes256_192[idx >> 8];")?;
    writeln!(out, "\t\tbreak;")?;
    writeln!(out, "\tdefault:")?;
    writeln!(
        out,
        "\t\tidx2 = idx - holes64k[(idx + 32) >> 16]"
    )?;
    writeln!(out, "\t\t    - holes256[(idx + 32) >> 8];")?;
    writeln!(out, "\t\tbreak;")?;
    writeln!(out, "\t}}")?;

    writeln!(out, "\tswitch ((idx >> 4) & 3) {{")?;
    writeln!(out, "\tcase 1:")?;
    writeln!(
        out,
        "\t\tm = g[(idx >> 4) - 1] & (g[(idx >> 4) - 1] >> 1) & 0x55555555U;"
    )?;
    writeln!(out, "\t\tidx2 -= popcount32(m);")?;
    writeln!(out, "\t\t/* FALLTHROUGH */")?;
    writeln!(out, "\tcase 0:")?;
    writeln!(out, "\t\tm = g[idx >> 4] & (g[idx >> 4] >> 1) & 0x55555555U;")?;
    writeln!(out, "\t\tm &= (2U << (2 * (idx & 15))) - 1;")?;
    writeln!(out, "\t\tidx2 -= popcount32(m);")?;
    writeln!(out, "\t\tbreak;")?;
    writeln!(out, "\tcase 2:")?;
    writeln!(
        out,
        "\t\tm = g[(idx >> 4) + 1] & (g[(idx >> 4) + 1] >> 1) & 0x55555555U;"
    )?;
    writeln!(out, "\t\tidx2 += popcount32(m);")?;
    writeln!(out, "\t\t/* FALLTHROUGH */")?;
    writeln!(out, "\tdefault:")?;
    writeln!(out, "\t\tm = g[idx >> 4] & (g[idx >> 4] >> 1) & 0x55555555U;")?;
    writeln!(out, "\t\tm &= ~((2U << (2 * (idx & 15))) - 1);")?;
    writeln!(out, "\t\tidx2 += popcount32(m);")?;
    writeln!(out, "\t\tbreak;")?;
    writeln!(out, "\t}}")?;
    writeln!(out)?;
    writeln!(out, "\treturn idx2;")?;
    writeln!(out, "}}")
}

/// Write the key-order permutation: one decimal rank per input key.
pub fn emit_map<W: Write>(out: &mut W, mph: &Mphf) -> io::Result<()> {
    for rank in &mph.result_map {
        writeln!(out, "{}", rank)?;
    }
    Ok(())
}

fn write_table<W: Write, T: Copy>(
    out: &mut W,
    ctype: &str,
    name: &str,
    values: &[T],
    render: impl Fn(T) -> String,
) -> io::Result<()> {
    writeln!(
        out,
        "\tstatic const {} {}[{}] = {{",
        ctype,
        name,
        values.len()
    )?;
    for row in values.chunks(4) {
        let cells: Vec<String> = row.iter().map(|&x| render(x)).collect();
        writeln!(out, "\t    {},", cells.join(", "))?;
    }
    writeln!(out, "\t}};")
}
