//! Diff rendering for result comparison.

use scriptdiff_core::encode_hex;

/// Bytes of context shown on each side of the first differing byte.
const CONTEXT: usize = 8;

/// Render a hex diff between the library and oracle results around the
/// first divergence.
#[must_use]
pub fn render_diff(library: &[u8], oracle: &[u8], offset: usize) -> String {
    if library == oracle {
        return String::from("[identical]");
    }

    let start = offset.saturating_sub(CONTEXT);
    let window = |bytes: &[u8]| {
        let end = (offset + CONTEXT + 1).min(bytes.len());
        if start >= end {
            String::from("<end>")
        } else {
            encode_hex(&bytes[start..end])
        }
    };

    let mut out = String::new();
    out.push_str("--- library\n");
    out.push_str("+++ oracle\n");
    out.push_str(&format!(
        "@@ byte {offset} (library {} bytes, oracle {} bytes) @@\n",
        library.len(),
        oracle.len()
    ));
    out.push_str(&format!("-{}\n", window(library)));
    out.push_str(&format!("+{}\n", window(oracle)));
    out
}
