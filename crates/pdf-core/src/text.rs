//! Text rendering utilities

use crate::Align;

/// Context for rendering text
pub struct TextRenderContext {
    /// PDF font resource name (e.g., "F1")
    pub font_name: String,
    /// Font size in points
    pub font_size: f32,
    /// Text width in points (for alignment)
    pub text_width: f64,
}

/// Left edge of a line of text anchored at `x`
///
/// With [`Align::Center`] the midpoint of the rendered text lands exactly on
/// `x`.
pub fn start_x(x: f64, text_width: f64, align: Align) -> f64 {
    match align {
        Align::Left => x,
        Align::Center => x - text_width / 2.0,
        Align::Right => x - text_width,
    }
}

/// Generate PDF operators for text insertion
///
/// Creates the text operators (BT, Tf, Td, Tj, ET) that draw one line of
/// text at a position, honoring alignment.
///
/// # Arguments
/// * `text_hex` - Hex string of encoded glyph codes (e.g., "<416C696365>")
/// * `x` - X coordinate in points (PDF coordinates, from left)
/// * `y` - Baseline Y coordinate in points (PDF coordinates, from bottom)
/// * `align` - Text alignment
/// * `ctx` - Text rendering context
pub fn generate_text_operators(
    text_hex: &str,
    x: f64,
    y: f64,
    align: Align,
    ctx: &TextRenderContext,
) -> Vec<u8> {
    let final_x = start_x(x, ctx.text_width, align);

    let mut ops = String::new();
    ops.push_str("BT\n");
    ops.push_str(&format!(
        "/{} {} Tf\n",
        ctx.font_name,
        format_number(ctx.font_size as f64)
    ));
    ops.push_str(&format!(
        "{} {} Td\n",
        format_number(final_x),
        format_number(y)
    ));
    ops.push_str(&format!("{text_hex} Tj\n"));
    ops.push_str("ET\n");

    ops.into_bytes()
}

/// Hex string operand for encoded text
pub fn hex_string(encoded: &[u8]) -> String {
    let mut hex = String::with_capacity(encoded.len() * 2 + 2);
    hex.push('<');
    for byte in encoded {
        hex.push_str(&format!("{byte:02X}"));
    }
    hex.push('>');
    hex
}

/// Format a number for a content stream: at most 4 decimals, no trailing
/// zeros, no exponent
pub(crate) fn format_number(value: f64) -> String {
    let formatted = format!("{value:.4}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}
