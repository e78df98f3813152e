// ABOUTME: Deterministic display color for a thread timestamp
// ABOUTME: FNV-1a hash of the timestamp picks a hue; output is "RRGGBB" without '#'

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

const SATURATION: f64 = 0.65;
const LIGHTNESS: f64 = 0.40;

/// Color for the thread rooted at `ts`, as six lowercase hex digits
pub fn thread_color(ts: &str) -> String {
    let hash = ts
        .bytes()
        .fold(FNV_OFFSET, |h, b| (h ^ u32::from(b)).wrapping_mul(FNV_PRIME));
    let hue = f64::from(hash % 360);
    let (r, g, b) = hsl_to_rgb(hue, SATURATION, LIGHTNESS);
    format!("{:02x}{:02x}{:02x}", r, g, b)
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> (u8, u8, u8) {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (channel(r), channel(g), channel(b))
}
