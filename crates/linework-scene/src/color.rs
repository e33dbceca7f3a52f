//! Color resolution.
//!
//! Entity colors resolve through the AutoCAD Color Index with BYLAYER and
//! BYBLOCK indirection. Inside block definitions the sentinels are
//! preserved so instantiation can substitute the instance or layer color.
//! Contrast correction against a known background is available for the
//! GPU-side color transform.

use crate::{BY_BLOCK, BY_LAYER};
use linework_dxf::{EntityCommon, Tables};

/// Contrast ratios below this trigger correction.
const MIN_CONTRAST_RATIO: f64 = 1.5;

/// Resolve an entity's color attributes to a concrete `0xRRGGBB` value or a
/// sentinel.
///
/// Precedence: `colorIndex == 0` → BYBLOCK, `colorIndex == 256` → BYLAYER,
/// a true-color property wins otherwise, then the ACI palette, then BYLAYER.
/// Outside block definitions sentinels dereference to the layer color
/// (black when the layer is unknown).
pub fn resolve_color(
    common: &EntityCommon,
    tables: &Tables,
    layer: Option<&str>,
    in_block: bool,
) -> i32 {
    let raw = match common.color_index {
        Some(0) => BY_BLOCK,
        Some(256) => BY_LAYER,
        _ => match common.color {
            Some(rgb) => rgb,
            None => match common.color_index {
                Some(index) if (1..=255).contains(&index) => aci_to_rgb(index as u8),
                _ => BY_LAYER,
            },
        },
    };
    if in_block || raw >= 0 {
        return raw;
    }
    // BYLAYER and BYBLOCK both fall back to the layer color at top level.
    layer.map_or(0, |name| tables.layer_color(name))
}

/// Substitute sentinels at block instantiation: BYBLOCK takes the instance
/// color, BYLAYER the instance's layer color.
pub fn resolve_block_sentinel(color: i32, instance_color: i32, layer_color: i32) -> i32 {
    match color {
        BY_BLOCK => instance_color,
        BY_LAYER => layer_color,
        other => other,
    }
}

/// AutoCAD Color Index → `0xRRGGBB`.
///
/// Indices 1-9 and the grayscale tail are the fixed table values; the 240
/// chromatic entries are generated from the standard hue/shade grid.
pub fn aci_to_rgb(index: u8) -> i32 {
    match index {
        0 => 0x000000,
        1 => 0xff0000,
        2 => 0xffff00,
        3 => 0x00ff00,
        4 => 0x00ffff,
        5 => 0x0000ff,
        6 => 0xff00ff,
        7 => 0xffffff,
        8 => 0x414141,
        9 => 0x808080,
        250..=255 => {
            let level = [0x33, 0x5b, 0x84, 0xac, 0xd5, 0xfd][index as usize - 250];
            (level << 16) | (level << 8) | level
        }
        _ => {
            let entry = index as usize - 10;
            let hue = (entry / 10) as f64 * 15.0;
            let shade = (entry % 10) / 2;
            let value = [1.0, 0.8, 0.6, 0.5, 0.3][shade];
            let saturation = if entry % 2 == 0 { 1.0 } else { 0.5 };
            hsv_to_rgb(hue, saturation, value)
        }
    }
}

fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> i32 {
    let c = value * saturation;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = value - c;
    let (r, g, b) = match hue as u32 {
        0..60 => (c, x, 0.0),
        60..120 => (x, c, 0.0),
        120..180 => (0.0, c, x),
        180..240 => (0.0, x, c),
        240..300 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    pack_rgb(r + m, g + m, b + m)
}

fn pack_rgb(r: f64, g: f64, b: f64) -> i32 {
    let to_byte = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as i32;
    (to_byte(r) << 16) | (to_byte(g) << 8) | to_byte(b)
}

fn unpack_rgb(color: i32) -> (f64, f64, f64) {
    (
        ((color >> 16) & 0xff) as f64 / 255.0,
        ((color >> 8) & 0xff) as f64 / 255.0,
        (color & 0xff) as f64 / 255.0,
    )
}

/// W3C relative luminance of an sRGB color.
pub fn relative_luminance(color: i32) -> f64 {
    let (r, g, b) = unpack_rgb(color);
    let linearize = |c: f64| {
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    0.2126 * linearize(r) + 0.7152 * linearize(g) + 0.0722 * linearize(b)
}

/// W3C contrast ratio between two colors.
pub fn contrast_ratio(a: i32, b: i32) -> f64 {
    let la = relative_luminance(a);
    let lb = relative_luminance(b);
    (la.max(lb) + 0.05) / (la.min(lb) + 0.05)
}

/// Correct a color for visibility against the given background.
///
/// Pure black flips to pure white against a near-black background and the
/// other way around; anything else with insufficient contrast gets its HLS
/// lightness nudged away from the background.
pub fn correct_contrast(color: i32, background: i32) -> i32 {
    let background_luminance = relative_luminance(background);
    if color == 0x000000 && background_luminance < 0.05 {
        return 0xffffff;
    }
    if color == 0xffffff && background_luminance > 0.8 {
        return 0x000000;
    }
    if contrast_ratio(color, background) >= MIN_CONTRAST_RATIO {
        return color;
    }

    let (h, l, s) = rgb_to_hls(color);
    let lightness = if background_luminance > 0.5 {
        (l - 0.3).max(0.0)
    } else {
        (l + 0.3).min(1.0)
    };
    hls_to_rgb(h, lightness, s)
}

/// RGB → HLS, hue in degrees.
fn rgb_to_hls(color: i32) -> (f64, f64, f64) {
    let (r, g, b) = unpack_rgb(color);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    if max == min {
        return (0.0, l, 0.0);
    }
    let delta = max - min;
    let s = if l > 0.5 {
        delta / (2.0 - max - min)
    } else {
        delta / (max + min)
    };
    let h = if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    } * 60.0;
    (h, l, s)
}

fn hls_to_rgb(h: f64, l: f64, s: f64) -> i32 {
    if s == 0.0 {
        return pack_rgb(l, l, l);
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let hue_to_channel = |mut t: f64| {
        t = t.rem_euclid(1.0);
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };
    let h = h / 360.0;
    pack_rgb(
        hue_to_channel(h + 1.0 / 3.0),
        hue_to_channel(h),
        hue_to_channel(h - 1.0 / 3.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use linework_dxf::Layer;

    fn tables() -> Tables {
        let mut tables = Tables::default();
        tables
            .layers
            .insert("walls".into(), Layer::new("walls", 0x00aa00));
        tables
    }

    #[test]
    fn test_aci_primaries() {
        assert_eq!(aci_to_rgb(1), 0xff0000);
        assert_eq!(aci_to_rgb(5), 0x0000ff);
        assert_eq!(aci_to_rgb(7), 0xffffff);
        assert_eq!(aci_to_rgb(255), 0xfdfdfd);
    }

    #[test]
    fn test_aci_chromatic_full_value() {
        // Entry 10 is pure red at full value and saturation.
        assert_eq!(aci_to_rgb(10), 0xff0000);
    }

    #[test]
    fn test_resolve_explicit_index() {
        let mut common = EntityCommon::default();
        common.color_index = Some(1);
        assert_eq!(resolve_color(&common, &tables(), Some("walls"), false), 0xff0000);
    }

    #[test]
    fn test_resolve_true_color_wins() {
        let mut common = EntityCommon::default();
        common.color_index = Some(3);
        common.color = Some(0x123456);
        assert_eq!(resolve_color(&common, &tables(), None, false), 0x123456);
    }

    #[test]
    fn test_resolve_by_layer() {
        let mut common = EntityCommon::default();
        common.color_index = Some(256);
        assert_eq!(resolve_color(&common, &tables(), Some("walls"), false), 0x00aa00);
        // Sentinel preserved inside a block definition.
        assert_eq!(resolve_color(&common, &tables(), None, true), BY_LAYER);
    }

    #[test]
    fn test_resolve_by_block() {
        let mut common = EntityCommon::default();
        common.color_index = Some(0);
        assert_eq!(resolve_color(&common, &tables(), None, true), BY_BLOCK);
        // Dereferences to the layer color at top level.
        assert_eq!(resolve_color(&common, &tables(), Some("walls"), false), 0x00aa00);
    }

    #[test]
    fn test_resolve_unknown_layer_black() {
        let common = EntityCommon::default();
        assert_eq!(resolve_color(&common, &tables(), Some("nope"), false), 0);
    }

    #[test]
    fn test_sentinel_substitution() {
        assert_eq!(resolve_block_sentinel(BY_BLOCK, 0x111111, 0x222222), 0x111111);
        assert_eq!(resolve_block_sentinel(BY_LAYER, 0x111111, 0x222222), 0x222222);
        assert_eq!(resolve_block_sentinel(0x333333, 0x111111, 0x222222), 0x333333);
    }

    #[test]
    fn test_luminance_extremes() {
        assert!(relative_luminance(0x000000) < 1e-9);
        assert!((relative_luminance(0xffffff) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_black_on_black_flips() {
        assert_eq!(correct_contrast(0x000000, 0x000000), 0xffffff);
        assert_eq!(correct_contrast(0xffffff, 0xffffff), 0x000000);
    }

    #[test]
    fn test_good_contrast_untouched() {
        assert_eq!(correct_contrast(0xff0000, 0x000000), 0xff0000);
    }

    #[test]
    fn test_low_contrast_lightened() {
        // Dark blue on black: lightness must go up.
        let corrected = correct_contrast(0x000040, 0x000000);
        assert_ne!(corrected, 0x000040);
        assert!(relative_luminance(corrected) > relative_luminance(0x000040));
    }

    #[test]
    fn test_hls_round_trip() {
        for &color in &[0xff0000, 0x00ff00, 0x336699, 0x808080, 0xfdfdfd] {
            let (h, l, s) = rgb_to_hls(color);
            assert_eq!(hls_to_rgb(h, l, s), color);
        }
    }
}
