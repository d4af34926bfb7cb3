use std::collections::HashMap;
use std::path::Path;

use memmap2::Mmap;
use ttf_parser::Face;

use crate::error::Error;
use crate::model::TextStyle;

/// Text measurement used by line breaking and click interpolation.
pub trait TextMeasure {
    /// Advance width of `text` in points.
    fn text_width(&self, text: &str, style: &TextStyle) -> f32;

    /// Natural line height as a multiple of the font size.
    fn line_height_ratio(&self, _style: &TextStyle) -> f32 {
        1.2
    }
}

impl<T: TextMeasure + ?Sized> TextMeasure for &T {
    fn text_width(&self, text: &str, style: &TextStyle) -> f32 {
        (**self).text_width(text, style)
    }

    fn line_height_ratio(&self, style: &TextStyle) -> f32 {
        (**self).line_height_ratio(style)
    }
}

/// Approximate Helvetica widths at 1000 units/em.
fn helvetica_width_1000(ch: char) -> f32 {
    match ch as u32 {
        32 => 278.0,                          // space
        33..=47 => 333.0,                     // punctuation
        48..=57 => 556.0,                     // digits
        58..=64 => 333.0,                     // more punctuation
        73 | 74 => 278.0,                     // I J (narrow uppercase)
        77 => 833.0,                          // M (wide)
        65..=90 => 667.0,                     // uppercase A-Z (average)
        91..=96 => 333.0,                     // brackets etc.
        102 | 105 | 106 | 108 | 116 => 278.0, // narrow lowercase: f i j l t
        109 | 119 => 833.0,                   // m w (wide)
        97..=122 => 556.0,                    // lowercase a-z (average)
        0..=31 => 0.0,
        _ => 556.0,
    }
}

const BOLD_WIDEN: f32 = 1.05;

/// Font-independent metrics, used when no font file is available.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApproxMetrics;

impl TextMeasure for ApproxMetrics {
    fn text_width(&self, text: &str, style: &TextStyle) -> f32 {
        let w: f32 = text.chars().map(helvetica_width_1000).sum();
        let w = w * style.font_size / 1000.0;
        if style.bold { w * BOLD_WIDEN } else { w }
    }
}

/// Metrics read from a TrueType/OpenType face.
pub struct FontMetrics {
    pub family: Option<String>,
    char_widths_1000: HashMap<char, f32>,
    line_h_ratio: f32,
    ascender_ratio: f32,
}

fn font_family_name(face: &Face) -> Option<String> {
    // ID 1 (Family) keeps "Aptos Display" apart from "Aptos".
    for name in face.names() {
        if name.name_id == ttf_parser::name_id::FAMILY
            && name.is_unicode()
            && let Some(s) = name.to_string()
        {
            return Some(s);
        }
    }
    None
}

impl FontMetrics {
    /// Map a font file and read its metrics. TTC files use the first face.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let file = std::fs::File::open(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", e, path.display()),
            ))
        })?;
        let data = unsafe { Mmap::map(&file) }.map_err(Error::Io)?;
        let metrics = Self::from_bytes(&data, 0)?;
        log::info!(
            "Loaded font metrics from {} ({} glyph widths)",
            path.display(),
            metrics.char_widths_1000.len()
        );
        Ok(metrics)
    }

    pub fn from_bytes(data: &[u8], face_index: u32) -> Result<Self, Error> {
        let face = Face::parse(data, face_index).map_err(|e| Error::Font(e.to_string()))?;
        let units = face.units_per_em() as f32;
        if units <= 0.0 {
            return Err(Error::Font("face reports zero units per em".into()));
        }

        let mut char_widths_1000 = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|cp| {
                    let Some(ch) = char::from_u32(cp) else {
                        return;
                    };
                    if let Some(adv) = face
                        .glyph_index(ch)
                        .and_then(|gid| face.glyph_hor_advance(gid))
                    {
                        char_widths_1000.insert(ch, adv as f32 / units * 1000.0);
                    }
                });
            }
        }

        let line_gap = face.line_gap() as f32;
        let line_h_ratio = (face.ascender() as f32 - face.descender() as f32 + line_gap) / units;
        let ascender_ratio = face.ascender() as f32 / units;

        Ok(Self {
            family: font_family_name(&face),
            char_widths_1000,
            line_h_ratio,
            ascender_ratio,
        })
    }

    /// Width of a single character in 1000-units, falling back to the
    /// approximate table for glyphs the face lacks.
    pub fn char_width_1000(&self, ch: char) -> f32 {
        self.char_widths_1000
            .get(&ch)
            .copied()
            .unwrap_or_else(|| helvetica_width_1000(ch))
    }

    pub fn ascender_ratio(&self) -> f32 {
        self.ascender_ratio
    }
}

impl TextMeasure for FontMetrics {
    fn text_width(&self, text: &str, style: &TextStyle) -> f32 {
        let w: f32 = text.chars().map(|ch| self.char_width_1000(ch)).sum();
        w * style.font_size / 1000.0
    }

    fn line_height_ratio(&self, _style: &TextStyle) -> f32 {
        if self.line_h_ratio > 0.0 {
            self.line_h_ratio
        } else {
            1.2
        }
    }
}
