//! `.cube` 3D lookup tables.
//!
//! Format: `#` comments, optional `TITLE "..."`, `LUT_3D_SIZE n`, optional
//! `DOMAIN_MIN r g b` / `DOMAIN_MAX r g b`, then `n³` rows of `r g b` with
//! red varying fastest, then green, then blue.

use std::path::Path;

use crate::error::PostFxError;

/// Smallest and largest accepted `LUT_3D_SIZE`.
pub const SIZE_RANGE: std::ops::RangeInclusive<u32> = 2..=256;

/// A cubic color table mapping input RGB to output RGB.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3d {
    title: Option<String>,
    size: u32,
    texels: Vec<[f32; 3]>,
}

fn lut_error(line: usize, message: impl Into<String>) -> PostFxError {
    PostFxError::Lut {
        line,
        message: message.into(),
    }
}

fn parse_triplet(line: usize, fields: &[&str]) -> Result<[f32; 3], PostFxError> {
    let [r, g, b] = fields else {
        return Err(lut_error(
            line,
            format!("expected 3 values, found {}", fields.len()),
        ));
    };
    let value = |s: &str| {
        s.parse::<f32>()
            .map_err(|e| lut_error(line, format!("'{s}': {e}")))
    };
    Ok([value(r)?, value(g)?, value(b)?])
}

impl Lut3d {
    /// The table that maps every color to itself.
    pub fn identity(size: u32) -> Self {
        let size = size.clamp(*SIZE_RANGE.start(), *SIZE_RANGE.end());
        let scale = 1.0 / (size - 1) as f32;
        let mut texels = Vec::with_capacity((size * size * size) as usize);
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    texels.push([
                        r as f32 * scale,
                        g as f32 * scale,
                        b as f32 * scale,
                    ]);
                }
            }
        }
        Self {
            title: None,
            size,
            texels,
        }
    }

    /// Parse `.cube` text.
    ///
    /// # Errors
    ///
    /// [`PostFxError::Lut`] with the offending 1-based line number (0 for
    /// problems only detectable at the end, such as a short table).
    pub fn parse(text: &str) -> Result<Self, PostFxError> {
        let mut title = None;
        let mut size = None;
        let mut domain_min = [0.0f32; 3];
        let mut domain_max = [1.0f32; 3];
        let mut texels = Vec::new();

        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let content = raw.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            let fields: Vec<&str> = content.split_whitespace().collect();
            match fields[0] {
                "TITLE" => {
                    let rest = content["TITLE".len()..].trim();
                    title = Some(rest.trim_matches('"').to_owned());
                }
                "LUT_3D_SIZE" => {
                    let n: u32 = fields
                        .get(1)
                        .and_then(|s| s.parse().ok())
                        .ok_or_else(|| lut_error(line, "LUT_3D_SIZE needs an integer"))?;
                    if !SIZE_RANGE.contains(&n) {
                        return Err(lut_error(
                            line,
                            format!("LUT_3D_SIZE {n} outside {SIZE_RANGE:?}"),
                        ));
                    }
                    size = Some(n);
                }
                "LUT_1D_SIZE" => {
                    return Err(lut_error(line, "1D LUTs are not supported"));
                }
                "DOMAIN_MIN" => domain_min = parse_triplet(line, &fields[1..])?,
                "DOMAIN_MAX" => domain_max = parse_triplet(line, &fields[1..])?,
                keyword if keyword.starts_with(|c: char| c.is_ascii_alphabetic()) => {
                    log::debug!("line {line}: ignoring '{keyword}'");
                }
                _ => {
                    if size.is_none() {
                        return Err(lut_error(line, "table data before LUT_3D_SIZE"));
                    }
                    texels.push(parse_triplet(line, &fields)?);
                }
            }
        }

        let size = size.ok_or_else(|| lut_error(0, "missing LUT_3D_SIZE"))?;
        let expected = (size as usize).pow(3);
        if texels.len() != expected {
            return Err(lut_error(
                0,
                format!("expected {expected} rows, found {}", texels.len()),
            ));
        }
        for axis in 0..3 {
            if domain_max[axis] <= domain_min[axis] {
                return Err(lut_error(0, "DOMAIN_MAX must exceed DOMAIN_MIN"));
            }
        }
        if domain_min != [0.0; 3] || domain_max != [1.0; 3] {
            for texel in &mut texels {
                for axis in 0..3 {
                    texel[axis] = (texel[axis] - domain_min[axis])
                        / (domain_max[axis] - domain_min[axis]);
                }
            }
        }

        Ok(Self {
            title,
            size,
            texels,
        })
    }

    /// Read and parse a `.cube` file.
    ///
    /// # Errors
    ///
    /// [`PostFxError::Io`] if the file cannot be read, otherwise as
    /// [`parse`](Self::parse).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PostFxError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let lut = Self::parse(&text)?;
        log::debug!(
            "loaded {}³ LUT '{}' from {}",
            lut.size,
            lut.title.as_deref().unwrap_or(""),
            path.as_ref().display()
        );
        Ok(lut)
    }

    /// Edge length of the cube.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// `TITLE`, if the file had one.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Output color for grid point `(r, g, b)`.
    pub fn texel(&self, r: u32, g: u32, b: u32) -> Option<[f32; 3]> {
        if r >= self.size || g >= self.size || b >= self.size {
            return None;
        }
        let n = self.size as usize;
        self.texels
            .get(r as usize + g as usize * n + b as usize * n * n)
            .copied()
    }

    /// Pack the table as RGBA8 texels in upload order (x = red).
    pub fn to_rgba8(&self) -> Vec<u8> {
        let quantize = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        self.texels
            .iter()
            .flat_map(|&[r, g, b]| [quantize(r), quantize(g), quantize(b), 255])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const TINY: &str = "\
# a comment
TITLE \"Swap\"
LUT_3D_SIZE 2

0 0 0
1 0 0
0 1 0
1 1 0
0 0 1
1 0 1
0 1 1
1 1 1   # trailing comment
";

    #[test]
    fn parses_header_and_rows() {
        let lut = Lut3d::parse(TINY).unwrap();
        assert_eq!(lut.size(), 2);
        assert_eq!(lut.title(), Some("Swap"));
        assert_eq!(lut.texel(1, 0, 0), Some([1.0, 0.0, 0.0]));
        assert_eq!(lut.texel(0, 1, 1), Some([0.0, 1.0, 1.0]));
        assert_eq!(lut.texel(2, 0, 0), None);
        assert_eq!(lut, Lut3d { title: Some("Swap".to_owned()), ..Lut3d::identity(2) });
    }

    #[test]
    fn identity_red_varies_fastest() {
        let lut = Lut3d::identity(3);
        assert_eq!(lut.texel(2, 0, 0), Some([1.0, 0.0, 0.0]));
        assert_eq!(lut.texel(1, 2, 0), Some([0.5, 1.0, 0.0]));
        let bytes = lut.to_rgba8();
        assert_eq!(bytes.len(), 27 * 4);
        assert_eq!(&bytes[4..8], &[128, 0, 0, 255]);
    }

    #[test]
    fn domain_is_normalized() {
        let text = "LUT_3D_SIZE 2\nDOMAIN_MIN 0 0 0\nDOMAIN_MAX 2 2 2\n"
            .to_owned()
            + &"2 2 2\n".repeat(8);
        let lut = Lut3d::parse(&text).unwrap();
        assert_eq!(lut.texel(0, 0, 0), Some([1.0, 1.0, 1.0]));
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = Lut3d::parse("TITLE \"x\"\nLUT_3D_SIZE 2\n0 0\n").unwrap_err();
        assert!(matches!(err, PostFxError::Lut { line: 3, .. }));

        let err = Lut3d::parse("\n\nLUT_1D_SIZE 16\n").unwrap_err();
        assert!(matches!(err, PostFxError::Lut { line: 3, .. }));

        let err = Lut3d::parse("LUT_3D_SIZE 1\n").unwrap_err();
        assert!(matches!(err, PostFxError::Lut { line: 1, .. }));

        let err = Lut3d::parse("0 0 0\n").unwrap_err();
        assert!(matches!(err, PostFxError::Lut { line: 1, .. }));
    }

    #[test]
    fn short_table_is_rejected() {
        let err = Lut3d::parse("LUT_3D_SIZE 2\n0 0 0\n").unwrap_err();
        assert!(err.to_string().contains("expected 8 rows"));
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TINY.as_bytes()).unwrap();
        let lut = Lut3d::load(file.path()).unwrap();
        assert_eq!(lut.size(), 2);

        let missing = Lut3d::load(file.path().with_extension("nope"));
        assert!(matches!(missing, Err(PostFxError::Io(_))));
    }
}
