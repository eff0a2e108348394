//! AngelCode BMFont descriptions in the text format.
//!
//! A description is a list of lines, each a tag followed by `key=value` pairs:
//!
//! ```text
//! info face="Arial" size=32
//! common lineHeight=32 base=26 scaleW=256 scaleH=256 pages=1
//! page id=0 file="arial.png"
//! char id=65 x=2 y=2 width=20 height=22 xoffset=0 yoffset=4 xadvance=21 page=0
//! kerning first=65 second=86 amount=-2
//! ```

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::errors::*;
use crate::utils::FastHashMap;

/// How the lines of a multi-line label are aligned against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlignment {
    Left,
    Center,
    Right,
}

impl TextAlignment {
    /// The fraction of the spare width placed before a line.
    pub fn factor(self) -> f32 {
        match self {
            TextAlignment::Left => 0.0,
            TextAlignment::Center => 0.5,
            TextAlignment::Right => 1.0,
        }
    }
}

/// The placement of one character in the font atlas, in pixels.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Glyph {
    pub id: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub x_offset: i32,
    pub y_offset: i32,
    pub x_advance: i32,
    pub page: u32,
}

/// A parsed bitmap font.
#[derive(Debug, Default, Clone)]
pub struct BitmapFont {
    face: String,
    size: i32,
    line_height: u32,
    base: u32,
    atlas_width: u32,
    atlas_height: u32,
    pages: Vec<String>,
    glyphs: FastHashMap<u32, Glyph>,
    kernings: FastHashMap<(u32, u32), i32>,
}

impl FromStr for BitmapFont {
    type Err = failure::Error;

    fn from_str(s: &str) -> Result<Self> {
        BitmapFont::parse(s)
    }
}

impl BitmapFont {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        BitmapFont::parse(&text)
            .map_err(|err| format_err!("Failed to parse font {:?}. {}", path.as_ref(), err))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut font = BitmapFont::default();

        for (n, line) in text.lines().enumerate() {
            let mut tokens = Tokens::new(line);
            let tag = match tokens.next_token() {
                Some((tag, None)) => tag,
                Some(_) => bail!("Line {} does not start with a tag.", n + 1),
                None => continue,
            };

            let attrs = tokens.collect::<Result<Vec<_>>>()?;
            let attr = |key: &str| attrs.iter().find(|v| v.0 == key).map(|v| v.1.as_str());

            match tag {
                "info" => {
                    font.face = attr("face").unwrap_or("").to_owned();
                    font.size = number(attr("size"), 0)?;
                }
                "common" => {
                    font.line_height = number(attr("lineHeight"), 0)?;
                    font.base = number(attr("base"), 0)?;
                    font.atlas_width = number(attr("scaleW"), 0)?;
                    font.atlas_height = number(attr("scaleH"), 0)?;
                }
                "page" => {
                    let id: usize = number(attr("id"), 0)?;
                    let file = attr("file").unwrap_or("").to_owned();
                    if font.pages.len() <= id {
                        font.pages.resize(id + 1, String::new());
                    }
                    font.pages[id] = file;
                }
                "char" => {
                    let glyph = Glyph {
                        id: number(attr("id"), 0)?,
                        x: number(attr("x"), 0)?,
                        y: number(attr("y"), 0)?,
                        width: number(attr("width"), 0)?,
                        height: number(attr("height"), 0)?,
                        x_offset: number(attr("xoffset"), 0)?,
                        y_offset: number(attr("yoffset"), 0)?,
                        x_advance: number(attr("xadvance"), 0)?,
                        page: number(attr("page"), 0)?,
                    };

                    font.glyphs.insert(glyph.id, glyph);
                }
                "kerning" => {
                    let first = number(attr("first"), 0)?;
                    let second = number(attr("second"), 0)?;
                    let amount = number(attr("amount"), 0)?;
                    font.kernings.insert((first, second), amount);
                }
                // chars, kernings and anything else only carry counts.
                _ => {}
            }
        }

        if font.line_height == 0 || font.atlas_width == 0 || font.atlas_height == 0 {
            bail!("Font description is missing its common line.");
        }

        Ok(font)
    }

    #[inline]
    pub fn face(&self) -> &str {
        &self.face
    }

    #[inline]
    pub fn size(&self) -> i32 {
        self.size
    }

    /// The distance between two lines, in pixels.
    #[inline]
    pub fn line_height(&self) -> u32 {
        self.line_height
    }

    /// The distance from the top of a line to the baseline, in pixels.
    #[inline]
    pub fn base(&self) -> u32 {
        self.base
    }

    /// The size of the atlas texture, in pixels.
    #[inline]
    pub fn atlas_size(&self) -> (u32, u32) {
        (self.atlas_width, self.atlas_height)
    }

    /// The texture files of the atlas pages.
    #[inline]
    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    #[inline]
    pub fn glyph(&self, c: char) -> Option<&Glyph> {
        self.glyphs.get(&(c as u32))
    }

    #[inline]
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// The adjustment of the advance between `first` and `second`.
    pub fn kerning(&self, first: char, second: char) -> i32 {
        self.kernings
            .get(&(first as u32, second as u32))
            .cloned()
            .unwrap_or(0)
    }

    /// The advance of `line` in pixels, kerning included.
    pub fn line_width(&self, line: &str) -> i32 {
        let mut width = 0;
        let mut prev = None;
        for c in line.chars() {
            if let Some(p) = prev {
                width += self.kerning(p, c);
            }

            if let Some(g) = self.glyph(c) {
                width += g.x_advance;
            }

            prev = Some(c);
        }

        width
    }
}

fn number<T: FromStr>(v: Option<&str>, default: T) -> Result<T> {
    match v {
        Some(v) => v
            .parse()
            .map_err(|_| format_err!("Invalid number {:?} in font description.", v)),
        None => Ok(default),
    }
}

/// Splits a line into a tag and `key=value` pairs. Quoted values may hold spaces.
struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Tokens<'a> {
    fn new(line: &'a str) -> Self {
        Tokens { rest: line }
    }

    fn next_token(&mut self) -> Option<(&'a str, Option<String>)> {
        self.rest = self.rest.trim_start();
        if self.rest.is_empty() {
            return None;
        }

        let end = self
            .rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or_else(|| self.rest.len());
        let key = &self.rest[..end];
        self.rest = &self.rest[end..];

        if !self.rest.starts_with('=') {
            return Some((key, None));
        }

        self.rest = &self.rest[1..];
        let value = if self.rest.starts_with('"') {
            let body = &self.rest[1..];
            let close = body.find('"').unwrap_or_else(|| body.len());
            self.rest = body.get(close + 1..).unwrap_or("");
            body[..close].to_owned()
        } else {
            let end = self
                .rest
                .find(char::is_whitespace)
                .unwrap_or_else(|| self.rest.len());
            let v = self.rest[..end].to_owned();
            self.rest = &self.rest[end..];
            v
        };

        Some((key, Some(value)))
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<(&'a str, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().map(|(k, v)| match v {
            Some(v) => Ok((k, v)),
            None => Err(format_err!("Attribute {} has no value.", k)),
        })
    }
}

#[cfg(test)]
pub(crate) const SAMPLE: &str = r#"info face="Sample Sans" size=16 bold=0 italic=0 charset="" unicode=1
common lineHeight=20 base=16 scaleW=128 scaleH=64 pages=1 packed=0
page id=0 file="sample.png"
chars count=3
char id=32 x=0 y=0 width=0 height=0 xoffset=0 yoffset=0 xadvance=5 page=0 chnl=15
char id=65 x=0 y=0 width=10 height=16 xoffset=0 yoffset=4 xadvance=10 page=0 chnl=15
char id=66 x=16 y=0 width=8 height=16 xoffset=1 yoffset=4 xadvance=9 page=0 chnl=15
kernings count=1
kerning first=65 second=66 amount=-2
"#;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse() {
        let font: BitmapFont = SAMPLE.parse().unwrap();
        assert_eq!(font.face(), "Sample Sans");
        assert_eq!(font.size(), 16);
        assert_eq!(font.line_height(), 20);
        assert_eq!(font.base(), 16);
        assert_eq!(font.atlas_size(), (128, 64));
        assert_eq!(font.pages(), &["sample.png".to_owned()]);
        assert_eq!(font.glyph_count(), 3);

        let b = font.glyph('B').unwrap();
        assert_eq!((b.x, b.width, b.x_offset, b.x_advance), (16, 8, 1, 9));
        assert!(font.glyph('Z').is_none());

        assert_eq!(font.kerning('A', 'B'), -2);
        assert_eq!(font.kerning('B', 'A'), 0);
        assert_eq!(font.line_width("AB A"), 10 - 2 + 9 + 5 + 10);
    }

    #[test]
    fn malformed() {
        assert!(BitmapFont::parse("info face=\"x\"\n").is_err());
        assert!(BitmapFont::parse("common lineHeight=abc scaleW=1 scaleH=1\n").is_err());
        assert!(BitmapFont::parse("common lineHeight\n").is_err());
    }
}
