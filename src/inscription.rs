//! 款识: upper and lower inscriptions with a sexagenary lunar date.

use crate::color::RgbColor;
use crate::error::{CalligraphyError, CalligraphyResult};
use crate::layout::{GlyphPlacement, TextArea, vertical_columns};
use serde::Serialize;
use std::str::FromStr;
use tracing::debug;

const STEMS: [char; 10] = ['甲', '乙', '丙', '丁', '戊', '己', '庚', '辛', '壬', '癸'];
const BRANCHES: [char; 12] = [
    '子', '丑', '寅', '卯', '辰', '巳', '午', '未', '申', '酉', '戌', '亥',
];
const MONTHS: [char; 12] = [
    '正', '二', '三', '四', '五', '六', '七', '八', '九', '十', '冬', '腊',
];
const DIGITS: [char; 10] = ['一', '二', '三', '四', '五', '六', '七', '八', '九', '十'];
const SEASON_ORDER: [char; 3] = ['孟', '仲', '季'];
const SEASONS: [char; 4] = ['春', '夏', '秋', '冬'];

/// 款 ink is a shade lighter than the main text.
pub const INSCRIPTION_COLOR: RgbColor = RgbColor::new(60, 60, 60);

/// Column pitch as a multiple of the glyph size.
const COLUMN_PITCH: f32 = 1.25;

/// A date in the Chinese lunisolar calendar. Conversion from the Gregorian
/// calendar is left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LunarDate {
    year: i32,
    month: u8,
    day: u8,
}

impl LunarDate {
    pub fn new(year: i32, month: u8, day: u8) -> CalligraphyResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(CalligraphyError::config(format!(
                "lunar month {} outside 1..=12",
                month
            )));
        }
        if !(1..=30).contains(&day) {
            return Err(CalligraphyError::config(format!(
                "lunar day {} outside 1..=30",
                day
            )));
        }
        Ok(Self { year, month, day })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    /// 干支 of the year; 4 CE is 甲子.
    pub fn stem_branch(&self) -> [char; 2] {
        let idx = (self.year - 4).rem_euclid(60) as usize;
        [STEMS[idx % 10], BRANCHES[idx % 12]]
    }

    pub fn month_name(&self) -> char {
        MONTHS[usize::from(self.month - 1)]
    }

    /// 初一 .. 初十, 十一 .. 二十, 廿一 .. 三十.
    pub fn day_name(&self) -> [char; 2] {
        let d = usize::from(self.day);
        match d {
            1..=10 => ['初', DIGITS[d - 1]],
            11..=19 => ['十', DIGITS[d - 11]],
            20 => ['二', '十'],
            21..=29 => ['廿', DIGITS[d - 21]],
            _ => ['三', '十'],
        }
    }

    /// 孟春 for the first month through 季冬 for the twelfth.
    pub fn season_name(&self) -> [char; 2] {
        let m = usize::from(self.month - 1);
        [SEASON_ORDER[m % 3], SEASONS[m / 3]]
    }

    /// 岁次甲辰年八月十五, or 岁次甲辰年仲秋 with `season`.
    pub fn chars(&self, season: bool) -> Vec<char> {
        let [stem, branch] = self.stem_branch();
        let mut out = vec!['岁', '次', stem, branch, '年'];
        if season {
            out.extend(self.season_name());
        } else {
            out.push(self.month_name());
            out.push('月');
            out.extend(self.day_name());
        }
        out
    }
}

impl FromStr for LunarDate {
    type Err = CalligraphyError;

    /// `YYYY-MM-DD` in lunar reckoning.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || CalligraphyError::config(format!("invalid lunar date '{}'", s));
        let mut parts = s.trim().splitn(3, '-');
        let year = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
        let month = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
        let day = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
        Self::new(year, month, day)
    }
}

/// Which side the inscriptions sit on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InscriptionLayout {
    /// 上款 at the upper right, 下款 at the lower left.
    #[default]
    Traditional,
    /// Mirrored: 上款 upper left, 下款 lower right.
    Modern,
}

impl FromStr for InscriptionLayout {
    type Err = CalligraphyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "traditional" => Ok(InscriptionLayout::Traditional),
            "modern" => Ok(InscriptionLayout::Modern),
            other => Err(CalligraphyError::config(format!(
                "unknown inscription layout '{}'",
                other
            ))),
        }
    }
}

/// 上款: who the piece is for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpperInscription {
    pub recipient: String,
    pub honorific: String,
    pub humble: String,
}

impl UpperInscription {
    pub fn new(recipient: &str) -> Self {
        Self {
            recipient: recipient.to_string(),
            honorific: "先生".to_string(),
            humble: "雅正".to_string(),
        }
    }

    pub fn chars(&self) -> Vec<char> {
        self.recipient
            .chars()
            .chain(self.honorific.chars())
            .chain(self.humble.chars())
            .filter(|c| !c.is_whitespace())
            .collect()
    }
}

/// 下款: date, optional place, and signature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LowerInscription {
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<LunarDate>,
    pub season: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// 1: signature only. 2: date, signature. 3: date, place, signature.
    pub columns: usize,
}

impl LowerInscription {
    pub fn new(author: &str) -> Self {
        Self {
            author: author.to_string(),
            date: None,
            season: false,
            location: None,
            columns: 2,
        }
    }

    /// Columns in reading order (right to left on the paper).
    pub fn columns(&self) -> Vec<Vec<char>> {
        let mut signature: Vec<char> = self
            .author
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        signature.push('书');
        if self.columns <= 1 {
            return vec![signature];
        }
        let mut out = Vec::with_capacity(3);
        if let Some(date) = &self.date {
            out.push(date.chars(self.season));
        }
        if self.columns >= 3 {
            match &self.location {
                Some(place) => out.push(std::iter::once('于').chain(place.chars()).collect()),
                None => out.push(vec!['记']),
            }
        }
        out.push(signature);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InscriptionSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper: Option<UpperInscription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower: Option<LowerInscription>,
    pub layout: InscriptionLayout,
    pub size: f32,
    pub color: RgbColor,
}

impl InscriptionSpec {
    pub fn is_empty(&self) -> bool {
        self.upper.is_none() && self.lower.is_none()
    }
}

/// Cells for both inscriptions on a `width`×`height` sheet. Each column is
/// laid out on its own so short columns stay bottom-aligned (下款) or
/// top-aligned (上款).
pub fn place_inscriptions(
    spec: &InscriptionSpec,
    width: u32,
    height: u32,
) -> Vec<GlyphPlacement> {
    let size = spec.size;
    if size <= 0.0 || spec.is_empty() {
        return Vec::new();
    }
    let (w, h) = (width as f32, height as f32);
    let inset = (w.min(h) * 0.12).max(size * 0.5);
    let usable = (h - 2.0 * inset).max(0.0);
    let pitch = size * COLUMN_PITCH;
    let mut cells = Vec::new();

    if let Some(upper) = &spec.upper {
        let x = match spec.layout {
            InscriptionLayout::Traditional => w - inset - size,
            InscriptionLayout::Modern => inset,
        };
        cells.extend(column(&upper.chars(), x, inset, usable, size));
    }

    if let Some(lower) = &spec.lower {
        let columns = lower.columns();
        let n = columns.len() as f32;
        // x of the first (rightmost) column
        let first = match spec.layout {
            InscriptionLayout::Traditional => inset + (n - 1.0) * pitch,
            InscriptionLayout::Modern => w - inset - size,
        };
        for (i, col) in columns.iter().enumerate() {
            let height = (col.len() as f32 * size).min(usable);
            let top = h - inset - height;
            cells.extend(column(col, first - i as f32 * pitch, top, height, size));
        }
    }

    debug!(cells = cells.len(), layout = ?spec.layout, "inscriptions placed");
    cells
}

fn column(chars: &[char], x: f32, y: f32, height: f32, size: f32) -> Vec<GlyphPlacement> {
    // the half-pixel slack keeps float rounding from losing the last cell
    let area = TextArea {
        x,
        y,
        width: size + 0.5,
        height: height + 0.5,
    };
    vertical_columns(chars, &area, size, 0)
        .into_iter()
        .map(|mut p| {
            p.x = x;
            p
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u8, d: u8) -> LunarDate {
        LunarDate::new(y, m, d).unwrap()
    }

    #[test]
    fn sexagenary_years() {
        assert_eq!(date(1984, 1, 1).stem_branch(), ['甲', '子']);
        assert_eq!(date(2024, 1, 1).stem_branch(), ['甲', '辰']);
        assert_eq!(date(2025, 1, 1).stem_branch(), ['乙', '巳']);
        assert_eq!(date(1911, 1, 1).stem_branch(), ['辛', '亥']);
        assert_eq!(date(2043, 1, 1).stem_branch(), ['癸', '亥']);
        // before the epoch the cycle still wraps forward
        assert_eq!(date(3, 1, 1).stem_branch(), ['癸', '亥']);
    }

    #[test]
    fn month_and_day_names() {
        assert_eq!(date(2024, 1, 1).month_name(), '正');
        assert_eq!(date(2024, 11, 1).month_name(), '冬');
        assert_eq!(date(2024, 12, 1).month_name(), '腊');
        let day = |d| date(2024, 1, d).day_name();
        assert_eq!(day(1), ['初', '一']);
        assert_eq!(day(10), ['初', '十']);
        assert_eq!(day(11), ['十', '一']);
        assert_eq!(day(15), ['十', '五']);
        assert_eq!(day(20), ['二', '十']);
        assert_eq!(day(21), ['廿', '一']);
        assert_eq!(day(29), ['廿', '九']);
        assert_eq!(day(30), ['三', '十']);
    }

    #[test]
    fn season_names_follow_the_month() {
        let season = |m| date(2024, m, 1).season_name();
        assert_eq!(season(1), ['孟', '春']);
        assert_eq!(season(2), ['仲', '春']);
        assert_eq!(season(6), ['季', '夏']);
        assert_eq!(season(8), ['仲', '秋']);
        assert_eq!(season(10), ['孟', '冬']);
        assert_eq!(season(12), ['季', '冬']);
    }

    #[test]
    fn date_text() {
        let d = date(2024, 8, 15);
        assert_eq!(d.chars(false).iter().collect::<String>(), "岁次甲辰年八月十五");
        assert_eq!(d.chars(true).iter().collect::<String>(), "岁次甲辰年仲秋");
    }

    #[test]
    fn dates_parse_and_validate() {
        assert_eq!("2024-08-15".parse::<LunarDate>().unwrap(), date(2024, 8, 15));
        assert!("2024-13-01".parse::<LunarDate>().is_err());
        assert!("2024-01-31".parse::<LunarDate>().is_err());
        assert!("2024/01/01".parse::<LunarDate>().is_err());
        assert!("modern".parse::<InscriptionLayout>().is_ok());
        assert!("sideways".parse::<InscriptionLayout>().is_err());
    }

    #[test]
    fn lower_inscription_columns() {
        let mut lower = LowerInscription::new("王羲之");
        lower.columns = 1;
        assert_eq!(lower.columns(), vec!["王羲之书".chars().collect::<Vec<_>>()]);

        lower.columns = 2;
        lower.date = Some(date(2024, 8, 15));
        let cols = lower.columns();
        assert_eq!(cols.len(), 2);
        assert_eq!(cols[0].iter().collect::<String>(), "岁次甲辰年八月十五");
        assert_eq!(cols[1].iter().collect::<String>(), "王羲之书");

        lower.columns = 3;
        lower.location = Some("兰亭".into());
        let cols = lower.columns();
        assert_eq!(cols[1].iter().collect::<String>(), "于兰亭");
        lower.location = None;
        assert_eq!(lower.columns()[1], vec!['记']);

        lower.columns = 2;
        lower.date = None;
        assert_eq!(lower.columns().len(), 1);
    }

    #[test]
    fn upper_inscription_text() {
        let upper = UpperInscription::new("李白");
        assert_eq!(upper.chars().iter().collect::<String>(), "李白先生雅正");
    }

    #[test]
    fn traditional_layout_places_upper_right_and_lower_left() {
        let mut lower = LowerInscription::new("某某");
        lower.date = Some(date(2024, 8, 15));
        let spec = InscriptionSpec {
            upper: Some(UpperInscription::new("李白")),
            lower: Some(lower),
            layout: InscriptionLayout::Traditional,
            size: 24.0,
            color: INSCRIPTION_COLOR,
        };
        let cells = place_inscriptions(&spec, 400, 600);
        // 6 upper + 9 date + 3 signature
        assert_eq!(cells.len(), 18);

        let upper = &cells[..6];
        assert!(upper.iter().all(|p| p.x > 300.0 && p.y < 300.0));
        assert!(upper.windows(2).all(|w| w[1].y > w[0].y && w[1].x == w[0].x));

        let date_col = &cells[6..15];
        let sign_col = &cells[15..];
        assert!(date_col.iter().all(|p| p.x < 200.0));
        // reading order runs right to left
        assert!(date_col[0].x > sign_col[0].x);
        // both columns end on the same baseline
        let bottom = |c: &[GlyphPlacement]| c.last().map(|p| p.y + p.size).unwrap_or(0.0);
        assert!((bottom(date_col) - bottom(sign_col)).abs() < 1e-3);
        for p in &cells {
            assert!(p.x >= 0.0 && p.x + p.size <= 400.0);
            assert!(p.y >= 0.0 && p.y + p.size <= 600.0);
        }
    }

    #[test]
    fn modern_layout_mirrors() {
        let spec = InscriptionSpec {
            upper: Some(UpperInscription::new("李白")),
            lower: Some(LowerInscription::new("某某")),
            layout: InscriptionLayout::Modern,
            size: 24.0,
            color: INSCRIPTION_COLOR,
        };
        let cells = place_inscriptions(&spec, 400, 600);
        assert!(cells[..6].iter().all(|p| p.x < 100.0));
        assert!(cells[6..].iter().all(|p| p.x > 300.0 && p.y > 300.0));
    }

    #[test]
    fn long_columns_are_truncated_to_the_sheet() {
        let spec = InscriptionSpec {
            upper: Some(UpperInscription::new(&"长".repeat(40))),
            lower: None,
            layout: InscriptionLayout::Traditional,
            size: 30.0,
            color: INSCRIPTION_COLOR,
        };
        let cells = place_inscriptions(&spec, 300, 400);
        assert!(!cells.is_empty() && cells.len() < 40);
        assert!(cells.iter().all(|p| p.y + p.size <= 400.0));
    }
}
