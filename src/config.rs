use crate::bleed::{BleedParams, BleedPreset, DirectionalBias};
use crate::color::RgbColor;
use crate::inscription::{
    INSCRIPTION_COLOR, InscriptionLayout, InscriptionSpec, LowerInscription, UpperInscription,
};
use crate::layout::TextArea;
use crate::seal::{SealLayout, SealSpec};
use crate::texture::MaterialProfile;
use anyhow::{Context, Result, anyhow};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const FONT_SLOTS: usize = 5;
const SEAL_SLOTS: usize = 4;

#[derive(Debug, Clone)]
pub struct RawConfig {
    source: PathBuf,
    data: BTreeMap<String, String>,
}

impl RawConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Ok(Self::parse(path, &content))
    }

    pub fn parse(source: impl Into<PathBuf>, content: &str) -> Self {
        let mut data = BTreeMap::new();
        for raw_line in content.lines() {
            if let Some((k, v)) = parse_line(raw_line) {
                data.insert(k, v);
            }
        }
        Self {
            source: source.into(),
            data,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| anyhow!("missing key '{}' in {}", key, self.source.display()))
    }

    pub fn parse_value<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        <T as FromStr>::Err: std::fmt::Display,
    {
        let raw = self.require(key)?;
        raw.parse::<T>()
            .map_err(|err| anyhow!("{}: parse {} -> {}", self.source.display(), key, err))
    }

    pub fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        <T as FromStr>::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(_) => self.parse_value(key),
            None => Ok(default),
        }
    }
}

fn parse_line(raw: &str) -> Option<(String, String)> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let without_inline = if trimmed.contains("=#") {
        trimmed
    } else {
        trimmed.split('#').next().unwrap_or("").trim()
    };

    if without_inline.is_empty() {
        return None;
    }

    let collapsed: String = without_inline
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let mut parts = collapsed.splitn(2, '=');
    let key = parts.next()?.to_string();
    let value = parts
        .next()
        .map(|v| v.to_string())
        .unwrap_or_else(String::new);
    if key.is_empty() {
        None
    } else {
        Some((key, value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontSlot {
    pub id: usize,
    pub name: String,
    /// Downward glyph correction as a fraction of the pixel size.
    pub baseline_shift: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextConfig {
    pub content: String,
    pub size: f32,
    pub color: RgbColor,
    pub area: TextArea,
    /// Glyphs per column; 0 fills the area height.
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtworkConfig {
    pub width: u32,
    pub height: u32,
    pub material: MaterialProfile,
    pub roughness: f32,
    pub seed: Option<u64>,
    pub paper_aging: f32,
    pub text: TextConfig,
    pub fonts: Vec<FontSlot>,
    pub seals: Vec<SealSpec>,
    pub bleed: BleedParams,
    /// 上款/下款; `None` when neither a recipient nor an author is set.
    pub inscription: Option<InscriptionSpec>,
}

impl ArtworkConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_raw(&RawConfig::load(path)?)
    }

    pub fn demo() -> Result<Self> {
        Self::from_raw(&RawConfig::parse("<demo>", DEMO_CONFIG))
    }

    pub fn from_raw(raw: &RawConfig) -> Result<Self> {
        let width = raw.parse_or::<u32>("width", 400)?;
        let height = raw.parse_or::<u32>("height", 600)?;
        let material = raw
            .get("material")
            .unwrap_or("xuan")
            .parse::<MaterialProfile>()?;

        let text = TextConfig {
            content: raw.get("text").unwrap_or("").to_string(),
            size: raw.parse_or("text_size", 60.0)?,
            color: parse_color(raw.get("text_color"), RgbColor::INK)?,
            area: TextArea {
                x: raw.parse_or("text_x", width as f32 * 0.15)?,
                y: raw.parse_or("text_y", height as f32 * 0.1)?,
                width: raw.parse_or("text_width", width as f32 * 0.7)?,
                height: raw.parse_or("text_height", height as f32 * 0.8)?,
            },
            rows: raw.parse_or("text_rows", 0)?,
        };

        Ok(Self {
            width,
            height,
            material,
            roughness: raw.parse_or("roughness", 0.5)?,
            seed: raw.get("seed").map(|_| raw.parse_value("seed")).transpose()?,
            paper_aging: raw.parse_or("paper_aging", 0.0)?,
            text,
            fonts: parse_font_slots(raw)?,
            seals: parse_seals(raw)?,
            bleed: parse_bleed(raw)?,
            inscription: parse_inscription(raw)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(anyhow!("width/height must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.roughness) {
            return Err(anyhow!("roughness must lie in [0, 1], got {}", self.roughness));
        }
        if !(0.0..=1.0).contains(&self.bleed.intensity) {
            return Err(anyhow!(
                "bleed_intensity must lie in [0, 1], got {}",
                self.bleed.intensity
            ));
        }
        if !self.text.content.is_empty() && self.text.size <= 0.0 {
            return Err(anyhow!("text_size must be > 0"));
        }
        let area = &self.text.area;
        if area.width <= 0.0 || area.height <= 0.0 {
            return Err(anyhow!("text area must have a positive size"));
        }
        if area.x + area.width > self.width as f32 || area.y + area.height > self.height as f32 {
            return Err(anyhow!(
                "text area ({}, {}, {}x{}) exceeds the {}x{} paper",
                area.x,
                area.y,
                area.width,
                area.height,
                self.width,
                self.height
            ));
        }
        if let Some(ins) = &self.inscription {
            if ins.size <= 0.0 {
                return Err(anyhow!("inscription_size must be > 0"));
            }
            if let Some(lower) = &ins.lower {
                if !(1..=3).contains(&lower.columns) {
                    return Err(anyhow!(
                        "lower_columns must be 1, 2 or 3, got {}",
                        lower.columns
                    ));
                }
            }
        }
        Ok(())
    }
}

/// 示例: a small xuan sheet with a four-glyph square seal.
pub const DEMO_CONFIG: &str = r#"
width = 400
height = 600
material = xuan
roughness = 0.5
text = 床前明月光，疑是地上霜。
text_size = 60
text_x = 150
text_y = 120
text_width = 200
text_height = 400
text_rows = 5
seal1_text = 上官婉儿
seal1_x = 50
seal1_y = 50
seal1_size = 100
bleed_intensity = 0.3
"#;

fn parse_font_slots(raw: &RawConfig) -> Result<Vec<FontSlot>> {
    let mut slots = Vec::new();
    for idx in 1..=FONT_SLOTS {
        let Some(name) = raw.get(&format!("font{idx}")) else {
            continue;
        };
        slots.push(FontSlot {
            id: idx,
            name: name.to_string(),
            baseline_shift: raw.parse_or(&format!("font{idx}_shift"), 0.0)?,
        });
    }
    Ok(slots)
}

fn parse_seals(raw: &RawConfig) -> Result<Vec<SealSpec>> {
    let mut seals = Vec::new();
    for idx in 1..=SEAL_SLOTS {
        let key = |suffix: &str| format!("seal{idx}_{suffix}");
        let Some(text) = raw.get(&key("text")) else {
            continue;
        };
        let layout = match raw.get(&key("layout")).unwrap_or("square") {
            "square" => SealLayout::SquareGrid,
            "circle" => SealLayout::CircleGrid {
                compact_ratio: raw.parse_or(&key("ratio"), 0.55)?,
                ornament: parse_bool(raw.get(&key("ornament"))),
            },
            "ring" => SealLayout::Ring {
                radius_fraction: raw.parse_or(&key("ratio"), 0.7)?,
            },
            other => return Err(anyhow!("seal{}: unknown layout '{}'", idx, other)),
        };
        let anchor = (raw.parse_or(&key("x"), 50)?, raw.parse_or(&key("y"), 50)?);
        let size = raw.parse_or(&key("size"), 100)?;
        let mut spec = SealSpec::new(text, layout, anchor, size)
            .with_context(|| format!("seal{idx}"))?
            .with_tilt(raw.parse_or(&key("tilt"), 0.0)?);
        if let Some(aging) = raw.get(&key("aging")) {
            spec = spec.with_aging(parse_fraction(&key("aging"), aging)?);
        }
        if let Some(opacity) = raw.get(&key("penetration")) {
            spec = spec.with_penetration(parse_fraction(&key("penetration"), opacity)?);
        }
        seals.push(spec);
    }
    Ok(seals)
}

fn parse_bleed(raw: &RawConfig) -> Result<BleedParams> {
    let mut params = match raw.get("bleed_preset") {
        Some(name) => BleedParams::preset(name.parse::<BleedPreset>()?),
        None => BleedParams::new(0.3),
    };
    params.intensity = raw.parse_or("bleed_intensity", params.intensity)?;
    if let Some(flag) = raw.get("bleed_gravity") {
        params.bias = (flag == "1").then_some(DirectionalBias::GRAVITY);
    }
    if let Some(flag) = raw.get("bleed_preserve") {
        params.preserve_glyphs = flag == "1";
    }
    if let Some(flag) = raw.get("bleed_pressure") {
        params.pressure_sensitive = flag == "1";
    }
    params.speckle_density = raw.parse_or("bleed_speckle", params.speckle_density)?;
    Ok(params)
}

fn parse_inscription(raw: &RawConfig) -> Result<Option<InscriptionSpec>> {
    let upper = match (raw.get("upper_text"), raw.get("upper_recipient")) {
        (Some(text), _) => Some(UpperInscription {
            recipient: text.to_string(),
            honorific: String::new(),
            humble: String::new(),
        }),
        (None, Some(name)) => {
            let mut upper = UpperInscription::new(name);
            if let Some(v) = raw.get("upper_honorific") {
                upper.honorific = v.to_string();
            }
            if let Some(v) = raw.get("upper_humble") {
                upper.humble = v.to_string();
            }
            Some(upper)
        }
        (None, None) => None,
    };
    let lower = match raw.get("lower_author") {
        Some(author) => {
            let mut lower = LowerInscription::new(author);
            lower.columns = raw.parse_or("lower_columns", lower.columns)?;
            lower.date = raw
                .get("lower_date")
                .map(|_| raw.parse_value("lower_date"))
                .transpose()?;
            lower.season = parse_bool(raw.get("lower_season"));
            lower.location = raw.get("lower_location").map(str::to_string);
            Some(lower)
        }
        None => None,
    };
    if upper.is_none() && lower.is_none() {
        return Ok(None);
    }
    Ok(Some(InscriptionSpec {
        upper,
        lower,
        layout: raw.parse_or("inscription_layout", InscriptionLayout::default())?,
        size: raw.parse_or("inscription_size", 24.0)?,
        color: parse_color(raw.get("inscription_color"), INSCRIPTION_COLOR)?,
    }))
}

fn parse_color(value: Option<&str>, default: RgbColor) -> Result<RgbColor> {
    match value {
        Some(v) if !v.is_empty() => RgbColor::parse(v),
        _ => Ok(default),
    }
}

fn parse_bool(value: Option<&str>) -> bool {
    matches!(value, Some(v) if v.trim() == "1")
}

fn parse_fraction(key: &str, value: &str) -> Result<f32> {
    let v = value
        .parse::<f32>()
        .map_err(|err| anyhow!("parse {} -> {}", key, err))?;
    if !(0.0..=1.0).contains(&v) {
        return Err(anyhow!("{} must lie in [0, 1], got {}", key, v));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalligraphyError;

    const SAMPLE: &str = r#"
# 小幅宣纸
width = 400
height = 600
material = fibrous
roughness = 0.5
seed = 42
text = 春眠不觉晓 处处闻啼鸟   # inline comment
text_color=#222
text_rows = 5
font1 = kai.ttf
font3 = zhuan.ttf
font3_shift = 0.25
seal1_text = 上官婉儿
seal1_x = 50
seal1_y = 50
seal1_size = 100
seal1_aging = 0.3
seal2_text = 闲云
seal2_layout = ring
seal2_penetration = 0.4
bleed_preset = traditional
bleed_intensity = 0.35
"#;

    #[test]
    fn parse_line_strips_comments_and_spaces() {
        assert_eq!(parse_line("  # note"), None);
        assert_eq!(
            parse_line("text = 床 前 # x"),
            Some(("text".into(), "床前".into()))
        );
        assert_eq!(
            parse_line("text_color=#112233"),
            Some(("text_color".into(), "#112233".into()))
        );
    }

    #[test]
    fn loads_sample_config() {
        let cfg = ArtworkConfig::from_raw(&RawConfig::parse("sample.cfg", SAMPLE)).unwrap();
        cfg.validate().unwrap();
        assert_eq!((cfg.width, cfg.height), (400, 600));
        assert_eq!(cfg.material, MaterialProfile::Xuan);
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.text.content, "春眠不觉晓处处闻啼鸟");
        assert_eq!(cfg.text.color, RgbColor::new(0x22, 0x22, 0x22));
        assert_eq!(cfg.text.rows, 5);
        assert_eq!(cfg.fonts.len(), 2);
        assert_eq!(cfg.fonts[1].id, 3);
        assert!((cfg.fonts[1].baseline_shift - 0.25).abs() < 1e-6);
        assert_eq!(cfg.seals.len(), 2);
        assert_eq!(cfg.seals[0].aging, Some(0.3));
        assert!(matches!(cfg.seals[1].layout(), SealLayout::Ring { .. }));
        assert_eq!(cfg.seals[1].penetration, Some(0.4));
        assert_eq!(cfg.bleed.bias, Some(DirectionalBias::GRAVITY));
        assert!((cfg.bleed.intensity - 0.35).abs() < 1e-6);
    }

    #[test]
    fn inscription_keys() {
        let raw = RawConfig::parse(
            "ins.cfg",
            "upper_recipient = 李白\nlower_author = 某某\nlower_columns = 3\n\
             lower_date = 2024-08-15\nlower_location = 兰亭\ninscription_layout = modern\n",
        );
        let cfg = ArtworkConfig::from_raw(&raw).unwrap();
        cfg.validate().unwrap();
        let ins = cfg.inscription.unwrap();
        assert_eq!(ins.layout, InscriptionLayout::Modern);
        assert_eq!(ins.size, 24.0);
        assert_eq!(ins.upper.unwrap().honorific, "先生");
        let lower = ins.lower.unwrap();
        assert_eq!(lower.columns().len(), 3);
        assert_eq!(lower.date.map(|d| d.month()), Some(8));

        assert!(ArtworkConfig::demo().unwrap().inscription.is_none());
        let raw = RawConfig::parse("bad.cfg", "lower_author = 某\nlower_date = 2024-14-01");
        assert!(ArtworkConfig::from_raw(&raw).is_err());
        let raw = RawConfig::parse("bad.cfg", "lower_author = 某\nlower_columns = 5");
        assert!(ArtworkConfig::from_raw(&raw).unwrap().validate().is_err());
    }

    #[test]
    fn bad_seal_glyph_count_is_reported() {
        let raw = RawConfig::parse("bad.cfg", "seal1_text = 三个字");
        let err = ArtworkConfig::from_raw(&raw).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CalligraphyError>(),
            Some(CalligraphyError::InvalidGlyphCount { actual: 3, .. })
        ));
    }

    #[test]
    fn non_ascii_color_is_an_error() {
        let raw = RawConfig::parse("bad.cfg", "text_color=#中中中中中中");
        assert!(ArtworkConfig::from_raw(&raw).is_err());
    }

    #[test]
    fn unknown_material_and_preset_fail() {
        let raw = RawConfig::parse("bad.cfg", "material = silk");
        assert!(ArtworkConfig::from_raw(&raw).is_err());
        let raw = RawConfig::parse("bad.cfg", "bleed_preset = soggy");
        assert!(ArtworkConfig::from_raw(&raw).is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut cfg = ArtworkConfig::demo().unwrap();
        cfg.validate().unwrap();
        cfg.roughness = 1.5;
        assert!(cfg.validate().is_err());
        let mut cfg = ArtworkConfig::demo().unwrap();
        cfg.text.area.width = 1000.0;
        assert!(cfg.validate().is_err());
    }
}
