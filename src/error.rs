pub type CalligraphyResult<T> = Result<T, CalligraphyError>;

#[derive(thiserror::Error, Debug)]
pub enum CalligraphyError {
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: i64, height: i64 },

    #[error("invalid glyph count: layout {layout} needs {expected}, got {actual}")]
    InvalidGlyphCount {
        layout: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("unsupported material profile '{0}'")]
    UnsupportedMaterialProfile(String),

    #[error("font unavailable: {0}")]
    FontUnavailable(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CalligraphyError {
    pub fn dimensions(width: impl Into<i64>, height: impl Into<i64>) -> Self {
        Self::InvalidDimensions {
            width: width.into(),
            height: height.into(),
        }
    }

    pub fn glyph_count(layout: &'static str, expected: usize, actual: usize) -> Self {
        Self::InvalidGlyphCount {
            layout,
            expected,
            actual,
        }
    }

    pub fn font(msg: impl Into<String>) -> Self {
        Self::FontUnavailable(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Rejects zero-area rasters before any allocation happens.
pub fn check_dimensions(width: u32, height: u32) -> CalligraphyResult<()> {
    if width == 0 || height == 0 {
        return Err(CalligraphyError::dimensions(width, height));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            CalligraphyError::dimensions(0, 5)
                .to_string()
                .contains("invalid dimensions: 0x5")
        );
        assert!(
            CalligraphyError::glyph_count("square", 4, 3)
                .to_string()
                .contains("needs 4, got 3")
        );
        assert!(
            CalligraphyError::UnsupportedMaterialProfile("silk".into())
                .to_string()
                .contains("'silk'")
        );
        assert!(
            CalligraphyError::font("kai.ttf")
                .to_string()
                .contains("font unavailable:")
        );
    }

    #[test]
    fn zero_area_is_rejected() {
        assert!(check_dimensions(10, 10).is_ok());
        assert!(matches!(
            check_dimensions(0, 10),
            Err(CalligraphyError::InvalidDimensions { width: 0, height: 10 })
        ));
        assert!(check_dimensions(10, 0).is_err());
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = CalligraphyError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
