use xuanzhi::ArtworkPipeline;
use xuanzhi::color::{is_ink, luma};
use xuanzhi::config::ArtworkConfig;
use xuanzhi::fonts::PlaceholderGlyphs;
use xuanzhi::texture::MaterialProfile;

const SEED: u64 = 2024;

fn scenario(bleed: f32) -> ArtworkConfig {
    let mut cfg = ArtworkConfig::demo().unwrap();
    cfg.material = "fibrous".parse::<MaterialProfile>().unwrap();
    cfg.roughness = 0.5;
    cfg.bleed.intensity = bleed;
    cfg.validate().unwrap();
    cfg
}

#[test]
fn demo_matches_the_reference_scenario() {
    let cfg = scenario(0.3);
    assert_eq!((cfg.width, cfg.height), (400, 600));
    assert_eq!(cfg.material, MaterialProfile::Xuan);
    assert_eq!(cfg.seals.len(), 1);
    assert_eq!(cfg.seals[0].anchor, (50, 50));
    assert_eq!(cfg.seals[0].size, 100);
    assert_eq!(cfg.seals[0].glyphs().len(), 4);
}

#[test]
fn torn_edge_survives_the_pipeline() {
    let (art, _) = ArtworkPipeline
        .render(&scenario(0.3), &PlaceholderGlyphs, SEED)
        .unwrap();
    let img = art.image();
    let (w, h) = img.dimensions();
    assert_eq!(art.alpha_at(0, 0), 0);
    assert_eq!(art.alpha_at(w / 2, h / 2), 255);

    let mut border_alphas = std::collections::BTreeSet::new();
    for y in 0..h {
        for x in (0..20).chain(w - 20..w) {
            border_alphas.insert(art.alpha_at(x, y));
        }
    }
    assert!(border_alphas.len() > 2, "{border_alphas:?}");
    assert!(border_alphas.iter().any(|&a| a > 0 && a < 255));
}

#[test]
fn seal_is_red_near_its_anchor() {
    let (art, _) = ArtworkPipeline
        .render(&scenario(0.3), &PlaceholderGlyphs, SEED)
        .unwrap();
    let img = art.image();
    let mut red = 0usize;
    let mut total = 0usize;
    for y in 50..150 {
        for x in 50..150 {
            let [r, g, b, _] = img.get_pixel(x, y).0;
            total += 1;
            if r > 130 && g < 80 && b < 80 {
                red += 1;
            }
        }
    }
    // the white glyphs take part of the body; most of it stays red
    assert!(red * 2 > total, "{red}/{total} red");
    let [r, g, _, _] = img.get_pixel(55, 55).0;
    assert!(r > 150 && g < 60);
}

#[test]
fn bleed_darkens_paper_next_to_writing() {
    let (dry, _) = ArtworkPipeline
        .render(&scenario(0.0), &PlaceholderGlyphs, SEED)
        .unwrap();
    let (wet, plan) = ArtworkPipeline
        .render(&scenario(0.3), &PlaceholderGlyphs, SEED)
        .unwrap();
    assert!(!plan.placements.is_empty());

    let (dry, wet) = (dry.image(), wet.image());
    let (w, h) = dry.dimensions();
    let near_ink = |x: u32, y: u32| {
        let (x0, y0) = (x.saturating_sub(2), y.saturating_sub(2));
        (y0..(y + 3).min(h)).any(|yy| (x0..(x + 3).min(w)).any(|xx| is_ink(dry.get_pixel(xx, yy))))
    };

    let mut delta = 0i64;
    let mut samples = 0i64;
    for y in 0..h {
        for x in 0..w {
            let before = dry.get_pixel(x, y);
            if before.0[3] < 255 || is_ink(before) || !near_ink(x, y) {
                continue;
            }
            let after = wet.get_pixel(x, y);
            delta += i64::from(luma(before[0], before[1], before[2]))
                - i64::from(luma(after[0], after[1], after[2]));
            samples += 1;
        }
    }
    assert!(samples > 0);
    assert!(delta > 0, "mean darkening {}", delta as f64 / samples as f64);

    for (a, b) in dry.pixels().zip(wet.pixels()) {
        if is_ink(a) {
            assert!(is_ink(b));
        }
        assert_eq!(a.0[3], b.0[3]);
    }
}

#[test]
fn unknown_material_is_rejected() {
    assert!("velvet".parse::<MaterialProfile>().is_err());
}
