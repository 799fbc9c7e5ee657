use foldlens_protocols::{OverlayCandidate, OverlayReason, default_device};

use super::*;

const CTA_CAP_PCT: f64 = 6.0;

fn audit(facts: &FoldFacts, overlay: &OverlayOutcome) -> FoldAuditOutcome {
    audit_fold(facts, overlay, default_device(), CTA_CAP_PCT)
}

fn bar_overlay(rect: Rect) -> OverlayOutcome {
    OverlayOutcome {
        candidates: vec![OverlayCandidate {
            rect,
            reason: OverlayReason::BottomBar,
            selector: Some("div.sticky-bar".to_string()),
        }],
        hidden: 1,
        degraded: false,
    }
}

#[test]
fn test_empty_page_audits_to_zero() {
    let outcome = audit(&FoldFacts::default(), &OverlayOutcome::default());
    assert_eq!(outcome.ux.fold_coverage_pct, 0.0);
    assert_eq!(outcome.ux.pre_hide_coverage_pct, 0.0);
    assert!(!outcome.ux.first_cta_in_fold);
    assert_eq!(outcome.ux.small_tap_targets, 0);
    assert!(outcome.ux.min_font_px.is_none());
    assert!(outcome.rects.is_empty());
}

#[test]
fn test_half_fold_of_text_covers_half_the_grid() {
    // Device is 393x852; a text block over the top half rasterizes to
    // exactly the top 16 of 32 rows.
    let facts = FoldFacts {
        glyph_rects: vec![Rect::new(0.0, 0.0, 393.0, 426.0)],
        ..FoldFacts::default()
    };
    let outcome = audit(&facts, &OverlayOutcome::default());
    assert_eq!(outcome.ux.fold_coverage_pct, 50.0);
    // Without overlays the two coverage numbers agree.
    assert_eq!(outcome.ux.pre_hide_coverage_pct, 50.0);
}

#[test]
fn test_glyph_erosion_drops_hairline_fragments() {
    let facts = FoldFacts {
        // 2px tall underline fragment erodes to nothing.
        glyph_rects: vec![Rect::new(10.0, 10.0, 200.0, 2.0)],
        ..FoldFacts::default()
    };
    let outcome = audit(&facts, &OverlayOutcome::default());
    assert_eq!(outcome.ux.fold_coverage_pct, 0.0);
    assert!(outcome.rects.glyphs.is_empty());
}

#[test]
fn test_cta_cap_limits_a_fold_sized_button() {
    let device = default_device();
    let facts = FoldFacts {
        cta_rects: vec![Rect::new(0.0, 0.0, device.width(), device.height())],
        ..FoldFacts::default()
    };
    let outcome = audit(&facts, &OverlayOutcome::default());
    // Uncapped this would be 100%; capped to 6% of the fold area the
    // rasterized footprint stays in the same ballpark.
    assert!(outcome.ux.fold_coverage_pct > 0.0);
    assert!(
        outcome.ux.fold_coverage_pct < 20.0,
        "cap failed: {}",
        outcome.ux.fold_coverage_pct
    );
    // The cap does not un-qualify the CTA itself.
    assert!(outcome.ux.first_cta_in_fold);
    let capped = outcome.rects.ctas[0];
    assert!(capped.area() <= device.fold_area() * (CTA_CAP_PCT / 100.0) * 1.001);
}

#[test]
fn test_first_cta_requires_full_containment() {
    let half_out = FoldFacts {
        cta_rects: vec![Rect::new(100.0, 820.0, 180.0, 60.0)],
        ..FoldFacts::default()
    };
    assert!(!audit(&half_out, &OverlayOutcome::default()).ux.first_cta_in_fold);

    let inside = FoldFacts {
        cta_rects: vec![Rect::new(100.0, 700.0, 180.0, 48.0)],
        ..FoldFacts::default()
    };
    assert!(audit(&inside, &OverlayOutcome::default()).ux.first_cta_in_fold);
}

#[test]
fn test_bottom_bar_shows_pre_hide_but_not_post_hide() {
    // Text on the top quarter, a consent bar pinned across the bottom.
    let facts = FoldFacts {
        glyph_rects: vec![Rect::new(0.0, 0.0, 393.0, 200.0)],
        ..FoldFacts::default()
    };
    let overlay = bar_overlay(Rect::new(0.0, 700.0, 393.0, 152.0));
    let outcome = audit(&facts, &overlay);

    assert_eq!(outcome.ux.fold_coverage_pct, 25.0);
    assert_eq!(outcome.ux.pre_hide_coverage_pct, 43.75);
    assert_eq!(outcome.ux.overlay_coverage_pct, 18.75);
    assert_eq!(outcome.ux.overlay_blockers, 1);
    assert!(!outcome.ux.overlay_scan_degraded);
}

#[test]
fn test_degraded_scan_zeroes_overlay_metrics_only() {
    let facts = FoldFacts {
        glyph_rects: vec![Rect::new(0.0, 0.0, 393.0, 426.0)],
        ..FoldFacts::default()
    };
    let outcome = audit(&facts, &OverlayOutcome::degraded());
    assert!(outcome.ux.overlay_scan_degraded);
    assert_eq!(outcome.ux.overlay_blockers, 0);
    assert_eq!(outcome.ux.overlay_coverage_pct, 0.0);
    // Content metrics are unaffected.
    assert_eq!(outcome.ux.fold_coverage_pct, 50.0);
}

#[test]
fn test_small_tap_targets_counted_with_chat_corner_exempt() {
    let facts = FoldFacts {
        actionable_rects: vec![
            // Small, in the fold: counts.
            Rect::new(10.0, 10.0, 40.0, 40.0),
            // Comfortable size: does not count.
            Rect::new(10.0, 80.0, 60.0, 60.0),
            // Small but fully inside the 120x120 bottom-right corner.
            Rect::new(300.0, 760.0, 36.0, 36.0),
            // Small but entirely below the fold.
            Rect::new(200.0, 900.0, 30.0, 30.0),
        ],
        ..FoldFacts::default()
    };
    let outcome = audit(&facts, &OverlayOutcome::default());
    assert_eq!(outcome.ux.small_tap_targets, 1);
}

#[test]
fn test_tap_threshold_is_strict() {
    let facts = FoldFacts {
        actionable_rects: vec![
            Rect::new(0.0, 0.0, 44.0, 44.0),
            Rect::new(0.0, 100.0, 43.9, 50.0),
        ],
        ..FoldFacts::default()
    };
    let outcome = audit(&facts, &OverlayOutcome::default());
    assert_eq!(outcome.ux.small_tap_targets, 1);
}

#[test]
fn test_hero_background_contributes_coverage() {
    let facts = FoldFacts {
        hero_rects: vec![Rect::new(0.0, 0.0, 393.0, 300.0)],
        ..FoldFacts::default()
    };
    let outcome = audit(&facts, &OverlayOutcome::default());
    assert!(outcome.ux.fold_coverage_pct > 30.0);
    assert_eq!(outcome.rects.hero_backgrounds.len(), 1);
}

#[test]
fn test_coverage_is_monotone_under_added_facts() {
    let base = FoldFacts {
        glyph_rects: vec![Rect::new(0.0, 0.0, 200.0, 100.0)],
        ..FoldFacts::default()
    };
    let richer = FoldFacts {
        media_rects: vec![Rect::new(0.0, 500.0, 393.0, 200.0)],
        ..base.clone()
    };
    let a = audit(&base, &OverlayOutcome::default()).ux.fold_coverage_pct;
    let b = audit(&richer, &OverlayOutcome::default()).ux.fold_coverage_pct;
    assert!(b >= a);
}

#[test]
fn test_fact_passthrough_fields() {
    let facts = FoldFacts {
        min_font_px: Some(11.0),
        max_font_px: Some(44.0),
        has_viewport_meta: true,
        uses_safe_area_insets: true,
        ..FoldFacts::default()
    };
    let ux = audit(&facts, &OverlayOutcome::default()).ux;
    assert_eq!(ux.min_font_px, Some(11.0));
    assert_eq!(ux.max_font_px, Some(44.0));
    assert!(ux.has_viewport_meta);
    assert!(ux.uses_safe_area_insets);
}

#[test]
fn test_facts_deserialize_from_sparse_program_payload() {
    let facts: FoldFacts = serde_json::from_value(serde_json::json!({
        "glyphRects": [{"x": 1.0, "y": 2.0, "width": 30.0, "height": 14.0}],
        "minFontPx": 12.5,
        "hasViewportMeta": true
    }))
    .unwrap();
    assert_eq!(facts.glyph_rects.len(), 1);
    assert_eq!(facts.min_font_px, Some(12.5));
    assert!(facts.max_font_px.is_none());
    assert!(facts.media_rects.is_empty());
    assert!(facts.has_viewport_meta);
    assert!(!facts.uses_safe_area_insets);
}
