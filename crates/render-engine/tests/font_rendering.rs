use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};

use subburn_project_model::caption::Caption;
use subburn_project_model::style::StyleConfig;
use subburn_render_engine::compositor::WRAP_WIDTH_RATIO;
use subburn_render_engine::{
    draw_caption, layout_caption, render_tick, Canvas, CaptionScene, DecodeEngine,
    DrawingSurface, SolidColorEngine, TickReport,
};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

fn surface(width: u32, height: u32) -> DrawingSurface {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("fonts")
        .join("DejaVuSans.ttf");
    let font = DrawingSurface::load_font(&path).expect("fixture font should load");
    DrawingSurface::new(width, height).with_font(font)
}

#[test]
fn wrapped_lines_stay_under_budget_with_real_metrics() {
    let canvas = surface(640, 360);
    let text = "the quick brown fox jumps over the lazy dog while the narrator keeps on talking";
    let layout = layout_caption(&canvas, text, &StyleConfig::default());
    let budget = WRAP_WIDTH_RATIO * 640.0;

    assert!(layout.lines.len() > 1);
    for line in &layout.lines {
        assert!(line.width > 0.0);
        assert!(
            line.width < budget || !line.text.contains(' '),
            "'{}' is {} px wide",
            line.text,
            line.width
        );
    }
    let rejoined: Vec<&str> = layout.lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(rejoined.join(" "), text);
}

#[test]
fn caption_text_is_drawn_inside_its_block() {
    let mut canvas = surface(1280, 720);
    let caption = Caption::new("a", 0.0, 2.0, "Hello world");
    let style = StyleConfig::default();
    let layout = layout_caption(&canvas, &caption.text, &style);

    assert_eq!(draw_caption(&mut canvas, &caption, &style), 1);

    let line = &layout.lines[0];
    let white: Vec<(u32, u32)> = canvas
        .image()
        .enumerate_pixels()
        .filter(|(_, _, p)| **p == WHITE)
        .map(|(x, y, _)| (x, y))
        .collect();
    assert!(!white.is_empty());
    for (x, y) in white {
        assert!((x as f64 - line.center_x).abs() <= line.width / 2.0 + 2.0);
        assert!((y as f64 - line.center_y).abs() <= layout.line_height / 2.0);
    }
}

#[test]
fn oversized_border_keeps_render_loop_drawing() {
    let engine: Arc<Mutex<dyn DecodeEngine>> = Arc::new(Mutex::new(SolidColorEngine::new(
        640,
        360,
        Rgba([16, 16, 16, 255]),
        10.0,
    )));
    let canvas = Mutex::new(surface(640, 360));
    let thick = StyleConfig {
        border_width: 1e9,
        ..Default::default()
    };
    let huge = StyleConfig {
        font_size: 1e9,
        ..thick.clone()
    };

    for style in [thick, huge] {
        let scene = CaptionScene::new(vec![Caption::new("a", 0.0, 5.0, "Wide outline")], style);
        for _ in 0..2 {
            let report = render_tick(&*engine, &canvas, &scene);
            assert!(
                matches!(report, TickReport::Drawn { lines, .. } if lines > 0),
                "got {report:?}"
            );
        }
    }
    assert!(!canvas.is_poisoned());
}

#[test]
fn oversized_border_is_capped_not_dropped() {
    let mut canvas = surface(640, 360);
    canvas.draw_frame(&RgbaImage::from_pixel(640, 360, Rgba([16, 16, 16, 255])));
    let caption = Caption::new("a", 0.0, 5.0, "Wide outline");
    let style = StyleConfig {
        border_width: 1e9,
        ..Default::default()
    };

    assert_eq!(draw_caption(&mut canvas, &caption, &style), 1);
    // 200 px above the text is inside the capped outline.
    assert_eq!(canvas.image().get_pixel(320, 100), &Rgba([0, 0, 0, 255]));
}
