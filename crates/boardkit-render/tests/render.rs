//! Frame composition checks against a recording surface.

use boardkit_core::{Engine, EngineConfig, Modifiers, SequentialIds, SerializableColor, ToolKind};
use boardkit_render::{
    DrawCommand, HIGHLIGHTER_ALPHA, RecordingSurface, RenderContext, RenderOutcome, SceneRenderer,
    fit_background,
};
use kurbo::{Point, Size};

const VIEWPORT: Size = Size::new(200.0, 200.0);

fn engine(config: EngineConfig) -> Engine {
    let mut engine = Engine::new(config).with_id_generator(Box::new(SequentialIds::new("r")));
    engine.set_viewport_size(VIEWPORT.width, VIEWPORT.height);
    engine
}

fn view(engine: &Engine, x: f64, y: f64) -> Point {
    engine.canvas().camera.world_to_screen(Point::new(x, y))
}

fn draw(engine: &mut Engine, tool: ToolKind, from: (f64, f64), to: (f64, f64)) {
    engine.set_tool(tool);
    let start = view(engine, from.0, from.1);
    let end = view(engine, to.0, to.1);
    engine.pointer_down(start, Modifiers::NONE);
    engine.pointer_move(start.lerp(end, 0.5));
    engine.pointer_up(end);
}

fn frame(engine: &Engine) -> Vec<DrawCommand> {
    let mut surface = RecordingSurface::new(VIEWPORT);
    let outcome = SceneRenderer::new().render(&mut surface, &RenderContext::from_engine(engine));
    assert_eq!(outcome, RenderOutcome::Painted);
    assert_eq!(surface.depth(), 0);
    surface.take_commands()
}

fn names(commands: &[DrawCommand]) -> Vec<&'static str> {
    commands.iter().map(DrawCommand::name).collect()
}

#[test]
fn empty_frame_order() {
    let engine = engine(EngineConfig::default());
    let commands = frame(&engine);
    assert_eq!(
        names(&commands),
        vec!["clear", "fill-rect", "save", "transform", "restore"]
    );
    assert_eq!(
        commands[1],
        DrawCommand::FillRect {
            rect: kurbo::Rect::new(0.0, 0.0, 200.0, 200.0),
            color: [255, 255, 255, 255],
        }
    );
    assert_eq!(
        commands[3],
        DrawCommand::Transform(engine.canvas().camera.transform())
    );
}

#[test]
fn transparent_background_is_not_filled() {
    let config = EngineConfig::from_json(r#"{"backgroundColor": "transparent"}"#).unwrap();
    let commands = frame(&engine(config));
    assert!(!names(&commands).contains(&"fill-rect"));
}

#[test]
fn background_image_sits_under_the_elements() {
    let config = EngineConfig::from_json(
        r#"{"backgroundImage": {"source": "plan.png", "width": 320, "height": 160}}"#,
    )
    .unwrap();
    let mut engine = engine(config);
    draw(&mut engine, ToolKind::Rectangle, (0.0, 0.0), (40.0, 40.0));

    let commands = frame(&engine);
    let image = commands
        .iter()
        .position(|c| matches!(c, DrawCommand::DrawImage { .. }))
        .unwrap();
    let transform = commands
        .iter()
        .position(|c| matches!(c, DrawCommand::Transform(_)))
        .unwrap();
    let element = commands
        .iter()
        .position(|c| matches!(c, DrawCommand::StrokePath { .. }))
        .unwrap();
    assert!(transform < image && image < element);
    assert_eq!(
        commands[image],
        DrawCommand::DrawImage {
            source: "plan.png".into(),
            dest: fit_background(Size::new(320.0, 160.0), VIEWPORT),
        }
    );
}

#[test]
fn elements_paint_in_z_order() {
    let mut engine = engine(EngineConfig::default());
    engine.set_stroke_color(SerializableColor::new(255, 0, 0, 255));
    draw(&mut engine, ToolKind::Rectangle, (0.0, 0.0), (40.0, 40.0));
    engine.set_stroke_color(SerializableColor::new(0, 0, 255, 255));
    draw(&mut engine, ToolKind::Ellipse, (10.0, 10.0), (50.0, 50.0));

    let colors: Vec<[u8; 4]> = frame(&engine)
        .iter()
        .filter(|c| matches!(c, DrawCommand::StrokePath { .. }))
        .filter_map(DrawCommand::color)
        .collect();
    assert_eq!(colors, vec![[255, 0, 0, 255], [0, 0, 255, 255]]);
}

#[test]
fn eraser_paints_with_background() {
    let config = EngineConfig::from_json(r##"{"backgroundColor": "#102030"}"##).unwrap();
    let mut engine = engine(config);
    draw(&mut engine, ToolKind::Eraser, (0.0, 0.0), (30.0, 10.0));

    let strokes: Vec<_> = frame(&engine)
        .into_iter()
        .filter(|c| matches!(c, DrawCommand::StrokePath { .. }))
        .collect();
    assert_eq!(strokes.len(), 1);
    assert_eq!(strokes[0].color(), Some([0x10, 0x20, 0x30, 255]));
}

#[test]
fn eraser_on_transparent_board_paints_white() {
    let config = EngineConfig::from_json(r#"{"backgroundColor": "transparent"}"#)
        .unwrap()
        .with_initial_scene(
            r#"[{"id":"e","kind":"eraser","points":[{"x":0,"y":0},{"x":20,"y":5}]}]"#,
        );
    let strokes: Vec<_> = frame(&engine(config))
        .into_iter()
        .filter(|c| matches!(c, DrawCommand::StrokePath { .. }))
        .collect();
    assert_eq!(strokes.len(), 1);
    assert_eq!(strokes[0].color(), Some([255, 255, 255, 255]));
}

#[test]
fn highlighter_strokes_are_translucent() {
    let scene = r##"[
        {"id":"h","kind":"freehand","points":[{"x":0,"y":0},{"x":20,"y":5}],
         "color":"#ff0000","brushType":"highlighter"},
        {"id":"p","kind":"freehand","points":[{"x":0,"y":10},{"x":20,"y":15}],
         "color":"#ff0000","brushType":"pen"}
    ]"##;
    let engine = engine(EngineConfig::default().with_initial_scene(scene));
    assert_eq!(engine.scene().len(), 2);

    let colors: Vec<[u8; 4]> = frame(&engine)
        .iter()
        .filter(|c| matches!(c, DrawCommand::StrokePath { .. }))
        .filter_map(DrawCommand::color)
        .collect();
    let alpha = (255.0 * HIGHLIGHTER_ALPHA).round() as u8;
    assert_eq!(colors, vec![[255, 0, 0, alpha], [255, 0, 0, 255]]);
}

#[test]
fn in_progress_shape_is_drawn() {
    let mut engine = engine(EngineConfig::default());
    engine.set_tool(ToolKind::Rectangle);
    engine.pointer_down(view(&engine, 0.0, 0.0), Modifiers::NONE);
    engine.pointer_move(view(&engine, 30.0, 30.0));
    assert!(engine.scene().is_empty());

    let strokes = frame(&engine)
        .iter()
        .filter(|c| matches!(c, DrawCommand::StrokePath { .. }))
        .count();
    assert_eq!(strokes, 1);
}

#[test]
fn path_preview_has_live_segment() {
    let mut engine = engine(EngineConfig::default());
    engine.set_tool(ToolKind::Path);
    for (x, y) in [(0.0, 0.0), (20.0, 0.0)] {
        let p = view(&engine, x, y);
        engine.pointer_down(p, Modifiers::NONE);
        engine.pointer_up(p);
    }
    engine.pointer_move(view(&engine, 20.0, 30.0));

    let commands = frame(&engine);
    let dashed: Vec<_> = commands
        .iter()
        .filter(|c| matches!(c, DrawCommand::StrokePath { dashes, .. } if !dashes.is_empty()))
        .collect();
    assert_eq!(dashed.len(), 1, "one live segment to the pointer");
    let dots = commands
        .iter()
        .filter(|c| matches!(c, DrawCommand::FillPath { .. }))
        .count();
    assert_eq!(dots, 2);
}

#[test]
fn selection_overlays_follow_elements() {
    let mut engine = engine(EngineConfig::default());
    draw(&mut engine, ToolKind::Rectangle, (0.0, 0.0), (40.0, 40.0));
    draw(&mut engine, ToolKind::Line, (60.0, 0.0), (90.0, 30.0));
    engine.set_tool(ToolKind::Select);
    engine.select_all();

    let commands = frame(&engine);
    let first_overlay = commands
        .iter()
        .position(|c| matches!(c, DrawCommand::FillPath { color: [255, 255, 255, 255], .. }))
        .unwrap();
    let strokes: Vec<usize> = commands
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, DrawCommand::StrokePath { .. }))
        .map(|(i, _)| i)
        .collect();
    // The first two strokes are the elements themselves.
    assert!(first_overlay > strokes[1]);

    // Four corner handles plus one endpoint handle.
    let handles = commands
        .iter()
        .filter(|c| matches!(c, DrawCommand::FillPath { color: [255, 255, 255, 255], .. }))
        .count();
    assert_eq!(handles, 5);

    // Dashed bounds only for the rectangle.
    let dashed_bounds = commands
        .iter()
        .filter(|c| matches!(c, DrawCommand::StrokePath { dashes, .. } if !dashes.is_empty()))
        .count();
    assert_eq!(dashed_bounds, 1);
}

#[test]
fn marquee_is_drawn_while_selecting() {
    let mut engine = engine(EngineConfig::default());
    engine.set_tool(ToolKind::Select);
    engine.pointer_down(view(&engine, -50.0, -50.0), Modifiers::NONE);
    engine.pointer_move(view(&engine, 10.0, 10.0));

    let commands = frame(&engine);
    let names = names(&commands);
    assert_eq!(names[names.len() - 3..], ["fill-path", "stroke-path", "restore"]);
}

#[test]
fn text_and_draft_render_as_text() {
    let mut engine = engine(EngineConfig::default());
    engine.set_tool(ToolKind::Text);
    let p = view(&engine, 10.0, 30.0);
    engine.pointer_down(p, Modifiers::NONE);
    engine.pointer_up(p);
    engine.set_text_draft("draft");

    let texts: Vec<_> = frame(&engine)
        .into_iter()
        .filter_map(|c| match c {
            DrawCommand::FillText { text, origin, .. } => Some((text, origin)),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec![("draft".to_string(), Point::new(10.0, 30.0))]);

    engine.commit_text("one\ntwo");
    let lines = frame(&engine)
        .iter()
        .filter(|c| matches!(c, DrawCommand::FillText { .. }))
        .count();
    assert_eq!(lines, 2);
}

#[test]
fn lost_surface_skips_frame() {
    let engine = engine(EngineConfig::default());
    let mut surface = RecordingSurface::new(VIEWPORT);
    surface.set_available(false);
    let mut renderer = SceneRenderer::new();
    let outcome = renderer.render(&mut surface, &RenderContext::from_engine(&engine));
    assert_eq!(outcome, RenderOutcome::Skipped);
    assert!(surface.commands().is_empty());
    assert_eq!(renderer.frame_count(), 0);
}
