//! Headless BoardKit demo.
//!
//! Two engines share an in-memory store. One draws, the other receives the
//! pushes and is painted onto a recording surface whose draw calls are
//! printed. Set `RUST_LOG=debug` to follow the sync traffic.

use boardkit_core::{
    Engine, EngineConfig, Key, KeyEvent, MemoryPersistence, Modifiers, SequentialIds, ToolKind,
};
use boardkit_render::{RecordingSurface, RenderContext, RenderOutcome, SceneRenderer};
use kurbo::{Point, Size};
use std::collections::BTreeMap;
use std::error::Error;
use std::rc::Rc;

const VIEWPORT: Size = Size::new(800.0, 600.0);

fn engine(prefix: &str, store: &MemoryPersistence) -> Result<Engine, Box<dyn Error>> {
    let config = EngineConfig::from_json(r##"{"sceneId": "demo", "strokeColor": "#1e1e1e"}"##)?;
    let mut engine = Engine::new(config).with_id_generator(Box::new(SequentialIds::new(prefix)));
    engine.set_viewport_size(VIEWPORT.width, VIEWPORT.height);
    engine.connect(Rc::new(store.clone()))?;
    Ok(engine)
}

fn stroke(engine: &mut Engine, tool: ToolKind, points: &[(f64, f64)]) {
    engine.set_tool(tool);
    let Some((first, rest)) = points.split_first() else {
        return;
    };
    engine.pointer_down(Point::from(*first), Modifiers::NONE);
    for point in rest {
        engine.pointer_move(Point::from(*point));
    }
    let last = rest.last().unwrap_or(first);
    engine.pointer_up(Point::from(*last));
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let store = MemoryPersistence::new();
    let mut alice = engine("alice", &store)?;
    let mut bob = engine("bob", &store)?;

    stroke(&mut alice, ToolKind::Rectangle, &[(100.0, 100.0), (300.0, 220.0)]);
    stroke(&mut alice, ToolKind::Ellipse, &[(350.0, 120.0), (480.0, 240.0)]);
    stroke(&mut alice, ToolKind::Arrow, &[(300.0, 160.0), (350.0, 180.0)]);
    stroke(
        &mut alice,
        ToolKind::Freehand,
        &[(120.0, 400.0), (160.0, 380.0), (200.0, 420.0), (240.0, 390.0)],
    );

    alice.set_tool(ToolKind::Text);
    alice.pointer_down(Point::new(520.0, 300.0), Modifiers::NONE);
    alice.pointer_up(Point::new(520.0, 300.0));
    alice.commit_text("hello\nboard");

    alice.set_tool(ToolKind::Path);
    for point in [(500.0, 450.0), (560.0, 420.0), (620.0, 470.0)] {
        alice.pointer_down(Point::from(point), Modifiers::NONE);
        alice.pointer_up(Point::from(point));
    }
    alice.key_down(&KeyEvent::plain(Key::Enter));

    let echoes = alice.poll_remote();
    let applied = bob.poll_remote();
    println!("store writes: {}", store.write_count());
    println!("alice applied {echoes} remote push(es), bob applied {applied}");

    // Bob selects everything so the overlays show up in the frame.
    bob.key_down(&KeyEvent::new(Key::Char('a'), Modifiers::CTRL));

    let mut surface = RecordingSurface::new(VIEWPORT);
    let mut renderer = SceneRenderer::new();
    let outcome = renderer.render(&mut surface, &RenderContext::from_engine(&bob));
    if outcome == RenderOutcome::Skipped {
        return Err("no surface".into());
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for command in surface.commands() {
        *counts.entry(command.name()).or_default() += 1;
    }
    println!("frame {}: {} draw call(s)", renderer.frame_count(), surface.commands().len());
    for (name, count) in counts {
        println!("  {name:<12} {count}");
    }

    let scene: serde_json::Value = serde_json::from_str(&bob.scene_json()?)?;
    println!("{}", serde_json::to_string_pretty(&scene)?);
    Ok(())
}
