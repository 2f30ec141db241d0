//! BoardKit Core Library
//!
//! Platform-agnostic scene model, input state machine and sync bridge for
//! the BoardKit whiteboard. Rendering lives in `boardkit-render`.

pub mod camera;
pub mod canvas;
pub mod clipboard;
pub mod config;
pub mod engine;
pub mod event_handler;
pub mod ids;
pub mod input;
pub mod scene;
pub mod selection;
pub mod shapes;
pub mod sync;
pub mod tools;

pub use camera::Camera;
pub use canvas::Canvas;
pub use clipboard::{Clipboard, PASTE_OFFSET};
pub use config::{BackgroundImage, ConfigError, EngineConfig};
pub use engine::Engine;
pub use event_handler::{EventHandler, InteractionState, SelectionRect, TextEdit};
pub use ids::{IdGenerator, SequentialIds, UuidGenerator};
pub use input::{Command, InputState, Key, KeyEvent, Modifiers, PointerEvent};
pub use scene::{Scene, SceneChange, SceneError, SceneResult};
pub use selection::{Handle, HandleKind, ManipulationState, MultiMoveState};
pub use shapes::{ElementRecord, SerializableColor, Shape, ShapeId};
pub use sync::{
    Inbound, MemoryPersistence, MergePolicy, Persistence, PersistenceError, PersistenceResult,
    Subscription, SyncBridge,
};
pub use tools::{ToolKind, ToolManager};
