//! A world of scripted entities.

use crate::settings::{HookSettings, Settings};
use bytemuck::{Pod, Zeroable};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use tether_core::define_component;
use tether_core::ecs::{Entity, World};
use tether_script::{
    component_kinds, component_library, EntityHandle, Handle, Library, Marshaler, NativeFunction,
    ScriptComponent, ScriptError, ScriptRuntime, Table, WorldRegistry,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}
define_component!(Position, "Position");

#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}
define_component!(Velocity, "Velocity");

fn xy_table(x: f32, y: f32) -> Table {
    Table::new().with("x", x).with("y", y)
}

fn patch_xy(table: &Table, x: &mut f32, y: &mut f32) {
    if let Some(value) = table.number("x") {
        *x = value as f32;
    }
    if let Some(value) = table.number("y") {
        *y = value as f32;
    }
}

impl ScriptComponent for Position {
    fn serialize(&self) -> Table {
        xy_table(self.x, self.y)
    }

    fn deserialize(table: &Table, into: &mut Self) {
        patch_xy(table, &mut into.x, &mut into.y);
    }
}

impl ScriptComponent for Velocity {
    fn serialize(&self) -> Table {
        xy_table(self.x, self.y)
    }

    fn deserialize(table: &Table, into: &mut Self) {
        patch_xy(table, &mut into.x, &mut into.y);
    }
}

component_kinds! {
    /// Components scripts can read and write.
    pub enum GameKinds {
        Position => Position,
        Velocity => Velocity,
    }
}

/// `Log.info(message)` and `Log.warn(message)`.
pub fn log_library() -> Library {
    Library::new("Log")
        .with_function(
            "info",
            NativeFunction::new(1, |stack| {
                let message: String = stack.pop()?;
                tracing::info!(target: "script", "{message}");
                Ok(0)
            }),
        )
        .with_function(
            "warn",
            NativeFunction::new(1, |stack| {
                let message: String = stack.pop()?;
                tracing::warn!(target: "script", "{message}");
                Ok(0)
            }),
        )
}

struct Scripted {
    entity: Entity,
    this: Table,
    runtime: ScriptRuntime,
}

pub struct Scene {
    world: Rc<RefCell<World>>,
    scripted: Vec<Scripted>,
    hooks: HookSettings,
    tick_seconds: f64,
}

impl Scene {
    /// Spawn one entity per script in `settings`. Scripts that fail to load
    /// leave their entity unscripted.
    pub fn new(settings: &Settings) -> Result<Self, ScriptError> {
        let mut world = World::new();
        let marshaler = Rc::new(Marshaler::<GameKinds>::resolve(&mut world));
        let world = Rc::new(RefCell::new(world));

        let worlds = Rc::new(WorldRegistry::new());
        let world_handle = worlds.insert(world.clone());
        let components = component_library(worlds, marshaler);
        let log = log_library();

        let mut scene = Self {
            world,
            scripted: Vec::new(),
            hooks: settings.hooks.clone(),
            tick_seconds: settings.tick_seconds,
        };
        for (index, path) in settings.script_paths().enumerate() {
            let origin = Position {
                x: 0.0,
                y: index as f32,
            };
            scene.spawn_scripted(&path, origin, world_handle, &components, &log)?;
        }
        Ok(scene)
    }

    fn spawn_scripted(
        &mut self,
        path: &Path,
        origin: Position,
        world_handle: Handle,
        components: &Library,
        log: &Library,
    ) -> Result<(), ScriptError> {
        let entity = tether_core::spawn!(self.world.borrow_mut(), origin, Velocity::default());
        let runtime = ScriptRuntime::from_file(path, &[components, log])?;
        if !runtime.good() {
            tracing::warn!(script = %path.display(), ?entity, "entity left without a script");
            return Ok(());
        }

        let this = EntityHandle::new(entity, world_handle).to_table(components);
        self.scripted.push(Scripted {
            entity,
            this,
            runtime,
        });
        Ok(())
    }

    pub fn world(&self) -> &Rc<RefCell<World>> {
        &self.world
    }

    pub fn scripted_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.scripted.iter().map(|s| s.entity)
    }

    pub fn start(&self) {
        for scripted in &self.scripted {
            scripted
                .runtime
                .run_hook(&self.hooks.start, (scripted.this.clone(),));
        }
    }

    pub fn tick(&self) {
        for scripted in &self.scripted {
            scripted
                .runtime
                .run_hook(&self.hooks.update, (scripted.this.clone(), self.tick_seconds));
        }
    }

    pub fn run(&self, ticks: u32) {
        self.start();
        for _ in 0..ticks {
            self.tick();
        }
    }

    pub fn position(&self, entity: Entity) -> Option<Position> {
        self.world.borrow().get::<Position>(entity)
    }
}
