//! The `Component` namespace: component access for scripts.
//!
//! ```js
//! function Update(self, dt) {
//!     var pos = Component.get(self, "Position");
//!     if (!pos.good) return;
//!     pos.x += dt;
//!     Component.set(self, pos);
//! }
//! ```
//!
//! `self` is an entity handle table (see [`EntityHandle::to_table`]). Kinds
//! are named by string or by the numeric id from `Component.id(name)`.
//! Requests scripts get wrong come back as `{ good: false, what }` or
//! `false`; none of them panic.

use crate::marshal::failure;
use crate::{
    ComponentKinds, ComponentStore, EntityHandle, Library, Marshaler, NativeFunction, Table, Value,
    WorldRegistry,
};
use std::rc::Rc;
use tether_core::ecs::ComponentId;

/// Build the `Component` library over `worlds`, marshaling the kinds of `K`.
pub fn component_library<S, K>(worlds: Rc<WorldRegistry<S>>, marshaler: Rc<Marshaler<K>>) -> Library
where
    S: ComponentStore + 'static,
    K: ComponentKinds,
{
    let get = {
        let worlds = worlds.clone();
        let marshaler = marshaler.clone();
        NativeFunction::new(2, move |stack| {
            let (handle, kind): (Table, Value) = stack.take()?;
            let result = get_component(&worlds, &marshaler, &handle, &kind);
            stack.push(result)?;
            Ok(1)
        })
    };

    let set = {
        let marshaler = marshaler.clone();
        NativeFunction::new(2, move |stack| {
            let (handle, component): (Table, Table) = stack.take()?;
            let written = match set_component(&worlds, &marshaler, &handle, &component) {
                Ok(()) => true,
                Err(what) => {
                    tracing::warn!(%what, "Component.set rejected");
                    false
                }
            };
            stack.push(written)?;
            Ok(1)
        })
    };

    let id = {
        let marshaler = marshaler.clone();
        NativeFunction::new(1, move |stack| {
            let name: String = stack.pop()?;
            let result = match lookup_named(&marshaler, &name) {
                Ok((_, id)) => Value::from(id),
                Err(what) => Value::from(failure(what)),
            };
            stack.push(result)?;
            Ok(1)
        })
    };

    let name = NativeFunction::new(1, move |stack| {
        let id: f64 = stack.pop()?;
        let result = match lookup_id(&marshaler, id) {
            Ok((kind, _)) => Value::from(kind.name()),
            Err(what) => Value::from(failure(what)),
        };
        stack.push(result)?;
        Ok(1)
    });

    Library::new("Component")
        .with_function("get", get)
        .with_function("set", set)
        .with_function("id", id)
        .with_function("name", name)
}

fn lookup_named<K: ComponentKinds>(
    marshaler: &Marshaler<K>,
    name: &str,
) -> Result<(K, ComponentId), String> {
    marshaler
        .kind_of_name(name)
        .and_then(|kind| Some((kind, marshaler.id_of(kind)?)))
        .ok_or_else(|| format!("no component kind named '{name}'"))
}

fn lookup_id<K: ComponentKinds>(
    marshaler: &Marshaler<K>,
    id: f64,
) -> Result<(K, ComponentId), String> {
    let valid = id.fract() == 0.0 && (0.0..=f64::from(ComponentId::MAX)).contains(&id);
    let id_u32 = id as ComponentId;
    match marshaler.kind_of_id(id_u32) {
        Some(kind) if valid => Ok((kind, id_u32)),
        _ => Err(format!("no component kind with id {id}")),
    }
}

fn lookup_kind<K: ComponentKinds>(
    marshaler: &Marshaler<K>,
    kind: &Value,
) -> Result<(K, ComponentId), String> {
    match kind {
        Value::Number(id) => lookup_id(marshaler, *id),
        Value::String(name) => lookup_named(marshaler, name),
        other => Err(format!(
            "component kind must be a name or an id, got a {}",
            other.kind()
        )),
    }
}

// Components read with `get` carry both `type` and `name`; a hand-built
// table needs one of them.
fn kind_of_table<K: ComponentKinds>(
    marshaler: &Marshaler<K>,
    component: &Table,
) -> Result<(K, ComponentId), String> {
    match component.value("type").or_else(|| component.value("name")) {
        Some(kind) => lookup_kind(marshaler, kind),
        None => Err("component table has neither 'type' nor 'name'".to_owned()),
    }
}

fn get_component<S: ComponentStore, K: ComponentKinds>(
    worlds: &WorldRegistry<S>,
    marshaler: &Marshaler<K>,
    handle: &Table,
    kind: &Value,
) -> Table {
    let Some(handle) = EntityHandle::from_table(handle) else {
        return failure("not an entity handle");
    };
    let (kind, id) = match lookup_kind(marshaler, kind) {
        Ok(found) => found,
        Err(what) => return failure(what),
    };
    let Some(world) = worlds.get(handle.world) else {
        return failure(format!("no world with handle {}", handle.world.to_bits()));
    };
    let Ok(world) = world.try_borrow() else {
        return failure("world is being modified");
    };
    match world.component_bytes(handle.entity, id) {
        Some(bytes) => marshaler.serialize(id, bytes),
        None => failure(format!(
            "entity {:?} has no {} component",
            handle.entity,
            kind.name()
        )),
    }
}

fn set_component<S: ComponentStore, K: ComponentKinds>(
    worlds: &WorldRegistry<S>,
    marshaler: &Marshaler<K>,
    handle: &Table,
    component: &Table,
) -> Result<(), String> {
    let handle = EntityHandle::from_table(handle).ok_or("not an entity handle")?;
    // The marshaler asserts on this; script input must not reach that.
    match component.try_get::<bool>("good") {
        Some(true) => {}
        Some(false) => return Err("component table is a failed result".to_owned()),
        None => return Err("component table has no 'good' field".to_owned()),
    }
    let (kind, id) = kind_of_table(marshaler, component)?;
    let world = worlds
        .get(handle.world)
        .ok_or_else(|| format!("no world with handle {}", handle.world.to_bits()))?;
    let mut world = world
        .try_borrow_mut()
        .map_err(|_| "world is already borrowed".to_owned())?;
    let dst = world
        .component_bytes_mut(handle.entity, id)
        .ok_or_else(|| format!("entity {:?} has no {} component", handle.entity, kind.name()))?;
    marshaler.deserialize(id, component, dst);
    Ok(())
}
