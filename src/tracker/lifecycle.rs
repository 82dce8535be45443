//! Creation, promotion, demotion and removal of plugin groups.

use log::debug;

use crate::layout::groups::{
    COMPACT_HEIGHT, COMPACT_WIDTH, PLUGIN_MIN_WIDTH, dependency_grid, file_rect, fit_group_to_files,
    next_plugin_group_position, required_height,
};
use crate::layout::{CollisionBox, CollisionConfig, resolve_collisions};
use crate::model::{
    EdgeType, GraphStore, GroupNode, GroupType, NavigationEdge, Position, group_id_for,
};
use crate::plugins::{PluginIndex, PluginInfo};

fn plugin_path(plugin: &PluginInfo, plugins: &PluginIndex) -> String {
    let root = plugins.workspace_root();
    match plugin.directory.strip_prefix(root) {
        Ok(relative) => relative.to_string_lossy().replace('\\', "/"),
        Err(_) => plugin.directory.to_string_lossy().into_owned(),
    }
}

/// The indexed spelling of a declared requirement; manifests may differ in case
/// from the runtime id they refer to. Unknown ids are kept as written.
fn canonical_runtime_id(plugins: &PluginIndex, declared: &str) -> String {
    plugins
        .lookup_by_runtime_id(declared)
        .map(|plugin| plugin.runtime_id)
        .unwrap_or_else(|| declared.to_owned())
}

fn canonical_requirements(plugins: &PluginIndex, plugin: &PluginInfo) -> Vec<String> {
    let mut required = Vec::with_capacity(plugin.required_plugins.len());
    for declared in &plugin.required_plugins {
        let id = canonical_runtime_id(plugins, declared);
        if id != plugin.runtime_id && !required.contains(&id) {
            required.push(id);
        }
    }
    required
}

/// Makes sure `plugin` has an expanded plugin group, promoting a dependency
/// placeholder in place or creating a new group below the previous one. Returns
/// the group id.
pub fn ensure_plugin_group(store: &mut GraphStore, plugins: &PluginIndex, plugin: &PluginInfo) -> String {
    let id = group_id_for(&plugin.runtime_id);
    let file_count = store.state().file_count(&id);

    match store.group(&id).map(|group| group.group_type) {
        Some(GroupType::Plugin) => return id,
        Some(_) => {
            let path = plugin_path(plugin, plugins);
            let required = canonical_requirements(plugins, plugin);
            store.update_group(&id, |group| {
                group.group_type = GroupType::Plugin;
                group.label = plugin.label().to_owned();
                group.required_plugins = Some(required);
                group.plugin_path = Some(path);
                group.width = group.width.max(PLUGIN_MIN_WIDTH);
                group.height = group.height.max(required_height(file_count));
            });
            debug!("promoted {id} to a plugin group");
        }
        None => {
            let group = GroupNode {
                id: id.clone(),
                label: plugin.label().to_owned(),
                group_type: GroupType::Plugin,
                position: next_plugin_group_position(store.state()),
                width: PLUGIN_MIN_WIDTH,
                height: required_height(file_count),
                required_plugins: Some(canonical_requirements(plugins, plugin)),
                plugin_path: Some(plugin_path(plugin, plugins)),
            };
            store.add_group(group);
        }
    }

    materialize_dependencies(store, plugins, &id);
    settle_top_level(store);
    id
}

/// Adds a compact placeholder group for every requirement of `owner_id` that has
/// no group yet, and a dependency edge for every requirement that has one.
pub fn materialize_dependencies(store: &mut GraphStore, plugins: &PluginIndex, owner_id: &str) -> bool {
    let Some(owner) = store.group(owner_id).cloned() else {
        return false;
    };
    let required = owner.required_plugins.clone().unwrap_or_default();
    let slots = dependency_grid(&owner, required.len());
    let mut changed = false;

    for (declared, slot) in required.iter().zip(slots) {
        let known = plugins.lookup_by_runtime_id(declared);
        let dependency_id = group_id_for(
            known
                .as_ref()
                .map_or(declared.as_str(), |plugin| plugin.runtime_id.as_str()),
        );
        if dependency_id == owner_id {
            continue;
        }
        if store.group(&dependency_id).is_none() {
            let label = known
                .as_ref()
                .map_or_else(|| declared.clone(), |plugin| plugin.label().to_owned());
            changed |= store.add_group(GroupNode {
                id: dependency_id.clone(),
                label,
                group_type: GroupType::Dependency,
                position: slot,
                width: COMPACT_WIDTH,
                height: COMPACT_HEIGHT,
                required_plugins: None,
                plugin_path: None,
            });
        }
        changed |= store.add_edge(NavigationEdge::dependency(&dependency_id, owner_id));
    }
    changed
}

/// Called after a file left `group_id`. An emptied group is demoted when another
/// plugin still requires it and deleted otherwise; then its former direct
/// dependencies that are now unused placeholders are deleted as well.
pub fn release_group_if_empty(store: &mut GraphStore, group_id: &str) {
    let Some(group) = store.group(group_id).cloned() else {
        return;
    };
    let remaining = store.state().file_count(group_id);
    if remaining > 0 {
        return;
    }

    let former_dependencies = group.required_plugins.clone().unwrap_or_default();
    if store
        .state()
        .is_required_by_other_plugin(group.runtime_id(), group_id)
    {
        store.update_group(group_id, |group| {
            group.group_type = GroupType::Dependency;
            group.required_plugins = None;
            group.plugin_path = None;
            fit_group_to_files(group, 0);
        });
        store.remove_edges_where(|edge| {
            edge.edge_type == EdgeType::Dependency && edge.target == group_id
        });
        debug!("demoted {group_id} to a dependency placeholder");
    } else {
        store.remove_group(group_id);
    }

    for runtime_id in former_dependencies {
        let dependency_id = group_id_for(&runtime_id);
        let unused = store.group(&dependency_id).is_some_and(|dependency| {
            dependency.group_type == GroupType::Dependency
                && store.state().file_count(&dependency_id) == 0
                && !store
                    .state()
                    .is_required_by_other_plugin(&runtime_id, &dependency_id)
        });
        if unused {
            store.remove_group(&dependency_id);
        }
    }
}

/// Ensures placeholders exist for every requirement of every plugin group.
pub fn top_up_dependencies(store: &mut GraphStore, plugins: &PluginIndex) -> bool {
    let owners = store
        .state()
        .groups
        .iter()
        .filter(|group| group.group_type == GroupType::Plugin)
        .map(|group| group.id.clone())
        .collect::<Vec<_>>();
    let mut changed = false;
    for owner in owners {
        changed |= materialize_dependencies(store, plugins, &owner);
    }
    if changed {
        settle_top_level(store);
    }
    changed
}

/// Deletes every dependency placeholder that owns no files.
pub fn prune_empty_dependency_groups(store: &mut GraphStore) -> bool {
    let empty = store
        .state()
        .groups
        .iter()
        .filter(|group| group.group_type == GroupType::Dependency)
        .filter(|group| store.state().file_count(&group.id) == 0)
        .map(|group| group.id.clone())
        .collect::<Vec<_>>();
    for id in &empty {
        store.remove_group(id);
    }
    !empty.is_empty()
}

/// Collision pass over groups and ungrouped files, which share the canvas frame.
pub fn settle_top_level(store: &mut GraphStore) {
    let state = store.state();
    let mut boxes = state
        .groups
        .iter()
        .map(|group| CollisionBox::new(group.id.clone(), None, group.rect()))
        .chain(
            state
                .nodes
                .iter()
                .filter(|node| node.group_id.is_none())
                .map(|node| {
                    CollisionBox::new(
                        node.id.clone(),
                        None,
                        file_rect(node.position, PLUGIN_MIN_WIDTH),
                    )
                }),
        )
        .collect::<Vec<_>>();

    if resolve_collisions(&mut boxes, CollisionConfig::default()) == 0 {
        return;
    }
    apply_positions(store, &boxes);
}

/// Collision pass over the files inside one group, in its local frame.
pub fn settle_group_members(store: &mut GraphStore, group_id: &str) {
    let Some(width) = store.group(group_id).map(|group| group.width) else {
        return;
    };
    let mut boxes = store
        .state()
        .files_in_group(group_id)
        .map(|node| {
            CollisionBox::new(
                node.id.clone(),
                Some(group_id.to_owned()),
                file_rect(node.position, width),
            )
        })
        .collect::<Vec<_>>();

    if resolve_collisions(&mut boxes, CollisionConfig::default()) == 0 {
        return;
    }
    apply_positions(store, &boxes);
}

fn apply_positions(store: &mut GraphStore, boxes: &[CollisionBox]) {
    for moved in boxes {
        let position = Position::from(moved.rect.min);
        if !store.update_group(&moved.id, |group| group.position = position) {
            store.update_node(&moved.id, |node| node.position = position);
        }
    }
}
