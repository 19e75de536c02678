//! Shortcut assignment.
//!
//! [`assign`] turns an ordered candidate list into the switchable list: pins
//! ordered by declaration and placed before or after the rest, custom
//! shortcuts reserved up front, and the remaining entries numbered left to
//! right from the lowest free slot. [`reorder`] is the simpler positional
//! renumbering used after an explicit user reorder.
use std::collections::HashMap;

use config::PinnedApp;
use keyswitch_keys::{SEQUENCE_LEN, char_at};
use tracing::debug;

use crate::TrackedApp;

/// Set both assignment fields for slot `index`.
fn set_slot(app: &mut TrackedApp, index: usize) {
    app.assigned_number = Some(index);
    app.assigned_key = char_at(index);
}

/// Assign shortcuts to `candidates`.
///
/// Candidates whose bundle id appears in `pinned` are ordered by their pin
/// declaration and placed ahead of (`pinned_first`) or behind the unpinned
/// entries. Valid custom shortcuts are reserved before the walk; when two pins
/// claim the same key the later one falls through to automatic numbering.
/// Automatic numbering stops at `capacity`, except for always-show pins which
/// may take any free slot in the sequence. The result is truncated to
/// `capacity` entries, always-show pins excepted. Entries that found no free
/// slot stay in the list unassigned.
pub fn assign(
    candidates: &[TrackedApp],
    pinned: &[PinnedApp],
    capacity: usize,
    pinned_first: bool,
) -> Vec<TrackedApp> {
    let mut pin_pos: HashMap<&str, usize> = HashMap::new();
    for (i, p) in pinned.iter().enumerate() {
        pin_pos.entry(p.bundle_id.as_str()).or_insert(i);
    }

    let mut matched: Vec<(usize, &TrackedApp)> = Vec::new();
    let mut unpinned: Vec<&TrackedApp> = Vec::new();
    for c in candidates {
        match pin_pos.get(c.bundle_id.as_str()) {
            Some(&pos) => matched.push((pos, c)),
            None => unpinned.push(c),
        }
    }
    matched.sort_by_key(|(pos, _)| *pos);

    let mut occupied = [false; SEQUENCE_LEN];
    let mut fixed: HashMap<&str, usize> = HashMap::new();
    let mut always: HashMap<&str, bool> = HashMap::new();
    for (pos, app) in &matched {
        let pin = &pinned[*pos];
        always.insert(app.bundle_id.as_str(), pin.always_show);
        if let Some(idx) = pin.shortcut_index() {
            if occupied[idx] {
                debug!(bundle_id = %pin.bundle_id, index = idx, "duplicate_custom_shortcut_falls_through");
            } else {
                occupied[idx] = true;
                fixed.insert(app.bundle_id.as_str(), idx);
            }
        }
    }

    let pinned_part = matched.iter().map(|(_, a)| *a);
    let ordered: Vec<&TrackedApp> = if pinned_first {
        pinned_part.chain(unpinned.iter().copied()).collect()
    } else {
        unpinned.iter().copied().chain(pinned_part).collect()
    };

    let normal_ceiling = capacity.min(SEQUENCE_LEN);
    let mut cursor = 0;
    let mut out = Vec::with_capacity(ordered.len());
    for (pos, src) in ordered.into_iter().enumerate() {
        let always_show = always.get(src.bundle_id.as_str()).copied().unwrap_or(false);
        if pos >= capacity && !always_show {
            continue;
        }
        let mut app = src.clone();
        app.clear_assignment();
        if let Some(&idx) = fixed.get(src.bundle_id.as_str()) {
            set_slot(&mut app, idx);
        } else {
            let ceiling = if always_show {
                SEQUENCE_LEN
            } else {
                normal_ceiling
            };
            while cursor < SEQUENCE_LEN && occupied[cursor] {
                cursor += 1;
            }
            if cursor < ceiling {
                occupied[cursor] = true;
                set_slot(&mut app, cursor);
                cursor += 1;
            }
        }
        out.push(app);
    }
    out
}

/// Re-project `current` into `new_order` and renumber by position.
///
/// Entries whose bundle id is not named in `new_order` follow in their
/// original order. Positions `0..capacity` receive slots `0..capacity`; later
/// entries are left unassigned. Pins are ignored.
pub fn reorder(current: &[TrackedApp], new_order: &[String], capacity: usize) -> Vec<TrackedApp> {
    let mut taken = vec![false; current.len()];
    let mut out = Vec::with_capacity(current.len());
    for id in new_order {
        if let Some(i) = current
            .iter()
            .enumerate()
            .position(|(i, a)| !taken[i] && a.bundle_id == *id)
        {
            taken[i] = true;
            out.push(current[i].clone());
        }
    }
    for (i, app) in current.iter().enumerate() {
        if !taken[i] {
            out.push(app.clone());
        }
    }
    let ceiling = capacity.min(SEQUENCE_LEN);
    for (i, app) in out.iter_mut().enumerate() {
        app.clear_assignment();
        if i < ceiling {
            set_slot(app, i);
        }
    }
    out
}
