//! Auto-layout geometry.
//!
//! Positions a frame's children and computes hug sizes after its subtree has been
//! materialized. Frames are arranged bottom-up, so a child's size is final by the
//! time its parent is arranged.

use crate::ir::{ItemSpacing, LayoutAlign, LayoutMode, SizingMode};
use crate::scene::{NodeId, NodeKind, SceneGraph};

/// Width available to text under `parent`, with the width of the ancestor that
/// constrains it. Walks up through FILL children until a fixed-width frame is found.
pub fn effective_width(graph: &SceneGraph, parent: NodeId) -> Option<(f64, f64)> {
    let mut inset = 0.0;
    let mut current = Some(parent);
    while let Some(id) = current {
        let node = graph.node(id);
        if let NodeKind::Frame(frame) = &node.kind {
            inset += frame.padding.horizontal();
        }
        if node.fixed_width {
            return Some((node.width, (node.width - inset).max(0.0)));
        }
        if !node.layout.fills_width {
            return None;
        }
        current = node.parent;
    }
    None
}

/// Inner width of a frame, when it is known at creation time.
pub fn inner_width(graph: &SceneGraph, frame: NodeId) -> Option<f64> {
    let node = graph.node(frame);
    let padding = node.frame().map(|f| f.padding.horizontal()).unwrap_or(0.0);
    node.fixed_width.then(|| (node.width - padding).max(0.0))
}

pub fn arrange(graph: &mut SceneGraph, frame_id: NodeId) {
    let Some(frame) = graph.node(frame_id).frame().cloned() else {
        return;
    };
    let children: Vec<NodeId> = graph
        .children(frame_id)
        .iter()
        .copied()
        .filter(|c| graph.node(*c).visible)
        .collect();

    match frame.layout_mode {
        LayoutMode::None => arrange_absolute(graph, frame_id, &children),
        LayoutMode::Vertical | LayoutMode::Horizontal => {
            arrange_auto(graph, frame_id, &children, frame.layout_mode)
        }
    }
}

fn arrange_absolute(graph: &mut SceneGraph, frame_id: NodeId, children: &[NodeId]) {
    let (right, bottom) = content_extent(graph, children);
    let node = graph.node_mut(frame_id);
    if !node.fixed_width && right > 0.0 {
        node.width = node.constraints.clamp_width(right);
    }
    if node.height <= 0.0 {
        node.height = node.constraints.clamp_height(bottom);
    }
}

/// Right and bottom edges of the union of `children`.
pub fn content_extent(graph: &SceneGraph, children: &[NodeId]) -> (f64, f64) {
    children.iter().fold((0.0_f64, 0.0_f64), |(r, b), c| {
        let n = graph.node(*c);
        (r.max(n.x + n.width), b.max(n.y + n.height))
    })
}

fn main_size(graph: &SceneGraph, c: NodeId, vertical: bool) -> f64 {
    let n = graph.node(c);
    if vertical {
        n.height
    } else {
        n.width
    }
}

fn cross_size(graph: &SceneGraph, c: NodeId, vertical: bool) -> f64 {
    let n = graph.node(c);
    if vertical {
        n.width
    } else {
        n.height
    }
}

/// One run of children along the primary axis. Only wrapping rows have more than one.
struct Line {
    children: Vec<NodeId>,
    main: f64,
    cross: f64,
}

fn break_lines(
    graph: &SceneGraph,
    children: &[NodeId],
    vertical: bool,
    spacing: f64,
    wrap_limit: Option<f64>,
) -> Vec<Line> {
    let mut lines: Vec<Line> = Vec::new();
    let mut current: Vec<NodeId> = Vec::new();
    let mut used = 0.0;
    for c in children {
        let child_main = main_size(graph, *c, vertical);
        if let Some(limit) = wrap_limit {
            if !current.is_empty() && used + child_main > limit {
                lines.push(measure_line(graph, std::mem::take(&mut current), vertical, spacing));
                used = 0.0;
            }
        }
        used += child_main + spacing;
        current.push(*c);
    }
    if !current.is_empty() {
        lines.push(measure_line(graph, current, vertical, spacing));
    }
    lines
}

fn measure_line(graph: &SceneGraph, children: Vec<NodeId>, vertical: bool, spacing: f64) -> Line {
    let gaps = children.len().saturating_sub(1) as f64;
    let main = children.iter().map(|c| main_size(graph, *c, vertical)).sum::<f64>() + spacing * gaps;
    let cross = children
        .iter()
        .map(|c| cross_size(graph, *c, vertical))
        .fold(0.0_f64, f64::max);
    Line { children, main, cross }
}

fn arrange_auto(graph: &mut SceneGraph, frame_id: NodeId, children: &[NodeId], mode: LayoutMode) {
    let Some(frame) = graph.node(frame_id).frame().cloned() else {
        return;
    };
    let vertical = mode == LayoutMode::Vertical;
    let padding = frame.padding;
    let (pad_main_start, pad_main, pad_cross_start, pad_cross) = if vertical {
        (padding.top, padding.vertical(), padding.left, padding.horizontal())
    } else {
        (padding.left, padding.horizontal(), padding.top, padding.vertical())
    };

    let frame_main = main_size(graph, frame_id, vertical);
    let frame_cross = cross_size(graph, frame_id, vertical);
    let main_fixed = frame.primary_sizing == SizingMode::Fixed;
    let cross_fixed = frame.counter_sizing == SizingMode::Fixed;

    // Stretch across the counter axis.
    if cross_fixed {
        let inner_cross = (frame_cross - pad_cross).max(0.0);
        for c in children {
            let child = graph.node_mut(*c);
            if child.layout.layout_align == LayoutAlign::Stretch {
                if vertical {
                    child.width = child.constraints.clamp_width(inner_cross);
                } else {
                    child.height = child.constraints.clamp_height(inner_cross);
                }
            }
        }
    }

    let spacing = match frame.item_spacing {
        ItemSpacing::Fixed(s) => s,
        ItemSpacing::Auto => 0.0,
    };
    let gaps = children.len().saturating_sub(1) as f64;

    // Grow along the main axis when the frame has a fixed main size.
    if main_fixed {
        let total_grow: f64 = children.iter().map(|c| graph.node(*c).layout.layout_grow).sum();
        if total_grow > 0.0 {
            let used: f64 = children
                .iter()
                .filter(|c| graph.node(**c).layout.layout_grow <= 0.0)
                .map(|c| main_size(graph, *c, vertical))
                .sum();
            let free = (frame_main - pad_main - used - spacing * gaps).max(0.0);
            for c in children {
                let grow = graph.node(*c).layout.layout_grow;
                if grow > 0.0 {
                    let share = free * grow / total_grow;
                    let child = graph.node_mut(*c);
                    if vertical {
                        child.height = child.constraints.clamp_height(share);
                    } else {
                        child.width = child.constraints.clamp_width(share);
                    }
                }
            }
        }
    }

    let wrap_limit = (!vertical && frame.layout_wrap && main_fixed).then(|| frame_main - pad_main);
    let lines = break_lines(graph, children, vertical, spacing, wrap_limit);

    // Hug sizes for the axes that are not fixed.
    let hug_main = lines.iter().map(|l| l.main).fold(0.0_f64, f64::max) + pad_main;
    let line_gaps = lines.len().saturating_sub(1) as f64;
    let hug_cross = lines.iter().map(|l| l.cross).sum::<f64>() + spacing * line_gaps + pad_cross;
    {
        let node = graph.node_mut(frame_id);
        if !main_fixed {
            if vertical {
                node.height = node.constraints.clamp_height(hug_main);
            } else {
                node.width = node.constraints.clamp_width(hug_main);
            }
        }
        if !cross_fixed {
            if vertical {
                node.width = node.constraints.clamp_width(hug_cross);
            } else {
                node.height = node.constraints.clamp_height(hug_cross);
            }
        }
    }

    let inner_main = (main_size(graph, frame_id, vertical) - pad_main).max(0.0);
    let inner_cross = (cross_size(graph, frame_id, vertical) - pad_cross).max(0.0);
    let primary_align = frame.primary_axis_align_items.as_deref().unwrap_or("MIN");
    let cross_align = frame.counter_axis_align_items.as_deref().unwrap_or("MIN");
    let distribute = matches!(frame.item_spacing, ItemSpacing::Auto) || primary_align == "SPACE_BETWEEN";
    let single_line = lines.len() == 1;

    let mut cursor_cross = pad_cross_start;
    for line in &lines {
        let line_gaps = line.children.len().saturating_sub(1) as f64;
        let free = (inner_main - line.main).max(0.0);
        let (start, gap) = if distribute && line_gaps > 0.0 {
            (0.0, spacing + free / line_gaps)
        } else {
            match primary_align {
                "CENTER" => (free / 2.0, spacing),
                "MAX" => (free, spacing),
                _ => (0.0, spacing),
            }
        };
        // A lone line aligns against the frame; wrapped lines against their own height.
        let line_extent = if single_line { inner_cross } else { line.cross };

        let mut cursor_main = pad_main_start + start;
        for c in &line.children {
            let child_main = main_size(graph, *c, vertical);
            let child_cross = cross_size(graph, *c, vertical);
            let offset = match cross_align {
                "CENTER" => ((line_extent - child_cross) / 2.0).max(0.0),
                "MAX" => (line_extent - child_cross).max(0.0),
                _ => 0.0,
            };
            let child = graph.node_mut(*c);
            if vertical {
                child.x = cursor_cross + offset;
                child.y = cursor_main;
            } else {
                child.x = cursor_main;
                child.y = cursor_cross + offset;
            }
            cursor_main += child_main + gap;
        }
        cursor_cross += line.cross + spacing;
    }
}
